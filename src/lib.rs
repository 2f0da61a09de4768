//! chatmetrics: working-hours-aware conversation analytics for a messaging
//! platform.
//!
//! The service reads raw message events and per-user working-hours
//! schedules, computes per-conversation and per-day response metrics
//! (counted only inside working hours), and merges the results into
//! aggregate tables through idempotent upsert plans.

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod engine;
pub mod logging;
pub mod services;
pub mod state;
pub mod utils;
pub mod web;
