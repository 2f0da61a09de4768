//! Service lifecycle: registration, spawning, and graceful shutdown.

pub mod jobs;
pub mod manager;
pub mod signals;
pub mod web;
