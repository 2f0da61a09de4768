//! The pure analytics core: schedule resolution, conversation segmentation,
//! working-interval arithmetic, metric aggregation, and upsert planning.
//!
//! Nothing in this module touches the database. The data layer feeds typed
//! rows in and executes the plans that come out, which keeps every stage
//! here deterministic and independently testable.

pub mod aggregate;
pub mod error;
pub mod pipeline;
pub mod plan;
pub mod schedule;
pub mod segment;
pub mod working_time;
