//! Runtime Module - plan execution
//!
//! - `executor`: runs a compiled plan (sequential, or level-parallel on a worker pool)
//! - `cache`: `PlanCache`, memoized plans keyed by request shape
//!
//! This module represents the "how" - runtime execution.
//! For static structure, see the `dag` module.

mod cache;
mod executor;

pub use cache::{PlanCache, PlanKey};
pub use executor::execute;
