//! DAG Module - network compilation
//!
//! - `network`: `Network` arena + `NetworkBuilder` (indexing, uniqueness checks)
//! - `validate`: cycle detection, promised-input check
//! - `prune`: backward reachability from requested outputs
//! - `schedule`: stable Kahn order + parallel levels
//! - `plan`: `ExecutionPlan` and its `Step`s (including evictions)

mod network;
mod plan;
mod prune;
mod schedule;
mod validate;

pub use network::{build_network, run, Network, NetworkBuilder, NetworkStats};
pub use plan::{ExecutionPlan, Step};
