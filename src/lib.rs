//! opgraph - compile and run minimal DAG plans over named-data operations
//!
//! Declare operations (`needs` → `provides`), compose them into a validated
//! [`Network`], then ask for any subset of outputs: only the operations on
//! the backward path from those outputs run, in a deterministic order.
//!
//! ## Module Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        DOMAIN MODEL                          │
//! │  ast/       Operation, Compute, Inputs/Outputs, builder      │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      APPLICATION LAYER                       │
//! │  dag/       Network, validate, prune, schedule, plan         │
//! │  runtime/   Executor, PlanCache                              │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    INFRASTRUCTURE LAYER                      │
//! │  store/     ResultSet                                        │
//! │  event/     Event log (EventLog, EventKind)                  │
//! │  util/      Name interner                                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`ast`] | Operation declarations and the `Compute` boundary |
//! | [`dag`] | Network indexing, cycle checks, pruning, scheduling, plans |
//! | [`runtime`] | Plan execution (sequential or level-parallel) and plan cache |
//! | [`store`] | Run results |
//! | [`event`] | Event log for audit/debugging |
//! | [`util`] | String interning |
//! | [`config`] | Per-network execution policy (TOML + env) |
//! | [`error`] | Error types with codes and fix suggestions |
//!
//! ## Example
//!
//! ```
//! use opgraph::{build_network, run, Operation, Outputs};
//! use serde_json::json;
//!
//! let mul1 = Operation::builder("mul1")
//!     .needs(["a", "b"])
//!     .provide("ab")
//!     .compute(|inputs, _| Ok(Outputs::from(json!(inputs.get_as::<i64>("a")? * inputs.get_as::<i64>("b")?))))
//!     .build()?;
//! let sub1 = Operation::builder("sub1")
//!     .needs(["a", "ab"])
//!     .provide("a_minus_ab")
//!     .compute(|inputs, _| Ok(Outputs::from(json!(inputs.get_as::<i64>("a")? - inputs.get_as::<i64>("ab")?))))
//!     .build()?;
//!
//! let net = build_network([mul1, sub1])?;
//! let result = run(&net, [("a", json!(2)), ("b", json!(5))], Some(&["a_minus_ab"][..]))?;
//! assert_eq!(result.to_json(), json!({"a_minus_ab": -8}));
//! # Ok::<(), opgraph::GraphError>(())
//! ```

// ═══════════════════════════════════════════════════════════════
// DOMAIN MODEL - operation declarations
// ═══════════════════════════════════════════════════════════════
pub mod ast;

// ═══════════════════════════════════════════════════════════════
// APPLICATION LAYER - compilation and execution
// ═══════════════════════════════════════════════════════════════
pub mod dag;
pub mod runtime;

// ═══════════════════════════════════════════════════════════════
// INFRASTRUCTURE LAYER - results, events, utilities
// ═══════════════════════════════════════════════════════════════
pub mod event;
pub mod store;
pub mod util;

// ═══════════════════════════════════════════════════════════════
// CROSS-CUTTING - Error handling, configuration
// ═══════════════════════════════════════════════════════════════
pub mod config;
pub mod error;

// ═══════════════════════════════════════════════════════════════
// PUBLIC API RE-EXPORTS
// ═══════════════════════════════════════════════════════════════

// Error types
pub use error::{ErrorCategory, FixSuggestion, GraphError, Result};

// Config types
pub use config::{InputOverlap, NetConfig};

// Declarations
pub use ast::{Compute, Inputs, Operation, OperationBuilder, Outputs, Params};

// Network
pub use dag::{build_network, run, ExecutionPlan, Network, NetworkBuilder, NetworkStats, Step};

// Results and events
pub use event::{Event, EventKind, EventLog};
pub use store::ResultSet;
