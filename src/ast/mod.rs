//! AST Module - operation declarations
//!
//! - `operation`: `Operation`, the `Compute` capability, `Inputs`/`Outputs`
//! - `builder`: `OperationBuilder`, the declaration-time factory

mod builder;
mod operation;

pub use builder::OperationBuilder;
pub use operation::{Compute, Inputs, Operation, Outputs, Params};
