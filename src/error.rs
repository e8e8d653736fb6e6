// The #[error] attribute from thiserror uses struct fields via string interpolation,
// but Rust's unused_assignments lint doesn't recognize this.
#![allow(unused_assignments)]

//! opgraph Error Types with Error Codes
//!
//! Error code ranges:
//! - OPG-000-009: Operation declaration errors
//! - OPG-010-019: Network structure errors (fatal, raised by `build_network`)
//! - OPG-020-029: Request errors (per call, fix the inputs/outputs asked)
//! - OPG-030-039: Execution errors (internal invariants, contracts, user failures)
//! - OPG-040-049: Config errors

use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

fn needed_by_suffix(needed_by: &Option<String>) -> String {
    needed_by
        .as_ref()
        .map(|op| format!(" (needed by operation '{}')", op))
        .unwrap_or_default()
}

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Where in the build/compile/execute lifecycle an error belongs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad operation declaration, caught by the builder
    Declaration,
    /// Network shape defect; the network can never be used
    Structural,
    /// The call asked for something the inputs cannot deliver
    Request,
    /// Engine invariant violated; signals a bug, not a user error
    Internal,
    /// Operation broke its declared `provides` contract
    Contract,
    /// The operation's own callable failed
    Operation,
    /// Configuration could not be loaded
    Config,
}

/// All error variants are part of the public API.
///
/// Implements both `thiserror::Error` for std error compatibility
/// and `miette::Diagnostic` for fancy terminal error display.
#[derive(Error, Debug, Diagnostic)]
pub enum GraphError {
    // ═══════════════════════════════════════════
    // DECLARATION ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[OPG-001] Invalid operation '{name}': {reason}")]
    #[diagnostic(
        code(opgraph::invalid_operation),
        help("Give the operation a name, a callable and unique needs/provides")
    )]
    InvalidOperation { name: String, reason: String },

    // ═══════════════════════════════════════════
    // STRUCTURE ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[OPG-010] Operation name '{name}' declared more than once")]
    #[diagnostic(
        code(opgraph::duplicate_operation_name),
        help("Rename one of the operations; names must be unique in a network")
    )]
    DuplicateOperationName { name: String },

    #[error("[OPG-011] Data '{name}' provided by both '{first}' and '{second}'")]
    #[diagnostic(
        code(opgraph::duplicate_provider),
        help("Each data name may have a single producing operation")
    )]
    DuplicateProvider {
        name: String,
        first: String,
        second: String,
    },

    #[error("[OPG-012] Cycle detected at operation '{operation}': {cycle}")]
    #[diagnostic(
        code(opgraph::cyclic_graph),
        help("Break the loop: an operation cannot (transitively) need its own outputs")
    )]
    CyclicGraph { operation: String, cycle: String },

    // ═══════════════════════════════════════════
    // REQUEST ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error(
        "[OPG-020] Cannot produce '{name}' from the given inputs{}",
        needed_by_suffix(.needed_by)
    )]
    #[diagnostic(
        code(opgraph::unresolvable_output),
        help("Supply the missing input, or ask only for outputs the inputs can reach")
    )]
    UnresolvableOutput {
        name: String,
        needed_by: Option<String>,
    },

    #[error("[OPG-021] Input '{name}' is also provided by operation '{operation}'")]
    #[diagnostic(
        code(opgraph::ambiguous_input),
        help("Drop the input, or set input_overlap = \"short_circuit\" to let it win")
    )]
    AmbiguousInput { name: String, operation: String },

    // ═══════════════════════════════════════════
    // EXECUTION ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[OPG-030] Operation '{operation}' is missing input '{name}' (planner bug)")]
    #[diagnostic(code(opgraph::missing_input))]
    MissingInput { operation: String, name: String },

    #[error("[OPG-031] Operation '{operation}' broke its provides contract {expected:?}: {reason}")]
    #[diagnostic(
        code(opgraph::output_arity_mismatch),
        help("Return one value per declared provide, in order or keyed by name")
    )]
    OutputArityMismatch {
        operation: String,
        expected: Vec<String>,
        reason: String,
    },

    #[error("[OPG-032] Operation '{operation}' failed: {source}")]
    #[diagnostic(code(opgraph::operation_failed))]
    OperationExecution {
        operation: String,
        source: anyhow::Error,
    },

    // ═══════════════════════════════════════════
    // CONFIG ERRORS (040-049)
    // ═══════════════════════════════════════════
    #[error("[OPG-040] Config error: {reason}")]
    #[diagnostic(code(opgraph::config_error))]
    ConfigError { reason: String },
}

impl GraphError {
    /// Get the error code (e.g., "OPG-012")
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidOperation { .. } => "OPG-001",
            Self::DuplicateOperationName { .. } => "OPG-010",
            Self::DuplicateProvider { .. } => "OPG-011",
            Self::CyclicGraph { .. } => "OPG-012",
            Self::UnresolvableOutput { .. } => "OPG-020",
            Self::AmbiguousInput { .. } => "OPG-021",
            Self::MissingInput { .. } => "OPG-030",
            Self::OutputArityMismatch { .. } => "OPG-031",
            Self::OperationExecution { .. } => "OPG-032",
            Self::ConfigError { .. } => "OPG-040",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidOperation { .. } => ErrorCategory::Declaration,
            Self::DuplicateOperationName { .. }
            | Self::DuplicateProvider { .. }
            | Self::CyclicGraph { .. } => ErrorCategory::Structural,
            Self::UnresolvableOutput { .. } | Self::AmbiguousInput { .. } => ErrorCategory::Request,
            Self::MissingInput { .. } => ErrorCategory::Internal,
            Self::OutputArityMismatch { .. } => ErrorCategory::Contract,
            Self::OperationExecution { .. } => ErrorCategory::Operation,
            Self::ConfigError { .. } => ErrorCategory::Config,
        }
    }

    /// Name of the operation the error is attributed to, if any
    pub fn operation(&self) -> Option<&str> {
        match self {
            Self::CyclicGraph { operation, .. }
            | Self::AmbiguousInput { operation, .. }
            | Self::MissingInput { operation, .. }
            | Self::OutputArityMismatch { operation, .. }
            | Self::OperationExecution { operation, .. } => Some(operation),
            Self::UnresolvableOutput { needed_by, .. } => needed_by.as_deref(),
            Self::InvalidOperation { name, .. } | Self::DuplicateOperationName { name } => {
                Some(name)
            }
            Self::DuplicateProvider { second, .. } => Some(second),
            Self::ConfigError { .. } => None,
        }
    }
}

impl FixSuggestion for GraphError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            GraphError::InvalidOperation { .. } => {
                Some("Give the operation a name, a callable and unique needs/provides")
            }
            GraphError::DuplicateOperationName { .. } => {
                Some("Rename one of the operations; names must be unique in a network")
            }
            GraphError::DuplicateProvider { .. } => {
                Some("Each data name may have a single producing operation")
            }
            GraphError::CyclicGraph { .. } => {
                Some("Remove circular dependencies between operations")
            }
            GraphError::UnresolvableOutput { .. } => {
                Some("Supply the missing input, or ask only for reachable outputs")
            }
            GraphError::AmbiguousInput { .. } => {
                Some("Drop the input or switch input_overlap to short_circuit")
            }
            GraphError::MissingInput { .. } => None,
            GraphError::OutputArityMismatch { .. } => {
                Some("Return one value per declared provide")
            }
            GraphError::OperationExecution { .. } => None,
            GraphError::ConfigError { .. } => Some("Check the TOML syntax and field names"),
        }
    }
}
