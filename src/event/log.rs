//! EventLog - append-only audit trail of compile and run activity
//!
//! - Event: envelope with id + timestamp + kind
//! - EventKind: plan, run and operation level events
//! - EventLog: thread-safe, cheap to clone (shared storage)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single event in the log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence ID (for ordering)
    pub id: u64,
    /// Time since the log was created (ms)
    pub timestamp_ms: u64,
    pub kind: EventKind,
}

/// All event types
///
/// Uses `Arc<str>` names (interned) so emitting never copies strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // ═══════════════════════════════════════════
    // PLAN LEVEL
    // ═══════════════════════════════════════════
    PlanCompiled {
        inputs: Vec<Arc<str>>,
        outputs: Option<Vec<Arc<str>>>,
        operations: Vec<Arc<str>>,
        evictions: usize,
    },
    PlanReused {
        inputs: Vec<Arc<str>>,
        outputs: Option<Vec<Arc<str>>>,
    },

    // ═══════════════════════════════════════════
    // RUN LEVEL
    // ═══════════════════════════════════════════
    RunStarted {
        operations: usize,
        parallel: bool,
    },
    RunCompleted {
        outputs: Vec<Arc<str>>,
        total_duration_ms: u64,
    },
    RunFailed {
        error: String,
        failed_operation: Option<Arc<str>>,
    },

    // ═══════════════════════════════════════════
    // OPERATION LEVEL
    // ═══════════════════════════════════════════
    OperationStarted {
        operation: Arc<str>,
    },
    OperationCompleted {
        operation: Arc<str>,
        provided: Vec<Arc<str>>,
        duration_ms: u64,
    },
    OperationFailed {
        operation: Arc<str>,
        error: String,
        duration_ms: u64,
    },
    ValueEvicted {
        name: Arc<str>,
    },
}

impl EventKind {
    /// Operation name if the event is about one operation
    pub fn operation(&self) -> Option<&str> {
        match self {
            Self::OperationStarted { operation }
            | Self::OperationCompleted { operation, .. }
            | Self::OperationFailed { operation, .. } => Some(operation),
            Self::RunFailed {
                failed_operation, ..
            } => failed_operation.as_deref(),
            Self::PlanCompiled { .. }
            | Self::PlanReused { .. }
            | Self::RunStarted { .. }
            | Self::RunCompleted { .. }
            | Self::ValueEvicted { .. } => None,
        }
    }

    pub fn is_run_event(&self) -> bool {
        matches!(
            self,
            Self::RunStarted { .. } | Self::RunCompleted { .. } | Self::RunFailed { .. }
        )
    }

    pub fn is_plan_event(&self) -> bool {
        matches!(self, Self::PlanCompiled { .. } | Self::PlanReused { .. })
    }
}

/// Thread-safe, append-only event log
#[derive(Clone)]
pub struct EventLog {
    events: Arc<RwLock<Vec<Event>>>,
    start_time: Instant,
    next_id: Arc<AtomicU64>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            start_time: Instant::now(),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event (thread-safe, returns event ID)
    pub fn emit(&self, kind: EventKind) -> u64 {
        // Id taken under the write lock so ids stay in append order
        let mut events = self.events.write();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        events.push(Event {
            id,
            timestamp_ms: self.start_time.elapsed().as_millis() as u64,
            kind,
        });
        id
    }

    /// All events (cloned - use `with_events` for zero-copy access)
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Zero-copy access to events via callback
    ///
    /// Holds read lock for duration of callback - keep it short.
    pub fn with_events<T>(&self, f: impl FnOnce(&[Event]) -> T) -> T {
        f(&self.events.read())
    }

    pub fn filter_operation(&self, operation: &str) -> Vec<Event> {
        self.with_events(|events| {
            events
                .iter()
                .filter(|e| e.kind.operation() == Some(operation))
                .cloned()
                .collect()
        })
    }

    pub fn count_operation(&self, operation: &str) -> usize {
        self.with_events(|events| {
            events
                .iter()
                .filter(|e| e.kind.operation() == Some(operation))
                .count()
        })
    }

    pub fn run_events(&self) -> Vec<Event> {
        self.with_events(|events| {
            events
                .iter()
                .filter(|e| e.kind.is_run_event())
                .cloned()
                .collect()
        })
    }

    /// Serialize to JSON for persistence/debugging
    pub fn to_json(&self) -> Value {
        self.with_events(|events| serde_json::to_value(events).unwrap_or(Value::Null))
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("len", &self.len())
            .finish()
    }
}
