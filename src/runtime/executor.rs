//! Executor - runs a compiled plan against concrete input values
//!
//! Sequential mode walks `plan.steps()` in order, applying evictions.
//! Parallel mode runs each level on the network's worker pool and joins
//! before the next one; evictions are skipped there, the final filter gives
//! the same result.
//!
//! Either way a run is all-or-nothing: the first failure (a panicking body
//! included) aborts and no partial `ResultSet` escapes.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use rayon::prelude::*;
use rayon::ThreadPool;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::ast::{Inputs, Operation, Outputs};
use crate::dag::{ExecutionPlan, Step};
use crate::error::{GraphError, Result};
use crate::event::{EventKind, EventLog};
use crate::store::ResultSet;

type Values = FxHashMap<Arc<str>, Value>;

/// Execute `plan` seeded with `inputs`
///
/// With a `pool`, plan levels run in parallel on it; without one, steps run
/// in order on the calling thread.
#[instrument(skip_all, fields(operations = plan.len(), parallel = pool.is_some()))]
pub fn execute(
    plan: &ExecutionPlan,
    inputs: Values,
    pool: Option<&ThreadPool>,
    events: Option<&EventLog>,
) -> Result<ResultSet> {
    let parallel = pool.is_some();
    let start = Instant::now();
    if let Some(log) = events {
        log.emit(EventKind::RunStarted {
            operations: plan.len(),
            parallel,
        });
    }

    let supplied: FxHashSet<Arc<str>> = inputs.keys().cloned().collect();
    let mut run = Run {
        store: inputs,
        supplied,
        executed: Vec::with_capacity(plan.len()),
        events,
    };

    let outcome = match pool {
        Some(pool) => run.levels(plan, pool),
        None => run.steps(plan),
    };

    match outcome.and_then(|()| run.finish(plan)) {
        Ok(result) => {
            let total_duration_ms = start.elapsed().as_millis() as u64;
            info!(
                executed = result.executed().len(),
                returned = result.len(),
                total_duration_ms,
                "run completed"
            );
            if let Some(log) = events {
                log.emit(EventKind::RunCompleted {
                    outputs: result.names().map(Arc::from).collect(),
                    total_duration_ms,
                });
            }
            Ok(result)
        }
        Err(err) => {
            warn!(code = err.code(), error = %err, "run failed");
            if let Some(log) = events {
                log.emit(EventKind::RunFailed {
                    error: err.to_string(),
                    failed_operation: err.operation().map(Arc::from),
                });
            }
            Err(err)
        }
    }
}

/// Mutable state of one run
struct Run<'e> {
    store: Values,
    supplied: FxHashSet<Arc<str>>,
    executed: Vec<Arc<str>>,
    events: Option<&'e EventLog>,
}

impl Run<'_> {
    fn steps(&mut self, plan: &ExecutionPlan) -> Result<()> {
        for step in plan.steps() {
            match step {
                Step::Compute(op) => {
                    let values = invoke(op, &self.store, self.events)?;
                    self.merge(op, values);
                }
                Step::Evict(name) => {
                    if self.store.remove(name).is_some() {
                        debug!(name = %name, "value evicted");
                        if let Some(log) = self.events {
                            log.emit(EventKind::ValueEvicted {
                                name: Arc::clone(name),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn levels(&mut self, plan: &ExecutionPlan, pool: &ThreadPool) -> Result<()> {
        for (depth, level) in plan.levels().iter().enumerate() {
            debug!(depth, width = level.len(), "running level");

            let results: Vec<Result<Vec<Value>>> = match level.as_slice() {
                [op] => vec![invoke(op, &self.store, self.events)],
                _ => {
                    let store = &self.store;
                    let events = self.events;
                    // Indexed collect keeps declaration order
                    pool.install(|| {
                        level
                            .par_iter()
                            .map(|op| invoke(op, store, events))
                            .collect()
                    })
                }
            };

            // Level is in declaration order: the first error wins
            let produced = results.into_iter().collect::<Result<Vec<_>>>()?;
            for (op, values) in level.iter().zip(produced) {
                self.merge(op, values);
            }
        }
        Ok(())
    }

    /// Store an operation's values, never overwriting supplied inputs
    fn merge(&mut self, op: &Operation, values: Vec<Value>) {
        for (name, value) in op.provides().iter().zip(values) {
            if self.supplied.contains(name) {
                debug!(name = %name, operation = op.name(), "supplied input kept");
                continue;
            }
            self.store.insert(Arc::clone(name), value);
        }
        self.executed.push(Arc::clone(op.name_arc()));
    }

    fn finish(mut self, plan: &ExecutionPlan) -> Result<ResultSet> {
        let values: BTreeMap<Arc<str>, Value> = match plan.outputs() {
            Some(outputs) => {
                let mut kept = BTreeMap::new();
                for name in outputs {
                    let value = self.store.remove(name).ok_or_else(|| {
                        GraphError::UnresolvableOutput {
                            name: name.to_string(),
                            needed_by: None,
                        }
                    })?;
                    kept.insert(Arc::clone(name), value);
                }
                kept
            }
            None => self.store.into_iter().collect(),
        };
        Ok(ResultSet::new(values, self.executed))
    }
}

/// Gather needs, call the body, align its outputs with `provides`
fn invoke(op: &Operation, store: &Values, events: Option<&EventLog>) -> Result<Vec<Value>> {
    let mut entries = Vec::with_capacity(op.needs().len());
    for name in op.needs() {
        let value = store.get(name).ok_or_else(|| GraphError::MissingInput {
            operation: op.name().to_string(),
            name: name.to_string(),
        })?;
        entries.push((&**name, value));
    }

    if let Some(log) = events {
        log.emit(EventKind::OperationStarted {
            operation: Arc::clone(op.name_arc()),
        });
    }

    let start = Instant::now();
    let inputs = Inputs::new(entries);
    let result = call(op, &inputs)
        .map_err(|source| GraphError::OperationExecution {
            operation: op.name().to_string(),
            source,
        })
        .and_then(|outputs| {
            outputs
                .align(op.provides())
                .map_err(|reason| GraphError::OutputArityMismatch {
                    operation: op.name().to_string(),
                    expected: op.provides().iter().map(|n| n.to_string()).collect(),
                    reason,
                })
        });
    let duration_ms = start.elapsed().as_millis() as u64;

    match &result {
        Ok(_) => {
            debug!(operation = op.name(), duration_ms, "operation completed");
            if let Some(log) = events {
                log.emit(EventKind::OperationCompleted {
                    operation: Arc::clone(op.name_arc()),
                    provided: op.provides().to_vec(),
                    duration_ms,
                });
            }
        }
        Err(err) => {
            debug!(operation = op.name(), error = %err, "operation failed");
            if let Some(log) = events {
                log.emit(EventKind::OperationFailed {
                    operation: Arc::clone(op.name_arc()),
                    error: err.to_string(),
                    duration_ms,
                });
            }
        }
    }

    result
}

/// Run the body, turning a panic into an ordinary failure
fn call(op: &Operation, inputs: &Inputs<'_>) -> anyhow::Result<Outputs> {
    panic::catch_unwind(AssertUnwindSafe(|| op.invoke(inputs)))
        .unwrap_or_else(|_| Err(anyhow!("operation panicked")))
}
