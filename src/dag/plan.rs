//! ExecutionPlan - pruned, ordered steps for one request shape
//!
//! A plan is immutable once compiled and shared through the plan cache as
//! `Arc<ExecutionPlan>`. Besides the total order of operations it keeps the
//! level grouping used for parallel runs and, when specific outputs are
//! asked, `Evict` steps that drop values no later step reads.

use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use super::network::Network;
use super::schedule::Schedule;
use crate::ast::Operation;
use crate::runtime::PlanKey;

/// One instruction of a plan
#[derive(Debug, Clone)]
pub enum Step {
    /// Run the operation and merge its provides
    Compute(Operation),
    /// Drop a value from the working store
    Evict(Arc<str>),
}

impl Step {
    pub fn operation(&self) -> Option<&Operation> {
        match self {
            Step::Compute(op) => Some(op),
            Step::Evict(_) => None,
        }
    }

    pub fn is_evict(&self) -> bool {
        matches!(self, Step::Evict(_))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Compute(op) => f.write_str(op.name()),
            Step::Evict(name) => write!(f, "evict({})", name),
        }
    }
}

#[derive(Debug)]
pub struct ExecutionPlan {
    inputs: Vec<Arc<str>>,
    outputs: Option<Vec<Arc<str>>>,
    steps: Vec<Step>,
    levels: Vec<Vec<Operation>>,
}

impl ExecutionPlan {
    pub(crate) fn new(
        network: &Network,
        key: &PlanKey,
        schedule: &Schedule,
        with_evictions: bool,
    ) -> Self {
        let ops: Vec<Operation> = schedule
            .order
            .iter()
            .map(|&id| network.op(id).clone())
            .collect();

        let steps = match key.outputs() {
            Some(keep) if with_evictions => plan_evictions(&ops, keep),
            _ => ops.into_iter().map(Step::Compute).collect(),
        };

        let levels = schedule
            .levels
            .iter()
            .map(|level| level.iter().map(|&id| network.op(id).clone()).collect())
            .collect();

        Self {
            inputs: key.inputs().to_vec(),
            outputs: key.outputs().map(<[_]>::to_vec),
            steps,
            levels,
        }
    }

    /// Input names the plan was compiled for (sorted)
    pub fn inputs(&self) -> &[Arc<str>] {
        &self.inputs
    }

    /// Asked outputs (sorted), `None` when every value is returned
    pub fn outputs(&self) -> Option<&[Arc<str>]> {
        self.outputs.as_deref()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Operations in execution order
    pub fn operations(&self) -> impl Iterator<Item = &Operation> + '_ {
        self.steps.iter().filter_map(Step::operation)
    }

    pub fn operation_names(&self) -> Vec<&str> {
        self.operations().map(Operation::name).collect()
    }

    /// Independent operation groups, each after all its dependencies
    pub fn levels(&self) -> &[Vec<Operation>] {
        &self.levels
    }

    pub fn contains(&self, operation: &str) -> bool {
        self.operations().any(|op| op.name() == operation)
    }

    /// Number of operations (evictions not counted)
    pub fn len(&self) -> usize {
        self.steps.len() - self.evictions()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn evictions(&self) -> usize {
        self.steps.iter().filter(|step| step.is_evict()).count()
    }
}

/// Interleave `Evict` steps after the last step touching each unkept name
fn plan_evictions(ops: &[Operation], keep: &[Arc<str>]) -> Vec<Step> {
    let keep: FxHashSet<&str> = keep.iter().map(|name| &**name).collect();

    let mut last_use: FxHashMap<&str, usize> = FxHashMap::default();
    for (pos, op) in ops.iter().enumerate() {
        for name in op.needs().iter().chain(op.provides()) {
            last_use.insert(&**name, pos);
        }
    }

    let mut steps = Vec::with_capacity(ops.len() * 2);
    for (pos, op) in ops.iter().enumerate() {
        steps.push(Step::Compute(op.clone()));
        for name in op.needs().iter().chain(op.provides()) {
            if last_use.get(&**name) == Some(&pos) && !keep.contains(&**name) {
                steps.push(Step::Evict(Arc::clone(name)));
            }
        }
    }
    steps
}

fn join_names(names: &[Arc<str>]) -> String {
    names.join(", ")
}

/// `{}` prints one line, `{:#}` one step per line
impl fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outputs = self
            .outputs
            .as_deref()
            .map(join_names)
            .unwrap_or_else(|| "*".to_string());

        if f.alternate() {
            writeln!(f, "ExecutionPlan")?;
            writeln!(f, "  inputs: {}", join_names(&self.inputs))?;
            writeln!(f, "  outputs: {}", outputs)?;
            for (i, step) in self.steps.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, step)?;
            }
            Ok(())
        } else {
            let steps: Vec<String> = self.steps.iter().map(Step::to_string).collect();
            write!(
                f,
                "ExecutionPlan(inputs=[{}], outputs=[{}], steps=[{}])",
                join_names(&self.inputs),
                outputs,
                steps.join(", ")
            )
        }
    }
}
