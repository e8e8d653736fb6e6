//! Network - validated, immutable DAG of operations (arena-indexed)
//!
//! Operations live in a `Vec` in declaration order and are referred to by
//! index everywhere else. Declared data-names are interned `Arc<str>` keys
//! into lookup tables (caller-supplied names are matched against them, never
//! interned):
//! - `producers`: data-name → the single operation providing it
//! - `consumers`: data-name → operations needing it (SmallVec, usually ≤4)
//!
//! Per-call work (`compile`, `run`) goes through the plan cache, so a
//! network is built once and shared freely across threads.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use tracing::{debug, info, instrument};

use super::plan::ExecutionPlan;
use super::{prune, schedule, validate};
use crate::ast::Operation;
use crate::config::{InputOverlap, NetConfig};
use crate::error::{GraphError, Result};
use crate::event::{EventKind, EventLog};
use crate::runtime::{execute, PlanCache, PlanKey};
use crate::store::ResultSet;

/// Stack-allocated op lists: most data-names have 0-4 consumers
pub(crate) type OpVec = SmallVec<[usize; 4]>;

/// Compile/cache counters for one network
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NetworkStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub prune_runs: u64,
    pub schedule_runs: u64,
    pub cached_plans: usize,
}

// ═══════════════════════════════════════════════════════════════
// BUILDER
// ═══════════════════════════════════════════════════════════════

/// Accumulates operations in declaration order, then validates them into a [`Network`]
#[derive(Default)]
#[must_use]
pub struct NetworkBuilder {
    ops: Vec<Operation>,
    config: NetConfig,
    events: Option<EventLog>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation(mut self, op: Operation) -> Self {
        self.ops.push(op);
        self
    }

    pub fn operations(mut self, ops: impl IntoIterator<Item = Operation>) -> Self {
        self.ops.extend(ops);
        self
    }

    pub fn config(mut self, config: NetConfig) -> Self {
        self.config = config;
        self
    }

    /// Record compile/run events into `log`
    pub fn event_log(mut self, log: EventLog) -> Self {
        self.events = Some(log);
        self
    }

    #[instrument(skip(self), fields(operations = self.ops.len()))]
    pub fn build(self) -> Result<Network> {
        let capacity = self.ops.len();
        let mut by_name: FxHashMap<Arc<str>, usize> =
            FxHashMap::with_capacity_and_hasher(capacity, Default::default());
        let mut producers: FxHashMap<Arc<str>, usize> =
            FxHashMap::with_capacity_and_hasher(capacity, Default::default());
        let mut consumers: FxHashMap<Arc<str>, OpVec> = FxHashMap::default();

        for (id, op) in self.ops.iter().enumerate() {
            if by_name.insert(Arc::clone(op.name_arc()), id).is_some() {
                return Err(GraphError::DuplicateOperationName {
                    name: op.name().to_string(),
                });
            }

            for name in op.provides() {
                if let Some(&first) = producers.get(name) {
                    return Err(GraphError::DuplicateProvider {
                        name: name.to_string(),
                        first: self.ops[first].name().to_string(),
                        second: op.name().to_string(),
                    });
                }
                producers.insert(Arc::clone(name), id);
            }

            for name in op.needs() {
                consumers.entry(Arc::clone(name)).or_default().push(id);
            }
        }

        // Producer → consumer edges, deduplicated per pair
        let mut downstream: Vec<OpVec> = vec![OpVec::new(); capacity];
        for (id, op) in self.ops.iter().enumerate() {
            for name in op.needs() {
                if let Some(&producer) = producers.get(name) {
                    if !downstream[producer].contains(&id) {
                        downstream[producer].push(id);
                    }
                }
            }
        }

        validate::detect_cycles(&self.ops, &downstream)?;

        let base_needs: Vec<Arc<str>> = {
            let mut seen: FxHashSet<&Arc<str>> = FxHashSet::default();
            self.ops
                .iter()
                .flat_map(|op| op.needs())
                .filter(|name| !producers.contains_key(*name) && seen.insert(*name))
                .cloned()
                .collect()
        };
        let provides: Vec<Arc<str>> = self
            .ops
            .iter()
            .flat_map(|op| op.provides())
            .cloned()
            .collect();

        let pool = if self.config.parallel {
            let pool = ThreadPoolBuilder::new()
                .num_threads(self.config.threads)
                .thread_name(|i| format!("opgraph-worker-{}", i))
                .build()
                .map_err(|e| GraphError::ConfigError {
                    reason: format!("Failed to start worker pool: {}", e),
                })?;
            Some(pool)
        } else {
            None
        };

        info!(
            operations = capacity,
            base_needs = base_needs.len(),
            provides = provides.len(),
            workers = pool.as_ref().map_or(0, ThreadPool::current_num_threads),
            "network built"
        );

        Ok(Network {
            ops: self.ops,
            by_name,
            producers,
            consumers,
            base_needs,
            provides,
            config: self.config,
            cache: PlanCache::new(),
            prune_runs: AtomicU64::new(0),
            schedule_runs: AtomicU64::new(0),
            events: self.events,
            pool,
        })
    }
}

/// Build a network with default config from operations in declaration order
pub fn build_network(ops: impl IntoIterator<Item = Operation>) -> Result<Network> {
    NetworkBuilder::new().operations(ops).build()
}

/// Run `network` on `inputs`, returning only `outputs` when given
pub fn run<I, K>(network: &Network, inputs: I, outputs: Option<&[&str]>) -> Result<ResultSet>
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    network.run_with(inputs, outputs)
}

// ═══════════════════════════════════════════════════════════════
// NETWORK
// ═══════════════════════════════════════════════════════════════

pub struct Network {
    ops: Vec<Operation>,
    by_name: FxHashMap<Arc<str>, usize>,
    producers: FxHashMap<Arc<str>, usize>,
    consumers: FxHashMap<Arc<str>, OpVec>,
    base_needs: Vec<Arc<str>>,
    provides: Vec<Arc<str>>,
    config: NetConfig,
    cache: PlanCache,
    prune_runs: AtomicU64,
    schedule_runs: AtomicU64,
    events: Option<EventLog>,
    /// Present only when `config.parallel` is on
    pool: Option<ThreadPool>,
}

impl Network {
    pub fn builder() -> NetworkBuilder {
        NetworkBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Operations in declaration order
    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.by_name.get(name).map(|&id| &self.ops[id])
    }

    /// Operation providing `name`, if any
    pub fn producer(&self, name: &str) -> Option<&Operation> {
        self.producer_id(name).map(|id| &self.ops[id])
    }

    /// Operations needing `name`, in declaration order
    pub fn consumers(&self, name: &str) -> impl Iterator<Item = &Operation> + '_ {
        self.consumers
            .get(name)
            .into_iter()
            .flat_map(move |ids| ids.iter().map(move |&id| &self.ops[id]))
    }

    /// Base inputs: needed by some operation, provided by none (first-seen order)
    pub fn needs(&self) -> &[Arc<str>] {
        &self.base_needs
    }

    /// Every provided name, in declaration order
    pub fn provides(&self) -> &[Arc<str>] {
        &self.provides
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    pub fn event_log(&self) -> Option<&EventLog> {
        self.events.as_ref()
    }

    /// Base needs missing from a promised input set (reporting only)
    pub fn unsatisfied_needs<I, S>(&self, inputs: I) -> Vec<Arc<str>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let promised: FxHashSet<Arc<str>> = inputs
            .into_iter()
            .map(|name| self.data_name(name.as_ref()))
            .collect();
        validate::missing_inputs(&self.base_needs, &promised)
    }

    pub(crate) fn op(&self, id: usize) -> &Operation {
        &self.ops[id]
    }

    pub(crate) fn producer_id(&self, name: &str) -> Option<usize> {
        self.producers.get(name).copied()
    }

    /// The network's own `Arc` for a declared name, a fresh one otherwise
    pub(crate) fn data_name(&self, name: &str) -> Arc<str> {
        self.producers
            .get_key_value(name)
            .map(|(key, _)| key)
            .or_else(|| self.consumers.get_key_value(name).map(|(key, _)| key))
            .map_or_else(|| Arc::from(name), Arc::clone)
    }

    // ═══════════════════════════════════════════════════════════════
    // COMPILE
    // ═══════════════════════════════════════════════════════════════

    /// Compile (or fetch from cache) the plan for an input-name set and optional outputs
    #[instrument(skip(self, inputs), fields(operations = self.ops.len()))]
    pub fn compile<I, S>(&self, inputs: I, outputs: Option<&[&str]>) -> Result<Arc<ExecutionPlan>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let key = PlanKey::resolved(inputs, outputs, |name| self.data_name(name));

        if let Some(plan) = self.cache.get(&key) {
            debug!(steps = plan.steps().len(), "plan cache hit");
            if let Some(log) = &self.events {
                log.emit(EventKind::PlanReused {
                    inputs: key.inputs().to_vec(),
                    outputs: key.outputs().map(<[_]>::to_vec),
                });
            }
            return Ok(plan);
        }

        debug!("plan cache miss");
        let plan = Arc::new(self.compile_uncached(&key, &|_: &Operation| true)?);
        self.record_compiled(&key, &plan);

        // Racing misses both compile; last writer wins
        self.cache.insert(key, Arc::clone(&plan));
        Ok(plan)
    }

    /// Compile a plan over only the operations `predicate` accepts
    ///
    /// Rejected operations are treated as absent: asking for something only
    /// they provide is `UnresolvableOutput`. With `outputs = None` every
    /// provide of an accepted operation is asked. These plans bypass the
    /// cache.
    #[instrument(skip(self, inputs, predicate), fields(operations = self.ops.len()))]
    pub fn compile_with<I, S, P>(
        &self,
        inputs: I,
        outputs: Option<&[&str]>,
        predicate: P,
    ) -> Result<Arc<ExecutionPlan>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        P: Fn(&Operation) -> bool,
    {
        let key = PlanKey::resolved(inputs, outputs, |name| self.data_name(name));
        let plan = Arc::new(self.compile_uncached(&key, &predicate)?);
        self.record_compiled(&key, &plan);
        Ok(plan)
    }

    fn compile_uncached(
        &self,
        key: &PlanKey,
        accept: &dyn Fn(&Operation) -> bool,
    ) -> Result<ExecutionPlan> {
        let available: FxHashSet<Arc<str>> = key.inputs().iter().cloned().collect();

        if self.config.input_overlap == InputOverlap::Reject {
            for name in key.inputs() {
                if let Some(producer) = self.producer(name).filter(|op| accept(op)) {
                    return Err(GraphError::AmbiguousInput {
                        name: name.to_string(),
                        operation: producer.name().to_string(),
                    });
                }
            }
        }

        let accepted_provides: Vec<Arc<str>>;
        let requested = match key.outputs() {
            Some(outputs) => outputs,
            None if self.ops.iter().all(|op| accept(op)) => &self.provides[..],
            None => {
                accepted_provides = self
                    .ops
                    .iter()
                    .filter(|op| accept(op))
                    .flat_map(|op| op.provides())
                    .cloned()
                    .collect();
                &accepted_provides[..]
            }
        };

        self.prune_runs.fetch_add(1, Ordering::Relaxed);
        let selected = prune::prune(self, &available, requested, accept)?;

        self.schedule_runs.fetch_add(1, Ordering::Relaxed);
        let schedule = schedule::schedule(self, &selected, &available)?;

        let evict = key.outputs().is_some() && !self.config.skip_evictions;
        Ok(ExecutionPlan::new(self, key, &schedule, evict))
    }

    fn record_compiled(&self, key: &PlanKey, plan: &ExecutionPlan) {
        info!(
            operations = plan.len(),
            evictions = plan.evictions(),
            "plan compiled"
        );
        if let Some(log) = &self.events {
            log.emit(EventKind::PlanCompiled {
                inputs: key.inputs().to_vec(),
                outputs: key.outputs().map(<[_]>::to_vec),
                operations: plan.operations().map(|op| Arc::clone(op.name_arc())).collect(),
                evictions: plan.evictions(),
            });
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // RUN
    // ═══════════════════════════════════════════════════════════════

    /// Run with every provide asked for
    pub fn run<I, K>(&self, inputs: I) -> Result<ResultSet>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        self.run_with(inputs, None)
    }

    /// Run and return exactly `outputs`
    pub fn run_for<I, K>(&self, inputs: I, outputs: &[&str]) -> Result<ResultSet>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        self.run_with(inputs, Some(outputs))
    }

    /// Run over only the operations `predicate` accepts (see [`Network::compile_with`])
    pub fn run_filtered<I, K, P>(
        &self,
        inputs: I,
        outputs: Option<&[&str]>,
        predicate: P,
    ) -> Result<ResultSet>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
        P: Fn(&Operation) -> bool,
    {
        let values = self.input_values(inputs);
        let plan = self.compile_with(values.keys(), outputs, predicate)?;
        execute(&plan, values, self.pool.as_ref(), self.events.as_ref())
    }

    pub(crate) fn run_with<I, K>(&self, inputs: I, outputs: Option<&[&str]>) -> Result<ResultSet>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let values = self.input_values(inputs);
        let plan = self.compile(values.keys(), outputs)?;
        execute(&plan, values, self.pool.as_ref(), self.events.as_ref())
    }

    fn input_values<I, K>(&self, inputs: I) -> FxHashMap<Arc<str>, Value>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        inputs
            .into_iter()
            .map(|(name, value)| (self.data_name(name.as_ref()), value))
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════
    // CACHE
    // ═══════════════════════════════════════════════════════════════

    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            cache_hits: self.cache.hits(),
            cache_misses: self.cache.misses(),
            prune_runs: self.prune_runs.load(Ordering::Relaxed),
            schedule_runs: self.schedule_runs.load(Ordering::Relaxed),
            cached_plans: self.cache.len(),
        }
    }

    /// Drop every cached plan (counters are kept)
    pub fn clear_plan_cache(&self) {
        self.cache.clear();
    }
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("operations", &self.ops.len())
            .field("needs", &self.base_needs)
            .field("config", &self.config)
            .field("cached_plans", &self.cache.len())
            .finish()
    }
}

/// `{}` prints one line, `{:#}` one operation per line
impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Network ({} operations)", self.ops.len())?;
            for op in &self.ops {
                writeln!(f, "  {}", op)?;
            }
            Ok(())
        } else {
            let names: Vec<&str> = self.ops.iter().map(Operation::name).collect();
            write!(f, "Network({})", names.join(", "))
        }
    }
}
