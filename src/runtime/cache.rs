//! PlanCache - memoized plans keyed by request shape
//!
//! Key = (sorted, deduplicated input names, optional sorted, deduplicated
//! output names). Lookups clone the `Arc` and release the shard lock before
//! returning, so compilation never runs under a lock. Two threads missing
//! the same key both compile; the last insert wins. No eviction.
//!
//! Key names are resolved by the caller (the network maps known names onto
//! its own `Arc`s); nothing here touches the global interner.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::dag::ExecutionPlan;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanKey {
    inputs: Vec<Arc<str>>,
    outputs: Option<Vec<Arc<str>>>,
}

impl PlanKey {
    pub fn new<I, S>(inputs: I, outputs: Option<&[&str]>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::resolved(inputs, outputs, |name| Arc::from(name))
    }

    /// Build a key, turning each name into an `Arc` through `resolve`
    pub fn resolved<I, S, F>(inputs: I, outputs: Option<&[&str]>, resolve: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str) -> Arc<str>,
    {
        Self {
            inputs: normalize(inputs, &resolve),
            outputs: outputs.map(|names| normalize(names.iter(), &resolve)),
        }
    }

    pub fn inputs(&self) -> &[Arc<str>] {
        &self.inputs
    }

    pub fn outputs(&self) -> Option<&[Arc<str>]> {
        self.outputs.as_deref()
    }
}

fn normalize<I, S, F>(names: I, resolve: &F) -> Vec<Arc<str>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    F: Fn(&str) -> Arc<str>,
{
    let mut names: Vec<Arc<str>> = names.into_iter().map(|n| resolve(n.as_ref())).collect();
    names.sort_unstable();
    names.dedup();
    names
}

/// Thread-safe plan store with hit/miss counters
#[derive(Default)]
pub struct PlanCache {
    plans: DashMap<PlanKey, Arc<ExecutionPlan>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached plan for `key`, counting the hit or miss
    pub fn get(&self, key: &PlanKey) -> Option<Arc<ExecutionPlan>> {
        let found = self.plans.get(key).map(|entry| Arc::clone(entry.value()));
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn insert(&self, key: PlanKey, plan: Arc<ExecutionPlan>) {
        self.plans.insert(key, plan);
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn clear(&self) {
        self.plans.clear();
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
