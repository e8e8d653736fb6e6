//! Scheduler - deterministic topological order over a pruned subset
//!
//! Kahn's algorithm with a min-heap on declaration index, so ties between
//! ready operations always resolve the same way. Edges whose data is supplied
//! as an input are dropped: the consumer doesn't wait on that producer.
//!
//! Each operation also gets a level (longest dependency chain above it);
//! operations sharing a level are independent and may run concurrently.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::network::{Network, OpVec};
use super::validate;
use crate::error::{GraphError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Schedule {
    /// Total order (op ids)
    pub order: Vec<usize>,
    /// Partial order: levels of op ids, each sorted by declaration index
    pub levels: Vec<Vec<usize>>,
}

pub(crate) fn schedule(
    network: &Network,
    selected: &[usize],
    available: &FxHashSet<Arc<str>>,
) -> Result<Schedule> {
    let n = network.len();
    let mut in_plan = vec![false; n];
    for &id in selected {
        in_plan[id] = true;
    }

    let mut downstream: Vec<OpVec> = vec![OpVec::new(); n];
    let mut indegree = vec![0usize; n];
    for &id in selected {
        for need in network.op(id).needs() {
            if available.contains(need) {
                continue;
            }
            if let Some(producer) = network.producer_id(need) {
                if in_plan[producer] && !downstream[producer].contains(&id) {
                    downstream[producer].push(id);
                    indegree[id] += 1;
                }
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = selected
        .iter()
        .filter(|&&id| indegree[id] == 0)
        .map(|&id| Reverse(id))
        .collect();
    let mut level = vec![0usize; n];
    let mut order = Vec::with_capacity(selected.len());

    while let Some(Reverse(id)) = ready.pop() {
        order.push(id);
        for &next in &downstream[id] {
            level[next] = level[next].max(level[id] + 1);
            indegree[next] -= 1;
            if indegree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() < selected.len() {
        // Unreachable for a validated network; re-check rather than trust it
        validate::detect_cycles(network.operations(), &downstream)?;
        let stuck: Vec<&str> = selected
            .iter()
            .filter(|&&id| indegree[id] > 0)
            .map(|&id| network.op(id).name())
            .collect();
        return Err(GraphError::CyclicGraph {
            operation: stuck.first().copied().unwrap_or_default().to_string(),
            cycle: stuck.join(" → "),
        });
    }

    let depth = order.iter().map(|&id| level[id] + 1).max().unwrap_or(0);
    let mut levels: Vec<Vec<usize>> = vec![Vec::new(); depth];
    for &id in selected {
        levels[level[id]].push(id);
    }

    Ok(Schedule { order, levels })
}
