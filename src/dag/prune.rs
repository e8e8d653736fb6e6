//! Pruner - minimal operation subset for one request
//!
//! Backward reachability from the requested outputs. A name already in the
//! available inputs is never produced, which short-circuits its producer on
//! that path. Producers rejected by `accept` count as missing.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::network::Network;
use crate::ast::Operation;
use crate::error::{GraphError, Result};

/// Ids (declaration order) of the operations needed to produce `requested`
pub(crate) fn prune(
    network: &Network,
    available: &FxHashSet<Arc<str>>,
    requested: &[Arc<str>],
    accept: &dyn Fn(&Operation) -> bool,
) -> Result<Vec<usize>> {
    let mut selected = vec![false; network.len()];
    let mut visited: FxHashSet<Arc<str>> = FxHashSet::default();

    // (data-name, consumer that asked for it)
    let mut frontier: VecDeque<(Arc<str>, Option<usize>)> = requested
        .iter()
        .map(|name| (Arc::clone(name), None))
        .collect();

    while let Some((name, needed_by)) = frontier.pop_front() {
        if available.contains(&name) || !visited.insert(Arc::clone(&name)) {
            continue;
        }

        let producer = network
            .producer_id(&name)
            .filter(|&id| accept(network.op(id)));
        let Some(id) = producer else {
            return Err(GraphError::UnresolvableOutput {
                name: name.to_string(),
                needed_by: needed_by.map(|op| network.op(op).name().to_string()),
            });
        };

        if !selected[id] {
            selected[id] = true;
            frontier.extend(
                network
                    .op(id)
                    .needs()
                    .iter()
                    .map(|need| (Arc::clone(need), Some(id))),
            );
        }
    }

    Ok(selected
        .iter()
        .enumerate()
        .filter_map(|(id, &keep)| keep.then_some(id))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Outputs;
    use crate::dag::build_network;
    use crate::util::intern;
    use serde_json::json;

    fn op(name: &str, needs: &[&str], provides: &[&str]) -> Operation {
        Operation::builder(name)
            .needs(needs.iter().copied())
            .provides(provides.iter().copied())
            .compute(|_, _| Ok(Outputs::from(json!(0))))
            .build()
            .unwrap()
    }

    fn names(list: &[&str]) -> Vec<Arc<str>> {
        list.iter().map(|n| intern(n)).collect()
    }

    fn set(list: &[&str]) -> FxHashSet<Arc<str>> {
        names(list).into_iter().collect()
    }

    fn all(_: &Operation) -> bool {
        true
    }

    fn example() -> Network {
        build_network([
            op("mul1", &["a", "b"], &["ab"]),
            op("sub1", &["a", "ab"], &["a_minus_ab"]),
            op("abspow1", &["a_minus_ab"], &["abs_a_minus_ab_cubed"]),
            op("unrelated", &["z"], &["zz"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_prune_keeps_only_backward_reachable() {
        let net = example();
        let ids = prune(&net, &set(&["a", "b"]), &names(&["a_minus_ab"]), &all).unwrap();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_available_input_short_circuits_producer() {
        let net = example();
        // ab supplied: mul1 is not needed
        let ids = prune(&net, &set(&["a", "ab"]), &names(&["a_minus_ab"]), &all).unwrap();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_requested_input_needs_nothing() {
        let net = example();
        let ids = prune(&net, &set(&["ab"]), &names(&["ab"]), &all).unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_unresolvable_names_consumer() {
        let net = example();
        let err = prune(&net, &set(&["a"]), &names(&["a_minus_ab"]), &all).unwrap_err();
        match err {
            GraphError::UnresolvableOutput { name, needed_by } => {
                assert_eq!(name, "b");
                assert_eq!(needed_by.as_deref(), Some("mul1"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_requested_output() {
        let net = example();
        let err = prune(&net, &set(&[]), &names(&["nope"]), &all).unwrap_err();
        assert!(matches!(
            err,
            GraphError::UnresolvableOutput { needed_by: None, .. }
        ));
    }

    #[test]
    fn test_rejected_producer_counts_as_missing() {
        let net = example();
        let not_mul1 = |op: &Operation| op.name() != "mul1";

        let err = prune(&net, &set(&["a", "b"]), &names(&["a_minus_ab"]), &not_mul1).unwrap_err();
        match err {
            GraphError::UnresolvableOutput { name, needed_by } => {
                assert_eq!(name, "ab");
                assert_eq!(needed_by.as_deref(), Some("sub1"));
            }
            other => panic!("unexpected error: {other}"),
        }

        // Supplying the rejected operation's output still works
        let ids = prune(&net, &set(&["a", "ab"]), &names(&["a_minus_ab"]), &not_mul1).unwrap();
        assert_eq!(ids, vec![1]);
    }
}
