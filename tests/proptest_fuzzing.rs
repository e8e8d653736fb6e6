//! Property-Based Testing for opgraph
//!
//! Random layered DAGs: operation `i` may need any base input or any value
//! provided by an operation declared before it, so every generated network
//! is acyclic with unique providers.

use std::collections::BTreeSet;

use opgraph::{build_network, NetConfig, Network, NetworkBuilder, Operation, Outputs};
use proptest::prelude::*;
use proptest::sample::Index;
use serde_json::{json, Value};

const BASE_INPUTS: [&str; 4] = ["in0", "in1", "in2", "in3"];

/// (needs, provide) per operation, in declaration order
#[derive(Debug, Clone)]
struct Shape {
    ops: Vec<(Vec<String>, String)>,
}

impl Shape {
    fn operations(&self) -> Vec<Operation> {
        self.ops
            .iter()
            .enumerate()
            .map(|(i, (needs, provide))| {
                let offset = i as i64;
                Operation::builder(format!("op{}", i))
                    .needs(needs.iter().cloned())
                    .provide(provide.clone())
                    .compute(move |inputs, _| {
                        let sum: i64 = inputs.iter().filter_map(|(_, v)| v.as_i64()).sum();
                        Ok(Outputs::from(json!(sum + offset)))
                    })
                    .build()
                    .unwrap()
            })
            .collect()
    }

    fn network(&self, config: NetConfig) -> Network {
        NetworkBuilder::new()
            .operations(self.operations())
            .config(config)
            .build()
            .unwrap()
    }

    /// Operations backward-reachable from `target` (all inputs supplied)
    fn ancestors(&self, target: usize) -> BTreeSet<String> {
        let mut needed = BTreeSet::new();
        let mut stack = vec![target];
        while let Some(i) = stack.pop() {
            if !needed.insert(format!("op{}", i)) {
                continue;
            }
            for need in &self.ops[i].0 {
                if let Some(producer) = self.ops.iter().position(|(_, p)| p == need) {
                    stack.push(producer);
                }
            }
        }
        needed
    }
}

prop_compose! {
    fn arb_shape()(picks in prop::collection::vec(prop::collection::vec(any::<Index>(), 0..4), 1..12)) -> Shape {
        let mut ops = Vec::with_capacity(picks.len());
        for (i, choices) in picks.into_iter().enumerate() {
            let mut needs: Vec<String> = Vec::new();
            for choice in choices {
                let slot = choice.index(BASE_INPUTS.len() + i);
                let name = if slot < BASE_INPUTS.len() {
                    BASE_INPUTS[slot].to_string()
                } else {
                    format!("d{}", slot - BASE_INPUTS.len())
                };
                if !needs.contains(&name) {
                    needs.push(name);
                }
            }
            ops.push((needs, format!("d{}", i)));
        }
        Shape { ops }
    }
}

fn all_inputs() -> Vec<(&'static str, Value)> {
    BASE_INPUTS
        .iter()
        .enumerate()
        .map(|(i, name)| (*name, json!(i as i64 + 1)))
        .collect()
}

/// Base inputs plus, optionally, a supplied intermediate `d{i}`
fn inputs_with(shape: &Shape, intermediate: Option<Index>) -> Vec<(String, Value)> {
    let mut inputs: Vec<(String, Value)> = all_inputs()
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
    if let Some(pick) = intermediate {
        let (_, provide) = &shape.ops[pick.index(shape.ops.len())];
        inputs.push((provide.clone(), json!(1000)));
    }
    inputs
}

proptest! {
    /// Property: valid shapes always build, one operation per declaration
    #[test]
    fn test_build_keeps_every_operation(shape in arb_shape()) {
        let net = build_network(shape.operations()).unwrap();
        prop_assert_eq!(net.len(), shape.ops.len());
    }

    /// Property: unfiltered runs return every provide plus every supplied input
    #[test]
    fn test_unfiltered_run_returns_everything(shape in arb_shape()) {
        let net = shape.network(NetConfig::default());
        let result = net.run(all_inputs()).unwrap();

        for (_, provide) in &shape.ops {
            prop_assert!(result.contains(provide), "missing {}", provide);
        }
        for name in BASE_INPUTS {
            prop_assert!(result.contains(name));
        }
        prop_assert_eq!(result.len(), shape.ops.len() + BASE_INPUTS.len());
    }

    /// Property: a single requested output runs exactly its backward closure
    #[test]
    fn test_subset_runs_minimal_operations(shape in arb_shape(), pick in any::<Index>()) {
        let target = pick.index(shape.ops.len());
        let provide = shape.ops[target].1.clone();
        let net = shape.network(NetConfig::default());

        let subset = net.run_for(all_inputs(), &[provide.as_str()]).unwrap();
        let full = net.run(all_inputs()).unwrap();

        let executed: BTreeSet<String> = subset.executed().into_iter().map(String::from).collect();
        prop_assert_eq!(&executed, &shape.ancestors(target));
        prop_assert!(executed.len() <= full.executed().len());
        prop_assert_eq!(subset.get(&provide), full.get(&provide));
        prop_assert_eq!(subset.len(), 1);
    }

    /// Property: execution order respects every dependency
    #[test]
    fn test_execution_order_is_topological(shape in arb_shape()) {
        let net = shape.network(NetConfig::default());
        let result = net.run(all_inputs()).unwrap();
        let position = |op: &str| result.executed().iter().position(|e| *e == op);

        for (i, (needs, _)) in shape.ops.iter().enumerate() {
            for need in needs {
                if let Some(producer) = shape.ops.iter().position(|(_, p)| p == need) {
                    let producer_op = format!("op{}", producer);
                    let consumer_op = format!("op{}", i);
                    prop_assert!(position(&producer_op) < position(&consumer_op));
                }
            }
        }
    }

    /// Property: cache hits, evictions and parallel levels never change results
    #[test]
    fn test_execution_modes_agree(shape in arb_shape(), pick in any::<Index>()) {
        let target = shape.ops[pick.index(shape.ops.len())].1.clone();
        let outputs = [target.as_str()];

        let plain = shape.network(NetConfig::default().with_skip_evictions(true));
        let evicting = shape.network(NetConfig::default());
        let threaded = shape.network(NetConfig::default().with_parallel(true));

        let expected = plain.run_for(all_inputs(), &outputs).unwrap();
        prop_assert_eq!(&evicting.run_for(all_inputs(), &outputs).unwrap(), &expected);
        // Second call is a cache hit
        prop_assert_eq!(&evicting.run_for(all_inputs(), &outputs).unwrap(), &expected);
        prop_assert_eq!(evicting.stats().cache_hits, 1);

        let parallel = threaded.run_for(all_inputs(), &outputs).unwrap();
        prop_assert_eq!(parallel.to_json(), expected.to_json());
    }

    /// Property: a supplied intermediate short-circuits the same way in every mode
    #[test]
    fn test_supplied_intermediate_agrees_across_modes(
        shape in arb_shape(),
        pick in any::<Index>(),
        intermediate in prop::option::of(any::<Index>()),
    ) {
        let target = shape.ops[pick.index(shape.ops.len())].1.clone();
        let outputs = [target.as_str()];
        let inputs = || inputs_with(&shape, intermediate);

        let plain = shape.network(NetConfig::default().with_skip_evictions(true));
        let evicting = shape.network(NetConfig::default());
        let threaded = shape.network(NetConfig::default().with_parallel(true).with_threads(4));

        let expected = plain.run_for(inputs(), &outputs).unwrap();
        prop_assert_eq!(&evicting.run_for(inputs(), &outputs).unwrap(), &expected);
        let parallel = threaded.run_for(inputs(), &outputs).unwrap();
        prop_assert_eq!(parallel.to_json(), expected.to_json());

        // Unfiltered: the supplied value is returned untouched
        let everything = plain.run(inputs()).unwrap();
        prop_assert_eq!(threaded.run(inputs()).unwrap().to_json(), everything.to_json());
        if let Some(pick) = intermediate {
            let supplied = &shape.ops[pick.index(shape.ops.len())].1;
            prop_assert_eq!(everything.get(supplied), Some(&json!(1000)));
            let supplied_op = format!("op{}", pick.index(shape.ops.len()));
            prop_assert!(!everything.was_executed(&supplied_op));
        }
    }
}
