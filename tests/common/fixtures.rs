//! Test fixtures and helpers

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Once;

use dashmap::DashMap;
use opgraph::{Network, NetworkBuilder, Operation, Outputs};
use serde_json::json;

/// Per-operation invocation counts, shared with the operation bodies
#[derive(Clone, Default)]
pub struct CallCounter {
    calls: Arc<DashMap<String, usize>>,
}

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&self, operation: &str) {
        *self.calls.entry(operation.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls.get(operation).map(|c| *c).unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.calls.iter().map(|entry| *entry.value()).sum()
    }
}

/// Integer operation: `f` receives the needs in declared order
pub fn int_op(
    name: &str,
    needs: &[&str],
    provide: &str,
    counter: &CallCounter,
    f: fn(&[i64]) -> i64,
) -> Operation {
    let counter = counter.clone();
    let op_name = name.to_string();
    let arity = needs.len();
    Operation::builder(name)
        .needs(needs.iter().copied())
        .provide(provide)
        .compute(move |inputs, _| {
            counter.hit(&op_name);
            let mut args = Vec::with_capacity(arity);
            for (need, value) in inputs.iter() {
                let n = value
                    .as_i64()
                    .ok_or_else(|| anyhow::anyhow!("'{}' is not an integer", need))?;
                args.push(n);
            }
            Ok(Outputs::from(json!(f(&args))))
        })
        .build()
        .expect("fixture operation is valid")
}

/// The mul1 → sub1 → abspow1 example network's operations
pub fn example_ops(counter: &CallCounter) -> Vec<Operation> {
    let abspow_counter = counter.clone();
    vec![
        int_op("mul1", &["a", "b"], "ab", counter, |v| v[0] * v[1]),
        int_op("sub1", &["a", "ab"], "a_minus_ab", counter, |v| v[0] - v[1]),
        Operation::builder("abspow1")
            .need("a_minus_ab")
            .provide("abs_a_minus_ab_cubed")
            .param("p", 3)
            .compute(move |inputs, params| {
                abspow_counter.hit("abspow1");
                let x: i64 = inputs.get_as("a_minus_ab")?;
                let p = params
                    .get("p")
                    .and_then(|p| p.as_u64())
                    .ok_or_else(|| anyhow::anyhow!("missing param p"))?;
                Ok(Outputs::from(json!(x.abs().pow(p as u32))))
            })
            .build()
            .expect("fixture operation is valid"),
    ]
}

pub fn example_network(counter: &CallCounter) -> Network {
    opgraph::build_network(example_ops(counter)).expect("example network is valid")
}

pub fn example_builder(counter: &CallCounter) -> NetworkBuilder {
    NetworkBuilder::new().operations(example_ops(counter))
}

/// Install a test-writer tracing subscriber once per test binary
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}
