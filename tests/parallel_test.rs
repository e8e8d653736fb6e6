//! Level-Parallel Execution Tests
//!
//! Same results as sequential runs, independent branches overlap in time,
//! and failures stay atomic.

mod common;

use std::sync::{Arc, Barrier};
use std::time::Duration;

use common::{example_builder, int_op, CallCounter};
use opgraph::{GraphError, NetConfig, NetworkBuilder, Operation, Outputs};
use pretty_assertions::assert_eq;
use serde_json::json;

// Fixed pool size: the Barrier test needs two workers even on one CPU
fn parallel() -> NetConfig {
    NetConfig::default().with_parallel(true).with_threads(4)
}

#[test]
fn test_parallel_matches_sequential() {
    let counter = CallCounter::new();
    let sequential = example_builder(&counter).build().unwrap();
    let threaded = example_builder(&counter).config(parallel()).build().unwrap();

    let inputs = || [("a", json!(2)), ("b", json!(5))];
    assert_eq!(
        sequential.run(inputs()).unwrap().to_json(),
        threaded.run(inputs()).unwrap().to_json()
    );
    assert_eq!(
        sequential.run_for(inputs(), &["a_minus_ab"]).unwrap(),
        threaded.run_for(inputs(), &["a_minus_ab"]).unwrap()
    );
}

#[test]
fn test_independent_branches_run_concurrently() {
    // Both branches block until the other arrives: passes only if they overlap
    let barrier = Arc::new(Barrier::new(2));
    let branch = |name: &str, provide: &str| {
        let barrier = Arc::clone(&barrier);
        Operation::builder(name)
            .need("seed")
            .provide(provide)
            .compute(move |inputs, _| {
                barrier.wait();
                Ok(Outputs::from(inputs.require("seed")?.clone()))
            })
            .build()
            .unwrap()
    };
    let join = Operation::builder("join")
        .needs(["left", "right"])
        .provide("both")
        .compute(|inputs, _| {
            Ok(Outputs::from(json!([
                inputs.require("left")?,
                inputs.require("right")?
            ])))
        })
        .build()
        .unwrap();

    let net = NetworkBuilder::new()
        .operations([branch("l", "left"), branch("r", "right"), join])
        .config(parallel())
        .build()
        .unwrap();

    let plan = net.compile(["seed"], None).unwrap();
    let widths: Vec<usize> = plan.levels().iter().map(Vec::len).collect();
    assert_eq!(widths, vec![2, 1]);

    let result = net.run([("seed", json!(1))]).unwrap();
    assert_eq!(result.get("both"), Some(&json!([1, 1])));
}

#[test]
fn test_failure_reports_earliest_declared_and_stops_later_levels() {
    let counter = CallCounter::new();
    let slow_fail = Operation::builder("first")
        .need("a")
        .provide("x")
        .compute(|_, _| {
            std::thread::sleep(Duration::from_millis(20));
            anyhow::bail!("first failed")
        })
        .build()
        .unwrap();
    let fast_fail = Operation::builder("second")
        .need("a")
        .provide("y")
        .compute(|_, _| anyhow::bail!("second failed"))
        .build()
        .unwrap();
    let after = int_op("after", &["x", "y"], "z", &counter, |v| v[0] + v[1]);

    let net = NetworkBuilder::new()
        .operations([slow_fail, fast_fail, after])
        .config(parallel())
        .build()
        .unwrap();

    let err = net.run([("a", json!(1))]).unwrap_err();
    match err {
        GraphError::OperationExecution { operation, .. } => assert_eq!(operation, "first"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(counter.count("after"), 0);
}

#[test]
fn test_wide_level_with_small_pool() {
    let counter = CallCounter::new();
    let ops: Vec<Operation> = (0..500)
        .map(|i| int_op(&format!("w{i}"), &["seed"], &format!("out{i}"), &counter, |v| v[0] * 2))
        .collect();
    let net = NetworkBuilder::new()
        .operations(ops)
        .config(NetConfig::default().with_parallel(true).with_threads(2))
        .build()
        .unwrap();

    let result = net.run([("seed", json!(21))]).unwrap();

    assert_eq!(counter.total(), 500);
    assert_eq!(result.get("out0"), Some(&json!(42)));
    assert_eq!(result.get("out499"), Some(&json!(42)));
    assert_eq!(result.executed().len(), 500);
}

#[test]
fn test_panicking_operation_fails_run_in_either_mode() {
    let boom = || {
        Operation::builder("boom")
            .need("a")
            .provide("x")
            .compute(|_, _| panic!("kaboom"))
            .build()
            .unwrap()
    };

    for config in [NetConfig::default(), parallel()] {
        let net = NetworkBuilder::new()
            .operation(boom())
            .config(config)
            .build()
            .unwrap();
        let err = net.run([("a", json!(1))]).unwrap_err();
        assert!(matches!(
            err,
            GraphError::OperationExecution { ref operation, .. } if operation == "boom"
        ));
    }
}
