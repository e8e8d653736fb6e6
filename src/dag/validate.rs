//! DAG Validation - structural checks run once per network
//!
//! Validates:
//! - Acyclicity: DFS three-color cycle detection over producer → consumer edges
//! - Promised inputs: which base needs a caller's input set leaves uncovered
//!
//! Provider/name uniqueness is checked while indexing in `NetworkBuilder::build`.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::network::OpVec;
use crate::ast::Operation;
use crate::error::GraphError;

/// Fail with `CyclicGraph` if `downstream` (indexed by op id) contains a cycle
///
/// The reported cycle reads in data-flow order: `a → b → a` means `a` feeds `b`
/// which feeds `a`.
pub(crate) fn detect_cycles(ops: &[Operation], downstream: &[OpVec]) -> Result<(), GraphError> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut colors = vec![Color::White; ops.len()];
    let mut stack: Vec<usize> = Vec::new();

    fn dfs(
        node: usize,
        downstream: &[OpVec],
        colors: &mut [Color],
        stack: &mut Vec<usize>,
    ) -> Result<(), Vec<usize>> {
        colors[node] = Color::Gray;
        stack.push(node);

        for &next in &downstream[node] {
            match colors[next] {
                Color::Gray => {
                    // Gray means `next` is on the current DFS path
                    let start = stack.iter().position(|&id| id == next).unwrap_or(0);
                    let mut cycle = stack[start..].to_vec();
                    cycle.push(next);
                    return Err(cycle);
                }
                Color::White => dfs(next, downstream, colors, stack)?,
                Color::Black => {}
            }
        }

        stack.pop();
        colors[node] = Color::Black;
        Ok(())
    }

    for id in 0..ops.len() {
        if colors[id] == Color::White {
            if let Err(cycle) = dfs(id, downstream, &mut colors, &mut stack) {
                let names: Vec<&str> = cycle.iter().map(|&id| ops[id].name()).collect();
                return Err(GraphError::CyclicGraph {
                    operation: names[0].to_string(),
                    cycle: names.join(" → "),
                });
            }
        }
    }

    Ok(())
}

/// Base needs not covered by `promised`, in their original order
pub(crate) fn missing_inputs(
    base_needs: &[Arc<str>],
    promised: &FxHashSet<Arc<str>>,
) -> Vec<Arc<str>> {
    base_needs
        .iter()
        .filter(|name| !promised.contains(*name))
        .cloned()
        .collect()
}
