//! OperationBuilder - declaration-time construction of [`Operation`]s
//!
//! Wraps a caller-supplied body in an immutable record. Shape mistakes that
//! need no knowledge of the surrounding network are caught here.

use rustc_hash::FxHashSet;
use serde_json::Value;

use super::operation::{Compute, Inputs, Operation, OperationInner, Outputs, Params};
use crate::error::{GraphError, Result};
use crate::util::intern;

/// Fluent builder returned by [`Operation::builder`]
///
/// ```
/// use opgraph::{Operation, Outputs};
/// use serde_json::json;
///
/// let op = Operation::builder("mul1")
///     .needs(["a", "b"])
///     .provide("ab")
///     .compute(|inputs, _params| {
///         let a: i64 = inputs.get_as("a")?;
///         let b: i64 = inputs.get_as("b")?;
///         Ok(Outputs::from(json!(a * b)))
///     })
///     .build()
///     .unwrap();
/// assert_eq!(op.name(), "mul1");
/// ```
#[must_use]
pub struct OperationBuilder {
    name: String,
    needs: Vec<String>,
    provides: Vec<String>,
    params: Params,
    body: Option<Box<dyn Compute>>,
}

impl OperationBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            needs: Vec::new(),
            provides: Vec::new(),
            params: Params::new(),
            body: None,
        }
    }

    pub fn need(mut self, name: impl Into<String>) -> Self {
        self.needs.push(name.into());
        self
    }

    pub fn needs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.needs.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn provide(mut self, name: impl Into<String>) -> Self {
        self.provides.push(name.into());
        self
    }

    pub fn provides<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provides.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Replace all params at once
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Attach a closure body
    pub fn compute<F>(mut self, body: F) -> Self
    where
        F: Fn(&Inputs<'_>, &Params) -> anyhow::Result<Outputs> + Send + Sync + 'static,
    {
        self.body = Some(Box::new(body));
        self
    }

    /// Attach any [`Compute`] implementation
    pub fn compute_with(mut self, body: impl Compute + 'static) -> Self {
        self.body = Some(Box::new(body));
        self
    }

    pub fn build(self) -> Result<Operation> {
        let name = self.name.as_str();
        if name.trim().is_empty() {
            return Err(invalid(name, "operation name is empty"));
        }
        if name.trim() != name {
            return Err(invalid(name, "operation name has surrounding whitespace"));
        }

        if self.provides.is_empty() {
            return Err(invalid(name, "operation provides nothing"));
        }

        if let Some(dup) = first_duplicate(&self.needs) {
            return Err(invalid(name, &format!("'{}' appears twice in needs", dup)));
        }

        if let Some(dup) = first_duplicate(&self.provides) {
            return Err(invalid(name, &format!("'{}' appears twice in provides", dup)));
        }

        if let Some(empty) = self
            .needs
            .iter()
            .chain(&self.provides)
            .find(|n| n.trim().is_empty())
        {
            return Err(invalid(name, &format!("empty data name {:?}", empty)));
        }

        let Some(body) = self.body else {
            return Err(invalid(name, "no compute body attached"));
        };

        Ok(Operation::from_inner(OperationInner {
            name: intern(name),
            needs: self.needs.iter().map(|n| intern(n)).collect(),
            provides: self.provides.iter().map(|n| intern(n)).collect(),
            params: self.params,
            body,
        }))
    }
}

fn invalid(name: &str, reason: &str) -> GraphError {
    GraphError::InvalidOperation {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn first_duplicate(names: &[String]) -> Option<&str> {
    let mut seen = FxHashSet::default();
    names
        .iter()
        .map(String::as_str)
        .find(|name| !seen.insert(*name))
}
