//! Operation - immutable declaration of one computation step
//!
//! An operation names the data it `needs`, the data it `provides`, static
//! `params` bound at declaration time, and a [`Compute`] body. It is a cheap
//! handle (`Arc` inner) so plans and networks share it without copying.

use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::builder::OperationBuilder;

/// Static configuration bound to an operation at declaration time
pub type Params = Map<String, Value>;

/// Capability implemented by every operation body
///
/// Closures with the matching signature implement it automatically.
pub trait Compute: Send + Sync {
    fn compute(&self, inputs: &Inputs<'_>, params: &Params) -> anyhow::Result<Outputs>;
}

impl<F> Compute for F
where
    F: Fn(&Inputs<'_>, &Params) -> anyhow::Result<Outputs> + Send + Sync,
{
    fn compute(&self, inputs: &Inputs<'_>, params: &Params) -> anyhow::Result<Outputs> {
        self(inputs, params)
    }
}

// ═══════════════════════════════════════════════════════════════
// INPUTS
// ═══════════════════════════════════════════════════════════════

/// Values gathered for an operation's `needs`, in declared order
#[derive(Debug, Clone)]
pub struct Inputs<'a> {
    entries: Vec<(&'a str, &'a Value)>,
}

impl<'a> Inputs<'a> {
    pub(crate) fn new(entries: Vec<(&'a str, &'a Value)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, value)| *value)
    }

    /// Like [`get`](Self::get) but fails with a readable error for use inside bodies
    pub fn require(&self, name: &str) -> anyhow::Result<&'a Value> {
        self.get(name)
            .ok_or_else(|| anyhow!("input '{}' was not declared in needs", name))
    }

    /// Deserialize one input into a concrete type
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let value = self.require(name)?;
        serde_json::from_value(value.clone())
            .with_context(|| format!("input '{}' has an unexpected shape: {}", name, value))
    }

    /// Value at position `index` of `needs`
    pub fn at(&self, index: usize) -> Option<&'a Value> {
        self.entries.get(index).map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════
// OUTPUTS
// ═══════════════════════════════════════════════════════════════

/// What an operation body returns for its `provides`
#[derive(Debug, Clone, PartialEq)]
pub enum Outputs {
    /// One value. With several provides, an array or object of matching shape is unpacked.
    Single(Value),
    /// One value per provide, in declared order
    Sequence(Vec<Value>),
    /// Values keyed by provide name
    Named(Map<String, Value>),
}

impl Outputs {
    /// Align returned values with `provides`, or explain why they don't fit
    pub(crate) fn align(self, provides: &[Arc<str>]) -> Result<Vec<Value>, String> {
        let expected = provides.len();
        match self {
            Outputs::Single(value) if expected == 1 => Ok(vec![value]),
            Outputs::Single(Value::Array(values)) => Self::check_len(values, expected),
            Outputs::Single(Value::Object(map)) => Self::take_named(map, provides),
            Outputs::Single(_) => Err(format!("expected {} values, got a single value", expected)),
            Outputs::Sequence(values) => Self::check_len(values, expected),
            Outputs::Named(map) => Self::take_named(map, provides),
        }
    }

    fn check_len(values: Vec<Value>, expected: usize) -> Result<Vec<Value>, String> {
        if values.len() == expected {
            Ok(values)
        } else {
            Err(format!("expected {} values, got {}", expected, values.len()))
        }
    }

    fn take_named(mut map: Map<String, Value>, provides: &[Arc<str>]) -> Result<Vec<Value>, String> {
        let mut values = Vec::with_capacity(provides.len());
        let mut missing = Vec::new();
        for name in provides {
            match map.remove(&**name) {
                Some(value) => values.push(value),
                None => missing.push(&**name),
            }
        }

        if !missing.is_empty() {
            return Err(format!("missing values for {:?}", missing));
        }
        if !map.is_empty() {
            let extra: Vec<&str> = map.keys().map(String::as_str).collect();
            return Err(format!("undeclared values {:?}", extra));
        }
        Ok(values)
    }
}

impl From<Value> for Outputs {
    fn from(value: Value) -> Self {
        Outputs::Single(value)
    }
}

impl From<Vec<Value>> for Outputs {
    fn from(values: Vec<Value>) -> Self {
        Outputs::Sequence(values)
    }
}

impl From<Map<String, Value>> for Outputs {
    fn from(map: Map<String, Value>) -> Self {
        Outputs::Named(map)
    }
}

// ═══════════════════════════════════════════════════════════════
// OPERATION
// ═══════════════════════════════════════════════════════════════

pub(crate) struct OperationInner {
    pub(crate) name: Arc<str>,
    pub(crate) needs: Vec<Arc<str>>,
    pub(crate) provides: Vec<Arc<str>>,
    pub(crate) params: Params,
    pub(crate) body: Box<dyn Compute>,
}

/// Immutable operation handle (clone is an `Arc` bump)
#[derive(Clone)]
pub struct Operation {
    inner: Arc<OperationInner>,
}

impl Operation {
    pub fn builder(name: impl Into<String>) -> OperationBuilder {
        OperationBuilder::new(name)
    }

    pub(crate) fn from_inner(inner: OperationInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn name_arc(&self) -> &Arc<str> {
        &self.inner.name
    }

    pub fn needs(&self) -> &[Arc<str>] {
        &self.inner.needs
    }

    pub fn provides(&self) -> &[Arc<str>] {
        &self.inner.provides
    }

    pub fn params(&self) -> &Params {
        &self.inner.params
    }

    /// Call the body with gathered inputs and the bound params
    pub fn invoke(&self, inputs: &Inputs<'_>) -> anyhow::Result<Outputs> {
        self.inner.body.compute(inputs, &self.inner.params)
    }

    /// Same underlying declaration (not just equal names)
    pub fn ptr_eq(&self, other: &Operation) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.inner.name)
            .field("needs", &self.inner.needs)
            .field("provides", &self.inner.provides)
            .field("params", &self.inner.params)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: [{}] -> [{}]",
            self.inner.name,
            self.inner.needs.join(", "),
            self.inner.provides.join(", ")
        )
    }
}
