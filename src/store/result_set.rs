//! ResultSet - the values one run returns
//!
//! Sorted by name (`BTreeMap`) so iteration, `Debug` and JSON output are
//! stable across runs. Also records which operations actually executed, in
//! order, which is what callers inspect to confirm pruning.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    values: BTreeMap<Arc<str>, Value>,
    executed: Vec<Arc<str>>,
}

impl ResultSet {
    pub(crate) fn new(values: BTreeMap<Arc<str>, Value>, executed: Vec<Arc<str>>) -> Self {
        Self { values, executed }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.keys().map(|name| &**name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.values.iter().map(|(name, value)| (&**name, value))
    }

    /// Operations executed to produce this result, in execution order
    pub fn executed(&self) -> Vec<&str> {
        self.executed.iter().map(|name| &**name).collect()
    }

    pub fn was_executed(&self, operation: &str) -> bool {
        self.executed.iter().any(|name| &**name == operation)
    }

    /// Values as a JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect::<Map<String, Value>>(),
        )
    }

    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.values
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}

impl IntoIterator for ResultSet {
    type Item = (Arc<str>, Value);
    type IntoIter = std::collections::btree_map::IntoIter<Arc<str>, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
