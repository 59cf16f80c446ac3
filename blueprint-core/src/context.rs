//! [`GenerationContext`]: the resolved, typed variable set for one generation.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::condition::VariableLookup;
use crate::types::Value;

/// Mapping from variable name to resolved value.
///
/// Built once per request by [`crate::variables::resolve`] and only read
/// afterwards; there is no mutating API. Iteration order is by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GenerationContext {
    values: BTreeMap<String, Value>,
}

impl GenerationContext {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for GenerationContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        GenerationContext {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl VariableLookup for GenerationContext {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}
