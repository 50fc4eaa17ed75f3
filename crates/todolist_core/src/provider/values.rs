//! Column-name → value maps exchanged at the provider boundary.

use rusqlite::types::Value;
use std::collections::btree_map;
use std::collections::BTreeMap;

/// One row's worth of column values, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentValues {
    values: BTreeMap<String, Value>,
}

impl ContentValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map holding a single task text, the usual insert payload.
    pub fn with_task(text: impl Into<String>) -> Self {
        let mut values = Self::new();
        values.put_text(crate::db::KEY_TASK, text);
        values
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn put_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), Value::Text(value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.values.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
