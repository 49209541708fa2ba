//! Parameter records for list-valued loaders.

use std::hash::{Hash, Hasher};

use serde::Serialize;

/// A filter together with its JSON encoding.
///
/// Filters may hold floats, so equality and hashing go through the
/// encoding rather than the value.
#[derive(Debug, Clone)]
pub struct FilterKey<W> {
    filter: Option<W>,
    json: String,
}

impl<W: Serialize> FilterKey<W> {
    pub fn new(filter: Option<W>) -> Self {
        let json = filter
            .as_ref()
            .and_then(|f| serde_json::to_string(f).ok())
            .unwrap_or_default();
        Self { filter, json }
    }
}

impl<W> FilterKey<W> {
    pub fn get(&self) -> Option<&W> {
        self.filter.as_ref()
    }

    pub fn json(&self) -> &str {
        &self.json
    }
}

impl<W> Default for FilterKey<W> {
    fn default() -> Self {
        Self {
            filter: None,
            json: String::new(),
        }
    }
}

impl<W> PartialEq for FilterKey<W> {
    fn eq(&self, other: &Self) -> bool {
        self.json == other.json
    }
}

impl<W> Eq for FilterKey<W> {}

impl<W> Hash for FilterKey<W> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.json.hash(state);
    }
}

/// Lookup key for a list-valued loader: the parent key plus the child
/// field's `limit` and `where` arguments.
#[derive(Debug, Clone)]
pub struct Param<K, W = ()> {
    pub key: K,
    pub limit: Option<i32>,
    pub filter: FilterKey<W>,
}

impl<K, W: Serialize> Param<K, W> {
    pub fn new(key: K) -> Self {
        Self {
            key,
            limit: None,
            filter: FilterKey::default(),
        }
    }

    pub fn with_limit(mut self, limit: Option<i32>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_filter(mut self, filter: Option<W>) -> Self {
        self.filter = FilterKey::new(filter);
        self
    }

    pub fn filter(&self) -> Option<&W> {
        self.filter.get()
    }
}

impl<K: PartialEq, W> PartialEq for Param<K, W> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.limit == other.limit && self.filter == other.filter
    }
}

impl<K: Eq, W> Eq for Param<K, W> {}

impl<K: Hash, W> Hash for Param<K, W> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.limit.hash(state);
        self.filter.hash(state);
    }
}
