use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Per request key/value bag shared by every phase of one physical request.
///
/// The bag is created together with the [`Exchange`](crate::transport::Exchange) and lives
/// exactly as long as it, so a validator can leave something behind that a terminator reads.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DataBag {
    inner: Map<String, Value>,
}

impl DataBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the previous one under the same key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.inner.get_mut(key)
    }

    /// Reads a value and deserializes it into `T`, `None` when absent or of another shape
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.inner.get(key).and_then(|value| T::deserialize(value).ok())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.inner.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.inner.iter()
    }
}
