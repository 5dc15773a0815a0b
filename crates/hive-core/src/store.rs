//! Persisted-store contract and the bundled in-memory implementation
//!
//! The storage engine is an external collaborator; the gateway treats it as
//! an opaque keyed document store. Documents are the serde snapshot records
//! of entities plus a store-assigned opaque key.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by the persisted store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt document {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// One persisted document: an entity snapshot record plus the store's key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Store-assigned opaque key
    pub key: String,
    /// Entity snapshot record
    pub body: serde_json::Value,
}

/// Field-subset match over document bodies.
///
/// A document matches when every filter field equals the same top-level
/// field of its body. An empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct StoreFilter {
    fields: serde_json::Map<String, serde_json::Value>,
}

impl StoreFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `name` to equal `value`.
    #[must_use]
    pub fn field(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Whether `body` satisfies every field of this filter.
    pub fn matches(&self, body: &serde_json::Value) -> bool {
        self.fields
            .iter()
            .all(|(name, value)| body.get(name) == Some(value))
    }
}

/// Keyed-document store the registries bind to.
///
/// `find_matching` feeds startup recovery; `insert`/`remove_matching` keep
/// the store in step with registrations. Durability is entirely the store's
/// concern.
#[async_trait]
pub trait DocStore: Send + Sync {
    /// All documents whose body matches `filter`.
    async fn find_matching(&self, filter: &StoreFilter) -> StoreResult<Vec<Document>>;

    /// Persist a snapshot record, returning it with its assigned key.
    async fn insert(&self, body: serde_json::Value) -> StoreResult<Document>;

    /// Remove every document matching `filter`; returns how many went away.
    async fn remove_matching(&self, filter: &StoreFilter) -> StoreResult<usize>;
}

/// In-memory document store, for the demo daemon and tests.
#[derive(Default)]
pub struct MemStore {
    docs: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load a snapshot record, e.g. to simulate state left over from a
    /// previous run.
    pub fn seed(&self, body: serde_json::Value) {
        self.docs.lock().insert(Uuid::new_v4().to_string(), body);
    }

    pub fn len(&self) -> usize {
        self.docs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.lock().is_empty()
    }
}

#[async_trait]
impl DocStore for MemStore {
    async fn find_matching(&self, filter: &StoreFilter) -> StoreResult<Vec<Document>> {
        let docs = self.docs.lock();
        Ok(docs
            .iter()
            .filter(|(_, body)| filter.matches(body))
            .map(|(key, body)| Document {
                key: key.clone(),
                body: body.clone(),
            })
            .collect())
    }

    async fn insert(&self, body: serde_json::Value) -> StoreResult<Document> {
        let key = Uuid::new_v4().to_string();
        self.docs.lock().insert(key.clone(), body.clone());
        Ok(Document { key, body })
    }

    async fn remove_matching(&self, filter: &StoreFilter) -> StoreResult<usize> {
        let mut docs = self.docs.lock();
        let before = docs.len();
        docs.retain(|_, body| !filter.matches(body));
        Ok(before - docs.len())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn filter_is_field_subset_match() {
        let store = MemStore::new();
        store.seed(json!({ "netcore": "zb0", "id": 1 }));
        store.seed(json!({ "netcore": "ble0", "id": 2 }));

        let zb = store
            .find_matching(&StoreFilter::new().field("netcore", "zb0"))
            .await
            .unwrap();
        assert_eq!(zb.len(), 1);
        assert_eq!(zb[0].body["id"], 1);

        let all = store.find_matching(&StoreFilter::new()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn insert_then_remove_matching() {
        let store = MemStore::new();
        let doc = store.insert(json!({ "id": 5 })).await.unwrap();
        assert!(!doc.key.is_empty());
        assert_eq!(store.len(), 1);

        let removed = store
            .remove_matching(&StoreFilter::new().field("id", 5))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.is_empty());

        // Removing again is a no-op, not an error.
        let removed = store
            .remove_matching(&StoreFilter::new().field("id", 5))
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }
}
