//! Process-local document store.
//!
//! Mirrors the Firestore backend's semantics: create-if-absent conflicts,
//! string field equality queries, and all-or-nothing commits (one write lock
//! held across the whole commit).

use crate::db::Write;
use crate::error::AppError;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

type Documents = BTreeMap<String, Value>;

#[derive(Default)]
pub struct MemoryBackend {
    collections: RwLock<HashMap<String, Documents>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, AppError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    pub async fn set(&self, collection: &str, id: &str, doc: &Value) -> Result<(), AppError> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc.clone());
        Ok(())
    }

    pub async fn create(&self, collection: &str, id: &str, doc: &Value) -> Result<(), AppError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Err(AppError::Conflict(format!(
                "{}/{} already exists",
                collection, id
            )));
        }
        docs.insert(id.to_string(), doc.clone());
        Ok(())
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    pub async fn list(&self, collection: &str) -> Result<Vec<Value>, AppError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    pub async fn find_by(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Value>, AppError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| doc.get(field).and_then(Value::as_str) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn commit(&self, writes: &[Write]) -> Result<(), AppError> {
        let mut collections = self.collections.write().await;
        for write in writes {
            match write {
                Write::Set {
                    collection,
                    id,
                    doc,
                } => {
                    collections
                        .entry(collection.to_string())
                        .or_default()
                        .insert(id.clone(), doc.clone());
                }
                Write::Delete { collection, id } => {
                    if let Some(docs) = collections.get_mut(*collection) {
                        docs.remove(id);
                    }
                }
            }
        }
        Ok(())
    }
}
