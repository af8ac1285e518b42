use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{doc_id, Collection, Document, ListFilter, Store, StoreError};

/// In-memory backend. Used by unit and integration tests, where the
/// filesystem layout is irrelevant.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, HashMap<String, Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn put(&self, collection: Collection, doc: Document) -> Result<(), StoreError> {
        let id = doc_id(&doc)?;
        let mut collections = self.collections.write().await;
        collections.entry(collection).or_default().insert(id, doc);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(&collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn list(
        &self,
        collection: Collection,
        filter: &ListFilter,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let mut docs: Vec<Document> = collections
            .get(&collection)
            .map(|docs| docs.values().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default();
        docs.sort_by(|a, b| doc_id(a).unwrap_or_default().cmp(&doc_id(b).unwrap_or_default()));
        Ok(docs)
    }

    async fn count(&self, collection: Collection, filter: &ListFilter) -> Result<usize, StoreError> {
        Ok(self.list(collection, filter).await?.len())
    }
}
