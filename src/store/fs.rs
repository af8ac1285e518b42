use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{doc_id, Collection, Document, ListFilter, Store, StoreError};

/// Filesystem backend: one JSON file per document, laid out as
/// `<root>/<collection>/<id>.json`.
///
/// Writes land in a uniquely-named sibling file first and are renamed into
/// place, so a concurrent reader sees either the old or the new document.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn dir(&self, collection: Collection) -> PathBuf {
        self.root.join(collection.as_str())
    }

    fn path(&self, collection: Collection, id: &str) -> PathBuf {
        self.dir(collection).join(format!("{}.json", id))
    }

    async fn read_doc(path: &Path) -> Result<Option<Document>, StoreError> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) => {
                // Tolerate a corrupt file rather than taking the whole
                // collection down with it.
                tracing::warn!(path = %path.display(), error = %e, "cannot decode document, skipping");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Store for FsStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        Self::read_doc(&self.path(collection, id)).await
    }

    async fn put(&self, collection: Collection, doc: Document) -> Result<(), StoreError> {
        let id = doc_id(&doc)?;
        let dir = self.dir(collection);
        fs::create_dir_all(&dir).await?;

        let bytes = serde_json::to_vec(&doc)?;
        let tmp = dir.join(format!("{}.json.tmp-{}", id, uuid::Uuid::new_v4().simple()));
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, self.path(collection, &id)).await?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path(collection, id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(
        &self,
        collection: Collection,
        filter: &ListFilter,
    ) -> Result<Vec<Document>, StoreError> {
        let dir = self.dir(collection);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut docs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(doc) = Self::read_doc(&path).await? {
                if filter.matches(&doc) {
                    docs.push(doc);
                }
            }
        }
        docs.sort_by(|a, b| doc_id(a).unwrap_or_default().cmp(&doc_id(b).unwrap_or_default()));
        Ok(docs)
    }

    async fn count(&self, collection: Collection, filter: &ListFilter) -> Result<usize, StoreError> {
        Ok(self.list(collection, filter).await?.len())
    }
}
