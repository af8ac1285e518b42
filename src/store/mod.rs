// Persistence abstraction for the resource tree.
//
// Four keyed collections (users, groups, checklists, items), each holding
// open attribute documents. The tree logic only ever sees `id`, `parent_id`
// and attributes; directory layout and file naming are backend details.

pub mod fs;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use fs::FsStore;
pub use memory::MemoryStore;

/// An open attribute mapping, as stored. Always contains a string `id`;
/// non-user documents also carry a string `parent_id`.
pub type Document = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Groups,
    Checklists,
    Items,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Groups => "groups",
            Collection::Checklists => "checklists",
            Collection::Items => "items",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from the storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failure: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("document has no id")]
    MissingId,
}

/// Equality filter for `list` and `count`.
///
/// `public_only` keeps only documents whose `private` attribute is exactly
/// `false`; a missing `private` counts as private (groups default private).
#[derive(Debug, Default, Clone)]
pub struct ListFilter {
    pub parent_id: Option<String>,
    pub name: Option<String>,
    pub public_only: bool,
}

impl ListFilter {
    pub fn children_of(parent_id: impl Into<String>) -> Self {
        Self { parent_id: Some(parent_id.into()), ..Self::default() }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Self::default() }
    }

    pub fn public_only(mut self) -> Self {
        self.public_only = true;
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        if let Some(parent_id) = &self.parent_id {
            if doc.get("parent_id").and_then(Value::as_str) != Some(parent_id.as_str()) {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if doc.get("name").and_then(Value::as_str) != Some(name.as_str()) {
                return false;
            }
        }
        if self.public_only && doc.get("private").and_then(Value::as_bool).unwrap_or(true) {
            return false;
        }
        true
    }
}

/// Durable keyed storage per collection.
///
/// All mutating operations are durable before returning. A write is atomic
/// per document: a concurrent reader observes either the old or the new
/// document, never a torn one.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError>;

    /// Upsert by the document's `id` field.
    async fn put(&self, collection: Collection, doc: Document) -> Result<(), StoreError>;

    /// Idempotent: deleting an absent id is not an error.
    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;

    async fn list(
        &self,
        collection: Collection,
        filter: &ListFilter,
    ) -> Result<Vec<Document>, StoreError>;

    async fn count(&self, collection: Collection, filter: &ListFilter) -> Result<usize, StoreError>;

    /// Mint a fresh globally-unique opaque id (24 lowercase hex chars).
    fn mint_id(&self) -> String {
        let bytes = uuid::Uuid::new_v4();
        bytes.as_bytes()[..12].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Pull the `id` out of a document, for backends keying by it.
pub(crate) fn doc_id(doc: &Document) -> Result<String, StoreError> {
    doc.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(StoreError::MissingId)
}
