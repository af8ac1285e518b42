// Identifier strategies.
//
// Two lineages exist for node identifiers: dense integers and
// globally-unique opaque hex tokens. Both live behind one trait so the
// resource tree never knows which is active. Either way an id must be
// unique within its collection, because the store backends key documents
// by id alone.

use async_trait::async_trait;
use thiserror::Error;

use crate::store::{Collection, ListFilter, Store, StoreError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

#[async_trait]
pub trait IdStrategy: Send + Sync {
    /// Validate an externally supplied id string. Failure is a recoverable
    /// validation error, never a panic.
    fn parse(&self, raw: &str) -> Result<String, IdError>;

    /// Allocate an id for a new node in `collection`.
    async fn allocate(
        &self,
        store: &dyn Store,
        collection: Collection,
    ) -> Result<String, StoreError>;
}

/// Dense non-negative integers, unique per collection: new ids are
/// `max(existing) + 1`, or 0 for an empty collection. Gaps left by
/// deletions are never refilled, and two parents never hand out the same
/// id to their children.
pub struct SequentialIds;

#[async_trait]
impl IdStrategy for SequentialIds {
    fn parse(&self, raw: &str) -> Result<String, IdError> {
        raw.parse::<u64>()
            .map(|n| n.to_string())
            .map_err(|_| IdError::InvalidId(raw.to_string()))
    }

    async fn allocate(
        &self,
        store: &dyn Store,
        collection: Collection,
    ) -> Result<String, StoreError> {
        let existing = store.list(collection, &ListFilter::default()).await?;
        let max = existing
            .iter()
            .filter_map(|doc| doc.get("id").and_then(serde_json::Value::as_str))
            .filter_map(|id| id.parse::<u64>().ok())
            .max();
        Ok(match max {
            Some(max) => (max + 1).to_string(),
            None => "0".to_string(),
        })
    }
}

/// Globally-unique opaque tokens: 24 lowercase hex characters, minted by
/// the store at insertion time.
pub struct OpaqueIds;

pub const OPAQUE_ID_LEN: usize = 24;

#[async_trait]
impl IdStrategy for OpaqueIds {
    fn parse(&self, raw: &str) -> Result<String, IdError> {
        let valid = raw.len() == OPAQUE_ID_LEN
            && raw.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if valid {
            Ok(raw.to_string())
        } else {
            Err(IdError::InvalidId(raw.to_string()))
        }
    }

    async fn allocate(
        &self,
        store: &dyn Store,
        _collection: Collection,
    ) -> Result<String, StoreError> {
        Ok(store.mint_id())
    }
}
