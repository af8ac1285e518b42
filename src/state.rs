use std::sync::Arc;

use crate::config::{AppConfig, IdStrategyKind};
use crate::id::{IdStrategy, OpaqueIds, SequentialIds};
use crate::model::Tree;
use crate::store::{FsStore, Store};

/// Shared request state. Owns the store handle for the whole process; the
/// tree and handlers receive it explicitly instead of going through a
/// global.
pub struct AppState {
    pub tree: Tree,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub base_url: String,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, ids: Arc<dyn IdStrategy>, config: &AppConfig) -> Arc<Self> {
        Arc::new(Self {
            tree: Tree::new(store, ids),
            jwt_secret: config.security.jwt_secret.clone(),
            jwt_expiry_hours: config.security.jwt_expiry_hours,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Wire up the configured filesystem store and id strategy.
    pub fn from_config(config: &AppConfig) -> Arc<Self> {
        let store: Arc<dyn Store> = Arc::new(FsStore::new(config.storage.data_dir.clone()));
        Self::new(store, strategy(config.storage.id_strategy), config)
    }
}

pub fn strategy(kind: IdStrategyKind) -> Arc<dyn IdStrategy> {
    match kind {
        IdStrategyKind::Sequential => Arc::new(SequentialIds),
        IdStrategyKind::Opaque => Arc::new(OpaqueIds),
    }
}
