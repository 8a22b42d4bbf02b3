//! Cache invalidation trigger.
//!
//! Mutations (publish, update, delete) happen in the wallet layer. Once one of
//! them succeeds, that layer calls into [`CacheTrigger`] so the next catalog
//! load observes fresh chain and provider state.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use super::keys::CacheKey;
use super::store::CacheStore;

/// Kinds of successful mutations that invalidate the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    /// A new asset was registered on chain and its body pinned.
    Published { content_id: String },
    /// An existing asset's on-chain pointer or metadata changed.
    Updated { content_id: String },
    /// An asset was removed.
    Deleted { content_id: String },
}

impl MutationKind {
    /// Keys whose contents the mutation makes stale.
    ///
    /// Metadata pages go too: a fresh listing that predates a publish would
    /// filter the new asset out of the catalog.
    pub fn affected_keys(&self) -> &'static [CacheKey] {
        &CacheKey::ALL
    }
}

/// Record of a single invalidation, kept for logging.
#[derive(Debug, Clone)]
pub struct InvalidationEvent {
    pub id: Uuid,
    pub kind: MutationKind,
    pub timestamp: OffsetDateTime,
}

impl InvalidationEvent {
    pub fn new(kind: MutationKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// Invalidation entry point shared with the mutation layer.
///
/// # Usage
///
/// ```ignore
/// // After the publish transaction is confirmed:
/// trigger.published(&content_id);
/// ```
pub struct CacheTrigger {
    store: Arc<CacheStore>,
}

impl CacheTrigger {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self { store }
    }

    /// Clear every key affected by `kind`.
    pub fn trigger(&self, kind: MutationKind) -> InvalidationEvent {
        let event = InvalidationEvent::new(kind);

        if !self.store.config().enabled {
            debug!(event_kind = ?event.kind, "Cache trigger skipped: cache disabled");
            return event;
        }

        for key in event.kind.affected_keys() {
            self.store.clear(*key);
        }

        info!(
            event_id = %event.id,
            event_kind = ?event.kind,
            "Catalog cache invalidated"
        );
        event
    }

    pub fn published(&self, content_id: &str) -> InvalidationEvent {
        self.trigger(MutationKind::Published {
            content_id: content_id.to_string(),
        })
    }

    pub fn updated(&self, content_id: &str) -> InvalidationEvent {
        self.trigger(MutationKind::Updated {
            content_id: content_id.to_string(),
        })
    }

    pub fn deleted(&self, content_id: &str) -> InvalidationEvent {
        self.trigger(MutationKind::Deleted {
            content_id: content_id.to_string(),
        })
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }
}
