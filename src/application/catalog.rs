//! Cache-aware asset catalog.
//!
//! A load shows the cached catalog while the chain read is in flight, swaps in
//! the chain-derived list once it resolves, then enriches that list in a
//! background task. Observers follow the transitions through a watch channel.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::enrichment::{EnrichError, EnrichmentEngine, Ticket};
use crate::application::repos::{ChainError, ContractAssetReader};
use crate::cache::{CacheKey, CacheStore};
use crate::domain::entities::{AssetRecord, EnrichedAsset, records_from_chain};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// What the catalog currently displays.
///
/// The list is always one whole snapshot, either the cached catalog or the
/// latest chain-derived one, never a merge of the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogState {
    /// Nothing to show yet.
    Loading,
    /// A fresh cache hit, shown while the chain read is still in flight.
    Cached(Vec<EnrichedAsset>),
    /// The chain read resolved; enrichment may still be running.
    Ready(Vec<EnrichedAsset>),
    /// The chain read failed.
    Failed(String),
}

impl CatalogState {
    pub fn assets(&self) -> &[EnrichedAsset] {
        match self {
            CatalogState::Cached(assets) | CatalogState::Ready(assets) => assets,
            CatalogState::Loading | CatalogState::Failed(_) => &[],
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, CatalogState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CatalogState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Read the chain once and return its records without enrichment.
///
/// Needs no metadata provider and leaves every cache untouched.
pub async fn read_chain_catalog(
    chain: &dyn ContractAssetReader,
) -> Result<Vec<EnrichedAsset>, CatalogError> {
    let records = records_from_chain(chain.all_assets().await?);
    Ok(bare_catalog(&records))
}

fn bare_catalog(records: &[AssetRecord]) -> Vec<EnrichedAsset> {
    records.iter().cloned().map(EnrichedAsset::bare).collect()
}

/// Background enrichment started by [`AssetCatalogView::load`].
///
/// Dropping the handle detaches the task; it still runs to completion.
pub struct EnrichmentHandle {
    ticket: Ticket,
    task: JoinHandle<()>,
}

impl EnrichmentHandle {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Wait for the enrichment pass to finish.
    pub async fn finished(self) {
        if let Err(err) = self.task.await {
            warn!(
                ticket = self.ticket.get(),
                error = %err,
                "Catalog enrichment task did not complete"
            );
        }
    }
}

struct CatalogInner {
    chain: Arc<dyn ContractAssetReader>,
    cache: Arc<CacheStore>,
    engine: Arc<EnrichmentEngine>,
    state: watch::Sender<CatalogState>,
}

#[derive(Clone)]
pub struct AssetCatalogView {
    inner: Arc<CatalogInner>,
}

impl AssetCatalogView {
    pub fn new(
        chain: Arc<dyn ContractAssetReader>,
        cache: Arc<CacheStore>,
        engine: Arc<EnrichmentEngine>,
    ) -> Self {
        let (state, _) = watch::channel(CatalogState::Loading);
        Self {
            inner: Arc::new(CatalogInner {
                chain,
                cache,
                engine,
                state,
            }),
        }
    }

    pub fn state(&self) -> CatalogState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.inner.state.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading()
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.inner.cache
    }

    /// Read the chain and publish the catalog, starting enrichment in the background.
    ///
    /// A load issued later supersedes this one: its state transitions and its
    /// enrichment result are then discarded.
    pub async fn load(&self) -> Result<EnrichmentHandle, CatalogError> {
        let ticket = self.inner.engine.issue();

        match self.inner.cache.get::<Vec<EnrichedAsset>>(CacheKey::Assets) {
            Some(cached) => {
                debug!(
                    ticket = ticket.get(),
                    assets = cached.len(),
                    "Showing cached catalog"
                );
                self.publish(ticket, CatalogState::Cached(cached));
            }
            None => {
                self.publish(ticket, CatalogState::Loading);
            }
        }

        let chain_assets = match self.inner.chain.all_assets().await {
            Ok(assets) => assets,
            Err(err) => {
                warn!(ticket = ticket.get(), error = %err, "Chain read failed");
                self.publish(ticket, CatalogState::Failed(err.to_string()));
                return Err(err.into());
            }
        };

        let records = records_from_chain(chain_assets);
        let raw = bare_catalog(&records);
        self.publish(ticket, CatalogState::Ready(raw));
        info!(
            ticket = ticket.get(),
            assets = records.len(),
            "Chain catalog loaded"
        );

        let view = self.clone();
        let task = tokio::spawn(async move { view.enrich(ticket, records).await });

        Ok(EnrichmentHandle { ticket, task })
    }

    /// Drop the cached catalog and load again from the chain.
    pub async fn refetch(&self) -> Result<EnrichmentHandle, CatalogError> {
        self.inner.cache.clear(CacheKey::Assets);
        self.load().await
    }

    async fn enrich(&self, ticket: Ticket, records: Vec<AssetRecord>) {
        match self.inner.engine.enrich_with(ticket, records).await {
            Ok(enriched) => {
                self.publish(ticket, CatalogState::Ready(enriched));
            }
            Err(EnrichError::Superseded { ticket, latest }) => {
                debug!(ticket, latest, "Discarding superseded enrichment");
            }
            Err(err) => {
                warn!(
                    ticket = ticket.get(),
                    error = %err,
                    "Catalog enrichment skipped, showing chain data"
                );
            }
        }
    }

    fn publish(&self, ticket: Ticket, next: CatalogState) -> bool {
        let engine = &self.inner.engine;
        self.inner.state.send_if_modified(|state| {
            if !engine.is_current(ticket) {
                return false;
            }
            *state = next;
            true
        })
    }
}
