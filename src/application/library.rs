//! The caller's own slice of the catalog.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::application::catalog::{AssetCatalogView, CatalogState};
use crate::application::repos::{ChainError, OwnershipReader};
use crate::domain::entities::EnrichedAsset;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("ownership read failed: {0}")]
    Ownership(#[from] ChainError),
    #[error("catalog is no longer publishing updates")]
    CatalogClosed,
    #[error("catalog still loading after {waited:?}")]
    CatalogTimeout { waited: Duration },
}

const DEFAULT_CATALOG_WAIT: Duration = Duration::from_secs(60);

/// Progress of the ownership read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnershipState {
    Loading,
    Loaded(Vec<u64>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySnapshot {
    pub loading: bool,
    pub assets: Vec<EnrichedAsset>,
    pub error: Option<String>,
}

/// Catalog entries whose id appears in `owned`, in catalog order.
pub fn filter_owned(catalog: &[EnrichedAsset], owned: &[u64]) -> Vec<EnrichedAsset> {
    let owned: HashSet<u64> = owned.iter().copied().collect();
    catalog
        .iter()
        .filter(|asset| owned.contains(&asset.id()))
        .cloned()
        .collect()
}

/// Combine the catalog and ownership states into what the library displays.
///
/// The library is loading while either input is; it only lists assets once
/// both have something to offer.
pub fn derive(catalog: &CatalogState, ownership: &OwnershipState) -> LibrarySnapshot {
    let loading = catalog.is_loading() || matches!(ownership, OwnershipState::Loading);
    let error = match ownership {
        OwnershipState::Failed(message) => Some(message.clone()),
        _ => catalog.error().map(str::to_string),
    };
    let assets = match ownership {
        OwnershipState::Loaded(ids) if !loading => filter_owned(catalog.assets(), ids),
        _ => Vec::new(),
    };

    LibrarySnapshot {
        loading,
        assets,
        error,
    }
}

/// Library view over a shared catalog. Holds no cache of its own.
#[derive(Clone)]
pub struct UserAssetView {
    catalog: AssetCatalogView,
    ownership: Arc<dyn OwnershipReader>,
    catalog_wait: Duration,
}

impl UserAssetView {
    pub fn new(catalog: AssetCatalogView, ownership: Arc<dyn OwnershipReader>) -> Self {
        Self {
            catalog,
            ownership,
            catalog_wait: DEFAULT_CATALOG_WAIT,
        }
    }

    /// Bound how long `load` waits for the catalog to leave `Loading`.
    pub fn with_catalog_wait(mut self, wait: Duration) -> Self {
        self.catalog_wait = wait;
        self
    }

    /// Snapshot for `account` given an ownership read already in hand.
    pub fn snapshot(&self, ownership: &OwnershipState) -> LibrarySnapshot {
        derive(&self.catalog.state(), ownership)
    }

    /// Wait for the catalog to leave `Loading` and for `account`'s ownership
    /// read, then filter.
    ///
    /// The catalog is expected to be loading or loaded already; this call does
    /// not start a catalog load. A catalog that stays in `Loading` past the
    /// configured wait is reported as [`LibraryError::CatalogTimeout`].
    pub async fn load(&self, account: &str) -> Result<LibrarySnapshot, LibraryError> {
        let mut updates = self.catalog.subscribe();
        let waited = self.catalog_wait;
        let (catalog, owned) = tokio::join!(
            async {
                match timeout(waited, updates.wait_for(|state| !state.is_loading())).await {
                    Ok(Ok(state)) => Ok(state.clone()),
                    Ok(Err(_)) => Err(LibraryError::CatalogClosed),
                    Err(_) => {
                        warn!(account, ?waited, "Catalog never left loading");
                        Err(LibraryError::CatalogTimeout { waited })
                    }
                }
            },
            self.ownership.owned_asset_ids(account),
        );

        let catalog = catalog?;
        let owned = owned?;
        debug!(
            account,
            owned = owned.len(),
            catalog = catalog.assets().len(),
            "Deriving user library"
        );
        Ok(derive(&catalog, &OwnershipState::Loaded(owned)))
    }
}
