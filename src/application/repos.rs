//! Collaborator traits describing chain and metadata adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{ChainAsset, MetadataPage};

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain read failed: {0}")]
    Read(String),
    #[error("chain response could not be decoded: {0}")]
    Decode(String),
    #[error("account `{account}` is not a valid identifier")]
    InvalidAccount { account: String },
}

impl ChainError {
    pub fn read(err: impl std::fmt::Display) -> Self {
        Self::Read(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata request failed: {0}")]
    Transport(String),
    #[error("metadata provider responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("metadata response could not be decoded: {0}")]
    Decode(String),
}

impl MetadataError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Read access to the registry contract's asset array.
#[async_trait]
pub trait ContractAssetReader: Send + Sync {
    /// Every asset currently listed on chain, in contract order.
    async fn all_assets(&self) -> Result<Vec<ChainAsset>, ChainError>;
}

/// Read access to the contract's per-account ownership index.
#[async_trait]
pub trait OwnershipReader: Send + Sync {
    async fn owned_asset_ids(&self, account: &str) -> Result<Vec<u64>, ChainError>;
}

/// Single-page access to the pinning provider's metadata listing.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch the page addressed by `cursor`; `None` requests the first page.
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<MetadataPage, MetadataError>;
}
