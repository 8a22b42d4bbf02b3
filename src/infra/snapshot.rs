//! Chain reader backed by an exported registry snapshot.
//!
//! The file is re-read on every call, so a refreshed export is picked up by
//! the next catalog load the same way a new chain read would be.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::application::repos::{ChainError, ContractAssetReader, OwnershipReader};
use crate::domain::entities::ChainAsset;

#[derive(Debug, Deserialize)]
struct ChainSnapshot {
    assets: Vec<ChainAsset>,
    #[serde(default)]
    owners: HashMap<String, Vec<u64>>,
}

#[derive(Clone, Debug)]
pub struct ChainSnapshotReader {
    path: PathBuf,
}

impl ChainSnapshotReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<ChainSnapshot, ChainError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|err| {
            ChainError::Read(format!("failed to read {}: {err}", self.path.display()))
        })?;
        serde_json::from_slice(&bytes).map_err(|err| ChainError::Decode(err.to_string()))
    }
}

#[async_trait]
impl ContractAssetReader for ChainSnapshotReader {
    async fn all_assets(&self) -> Result<Vec<ChainAsset>, ChainError> {
        Ok(self.read().await?.assets)
    }
}

#[async_trait]
impl OwnershipReader for ChainSnapshotReader {
    /// Accounts compare case-insensitively; an account with no entry owns nothing.
    async fn owned_asset_ids(&self, account: &str) -> Result<Vec<u64>, ChainError> {
        let account = account.trim();
        if account.is_empty() {
            return Err(ChainError::InvalidAccount {
                account: account.to_string(),
            });
        }

        let snapshot = self.read().await?;
        Ok(snapshot
            .owners
            .into_iter()
            .find(|(owner, _)| owner.eq_ignore_ascii_case(account))
            .map(|(_, ids)| ids)
            .unwrap_or_default())
    }
}
