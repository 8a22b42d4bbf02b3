//! Domain records for the asset catalog.
//!
//! `ChainAsset` and `AssetRecord` originate on chain, `MetadataRecord` comes
//! from the pinning provider, and `EnrichedAsset` is the join of the two.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_with::{As, DisplayFromStr, FromInto, PickFirst};
use tracing::debug;

/// Row of the on-chain asset array, as returned by the registry contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainAsset {
    pub author: String,
    pub content_id: String,
    pub title: String,
    pub thumbnail_id: String,
    #[serde(default)]
    pub description: String,
    /// Amount in the chain's smallest unit; travels as a decimal string, a
    /// plain JSON number is accepted on input.
    #[serde(with = "As::<PickFirst<(DisplayFromStr, FromInto<u64>)>>")]
    pub price_in_native: u128,
    /// The contract's own identifier for the asset, when it exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<u64>,
}

/// On-chain asset with a catalog identifier attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub id: u64,
    pub author: String,
    pub content_id: String,
    pub title: String,
    pub thumbnail_id: String,
    pub description: String,
    /// Amount in the chain's smallest unit; travels as a decimal string, a
    /// plain JSON number is accepted on input.
    #[serde(with = "As::<PickFirst<(DisplayFromStr, FromInto<u64>)>>")]
    pub price_in_native: u128,
}

impl AssetRecord {
    /// Attach the catalog identifier `id` to a chain row.
    pub fn from_chain(id: u64, asset: ChainAsset) -> Self {
        Self {
            id,
            author: asset.author,
            content_id: asset.content_id,
            title: asset.title,
            thumbnail_id: asset.thumbnail_id,
            description: asset.description,
            price_in_native: asset.price_in_native,
        }
    }
}

/// Map a full chain read into catalog records.
///
/// One id scheme covers the whole read: token ids when every row carries a
/// distinct one, otherwise the 1-based array position for every row. Mixing
/// the two would let a token id collide with another row's position.
pub fn records_from_chain(assets: Vec<ChainAsset>) -> Vec<AssetRecord> {
    let by_token = has_distinct_token_ids(&assets);
    if !by_token && assets.iter().any(|asset| asset.token_id.is_some()) {
        debug!(
            assets = assets.len(),
            "Token ids missing or repeated, using positional ids"
        );
    }

    assets
        .into_iter()
        .enumerate()
        .map(|(index, asset)| {
            let id = match asset.token_id {
                Some(token_id) if by_token => token_id,
                _ => index as u64 + 1,
            };
            AssetRecord::from_chain(id, asset)
        })
        .collect()
}

fn has_distinct_token_ids(assets: &[ChainAsset]) -> bool {
    let mut seen = HashSet::with_capacity(assets.len());
    assets
        .iter()
        .all(|asset| asset.token_id.is_some_and(|token_id| seen.insert(token_id)))
}

/// Off-chain metadata attached to a pinned object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub content_id: String,
    #[serde(default)]
    pub keyvalues: BTreeMap<String, String>,
    pub created_at: String,
}

/// One page of the provider's metadata listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPage {
    pub items: Vec<MetadataRecord>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl MetadataPage {
    /// Token for the following page; an empty token also ends the stream.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_page_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}

/// Catalog entry as consumed by feeds, libraries, and dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedAsset {
    #[serde(flatten)]
    pub asset: AssetRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashtags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

impl EnrichedAsset {
    /// Wrap a chain record that has not been through enrichment yet.
    pub fn bare(asset: AssetRecord) -> Self {
        Self {
            asset,
            hashtags: None,
            published_at: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.asset.id
    }

    pub fn content_id(&self) -> &str {
        &self.asset.content_id
    }
}
