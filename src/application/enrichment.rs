//! Join of on-chain assets against off-chain metadata.
//!
//! The pinning provider is the source of truth for whether an asset still
//! exists: an on-chain record without a metadata entry (deleted, or never
//! finished uploading) is left out of the catalog.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::{debug, info};

use crate::application::pagination::{MetadataPaginator, PaginationError};
use crate::cache::{CacheKey, CacheStore};
use crate::domain::entities::{AssetRecord, EnrichedAsset, MetadataRecord};

const PUBLISHED_AT_KEY: &str = "publishedAt";

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error(transparent)]
    Metadata(#[from] PaginationError),
    #[error("metadata listing was empty")]
    EmptyMetadata,
    #[error("enrichment request {ticket} superseded by {latest}")]
    Superseded { ticket: u64, latest: u64 },
}

/// Monotonic identifier of an enrichment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Enriches chain records and publishes the result to the catalog cache.
pub struct EnrichmentEngine {
    cache: Arc<CacheStore>,
    paginator: MetadataPaginator,
    latest: AtomicU64,
}

impl EnrichmentEngine {
    pub fn new(cache: Arc<CacheStore>, paginator: MetadataPaginator) -> Self {
        Self {
            cache,
            paginator,
            latest: AtomicU64::new(0),
        }
    }

    /// Issue a ticket that supersedes every ticket issued before it.
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Enrich `assets` under a freshly issued ticket.
    pub async fn enrich(
        &self,
        assets: Vec<AssetRecord>,
    ) -> Result<Vec<EnrichedAsset>, EnrichError> {
        let ticket = self.issue();
        self.enrich_with(ticket, assets).await
    }

    /// Enrich `assets` and overwrite the catalog cache, provided `ticket` is
    /// still the latest one issued when the result is ready.
    pub async fn enrich_with(
        &self,
        ticket: Ticket,
        assets: Vec<AssetRecord>,
    ) -> Result<Vec<EnrichedAsset>, EnrichError> {
        let metadata = self.load_metadata().await?;
        if metadata.is_empty() {
            return Err(EnrichError::EmptyMetadata);
        }

        let enriched = join_assets(assets, metadata);

        let latest = self.latest.load(Ordering::SeqCst);
        if latest != ticket.0 {
            return Err(EnrichError::Superseded {
                ticket: ticket.0,
                latest,
            });
        }

        self.cache.set(CacheKey::Assets, &enriched);
        info!(
            ticket = ticket.0,
            assets = enriched.len(),
            "Catalog enriched"
        );
        Ok(enriched)
    }

    async fn load_metadata(&self) -> Result<Vec<MetadataRecord>, EnrichError> {
        if let Some(records) = self.cache.get::<Vec<MetadataRecord>>(CacheKey::MetadataPages) {
            debug!(records = records.len(), "Using cached metadata listing");
            return Ok(records);
        }

        let records = self.paginator.try_fetch_all_pages(None).await?;
        if !records.is_empty() {
            self.cache.set(CacheKey::MetadataPages, &records);
        }
        Ok(records)
    }
}

/// Keep the assets that have metadata and attach the derived fields.
///
/// Duplicate metadata for a content id resolves to the last record listed.
pub fn join_assets(assets: Vec<AssetRecord>, metadata: Vec<MetadataRecord>) -> Vec<EnrichedAsset> {
    let lookup: HashMap<String, MetadataRecord> = metadata
        .into_iter()
        .map(|record| (record.content_id.clone(), record))
        .collect();

    assets
        .into_iter()
        .filter_map(|asset| {
            let record = lookup.get(&asset.content_id)?;
            Some(EnrichedAsset {
                hashtags: extract_hashtags(&record.keyvalues),
                published_at: record.keyvalues.get(PUBLISHED_AT_KEY).cloned(),
                asset,
            })
        })
        .collect()
}

/// Keys whose value repeats the key are the provider's free-text tags.
pub fn extract_hashtags(keyvalues: &BTreeMap<String, String>) -> Option<String> {
    let tags: Vec<&str> = keyvalues
        .iter()
        .filter(|(key, value)| key == value)
        .map(|(key, _)| key.as_str())
        .collect();

    (!tags.is_empty()).then(|| tags.join(","))
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;
    use std::time::Duration;

    use super::*;
    use crate::application::pagination::PaginationLimits;
    use crate::application::pagination::tests::{ScriptedProvider, record};
    use crate::cache::CacheConfig;

    fn asset(id: u64, content_id: &str) -> AssetRecord {
        AssetRecord {
            id,
            author: "0xauthor".to_string(),
            content_id: content_id.to_string(),
            title: format!("Post {id}"),
            thumbnail_id: format!("thumb-{id}"),
            description: String::new(),
            price_in_native: 0,
        }
    }

    fn three_assets() -> Vec<AssetRecord> {
        vec![asset(1, "c1"), asset(2, "c2"), asset(3, "c3")]
    }

    fn engine(
        provider: ScriptedProvider,
    ) -> (EnrichmentEngine, Arc<CacheStore>, Arc<ScriptedProvider>) {
        let cache = Arc::new(CacheStore::new(CacheConfig::default()));
        let provider = Arc::new(provider);
        let paginator = MetadataPaginator::new(
            provider.clone(),
            PaginationLimits {
                max_pages: NonZeroU32::new(10).expect("non-zero"),
                fetch_budget: Duration::from_secs(5),
            },
        );
        (
            EnrichmentEngine::new(cache.clone(), paginator),
            cache,
            provider,
        )
    }

    fn two_page_listing() -> ScriptedProvider {
        ScriptedProvider::default()
            .page(
                None,
                vec![record(
                    "c1",
                    &[("web3", "web3"), ("publishedAt", "2024-05-02"), ("lang", "en")],
                )],
                Some("p2"),
            )
            .page(Some("p2"), vec![record("c3", &[("rust", "rust")])], None)
    }

    #[test]
    fn join_keeps_only_assets_with_metadata() {
        let enriched = join_assets(
            three_assets(),
            vec![record("c1", &[]), record("c3", &[]), record("c9", &[])],
        );

        let ids: Vec<&str> = enriched.iter().map(EnrichedAsset::content_id).collect();
        assert_eq!(ids, vec!["c1", "c3"]);
    }

    #[test]
    fn join_attaches_hashtags_and_publish_date() {
        let enriched = join_assets(
            vec![asset(1, "c1")],
            vec![record(
                "c1",
                &[("web3", "web3"), ("art", "art"), ("publishedAt", "2024-05-02")],
            )],
        );

        assert_eq!(enriched[0].hashtags.as_deref(), Some("art,web3"));
        assert_eq!(enriched[0].published_at.as_deref(), Some("2024-05-02"));
    }

    #[test]
    fn duplicate_metadata_resolves_to_last_record() {
        let enriched = join_assets(
            vec![asset(1, "c1")],
            vec![record("c1", &[("old", "old")]), record("c1", &[("new", "new")])],
        );
        assert_eq!(enriched[0].hashtags.as_deref(), Some("new"));
    }

    #[test]
    fn hashtags_absent_without_self_keyed_pairs() {
        let mut keyvalues = BTreeMap::new();
        keyvalues.insert("lang".to_string(), "en".to_string());
        assert_eq!(extract_hashtags(&keyvalues), None);
    }

    #[tokio::test]
    async fn two_page_listing_filters_missing_asset() {
        let (engine, cache, _) = engine(two_page_listing());

        let enriched = engine.enrich(three_assets()).await.expect("enriched");

        let ids: Vec<&str> = enriched.iter().map(EnrichedAsset::content_id).collect();
        assert_eq!(ids, vec!["c1", "c3"]);
        assert_eq!(enriched[0].hashtags.as_deref(), Some("web3"));
        assert_eq!(enriched[1].hashtags.as_deref(), Some("rust"));

        let cached: Vec<EnrichedAsset> = cache.get(CacheKey::Assets).expect("catalog cached");
        assert_eq!(cached, enriched);
        assert!(cache.contains_fresh(CacheKey::MetadataPages));
    }

    #[tokio::test]
    async fn page_failure_leaves_catalog_cache_unchanged() {
        let provider = ScriptedProvider::default()
            .page(None, vec![record("c1", &[])], Some("p2"))
            .failing(Some("p2"));
        let (engine, cache, _) = engine(provider);
        let previous = vec![EnrichedAsset::bare(asset(7, "c7"))];
        cache.set(CacheKey::Assets, &previous);

        let err = engine.enrich(three_assets()).await.expect_err("page 2 fails");

        assert!(matches!(err, EnrichError::Metadata(_)));
        let cached: Vec<EnrichedAsset> = cache.get(CacheKey::Assets).expect("still cached");
        assert_eq!(cached, previous);
        assert!(!cache.contains_fresh(CacheKey::MetadataPages));
    }

    #[tokio::test]
    async fn empty_listing_skips_cache_write() {
        let provider = ScriptedProvider::default().page(None, Vec::new(), None);
        let (engine, cache, _) = engine(provider);

        let err = engine.enrich(three_assets()).await.expect_err("empty listing");

        assert!(matches!(err, EnrichError::EmptyMetadata));
        assert!(cache.get::<Vec<EnrichedAsset>>(CacheKey::Assets).is_none());
        assert!(cache.get::<Vec<MetadataRecord>>(CacheKey::MetadataPages).is_none());
    }

    #[tokio::test]
    async fn repeated_enrichment_is_idempotent() {
        let (engine, cache, _) = engine(two_page_listing());

        engine.enrich(three_assets()).await.expect("first pass");
        let first: Vec<EnrichedAsset> = cache.get(CacheKey::Assets).expect("cached");
        engine.enrich(three_assets()).await.expect("second pass");
        let second: Vec<EnrichedAsset> = cache.get(CacheKey::Assets).expect("cached");

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn fresh_metadata_cache_skips_provider() {
        let (engine, _, provider) = engine(two_page_listing());

        engine.enrich(three_assets()).await.expect("first pass");
        assert_eq!(provider.request_count(), 2);

        engine.enrich(three_assets()).await.expect("second pass");
        assert_eq!(provider.request_count(), 2);
    }

    #[tokio::test]
    async fn superseded_ticket_does_not_write_cache() {
        let (engine, cache, _) = engine(two_page_listing());

        let stale = engine.issue();
        let current = engine.issue();
        assert!(!engine.is_current(stale));
        assert!(engine.is_current(current));

        let err = engine
            .enrich_with(stale, three_assets())
            .await
            .expect_err("superseded");

        assert!(matches!(err, EnrichError::Superseded { ticket: 1, latest: 2 }));
        assert!(cache.get::<Vec<EnrichedAsset>>(CacheKey::Assets).is_none());
    }
}
