//! Exhaustive walk over the metadata provider's cursor-paged listing.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::application::repos::{MetadataError, MetadataProvider};
use crate::domain::entities::MetadataRecord;

const DEFAULT_MAX_PAGES: u32 = 50;
const DEFAULT_FETCH_BUDGET_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("page {page} failed: {source}")]
    Page {
        page: u32,
        #[source]
        source: MetadataError,
    },
    #[error("provider still had pages after {max_pages} requests")]
    PageLimitExceeded { max_pages: u32 },
    #[error("listing did not finish within {budget:?}")]
    BudgetExceeded { budget: Duration },
    #[error("provider returned cursor `{cursor}` for the page it was requested with")]
    CursorLoop { cursor: String },
}

/// Ceilings applied to a single walk.
#[derive(Debug, Clone, Copy)]
pub struct PaginationLimits {
    pub max_pages: NonZeroU32,
    pub fetch_budget: Duration,
}

impl Default for PaginationLimits {
    fn default() -> Self {
        Self {
            max_pages: NonZeroU32::new(DEFAULT_MAX_PAGES).unwrap_or(NonZeroU32::MIN),
            fetch_budget: Duration::from_secs(DEFAULT_FETCH_BUDGET_SECS),
        }
    }
}

impl From<&crate::config::MetadataSettings> for PaginationLimits {
    fn from(settings: &crate::config::MetadataSettings) -> Self {
        Self {
            max_pages: settings.max_pages,
            fetch_budget: settings.fetch_budget,
        }
    }
}

/// Sequential page walker.
///
/// Pages are requested strictly in cursor order. A walk either yields every
/// record the provider listed or fails as a whole; callers never see a partial
/// listing.
#[derive(Clone)]
pub struct MetadataPaginator {
    provider: Arc<dyn MetadataProvider>,
    limits: PaginationLimits,
}

impl MetadataPaginator {
    pub fn new(provider: Arc<dyn MetadataProvider>, limits: PaginationLimits) -> Self {
        Self { provider, limits }
    }

    pub fn limits(&self) -> PaginationLimits {
        self.limits
    }

    /// Walk every page starting at `cursor`, degrading any failure to an empty list.
    pub async fn fetch_all_pages(&self, cursor: Option<&str>) -> Vec<MetadataRecord> {
        match self.try_fetch_all_pages(cursor).await {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "Metadata listing aborted");
                Vec::new()
            }
        }
    }

    /// Walk every page starting at `cursor`.
    pub async fn try_fetch_all_pages(
        &self,
        cursor: Option<&str>,
    ) -> Result<Vec<MetadataRecord>, PaginationError> {
        let budget = self.limits.fetch_budget;
        timeout(budget, self.walk(cursor.map(str::to_string)))
            .await
            .unwrap_or(Err(PaginationError::BudgetExceeded { budget }))
    }

    async fn walk(
        &self,
        mut cursor: Option<String>,
    ) -> Result<Vec<MetadataRecord>, PaginationError> {
        let max_pages = self.limits.max_pages.get();
        let mut records = Vec::new();
        let mut pages = 0u32;

        loop {
            if pages == max_pages {
                return Err(PaginationError::PageLimitExceeded { max_pages });
            }
            pages += 1;

            let page = self
                .provider
                .fetch_page(cursor.as_deref())
                .await
                .map_err(|source| PaginationError::Page {
                    page: pages,
                    source,
                })?;

            debug!(
                page = pages,
                records = page.items.len(),
                has_next = page.next_cursor().is_some(),
                "Fetched metadata page"
            );

            let next = page.next_cursor().map(str::to_string);
            records.extend(page.items);

            match next {
                None => break,
                Some(token) if cursor.as_deref() == Some(token.as_str()) => {
                    return Err(PaginationError::CursorLoop { cursor: token });
                }
                Some(token) => cursor = Some(token),
            }
        }

        debug!(pages, records = records.len(), "Metadata listing complete");
        Ok(records)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::entities::MetadataPage;

    pub(crate) fn record(content_id: &str, keyvalues: &[(&str, &str)]) -> MetadataRecord {
        MetadataRecord {
            content_id: content_id.to_string(),
            keyvalues: keyvalues
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect::<BTreeMap<_, _>>(),
            created_at: "2024-05-01T10:00:00Z".to_string(),
        }
    }

    /// Provider serving canned pages keyed by cursor, recording each request.
    #[derive(Default)]
    pub(crate) struct ScriptedProvider {
        pages: HashMap<Option<String>, Result<MetadataPage, String>>,
        pub(crate) requests: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedProvider {
        pub(crate) fn page(
            mut self,
            cursor: Option<&str>,
            items: Vec<MetadataRecord>,
            next: Option<&str>,
        ) -> Self {
            self.pages.insert(
                cursor.map(str::to_string),
                Ok(MetadataPage {
                    items,
                    next_page_token: next.map(str::to_string),
                }),
            );
            self
        }

        pub(crate) fn failing(mut self, cursor: Option<&str>) -> Self {
            self.pages
                .insert(cursor.map(str::to_string), Err("boom".to_string()));
            self
        }

        pub(crate) fn request_count(&self) -> usize {
            self.requests.lock().expect("requests lock").len()
        }
    }

    #[async_trait]
    impl MetadataProvider for ScriptedProvider {
        async fn fetch_page(&self, cursor: Option<&str>) -> Result<MetadataPage, MetadataError> {
            self.requests
                .lock()
                .expect("requests lock")
                .push(cursor.map(str::to_string));
            match self.pages.get(&cursor.map(str::to_string)) {
                Some(Ok(page)) => Ok(page.clone()),
                Some(Err(message)) => Err(MetadataError::transport(message)),
                None => Err(MetadataError::Status {
                    status: 404,
                    body: "unknown cursor".to_string(),
                }),
            }
        }
    }

    /// Provider that always claims another page exists.
    struct EndlessProvider;

    #[async_trait]
    impl MetadataProvider for EndlessProvider {
        async fn fetch_page(&self, cursor: Option<&str>) -> Result<MetadataPage, MetadataError> {
            let next = cursor
                .and_then(|value| value.parse::<u64>().ok())
                .map_or(1, |value| value + 1);
            Ok(MetadataPage {
                items: vec![record(&format!("c{next}"), &[])],
                next_page_token: Some(next.to_string()),
            })
        }
    }

    /// Provider that never answers.
    struct StalledProvider;

    #[async_trait]
    impl MetadataProvider for StalledProvider {
        async fn fetch_page(&self, _cursor: Option<&str>) -> Result<MetadataPage, MetadataError> {
            std::future::pending().await
        }
    }

    fn limits(max_pages: u32) -> PaginationLimits {
        PaginationLimits {
            max_pages: NonZeroU32::new(max_pages).expect("non-zero"),
            fetch_budget: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn walks_pages_in_cursor_order() {
        let provider = Arc::new(
            ScriptedProvider::default()
                .page(None, vec![record("c1", &[])], Some("p2"))
                .page(Some("p2"), vec![record("c3", &[])], None),
        );
        let paginator = MetadataPaginator::new(provider.clone(), limits(10));

        let records = paginator.fetch_all_pages(None).await;

        let ids: Vec<&str> = records.iter().map(|r| r.content_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);
        assert_eq!(
            *provider.requests.lock().expect("requests lock"),
            vec![None, Some("p2".to_string())]
        );
    }

    #[tokio::test]
    async fn starts_from_supplied_cursor() {
        let provider = Arc::new(ScriptedProvider::default().page(
            Some("p2"),
            vec![record("c3", &[])],
            None,
        ));
        let paginator = MetadataPaginator::new(provider, limits(10));

        let records = paginator.fetch_all_pages(Some("p2")).await;
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn failure_on_any_page_yields_empty_list() {
        let provider = Arc::new(
            ScriptedProvider::default()
                .page(None, vec![record("c1", &[])], Some("p2"))
                .failing(Some("p2")),
        );
        let paginator = MetadataPaginator::new(provider.clone(), limits(10));

        assert!(paginator.fetch_all_pages(None).await.is_empty());

        let err = paginator
            .try_fetch_all_pages(None)
            .await
            .expect_err("second page fails");
        assert!(matches!(err, PaginationError::Page { page: 2, .. }));
    }

    #[tokio::test]
    async fn page_ceiling_stops_endless_provider() {
        let paginator = MetadataPaginator::new(Arc::new(EndlessProvider), limits(3));

        let err = paginator
            .try_fetch_all_pages(None)
            .await
            .expect_err("ceiling reached");
        assert!(matches!(
            err,
            PaginationError::PageLimitExceeded { max_pages: 3 }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn time_budget_stops_stalled_provider() {
        let paginator = MetadataPaginator::new(Arc::new(StalledProvider), limits(10));

        let err = paginator
            .try_fetch_all_pages(None)
            .await
            .expect_err("budget exhausted");
        assert!(matches!(err, PaginationError::BudgetExceeded { .. }));
    }

    #[tokio::test]
    async fn repeated_cursor_is_rejected() {
        let provider = Arc::new(
            ScriptedProvider::default()
                .page(None, vec![record("c1", &[])], Some("p2"))
                .page(Some("p2"), vec![record("c2", &[])], Some("p2")),
        );
        let paginator = MetadataPaginator::new(provider.clone(), limits(10));

        let err = paginator
            .try_fetch_all_pages(None)
            .await
            .expect_err("loop detected");
        assert!(matches!(err, PaginationError::CursorLoop { ref cursor } if cursor == "p2"));
        assert_eq!(provider.request_count(), 2);
    }
}
