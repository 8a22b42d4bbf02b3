//! Metadata provider backed by a Pinata-style pinning service.
//!
//! Lists public files page by page; each file's `cid` is the content id the
//! registry contract points at.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::application::repos::{MetadataError, MetadataProvider};
use crate::config::MetadataSettings;
use crate::domain::entities::{MetadataPage, MetadataRecord};

use super::error::InfraError;

const LIST_PATH: &str = "v3/files/public";

#[derive(Debug, Deserialize)]
struct ListResponse {
    data: ListData,
}

#[derive(Debug, Deserialize)]
struct ListData {
    #[serde(default)]
    files: Vec<PinnedFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PinnedFile {
    cid: String,
    #[serde(default)]
    keyvalues: Option<BTreeMap<String, String>>,
    #[serde(default)]
    created_at: String,
}

impl From<PinnedFile> for MetadataRecord {
    fn from(file: PinnedFile) -> Self {
        Self {
            content_id: file.cid,
            keyvalues: file.keyvalues.unwrap_or_default(),
            created_at: file.created_at,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PinataMetadataProvider {
    client: Client,
    endpoint: Url,
    jwt: String,
    page_limit: u32,
}

impl PinataMetadataProvider {
    pub fn new(settings: &MetadataSettings) -> Result<Self, InfraError> {
        let jwt = settings
            .jwt
            .clone()
            .ok_or_else(|| InfraError::configuration("metadata.jwt is required"))?;
        let endpoint = settings
            .base_url
            .join(LIST_PATH)
            .map_err(|err| InfraError::configuration(format!("invalid metadata.base_url: {err}")))?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            jwt,
            page_limit: settings.page_limit.get(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("inkchain/", env!("CARGO_PKG_VERSION"))
    }

    fn page_url(&self, cursor: Option<&str>) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &self.page_limit.to_string());
            if let Some(token) = cursor {
                query.append_pair("pageToken", token);
            }
        }
        url
    }
}

fn parse_listing(bytes: &[u8]) -> Result<MetadataPage, MetadataError> {
    let response: ListResponse =
        serde_json::from_slice(bytes).map_err(|err| MetadataError::Decode(err.to_string()))?;
    Ok(MetadataPage {
        items: response
            .data
            .files
            .into_iter()
            .map(MetadataRecord::from)
            .collect(),
        next_page_token: response.data.next_page_token,
    })
}

#[async_trait]
impl MetadataProvider for PinataMetadataProvider {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<MetadataPage, MetadataError> {
        let response = self
            .client
            .get(self.page_url(cursor))
            .bearer_auth(&self.jwt)
            .send()
            .await
            .map_err(MetadataError::transport)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(MetadataError::transport)?;
        if !status.is_success() {
            return Err(MetadataError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        parse_listing(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;
    use std::time::Duration;

    use super::*;

    fn settings(jwt: Option<&str>) -> MetadataSettings {
        MetadataSettings {
            base_url: Url::parse("https://pins.example.test/").expect("valid url"),
            jwt: jwt.map(str::to_string),
            page_limit: NonZeroU32::new(25).expect("non-zero"),
            max_pages: NonZeroU32::new(5).expect("non-zero"),
            fetch_budget: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn requires_jwt() {
        let err = PinataMetadataProvider::new(&settings(None)).expect_err("missing jwt");
        assert!(matches!(err, InfraError::Configuration { .. }));
    }

    #[test]
    fn page_url_carries_limit_and_cursor() {
        let provider = PinataMetadataProvider::new(&settings(Some("token"))).expect("provider");

        assert_eq!(
            provider.page_url(None).as_str(),
            "https://pins.example.test/v3/files/public?limit=25"
        );
        assert_eq!(
            provider.page_url(Some("abc=")).as_str(),
            "https://pins.example.test/v3/files/public?limit=25&pageToken=abc%3D"
        );
    }

    #[test]
    fn parses_listing_page() {
        let body = br#"{
            "data": {
                "files": [
                    {
                        "id": "f1",
                        "cid": "bafy1",
                        "keyvalues": { "web3": "web3", "publishedAt": "2024-05-02" },
                        "created_at": "2024-05-01T10:00:00Z"
                    },
                    {
                        "id": "f2",
                        "cid": "bafy2",
                        "keyvalues": null,
                        "created_at": "2024-05-03T10:00:00Z"
                    }
                ],
                "next_page_token": "MDE5"
            }
        }"#;

        let page = parse_listing(body).expect("valid listing");

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].content_id, "bafy1");
        assert_eq!(page.items[0].keyvalues.get("web3").map(String::as_str), Some("web3"));
        assert!(page.items[1].keyvalues.is_empty());
        assert_eq!(page.next_cursor(), Some("MDE5"));
    }

    #[test]
    fn last_page_has_no_cursor() {
        let page = parse_listing(br#"{ "data": { "files": [] } }"#).expect("valid listing");
        assert!(page.items.is_empty());
        assert_eq!(page.next_cursor(), None);
    }

    #[test]
    fn malformed_listing_is_a_decode_error() {
        let err = parse_listing(b"<html>").expect_err("not json");
        assert!(matches!(err, MetadataError::Decode(_)));
    }
}
