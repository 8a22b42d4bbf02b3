//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

mod cli;

pub use cli::{CatalogArgs, CliArgs, Command, LibraryArgs, SyncOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "inkchain";
const DEFAULT_CACHE_ASSETS_TTL_SECS: u64 = 60;
const DEFAULT_CACHE_METADATA_TTL_SECS: u64 = 60;
const DEFAULT_METADATA_BASE_URL: &str = "https://api.pinata.cloud/";
const DEFAULT_METADATA_PAGE_LIMIT: u64 = 100;
const DEFAULT_METADATA_MAX_PAGES: u64 = 50;
const DEFAULT_METADATA_FETCH_BUDGET_SECS: u64 = 30;
const DEFAULT_METADATA_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CHAIN_SNAPSHOT_PATH: &str = "chain-snapshot.json";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub metadata: MetadataSettings,
    pub chain: ChainSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub assets_ttl: Duration,
    pub metadata_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct MetadataSettings {
    pub base_url: Url,
    pub jwt: Option<String>,
    pub page_limit: NonZeroU32,
    pub max_pages: NonZeroU32,
    pub fetch_budget: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub snapshot_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("INKCHAIN").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Catalog(args)) => raw.apply_sync_overrides(&args.overrides),
        Some(Command::Library(args)) => raw.apply_sync_overrides(&args.overrides),
        None => raw.apply_sync_overrides(&SyncOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    metadata: RawMetadataSettings,
    chain: RawChainSettings,
}

impl RawSettings {
    fn apply_sync_overrides(&mut self, overrides: &SyncOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.metadata_base_url.as_ref() {
            self.metadata.base_url = Some(url.clone());
        }
        if let Some(jwt) = overrides.metadata_jwt.as_ref() {
            self.metadata.jwt = Some(jwt.clone());
        }
        if let Some(max) = overrides.metadata_max_pages {
            self.metadata.max_pages = Some(max.into());
        }
        if let Some(path) = overrides.chain_snapshot.as_ref() {
            self.chain.snapshot_path = Some(path.clone());
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            cache,
            metadata,
            chain,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            cache: build_cache_settings(cache)?,
            metadata: build_metadata_settings(metadata)?,
            chain: build_chain_settings(chain)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let assets_ttl = positive_seconds(
        cache
            .assets_ttl_seconds
            .unwrap_or(DEFAULT_CACHE_ASSETS_TTL_SECS),
        "cache.assets_ttl_seconds",
    )?;
    let metadata_ttl = positive_seconds(
        cache
            .metadata_ttl_seconds
            .unwrap_or(DEFAULT_CACHE_METADATA_TTL_SECS),
        "cache.metadata_ttl_seconds",
    )?;

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        assets_ttl,
        metadata_ttl,
    })
}

fn build_metadata_settings(
    metadata: RawMetadataSettings,
) -> Result<MetadataSettings, LoadError> {
    let raw_url = metadata
        .base_url
        .unwrap_or_else(|| DEFAULT_METADATA_BASE_URL.to_string());
    let mut base_url = Url::parse(raw_url.trim())
        .map_err(|err| LoadError::invalid("metadata.base_url", format!("invalid URL: {err}")))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "metadata.base_url",
            "scheme must be http or https",
        ));
    }
    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }

    let jwt = metadata.jwt.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let page_limit = non_zero_u32(
        metadata.page_limit.unwrap_or(DEFAULT_METADATA_PAGE_LIMIT),
        "metadata.page_limit",
    )?;
    let max_pages = non_zero_u32(
        metadata.max_pages.unwrap_or(DEFAULT_METADATA_MAX_PAGES),
        "metadata.max_pages",
    )?;
    let fetch_budget = positive_seconds(
        metadata
            .fetch_budget_seconds
            .unwrap_or(DEFAULT_METADATA_FETCH_BUDGET_SECS),
        "metadata.fetch_budget_seconds",
    )?;
    let request_timeout = positive_seconds(
        metadata
            .request_timeout_seconds
            .unwrap_or(DEFAULT_METADATA_REQUEST_TIMEOUT_SECS),
        "metadata.request_timeout_seconds",
    )?;

    Ok(MetadataSettings {
        base_url,
        jwt,
        page_limit,
        max_pages,
        fetch_budget,
        request_timeout,
    })
}

fn build_chain_settings(chain: RawChainSettings) -> Result<ChainSettings, LoadError> {
    let snapshot_path = chain
        .snapshot_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CHAIN_SNAPSHOT_PATH));
    if snapshot_path.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "chain.snapshot_path",
            "path must not be empty",
        ));
    }

    Ok(ChainSettings { snapshot_path })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    assets_ttl_seconds: Option<u64>,
    metadata_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMetadataSettings {
    base_url: Option<String>,
    jwt: Option<String>,
    page_limit: Option<u64>,
    max_pages: Option<u64>,
    fetch_budget_seconds: Option<u64>,
    request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawChainSettings {
    snapshot_path: Option<PathBuf>,
}

fn positive_seconds(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
