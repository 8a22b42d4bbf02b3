//! Cache configuration.
//!
//! Controls whether the catalog cache is active and how long each key class
//! stays fresh. Populated from the `[cache]` section of `inkchain.toml`.

use std::time::Duration;

use super::keys::{CacheKey, KeyClass};

const DEFAULT_ASSETS_TTL_SECS: u64 = 60;
const DEFAULT_METADATA_TTL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Enable the catalog cache. When disabled every read misses.
    pub enabled: bool,
    /// Maximum age of the enriched catalog entry.
    pub assets_ttl: Duration,
    /// Maximum age of the flattened metadata listing.
    pub metadata_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            assets_ttl: Duration::from_secs(DEFAULT_ASSETS_TTL_SECS),
            metadata_ttl: Duration::from_secs(DEFAULT_METADATA_TTL_SECS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            assets_ttl: settings.assets_ttl,
            metadata_ttl: settings.metadata_ttl,
        }
    }
}

impl CacheConfig {
    /// TTL applied to `key`, resolved through its expiry class.
    pub fn ttl_for(&self, key: CacheKey) -> Duration {
        match key.class() {
            KeyClass::Catalog => self.assets_ttl,
            KeyClass::Metadata => self.metadata_ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.assets_ttl, Duration::from_secs(60));
        assert_eq!(config.metadata_ttl, Duration::from_secs(60));
    }

    #[test]
    fn ttl_follows_key_class() {
        let config = CacheConfig {
            assets_ttl: Duration::from_secs(5),
            metadata_ttl: Duration::from_secs(30),
            ..Default::default()
        };
        assert_eq!(config.ttl_for(CacheKey::Assets), Duration::from_secs(5));
        assert_eq!(
            config.ttl_for(CacheKey::MetadataPages),
            Duration::from_secs(30)
        );
    }
}
