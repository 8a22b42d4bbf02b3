//! Cache key definitions.
//!
//! The keyspace is closed: every entry the catalog layer stores lives under one
//! of the [`CacheKey`] variants, so the store never needs an eviction policy.

use std::fmt;

/// Named slot in the [`CacheStore`](super::CacheStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The enriched, filtered asset catalog.
    Assets,
    /// The flattened metadata listing gathered from every provider page.
    MetadataPages,
}

/// Expiry class of a key. Each class carries its own TTL in [`CacheConfig`](super::CacheConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    Catalog,
    Metadata,
}

impl CacheKey {
    pub const ALL: [CacheKey; 2] = [CacheKey::Assets, CacheKey::MetadataPages];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKey::Assets => "ASSETS",
            CacheKey::MetadataPages => "METADATA_PAGES",
        }
    }

    pub fn class(&self) -> KeyClass {
        match self {
            CacheKey::Assets => KeyClass::Catalog,
            CacheKey::MetadataPages => KeyClass::Metadata,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_are_stable() {
        assert_eq!(CacheKey::Assets.as_str(), "ASSETS");
        assert_eq!(CacheKey::MetadataPages.to_string(), "METADATA_PAGES");
    }

    #[test]
    fn every_key_has_a_class() {
        let classes: Vec<KeyClass> = CacheKey::ALL.iter().map(CacheKey::class).collect();
        assert_eq!(classes, vec![KeyClass::Catalog, KeyClass::Metadata]);
    }
}
