//! Inkchain Cache System
//!
//! A session-scoped keyed store with per-key-class expiry, shared by the
//! catalog and library views:
//!
//! - **`ASSETS`**: the enriched, filtered catalog
//! - **`METADATA_PAGES`**: the flattened off-chain metadata listing
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `inkchain.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! assets_ttl_seconds = 60
//! metadata_ttl_seconds = 60
//! ```

mod config;
mod keys;
mod lock;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use keys::{CacheKey, KeyClass};
pub use store::CacheStore;
pub use trigger::{CacheTrigger, InvalidationEvent, MutationKind};
