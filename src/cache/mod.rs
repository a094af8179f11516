//! In-process track cache.
//!
//! Backs the [`TrackCache`](crate::application::repos::TrackCache) capability
//! with two bounded LRU maps:
//!
//! - **tracks**: single tracks keyed by (`artist`, `title`)
//! - **artists**: full per-artist listings
//!
//! Configured through the `[cache]` section:
//!
//! ```toml
//! [cache]
//! track_limit = 1000
//! artist_limit = 200
//! ttl_seconds = 3600
//! ```

mod config;
mod lock;
mod store;

pub use config::CacheConfig;
pub use store::MemoryTrackCache;

pub(crate) use store::METRIC_EVICT;
