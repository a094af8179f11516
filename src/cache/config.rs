//! In-process track cache configuration.

use std::{num::NonZeroUsize, time::Duration};

const DEFAULT_TRACK_LIMIT: usize = 1000;
const DEFAULT_ARTIST_LIMIT: usize = 200;
const DEFAULT_TTL_SECONDS: u64 = 60 * 60;

/// Sizes and lifetime of the track cache (`[cache]` section).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum single-track entries.
    pub track_limit: usize,
    /// Maximum per-artist listings.
    pub artist_limit: usize,
    /// Entry lifetime in seconds; bounds staleness after a store-side delete.
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            track_limit: DEFAULT_TRACK_LIMIT,
            artist_limit: DEFAULT_ARTIST_LIMIT,
            ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            track_limit: settings.track_limit,
            artist_limit: settings.artist_limit,
            ttl_seconds: settings.ttl.as_secs(),
        }
    }
}

impl CacheConfig {
    /// Track limit as NonZeroUsize, clamping to 1 if zero.
    pub fn track_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.track_limit).unwrap_or(NonZeroUsize::MIN)
    }

    /// Artist limit as NonZeroUsize, clamping to 1 if zero.
    pub fn artist_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.artist_limit).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}
