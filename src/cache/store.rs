//! In-process LRU implementation of [`TrackCache`].
//!
//! Two independent maps: single tracks keyed by (`artist`, `title`) and
//! per-artist listings. Entries expire after the configured TTL and are evicted
//! lazily on read.

use std::{
    hash::Hash,
    sync::Mutex,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;

use crate::application::repos::{CacheError, TrackCache};
use crate::domain::track::{Track, TrackKey};

use super::config::CacheConfig;
use super::lock::lock_map;

const SOURCE: &str = "cache::store";
pub(crate) const METRIC_EVICT: &str = "lyrics_cache_evict_total";

struct Entry<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Entry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

// ============================================================================
// Track cache
// ============================================================================

pub struct MemoryTrackCache {
    tracks: Mutex<LruCache<TrackKey, Entry<Track>>>,
    artists: Mutex<LruCache<String, Entry<Vec<Track>>>>,
    ttl: Duration,
}

impl MemoryTrackCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            tracks: Mutex::new(LruCache::new(config.track_limit_non_zero())),
            artists: Mutex::new(LruCache::new(config.artist_limit_non_zero())),
            ttl: config.ttl(),
        }
    }

    pub fn get_track(&self, artist: &str, title: &str) -> Option<Track> {
        let mut tracks = lock_map(&self.tracks, SOURCE, "get_track");
        fresh(&mut tracks, &TrackKey::new(artist, title))
    }

    pub fn put_track(&self, track: Track) {
        let entry = self.entry(track);
        let mut tracks = lock_map(&self.tracks, SOURCE, "put_track");
        insert(&mut tracks, entry.value.key(), entry, "tracks");
    }

    pub fn get_artist(&self, artist: &str) -> Option<Vec<Track>> {
        let mut artists = lock_map(&self.artists, SOURCE, "get_artist");
        fresh(&mut artists, &artist.to_string())
    }

    pub fn put_artist(&self, artist: &str, tracks: Vec<Track>) {
        let entry = self.entry(tracks);
        let mut artists = lock_map(&self.artists, SOURCE, "put_artist");
        insert(&mut artists, artist.to_string(), entry, "artists");
    }

    pub fn len(&self) -> usize {
        lock_map(&self.tracks, SOURCE, "len").len() + lock_map(&self.artists, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry<T>(&self, value: T) -> Entry<T> {
        Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        }
    }
}

fn fresh<K, T>(map: &mut LruCache<K, Entry<T>>, key: &K) -> Option<T>
where
    K: Hash + Eq,
    T: Clone,
{
    let expired = match map.get(key) {
        Some(entry) if !entry.is_expired(Instant::now()) => return Some(entry.value.clone()),
        Some(_) => true,
        None => false,
    };
    if expired {
        map.pop(key);
    }
    None
}

fn insert<K, T>(map: &mut LruCache<K, Entry<T>>, key: K, entry: Entry<T>, kind: &'static str)
where
    K: Hash + Eq + Clone,
{
    let inserted = key.clone();
    if let Some((evicted, _)) = map.push(key, entry)
        && evicted != inserted
    {
        counter!(METRIC_EVICT, "map" => kind).increment(1);
    }
}

#[async_trait]
impl TrackCache for MemoryTrackCache {
    async fn save_track(&self, track: &Track) -> Result<(), CacheError> {
        self.put_track(track.clone());
        Ok(())
    }

    async fn save_artist_tracks(&self, artist: &str, tracks: &[Track]) -> Result<(), CacheError> {
        self.put_artist(artist, tracks.to_vec());
        Ok(())
    }

    async fn track(&self, artist: &str, title: &str) -> Result<Option<Track>, CacheError> {
        Ok(self.get_track(artist, title))
    }

    async fn artist_tracks(&self, artist: &str) -> Result<Option<Vec<Track>>, CacheError> {
        Ok(self.get_artist(artist))
    }
}
