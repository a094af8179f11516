use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lyrics_library::application::repos::{
    CacheError, LyricsError, LyricsProvider, LyricsTranslator, RepoError, TrackCache, TrackStore,
    TranslateError,
};
use lyrics_library::application::tracks::TrackService;
use lyrics_library::application::warmup::{
    CacheWarmJob, WarmSubmit, WarmupConfig, spawn_cache_warmer,
};
use lyrics_library::cache::{CacheConfig, MemoryTrackCache};
use lyrics_library::domain::track::{NewTrack, Track};
use metrics_util::debugging::DebuggingRecorder;
use time::OffsetDateTime;
use uuid::Uuid;

fn sample(title: &str) -> Track {
    Track {
        id: Uuid::new_v4(),
        artist: "Juice WRLD".to_string(),
        title: title.to_string(),
        lyrics: vec!["line one".to_string()],
        translation: vec!["строка один".to_string()],
        created_at: OffsetDateTime::now_utc(),
    }
}

struct NoLyrics;

#[async_trait]
impl LyricsProvider for NoLyrics {
    async fn lyrics(&self, _: &str, _: &str) -> Result<Vec<String>, LyricsError> {
        Err(LyricsError::NotFound)
    }
}

struct NoTranslation;

#[async_trait]
impl LyricsTranslator for NoTranslation {
    async fn translate(&self, _: &[String]) -> Result<Vec<String>, TranslateError> {
        Err(TranslateError::failed("disabled"))
    }
}

struct SingleTrackStore(Track);

#[async_trait]
impl TrackStore for SingleTrackStore {
    async fn save_track(&self, _: NewTrack) -> Result<Track, RepoError> {
        Ok(self.0.clone())
    }

    async fn find_track(&self, artist: &str, title: &str) -> Result<Track, RepoError> {
        if self.0.artist == artist && self.0.title == title {
            Ok(self.0.clone())
        } else {
            Err(RepoError::TrackNotFound)
        }
    }

    async fn list_by_artist(&self, _: &str) -> Result<Vec<Track>, RepoError> {
        Ok(vec![self.0.clone()])
    }

    async fn delete_track(&self, _: &str) -> Result<(), RepoError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

struct UnavailableCache;

#[async_trait]
impl TrackCache for UnavailableCache {
    async fn save_track(&self, _: &Track) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("down".to_string()))
    }

    async fn save_artist_tracks(&self, _: &str, _: &[Track]) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("down".to_string()))
    }

    async fn track(&self, _: &str, _: &str) -> Result<Option<Track>, CacheError> {
        Err(CacheError::Unavailable("down".to_string()))
    }

    async fn artist_tracks(&self, _: &str) -> Result<Option<Vec<Track>>, CacheError> {
        Err(CacheError::Unavailable("down".to_string()))
    }
}

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    // Eviction
    let small = MemoryTrackCache::new(&CacheConfig {
        track_limit: 1,
        ..Default::default()
    });
    small.put_track(sample("first"));
    small.put_track(sample("second"));

    // Hit, miss and a successful warm write
    let cache = Arc::new(MemoryTrackCache::new(&CacheConfig::default()));
    let cached = sample("Lucid Dreams");
    cache.put_track(cached.clone());
    let (queue, worker) = spawn_cache_warmer(&WarmupConfig::default(), cache.clone());
    let service = TrackService::new(
        Arc::new(NoLyrics),
        Arc::new(NoTranslation),
        Arc::new(SingleTrackStore(sample("Robbery"))),
        cache,
        queue,
    );

    service
        .track(&cached.artist, &cached.title)
        .await
        .expect("cache hit");
    service
        .track("Juice WRLD", "Robbery")
        .await
        .expect("store fallback");

    let report = worker.shutdown(Duration::from_secs(1)).await;
    assert_eq!(report.completed, 1);

    // Failed warm write, then a submission after shutdown
    let (failing_queue, failing_worker) =
        spawn_cache_warmer(&WarmupConfig::default(), Arc::new(UnavailableCache));
    assert_eq!(
        failing_queue.submit(CacheWarmJob::Track(sample("Wishing Well"))),
        WarmSubmit::Queued
    );
    let report = failing_worker.shutdown(Duration::from_secs(1)).await;
    assert_eq!(report.failed, 1);
    assert_eq!(
        failing_queue.submit(CacheWarmJob::Track(sample("Legends"))),
        WarmSubmit::Closed
    );

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "lyrics_cache_hit_total",
        "lyrics_cache_miss_total",
        "lyrics_cache_evict_total",
        "lyrics_cache_warm_dropped_total",
        "lyrics_cache_warm_failed_total",
        "lyrics_cache_warm_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
