//! Bounded background queue for best-effort cache population.
//!
//! Read and write paths hand finished tracks to a [`CacheWarmQueue`] and return
//! to their caller immediately. A single dispatcher task pulls jobs off the
//! channel and runs at most `concurrency` cache writes at once, each under its
//! own timeout. A full queue drops the job, a failed write is logged, and
//! nothing is retried.
//!
//! [`CacheWarmWorker::shutdown`] is the drain contract: the queue stops
//! accepting jobs, everything already queued is written, and whatever is still
//! running when the grace period ends is aborted and reported as abandoned.

use std::{
    num::NonZeroUsize,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use metrics::{counter, histogram};
use tokio::{
    sync::{OwnedSemaphorePermit, Semaphore, mpsc, oneshot},
    task::{JoinError, JoinHandle, JoinSet},
};
use tracing::{debug, info, warn};

use crate::application::repos::{CacheError, TrackCache};
use crate::domain::track::Track;

const SOURCE: &str = "application::warmup";
const DEFAULT_QUEUE_CAPACITY: usize = 256;
const DEFAULT_CONCURRENCY: usize = 4;
const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(2);

pub(crate) const METRIC_WARM_DROPPED: &str = "lyrics_cache_warm_dropped_total";
pub(crate) const METRIC_WARM_FAILED: &str = "lyrics_cache_warm_failed_total";
pub(crate) const METRIC_WARM_MS: &str = "lyrics_cache_warm_ms";

/// A single cache write.
#[derive(Debug, Clone)]
pub enum CacheWarmJob {
    Track(Track),
    ArtistTracks { artist: String, tracks: Vec<Track> },
}

impl CacheWarmJob {
    fn kind(&self) -> &'static str {
        match self {
            CacheWarmJob::Track(_) => "track",
            CacheWarmJob::ArtistTracks { .. } => "artist_tracks",
        }
    }

    fn artist(&self) -> &str {
        match self {
            CacheWarmJob::Track(track) => &track.artist,
            CacheWarmJob::ArtistTracks { artist, .. } => artist,
        }
    }

    async fn write(&self, cache: &dyn TrackCache) -> Result<(), CacheError> {
        match self {
            CacheWarmJob::Track(track) => cache.save_track(track).await,
            CacheWarmJob::ArtistTracks { artist, tracks } => {
                cache.save_artist_tracks(artist, tracks).await
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct WarmupConfig {
    pub queue_capacity: NonZeroUsize,
    pub concurrency: NonZeroUsize,
    pub task_timeout: Duration,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            queue_capacity: NonZeroUsize::new(DEFAULT_QUEUE_CAPACITY)
                .unwrap_or(NonZeroUsize::MIN),
            concurrency: NonZeroUsize::new(DEFAULT_CONCURRENCY).unwrap_or(NonZeroUsize::MIN),
            task_timeout: DEFAULT_TASK_TIMEOUT,
        }
    }
}

impl From<&crate::config::WarmupSettings> for WarmupConfig {
    fn from(settings: &crate::config::WarmupSettings) -> Self {
        Self {
            queue_capacity: settings.queue_capacity,
            concurrency: settings.concurrency,
            task_timeout: settings.task_timeout,
        }
    }
}

/// Outcome of [`CacheWarmQueue::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmSubmit {
    Queued,
    /// The queue was full; the job was discarded.
    Dropped,
    /// The worker is shutting down or gone.
    Closed,
}

/// Counts reported once the worker has drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub completed: usize,
    pub failed: usize,
    pub abandoned: usize,
}

#[derive(Debug, Default)]
struct WarmStats {
    accepted: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl WarmStats {
    fn report(&self) -> DrainReport {
        let accepted = self.accepted.load(Ordering::SeqCst);
        let completed = self.completed.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);
        DrainReport {
            completed,
            failed,
            abandoned: accepted.saturating_sub(completed + failed),
        }
    }
}

/// Cheap, cloneable submission handle.
#[derive(Clone)]
pub struct CacheWarmQueue {
    sender: mpsc::Sender<CacheWarmJob>,
    stats: Arc<WarmStats>,
}

impl CacheWarmQueue {
    /// Hand a job to the worker without waiting.
    pub fn submit(&self, job: CacheWarmJob) -> WarmSubmit {
        match self.sender.try_send(job) {
            Ok(()) => {
                self.stats.accepted.fetch_add(1, Ordering::SeqCst);
                WarmSubmit::Queued
            }
            Err(mpsc::error::TrySendError::Full(job)) => {
                counter!(METRIC_WARM_DROPPED, "reason" => "full").increment(1);
                warn!(
                    target = SOURCE,
                    job = job.kind(),
                    artist = job.artist(),
                    "cache warm queue full; dropping job"
                );
                WarmSubmit::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                counter!(METRIC_WARM_DROPPED, "reason" => "closed").increment(1);
                debug!(
                    target = SOURCE,
                    job = job.kind(),
                    artist = job.artist(),
                    "cache warm queue closed; dropping job"
                );
                WarmSubmit::Closed
            }
        }
    }
}

/// Owner of the dispatcher task.
pub struct CacheWarmWorker {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
    stats: Arc<WarmStats>,
}

/// Start the dispatcher and return the submission handle alongside its owner.
pub fn spawn_cache_warmer(
    config: &WarmupConfig,
    cache: Arc<dyn TrackCache>,
) -> (CacheWarmQueue, CacheWarmWorker) {
    let (sender, receiver) = mpsc::channel(config.queue_capacity.get());
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let stats = Arc::new(WarmStats::default());

    let dispatcher = Dispatcher {
        cache,
        permits: Arc::new(Semaphore::new(config.concurrency.get())),
        task_timeout: config.task_timeout,
        stats: stats.clone(),
    };
    let handle = tokio::spawn(dispatcher.run(receiver, shutdown_rx));

    info!(
        target = SOURCE,
        queue_capacity = config.queue_capacity.get(),
        concurrency = config.concurrency.get(),
        task_timeout_ms = config.task_timeout.as_millis() as u64,
        "cache warm worker started"
    );

    (
        CacheWarmQueue {
            sender,
            stats: stats.clone(),
        },
        CacheWarmWorker {
            shutdown: Some(shutdown_tx),
            handle,
            stats,
        },
    )
}

impl CacheWarmWorker {
    /// Stop accepting jobs, finish the queued ones, and wait at most `grace`.
    pub async fn shutdown(mut self, grace: Duration) -> DrainReport {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        if tokio::time::timeout(grace, &mut self.handle).await.is_err() {
            self.handle.abort();
            let _ = (&mut self.handle).await;
            warn!(
                target = SOURCE,
                grace_ms = grace.as_millis() as u64,
                "cache warm drain exceeded grace period; aborting remaining jobs"
            );
        }

        let report = self.stats.report();
        info!(
            target = SOURCE,
            completed = report.completed,
            failed = report.failed,
            abandoned = report.abandoned,
            "cache warm worker stopped"
        );
        report
    }
}

struct Dispatcher {
    cache: Arc<dyn TrackCache>,
    permits: Arc<Semaphore>,
    task_timeout: Duration,
    stats: Arc<WarmStats>,
}

impl Dispatcher {
    async fn run(
        self,
        mut receiver: mpsc::Receiver<CacheWarmJob>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let mut running = JoinSet::new();
        let mut closing = false;

        loop {
            tokio::select! {
                _ = &mut shutdown, if !closing => {
                    // Buffered jobs stay receivable after close.
                    receiver.close();
                    closing = true;
                }
                next = receiver.recv() => {
                    let Some(job) = next else { break };
                    let Ok(permit) = self.permits.clone().acquire_owned().await else {
                        break;
                    };
                    running.spawn(write_job(
                        self.cache.clone(),
                        job,
                        self.task_timeout,
                        self.stats.clone(),
                        permit,
                    ));
                }
                Some(joined) = running.join_next(), if !running.is_empty() => {
                    self.settle(joined);
                }
            }
        }

        while let Some(joined) = running.join_next().await {
            self.settle(joined);
        }
    }

    /// Counts a write task that died before reporting its own outcome.
    fn settle(&self, joined: Result<(), JoinError>) {
        let Err(err) = joined else { return };
        if err.is_cancelled() {
            return;
        }
        self.stats.failed.fetch_add(1, Ordering::SeqCst);
        counter!(METRIC_WARM_FAILED, "reason" => "panic").increment(1);
        warn!(target = SOURCE, error = %err, "cache warm task panicked");
    }
}

async fn write_job(
    cache: Arc<dyn TrackCache>,
    job: CacheWarmJob,
    task_timeout: Duration,
    stats: Arc<WarmStats>,
    _permit: OwnedSemaphorePermit,
) {
    let kind = job.kind();
    let started = Instant::now();
    let outcome = tokio::time::timeout(task_timeout, job.write(cache.as_ref())).await;
    histogram!(METRIC_WARM_MS, "job" => kind).record(started.elapsed().as_secs_f64() * 1000.0);

    match outcome {
        Ok(Ok(())) => {
            stats.completed.fetch_add(1, Ordering::SeqCst);
            debug!(
                target = SOURCE,
                job = kind,
                artist = job.artist(),
                "cache warmed"
            );
        }
        Ok(Err(err)) => {
            stats.failed.fetch_add(1, Ordering::SeqCst);
            counter!(METRIC_WARM_FAILED, "reason" => "error").increment(1);
            warn!(
                target = SOURCE,
                job = kind,
                artist = job.artist(),
                error = %err,
                "cache warm failed"
            );
        }
        Err(_) => {
            stats.failed.fetch_add(1, Ordering::SeqCst);
            counter!(METRIC_WARM_FAILED, "reason" => "timeout").increment(1);
            warn!(
                target = SOURCE,
                job = kind,
                artist = job.artist(),
                timeout_ms = task_timeout.as_millis() as u64,
                "cache warm timed out"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;
    use tokio::sync::Notify;
    use uuid::Uuid;

    use super::*;

    fn track(title: &str) -> Track {
        Track {
            id: Uuid::new_v4(),
            artist: "Juice WRLD".to_string(),
            title: title.to_string(),
            lyrics: vec!["line one".to_string()],
            translation: vec!["строка один".to_string()],
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn config(capacity: usize, concurrency: usize, timeout: Duration) -> WarmupConfig {
        WarmupConfig {
            queue_capacity: NonZeroUsize::new(capacity).expect("non-zero capacity"),
            concurrency: NonZeroUsize::new(concurrency).expect("non-zero concurrency"),
            task_timeout: timeout,
        }
    }

    #[derive(Default)]
    struct RecordingCache {
        tracks: Mutex<Vec<String>>,
        artists: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl TrackCache for RecordingCache {
        async fn save_track(&self, track: &Track) -> Result<(), CacheError> {
            self.tracks
                .lock()
                .expect("tracks lock")
                .push(track.title.clone());
            Ok(())
        }

        async fn save_artist_tracks(
            &self,
            artist: &str,
            tracks: &[Track],
        ) -> Result<(), CacheError> {
            self.artists
                .lock()
                .expect("artists lock")
                .push((artist.to_string(), tracks.len()));
            Ok(())
        }

        async fn track(&self, _: &str, _: &str) -> Result<Option<Track>, CacheError> {
            Ok(None)
        }

        async fn artist_tracks(&self, _: &str) -> Result<Option<Vec<Track>>, CacheError> {
            Ok(None)
        }
    }

    /// Holds every write until the gate opens.
    struct GatedCache {
        entered: Notify,
        gate: Semaphore,
    }

    impl GatedCache {
        fn closed() -> Self {
            Self {
                entered: Notify::new(),
                gate: Semaphore::new(0),
            }
        }
    }

    #[async_trait]
    impl TrackCache for GatedCache {
        async fn save_track(&self, _: &Track) -> Result<(), CacheError> {
            self.entered.notify_one();
            let _pass = self
                .gate
                .acquire()
                .await
                .map_err(|err| CacheError::Unavailable(err.to_string()))?;
            Ok(())
        }

        async fn save_artist_tracks(&self, _: &str, _: &[Track]) -> Result<(), CacheError> {
            Ok(())
        }

        async fn track(&self, _: &str, _: &str) -> Result<Option<Track>, CacheError> {
            Ok(None)
        }

        async fn artist_tracks(&self, _: &str) -> Result<Option<Vec<Track>>, CacheError> {
            Ok(None)
        }
    }

    struct FailingCache;

    #[async_trait]
    impl TrackCache for FailingCache {
        async fn save_track(&self, _: &Track) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        async fn save_artist_tracks(&self, _: &str, _: &[Track]) -> Result<(), CacheError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }

        async fn track(&self, _: &str, _: &str) -> Result<Option<Track>, CacheError> {
            Ok(None)
        }

        async fn artist_tracks(&self, _: &str) -> Result<Option<Vec<Track>>, CacheError> {
            Ok(None)
        }
    }

    struct PanickingCache;

    #[async_trait]
    impl TrackCache for PanickingCache {
        async fn save_track(&self, _: &Track) -> Result<(), CacheError> {
            panic!("cache adapter bug");
        }

        async fn save_artist_tracks(&self, _: &str, _: &[Track]) -> Result<(), CacheError> {
            Ok(())
        }

        async fn track(&self, _: &str, _: &str) -> Result<Option<Track>, CacheError> {
            Ok(None)
        }

        async fn artist_tracks(&self, _: &str) -> Result<Option<Vec<Track>>, CacheError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn panicking_write_counts_as_failed() {
        let (queue, worker) = spawn_cache_warmer(
            &config(4, 1, Duration::from_secs(1)),
            Arc::new(PanickingCache),
        );

        assert_eq!(
            queue.submit(CacheWarmJob::Track(track("Lucid Dreams"))),
            WarmSubmit::Queued
        );
        assert_eq!(
            queue.submit(CacheWarmJob::ArtistTracks {
                artist: "Juice WRLD".to_string(),
                tracks: vec![track("Wishing Well")],
            }),
            WarmSubmit::Queued
        );

        let report = worker.shutdown(Duration::from_secs(2)).await;

        assert_eq!(
            report,
            DrainReport {
                completed: 1,
                failed: 1,
                abandoned: 0
            }
        );
    }

    #[tokio::test]
    async fn shutdown_drains_queued_jobs() {
        let cache = Arc::new(RecordingCache::default());
        let (queue, worker) =
            spawn_cache_warmer(&config(8, 2, Duration::from_secs(1)), cache.clone());

        assert_eq!(
            queue.submit(CacheWarmJob::Track(track("Lucid Dreams"))),
            WarmSubmit::Queued
        );
        assert_eq!(
            queue.submit(CacheWarmJob::ArtistTracks {
                artist: "Juice WRLD".to_string(),
                tracks: vec![track("Lucid Dreams"), track("Wishing Well")],
            }),
            WarmSubmit::Queued
        );

        let report = worker.shutdown(Duration::from_secs(1)).await;

        assert_eq!(
            report,
            DrainReport {
                completed: 2,
                failed: 0,
                abandoned: 0
            }
        );
        assert_eq!(
            *cache.tracks.lock().expect("tracks lock"),
            vec!["Lucid Dreams".to_string()]
        );
        assert_eq!(
            *cache.artists.lock().expect("artists lock"),
            vec![("Juice WRLD".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn full_queue_drops_jobs() {
        let cache = Arc::new(GatedCache::closed());
        let (queue, worker) =
            spawn_cache_warmer(&config(1, 1, Duration::from_secs(5)), cache.clone());

        assert_eq!(
            queue.submit(CacheWarmJob::Track(track("first"))),
            WarmSubmit::Queued
        );
        cache.entered.notified().await;

        let outcomes: Vec<_> = (0..10)
            .map(|i| queue.submit(CacheWarmJob::Track(track(&format!("burst {i}")))))
            .collect();
        let queued = outcomes
            .iter()
            .filter(|outcome| **outcome == WarmSubmit::Queued)
            .count();
        let dropped = outcomes
            .iter()
            .filter(|outcome| **outcome == WarmSubmit::Dropped)
            .count();
        assert!(queued <= 2, "queued {queued} jobs past capacity");
        assert_eq!(queued + dropped, 10);

        cache.gate.add_permits(1);
        let report = worker.shutdown(Duration::from_secs(2)).await;

        assert_eq!(
            report,
            DrainReport {
                completed: queued + 1,
                failed: 0,
                abandoned: 0
            }
        );
    }

    #[tokio::test]
    async fn failures_and_timeouts_are_counted_not_raised() {
        let (queue, worker) =
            spawn_cache_warmer(&config(4, 2, Duration::from_millis(20)), Arc::new(FailingCache));

        queue.submit(CacheWarmJob::Track(track("Lucid Dreams")));
        queue.submit(CacheWarmJob::ArtistTracks {
            artist: "Juice WRLD".to_string(),
            tracks: vec![track("Lucid Dreams")],
        });

        let report = worker.shutdown(Duration::from_secs(2)).await;
        assert_eq!(
            report,
            DrainReport {
                completed: 0,
                failed: 2,
                abandoned: 0
            }
        );
    }

    #[tokio::test]
    async fn shutdown_abandons_jobs_past_grace() {
        let cache = Arc::new(GatedCache::closed());
        let (queue, worker) =
            spawn_cache_warmer(&config(4, 1, Duration::from_secs(30)), cache.clone());

        queue.submit(CacheWarmJob::Track(track("stuck")));
        queue.submit(CacheWarmJob::Track(track("waiting")));
        cache.entered.notified().await;

        let report = worker.shutdown(Duration::from_millis(50)).await;
        assert_eq!(report.completed, 0);
        assert_eq!(report.abandoned, 2);
    }

    #[tokio::test]
    async fn submissions_after_shutdown_are_rejected() {
        let (queue, worker) = spawn_cache_warmer(
            &config(4, 1, Duration::from_secs(1)),
            Arc::new(RecordingCache::default()),
        );

        worker.shutdown(Duration::from_secs(1)).await;

        assert_eq!(
            queue.submit(CacheWarmJob::Track(track("late"))),
            WarmSubmit::Closed
        );
    }
}
