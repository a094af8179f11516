//! Track orchestration: cache-aside reads, provider/translator pipeline on save.
//!
//! Every path except delete probes the cache first. A hit short-circuits the
//! rest of the pipeline, including on save. Store writes are synchronous and
//! mandatory; cache writes go through the [`CacheWarmQueue`] and never affect
//! the caller's result.

use std::{error::Error as StdError, sync::Arc};

use metrics::counter;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::application::repos::{
    LyricsError, LyricsProvider, LyricsTranslator, RepoError, TrackCache, TrackStore,
    TranslateError,
};
use crate::application::warmup::{CacheWarmJob, CacheWarmQueue};
use crate::domain::error::DomainError;
use crate::domain::track::{NewTrack, Track, sort_by_title, validate_key_part};

const SOURCE: &str = "application::tracks";

pub(crate) const METRIC_CACHE_HIT: &str = "lyrics_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "lyrics_cache_miss_total";

pub const OP_SAVE: &str = "service.track.save";
pub const OP_GET: &str = "service.track.get";
pub const OP_ARTIST_TRACKS: &str = "service.track.artist_tracks";
pub const OP_DELETE: &str = "service.track.delete";

pub type UpstreamError = Box<dyn StdError + Send + Sync + 'static>;

/// Closed error vocabulary exposed to transports.
#[derive(Debug, Error)]
pub enum TrackServiceError {
    #[error("lyrics not found")]
    LyricsNotFound,
    #[error("failed to translate lyrics")]
    TranslationFailed(#[source] TranslateError),
    #[error("track not found")]
    TrackNotFound,
    #[error("no tracks found for artist")]
    ArtistTracksNotFound,
    #[error("invalid track identifier")]
    InvalidIdentifier,
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error("{op} failed")]
    Upstream {
        op: &'static str,
        #[source]
        source: UpstreamError,
    },
}

/// Discriminant of [`TrackServiceError`], for exhaustive matching without the cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackErrorKind {
    LyricsNotFound,
    TranslationFailed,
    TrackNotFound,
    ArtistTracksNotFound,
    InvalidIdentifier,
    Invalid,
    Upstream,
}

impl TrackServiceError {
    pub fn upstream(op: &'static str, source: impl Into<UpstreamError>) -> Self {
        Self::Upstream {
            op,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> TrackErrorKind {
        match self {
            TrackServiceError::LyricsNotFound => TrackErrorKind::LyricsNotFound,
            TrackServiceError::TranslationFailed(_) => TrackErrorKind::TranslationFailed,
            TrackServiceError::TrackNotFound => TrackErrorKind::TrackNotFound,
            TrackServiceError::ArtistTracksNotFound => TrackErrorKind::ArtistTracksNotFound,
            TrackServiceError::InvalidIdentifier => TrackErrorKind::InvalidIdentifier,
            TrackServiceError::Invalid(_) => TrackErrorKind::Invalid,
            TrackServiceError::Upstream { .. } => TrackErrorKind::Upstream,
        }
    }

    /// Operation label carried by upstream failures.
    pub fn op(&self) -> Option<&'static str> {
        match self {
            TrackServiceError::Upstream { op, .. } => Some(op),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct TrackService {
    provider: Arc<dyn LyricsProvider>,
    translator: Arc<dyn LyricsTranslator>,
    store: Arc<dyn TrackStore>,
    cache: Arc<dyn TrackCache>,
    warmer: CacheWarmQueue,
}

impl TrackService {
    pub fn new(
        provider: Arc<dyn LyricsProvider>,
        translator: Arc<dyn LyricsTranslator>,
        store: Arc<dyn TrackStore>,
        cache: Arc<dyn TrackCache>,
        warmer: CacheWarmQueue,
    ) -> Self {
        Self {
            provider,
            translator,
            store,
            cache,
            warmer,
        }
    }

    /// Fetch, translate, and persist a track unless the cache already holds it.
    #[instrument(skip(self), fields(op = OP_SAVE))]
    pub async fn save(&self, artist: &str, title: &str) -> Result<Track, TrackServiceError> {
        validate_key_part("artist", artist)?;
        validate_key_part("title", title)?;

        if let Some(track) = self.cached_track(OP_SAVE, artist, title).await {
            return Ok(track);
        }

        let lyrics = match self.provider.lyrics(artist, title).await {
            Ok(lines) if lines.is_empty() => return Err(TrackServiceError::LyricsNotFound),
            Ok(lines) => lines,
            Err(LyricsError::NotFound) => return Err(TrackServiceError::LyricsNotFound),
            Err(err) => {
                return Err(TrackServiceError::upstream(
                    "service.track.save.lyrics",
                    err,
                ));
            }
        };

        let translation = match self.translator.translate(&lyrics).await {
            Ok(lines) if lines.is_empty() => {
                return Err(TrackServiceError::TranslationFailed(
                    TranslateError::failed("translator returned no lines"),
                ));
            }
            Ok(lines) => lines,
            Err(err @ TranslateError::Failed(_)) => {
                return Err(TrackServiceError::TranslationFailed(err));
            }
            Err(err) => {
                return Err(TrackServiceError::upstream(
                    "service.track.save.translate",
                    err,
                ));
            }
        };

        let draft = NewTrack {
            artist: artist.to_string(),
            title: title.to_string(),
            lyrics,
            translation,
        };
        draft.validate()?;

        let track = self
            .store
            .save_track(draft)
            .await
            .map_err(|err| TrackServiceError::upstream("service.track.save.store", err))?;

        self.warm(CacheWarmJob::Track(track.clone()));
        Ok(track)
    }

    #[instrument(skip(self), fields(op = OP_GET))]
    pub async fn track(&self, artist: &str, title: &str) -> Result<Track, TrackServiceError> {
        validate_key_part("artist", artist)?;
        validate_key_part("title", title)?;

        if let Some(track) = self.cached_track(OP_GET, artist, title).await {
            return Ok(track);
        }

        let track = self
            .store
            .find_track(artist, title)
            .await
            .map_err(|err| match err {
                RepoError::TrackNotFound => TrackServiceError::TrackNotFound,
                other => TrackServiceError::upstream(OP_GET, other),
            })?;

        self.warm(CacheWarmJob::Track(track.clone()));
        Ok(track)
    }

    /// All tracks for an artist, ordered by title.
    #[instrument(skip(self), fields(op = OP_ARTIST_TRACKS))]
    pub async fn artist_tracks(&self, artist: &str) -> Result<Vec<Track>, TrackServiceError> {
        validate_key_part("artist", artist)?;

        if let Some(mut tracks) = self.cached_artist_tracks(artist).await {
            sort_by_title(&mut tracks);
            return Ok(tracks);
        }

        let mut tracks = self
            .store
            .list_by_artist(artist)
            .await
            .map_err(|err| match err {
                RepoError::ArtistTracksNotFound => TrackServiceError::ArtistTracksNotFound,
                other => TrackServiceError::upstream(OP_ARTIST_TRACKS, other),
            })?;
        if tracks.is_empty() {
            return Err(TrackServiceError::ArtistTracksNotFound);
        }
        sort_by_title(&mut tracks);

        self.warm(CacheWarmJob::ArtistTracks {
            artist: artist.to_string(),
            tracks: tracks.clone(),
        });
        Ok(tracks)
    }

    /// Remove a stored track. Cached copies are left to expire.
    #[instrument(skip(self), fields(op = OP_DELETE))]
    pub async fn delete(&self, identifier: &str) -> Result<(), TrackServiceError> {
        self.store
            .delete_track(identifier)
            .await
            .map_err(|err| match err {
                RepoError::InvalidIdentifier | RepoError::TrackNotFound => {
                    TrackServiceError::InvalidIdentifier
                }
                other => TrackServiceError::upstream(OP_DELETE, other),
            })
    }

    pub async fn health_check(&self) -> Result<(), RepoError> {
        self.store.health_check().await
    }

    async fn cached_track(&self, op: &'static str, artist: &str, title: &str) -> Option<Track> {
        match self.cache.track(artist, title).await {
            Ok(Some(track)) => {
                counter!(METRIC_CACHE_HIT, "op" => op).increment(1);
                Some(track)
            }
            Ok(None) => {
                counter!(METRIC_CACHE_MISS, "op" => op).increment(1);
                None
            }
            Err(err) => {
                counter!(METRIC_CACHE_MISS, "op" => op).increment(1);
                warn!(
                    target = SOURCE,
                    op,
                    error = %err,
                    "cache lookup failed; falling back"
                );
                None
            }
        }
    }

    async fn cached_artist_tracks(&self, artist: &str) -> Option<Vec<Track>> {
        match self.cache.artist_tracks(artist).await {
            Ok(Some(tracks)) if !tracks.is_empty() => {
                counter!(METRIC_CACHE_HIT, "op" => OP_ARTIST_TRACKS).increment(1);
                Some(tracks)
            }
            Ok(_) => {
                counter!(METRIC_CACHE_MISS, "op" => OP_ARTIST_TRACKS).increment(1);
                None
            }
            Err(err) => {
                counter!(METRIC_CACHE_MISS, "op" => OP_ARTIST_TRACKS).increment(1);
                warn!(
                    target = SOURCE,
                    op = OP_ARTIST_TRACKS,
                    error = %err,
                    "cache lookup failed; falling back"
                );
                None
            }
        }
    }

    fn warm(&self, job: CacheWarmJob) {
        let outcome = self.warmer.submit(job);
        debug!(target = SOURCE, outcome = ?outcome, "cache warm submitted");
    }
}
