//! Capability traits describing the collaborators the track service depends on.
//!
//! Each trait has its own narrow error vocabulary. The service re-maps these
//! into [`TrackServiceError`](crate::application::tracks::TrackServiceError)
//! so transport code never depends on collaborator internals.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::track::{NewTrack, Track};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("track not found")]
    TrackNotFound,
    #[error("no tracks stored for artist")]
    ArtistTracksNotFound,
    #[error("invalid track identifier")]
    InvalidIdentifier,
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Durable track storage keyed by (`artist`, `title`) and by identifier.
#[async_trait]
pub trait TrackStore: Send + Sync {
    /// Persist a track and return it with its store-assigned identity.
    async fn save_track(&self, track: NewTrack) -> Result<Track, RepoError>;

    /// Fails with [`RepoError::TrackNotFound`] when nothing is stored for the key.
    async fn find_track(&self, artist: &str, title: &str) -> Result<Track, RepoError>;

    /// Fails with [`RepoError::ArtistTracksNotFound`] when the artist has no tracks.
    async fn list_by_artist(&self, artist: &str) -> Result<Vec<Track>, RepoError>;

    /// Fails with [`RepoError::InvalidIdentifier`] for malformed or unknown identifiers.
    async fn delete_track(&self, identifier: &str) -> Result<(), RepoError>;

    async fn health_check(&self) -> Result<(), RepoError>;
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cache entry could not be encoded: {0}")]
    Serialization(String),
}

/// Fast lookaside cache with the same lookup shapes as the store.
///
/// `Ok(None)` is a miss. Callers treat every `Err` as a miss as well.
#[async_trait]
pub trait TrackCache: Send + Sync {
    async fn save_track(&self, track: &Track) -> Result<(), CacheError>;

    async fn save_artist_tracks(&self, artist: &str, tracks: &[Track]) -> Result<(), CacheError>;

    async fn track(&self, artist: &str, title: &str) -> Result<Option<Track>, CacheError>;

    async fn artist_tracks(&self, artist: &str) -> Result<Option<Vec<Track>>, CacheError>;
}

#[derive(Debug, Error)]
pub enum LyricsError {
    #[error("lyrics not found")]
    NotFound,
    #[error("lyrics request failed: {0}")]
    Http(String),
    #[error("lyrics response could not be decoded: {0}")]
    Decode(String),
    #[error("lyrics provider returned an error: {0}")]
    Api(String),
}

/// External source of raw lyric lines.
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// Returns normalized lines; [`LyricsError::NotFound`] when the provider has none.
    async fn lyrics(&self, artist: &str, title: &str) -> Result<Vec<String>, LyricsError>;
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translation failed: {0}")]
    Failed(String),
    #[error("translation request failed: {0}")]
    Http(String),
    #[error("translation response could not be decoded: {0}")]
    Decode(String),
}

impl TranslateError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// External translation of lyric lines. Output may reflow the line count.
#[async_trait]
pub trait LyricsTranslator: Send + Sync {
    async fn translate(&self, lines: &[String]) -> Result<Vec<String>, TranslateError>;
}
