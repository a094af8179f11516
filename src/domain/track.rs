//! Track entity and lyric text normalization.
//!
//! A [`Track`] is identified for reads by its case-sensitive (`artist`, `title`)
//! pair and for deletion by the store-assigned [`Uuid`]. Lyrics and translations
//! are stored as ordered, trimmed, non-blank lines.

use time::OffsetDateTime;
use uuid::Uuid;

use super::error::DomainError;

/// A persisted track with its lyrics and their translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: Uuid,
    pub artist: String,
    pub title: String,
    pub lyrics: Vec<String>,
    pub translation: Vec<String>,
    pub created_at: OffsetDateTime,
}

impl Track {
    pub fn key(&self) -> TrackKey {
        TrackKey::new(self.artist.clone(), self.title.clone())
    }
}

/// A track assembled by the orchestration pipeline, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrack {
    pub artist: String,
    pub title: String,
    pub lyrics: Vec<String>,
    pub translation: Vec<String>,
}

impl NewTrack {
    /// Check the invariants a track must satisfy before it reaches the store.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_key_part("artist", &self.artist)?;
        validate_key_part("title", &self.title)?;
        if self.lyrics.is_empty() {
            return Err(DomainError::invariant("track lyrics must not be empty"));
        }
        if self.translation.is_empty() {
            return Err(DomainError::invariant("track translation must not be empty"));
        }
        Ok(())
    }

    /// Attach store-assigned identity.
    pub fn into_track(self, id: Uuid, created_at: OffsetDateTime) -> Track {
        Track {
            id,
            artist: self.artist,
            title: self.title,
            lyrics: self.lyrics,
            translation: self.translation,
            created_at,
        }
    }
}

/// Case-sensitive (`artist`, `title`) lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackKey {
    pub artist: String,
    pub title: String,
}

impl TrackKey {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
        }
    }
}

/// Reject blank artist or title values.
pub fn validate_key_part(field: &'static str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    Ok(())
}

/// Split raw lyric text into trimmed, non-blank lines.
///
/// `\r\n` and lone `\r` are treated as line breaks.
pub fn format_lyrics(raw: &str) -> Vec<String> {
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Normalize already-split lines, re-splitting any that carry embedded breaks.
pub fn normalize_lines<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .flat_map(|line| format_lyrics(line.as_ref()))
        .collect()
}

/// Deterministic order for artist listings: title, then identifier.
pub fn sort_by_title(tracks: &mut [Track]) {
    tracks.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
}
