use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::track::Track;

#[derive(Debug, Deserialize, Serialize)]
pub struct SaveTrackRequest {
    pub artist: String,
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrackQuery {
    #[serde(default)]
    pub artist: String,
    pub title: Option<String>,
}

impl TrackQuery {
    /// Title filter, if one was given with non-blank content.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|title| !title.trim().is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TrackResponse {
    pub id: Uuid,
    pub artist: String,
    pub title: String,
    pub lyrics: Vec<String>,
    pub translation: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Track> for TrackResponse {
    fn from(track: Track) -> Self {
        Self {
            id: track.id,
            artist: track.artist,
            title: track.title,
            lyrics: track.lyrics,
            translation: track.translation,
            created_at: track.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrackListResponse {
    pub artist: String,
    pub tracks: Vec<TrackResponse>,
}
