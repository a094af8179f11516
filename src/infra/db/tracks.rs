use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{RepoError, TrackStore},
    domain::track::{NewTrack, Track},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct TrackRow {
    id: Uuid,
    artist: String,
    title: String,
    lyrics: Vec<String>,
    translation: Vec<String>,
    created_at: OffsetDateTime,
}

impl From<TrackRow> for Track {
    fn from(row: TrackRow) -> Self {
        Self {
            id: row.id,
            artist: row.artist,
            title: row.title,
            lyrics: row.lyrics,
            translation: row.translation,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl TrackStore for PostgresRepositories {
    async fn save_track(&self, track: NewTrack) -> Result<Track, RepoError> {
        track.validate().map_err(|err| RepoError::InvalidInput {
            message: err.to_string(),
        })?;

        let NewTrack {
            artist,
            title,
            lyrics,
            translation,
        } = track;

        // A stored track is immutable; the no-op update makes RETURNING yield the existing row.
        let row = sqlx::query_as::<_, TrackRow>(
            r#"
            INSERT INTO tracks (id, artist, title, lyrics, translation)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (artist, title) DO UPDATE
                SET artist = tracks.artist
            RETURNING id, artist, title, lyrics, translation, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(artist)
        .bind(title)
        .bind(lyrics)
        .bind(translation)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(Track::from(row))
    }

    async fn find_track(&self, artist: &str, title: &str) -> Result<Track, RepoError> {
        let row = sqlx::query_as::<_, TrackRow>(
            r#"
            SELECT id, artist, title, lyrics, translation, created_at
            FROM tracks
            WHERE artist = $1 AND title = $2
            "#,
        )
        .bind(artist)
        .bind(title)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(Track::from).ok_or(RepoError::TrackNotFound)
    }

    async fn list_by_artist(&self, artist: &str) -> Result<Vec<Track>, RepoError> {
        let rows = sqlx::query_as::<_, TrackRow>(
            r#"
            SELECT id, artist, title, lyrics, translation, created_at
            FROM tracks
            WHERE artist = $1
            ORDER BY title, id
            "#,
        )
        .bind(artist)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if rows.is_empty() {
            return Err(RepoError::ArtistTracksNotFound);
        }

        Ok(rows.into_iter().map(Track::from).collect())
    }

    async fn delete_track(&self, identifier: &str) -> Result<(), RepoError> {
        let id = Uuid::parse_str(identifier.trim()).map_err(|_| RepoError::InvalidIdentifier)?;

        let result = sqlx::query("DELETE FROM tracks WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::InvalidIdentifier);
        }

        Ok(())
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        self.ping().await.map_err(map_sqlx_error)
    }
}
