//! Track endpoints.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;

use super::HttpState;
use super::error::ApiError;
use super::models::{SaveTrackRequest, TrackListResponse, TrackQuery, TrackResponse};

pub async fn save_track(
    State(state): State<HttpState>,
    payload: Result<Json<SaveTrackRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload
        .map_err(|err| ApiError::bad_request("invalid request body", Some(err.body_text())))?;

    let track = state.tracks.save(&payload.artist, &payload.title).await?;

    Ok((StatusCode::CREATED, Json(TrackResponse::from(track))))
}

/// `GET /lyrics?artist=…&title=…` returns one track; without `title` it lists
/// the artist's tracks.
pub async fn get_tracks(
    State(state): State<HttpState>,
    query: Result<Query<TrackQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query
        .map_err(|err| ApiError::bad_request("invalid query", Some(err.body_text())))?;

    match query.title() {
        Some(title) => {
            let track = state.tracks.track(&query.artist, title).await?;
            Ok(Json(TrackResponse::from(track)).into_response())
        }
        None => {
            let tracks = state.tracks.artist_tracks(&query.artist).await?;
            Ok(Json(TrackListResponse {
                artist: query.artist,
                tracks: tracks.into_iter().map(TrackResponse::from).collect(),
            })
            .into_response())
        }
    }
}

pub async fn delete_track(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.tracks.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn health(State(state): State<HttpState>) -> Response {
    match state.tracks.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
