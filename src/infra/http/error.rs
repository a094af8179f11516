use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::ErrorReport;
use crate::application::tracks::TrackServiceError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const LYRICS_NOT_FOUND: &str = "lyrics_not_found";
    pub const TRACK_NOT_FOUND: &str = "track_not_found";
    pub const ARTIST_TRACKS_NOT_FOUND: &str = "artist_tracks_not_found";
    pub const INVALID_IDENTIFIER: &str = "invalid_identifier";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const TRANSLATION_FAILED: &str = "translation_failed";
    pub const UPSTREAM: &str = "upstream_error";
    pub const TIMEOUT: &str = "request_timeout";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    report: Option<ErrorReport>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            report: None,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn timeout() -> Self {
        Self::new(
            StatusCode::GATEWAY_TIMEOUT,
            codes::TIMEOUT,
            "Request deadline exceeded",
            None,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    fn with_report(mut self, report: ErrorReport) -> Self {
        self.report = Some(report);
        self
    }
}

impl From<TrackServiceError> for ApiError {
    fn from(err: TrackServiceError) -> Self {
        let (status, code, message) = match &err {
            TrackServiceError::LyricsNotFound => (
                StatusCode::NOT_FOUND,
                codes::LYRICS_NOT_FOUND,
                "Lyrics not found",
            ),
            TrackServiceError::TrackNotFound => (
                StatusCode::NOT_FOUND,
                codes::TRACK_NOT_FOUND,
                "Track not found",
            ),
            TrackServiceError::ArtistTracksNotFound => (
                StatusCode::NOT_FOUND,
                codes::ARTIST_TRACKS_NOT_FOUND,
                "No tracks found for artist",
            ),
            TrackServiceError::InvalidIdentifier => (
                StatusCode::BAD_REQUEST,
                codes::INVALID_IDENTIFIER,
                "Invalid track identifier",
            ),
            TrackServiceError::Invalid(_) => (
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid input",
            ),
            TrackServiceError::TranslationFailed(_) => (
                StatusCode::BAD_GATEWAY,
                codes::TRANSLATION_FAILED,
                "Failed to translate lyrics",
            ),
            TrackServiceError::Upstream { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::UPSTREAM,
                "Internal error",
            ),
        };

        // Upstream causes stay in logs; clients only see the operation label.
        let hint = match &err {
            TrackServiceError::Invalid(inner) => Some(inner.to_string()),
            TrackServiceError::Upstream { op, .. } => Some((*op).to_string()),
            _ => None,
        };

        let report = ErrorReport::from_error("infra::http::tracks", status, &err);
        ApiError::new(status, code, message, hint).with_report(report)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = self.report.unwrap_or_else(|| {
            ErrorReport::from_message(
                "infra::http",
                self.status,
                format!(
                    "{}: {}",
                    self.code,
                    self.hint.as_deref().unwrap_or(self.message)
                ),
            )
        });
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}
