pub mod error;
mod handlers;
pub mod middleware;
pub mod models;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get},
};

use crate::application::tracks::TrackService;

use self::middleware::{log_responses, request_deadline, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub tracks: Arc<TrackService>,
}

pub fn build_router(state: HttpState, request_timeout: Duration) -> Router {
    Router::new()
        .route(
            "/lyrics",
            get(handlers::get_tracks).post(handlers::save_track),
        )
        .route("/lyrics/{id}", delete(handlers::delete_track))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            request_timeout,
            request_deadline,
        ))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
