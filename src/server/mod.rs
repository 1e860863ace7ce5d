//! HTTP surface
//!
//! Exposes the caption pipeline as a JSON endpoint. Every failure is
//! rendered as `{"error": "..."}` with the status of its error class.

pub mod handlers;

use crate::captions::CaptionGenerator;
use crate::models::ErrorResponse;
use crate::Error;
use axum::extract::DefaultBodyLimit;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const GENERATE_CAPTIONS_PATH: &str = "/api/generate-captions";
pub const HEALTH_PATH: &str = "/health";

#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<CaptionGenerator>,
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route(GENERATE_CAPTIONS_PATH, post(handlers::generate_captions))
        .route(HEALTH_PATH, get(handlers::health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = match &self {
            // Internal details stay in the logs.
            Error::Io(_) | Error::Serialization(_) | Error::Config(_) | Error::Invariant(_) => {
                "Internal server error".to_string()
            }
            Error::Http(_) => "Failed to reach the caption provider".to_string(),
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
