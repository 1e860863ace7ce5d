use super::AppState;
use crate::models::{CaptionsResponse, GenerateCaptionsRequest};
use crate::{Error, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

pub async fn generate_captions(
    State(state): State<AppState>,
    body: std::result::Result<Json<GenerateCaptionsRequest>, JsonRejection>,
) -> Result<Json<CaptionsResponse>> {
    let Json(request) = body.map_err(|rejection| {
        tracing::warn!("Rejected caption request body: {}", rejection.body_text());
        Error::InvalidInput(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    let captions = state.generator.generate(&request).await?;
    Ok(Json(CaptionsResponse { captions }))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
