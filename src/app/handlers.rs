//! HTTP request handlers for the menu API

use crate::app::server::AppState;
use crate::core::emitter::json_array_stream;
use crate::utils::error::MenuError;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Default, Deserialize)]
pub struct ParseMenuRequest {
    #[serde(rename = "menuUrl", default)]
    pub menu_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /api/parseMenu`
///
/// Answers with a chunked JSON array of menu items, or a JSON error object.
/// Bodies that are not JSON are treated the same as a missing `menuUrl`.
pub async fn parse_menu(State(state): State<AppState>, body: Bytes) -> Response {
    let menu_url = match requested_menu_url(&body) {
        Ok(url) => url,
        Err(err) => {
            tracing::warn!("Rejected parseMenu request: {}", err);
            return error_response(&err);
        }
    };

    match state.engine.start(&menu_url).await {
        Ok(items) => (
            [(header::CONTENT_TYPE, "application/json")],
            Body::from_stream(json_array_stream(items)),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(
                "Failed to process menu {} ({:?}): {}",
                menu_url,
                err.category(),
                err
            );
            error_response(&err)
        }
    }
}

fn requested_menu_url(body: &[u8]) -> Result<String, MenuError> {
    serde_json::from_slice::<ParseMenuRequest>(body)
        .ok()
        .and_then(|request| request.menu_url)
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| MenuError::invalid_request("No menu URL provided"))
}

pub fn error_response(err: &MenuError) -> Response {
    (err.status_code(), Json(json!({ "error": err.user_message() }))).into_response()
}
