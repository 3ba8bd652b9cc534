//! Routes and handlers for `/proxy/analyze`

use super::AppState;
use crate::error::AdvisorError;
use crate::pipeline::SYMBOL_REQUIRED;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

pub const ANALYZE_PATH: &str = "/proxy/analyze";

/// Build the router with tracing and the permissive allow-origin header
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(ANALYZE_PATH, post(analyze_handler).options(preflight_handler))
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error body returned by the analyze endpoint
#[derive(Debug)]
pub enum ApiError {
    /// Caller supplied a missing or invalid symbol
    BadRequest(String),
    /// Anything that went wrong while analyzing
    Internal(String),
}

impl From<AdvisorError> for ApiError {
    fn from(err: AdvisorError) -> Self {
        if err.is_client_error() {
            ApiError::BadRequest(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Extract the `company` field; anything but a non-blank string is rejected
fn company_symbol(body: &[u8]) -> Result<String, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ApiError::BadRequest(SYMBOL_REQUIRED.to_string()))?;

    match value.get("company").and_then(Value::as_str).map(str::trim) {
        Some(symbol) if !symbol.is_empty() => Ok(symbol.to_string()),
        _ => Err(ApiError::BadRequest(SYMBOL_REQUIRED.to_string())),
    }
}

/// POST /proxy/analyze - run the crew for `{"company": "<symbol>"}`
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let symbol = company_symbol(&body).inspect_err(|_| {
        warn!("Rejected analyze request without a stock symbol");
    })?;

    match state.advisor.analyze(&symbol).await {
        Ok(output) => Ok(Json(json!({ "result": output.raw }))),
        Err(e) => {
            error!(symbol = %symbol, error = %e, "Analysis failed");
            Err(e.into())
        }
    }
}

/// OPTIONS /proxy/analyze - CORS preflight
async fn preflight_handler() -> impl IntoResponse {
    (
        [
            (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
            (ACCESS_CONTROL_ALLOW_METHODS, "POST"),
        ],
        Json(json!({ "status": "ok" })),
    )
}
