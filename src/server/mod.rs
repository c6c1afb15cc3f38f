//! HTTP surface: router, shared state, and the convert handler

pub mod convert;
pub mod request;
pub mod response;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{any, get};
use axum::{Json, Router};
use serde_json::json;

use crate::config::Config;
use crate::gcs::ObjectStore;
use crate::llm::ModelClient;

pub use response::{ConvertResponse, ErrorDetails};

/// Shared per-process state, constructed once at startup
pub struct AppState {
    pub config: Config,
    pub model: Arc<dyn ModelClient>,
    pub store: Arc<dyn ObjectStore>,
}

/// Build the service router.
///
/// `/convert` is mounted for any method so the handler can return the
/// contract's 400 (rather than a bare 405) on non-POST requests.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/convert", any(convert::convert))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(request::MAX_BODY_BYTES))
        .with_state(state)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
