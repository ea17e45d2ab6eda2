//! HTTP request handlers organized by domain

use axum::Json;
use serde::Deserialize;

pub mod catalog;
pub mod rules;
pub mod transactions;

// Re-export all handlers for use in router
pub use catalog::*;
pub use rules::*;
pub use transactions::*;

/// Query/body fragment selecting a ledger profile; defaults to profile 1
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UserScope {
    #[serde(default = "default_user_id")]
    pub user_id: i64,
}

pub(crate) fn default_user_id() -> i64 {
    1
}

/// GET /api/health - Liveness probe
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
