//! Route handlers

pub mod catalog;
pub mod combinations;
pub mod discount_rules;
pub mod price_lists;

use axum::Json;
use serde_json::{json, Value};

/// Liveness check
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
