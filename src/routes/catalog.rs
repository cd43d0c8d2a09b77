//! Read-only catalog lookups

use axum::{
    extract::{Path, State},
    Json,
};

use crate::db;
use crate::error::Result;
use crate::models::{Branch, Company, Item};
use crate::AppState;

/// All companies
pub async fn companies(State(state): State<AppState>) -> Result<Json<Vec<Company>>> {
    Ok(Json(db::get_companies(&state.db).await?))
}

/// Branches of one company
pub async fn branches(
    State(state): State<AppState>,
    Path(company_id): Path<i64>,
) -> Result<Json<Vec<Branch>>> {
    Ok(Json(db::get_branches(&state.db, company_id).await?))
}

/// Item with its classification and last cost
pub async fn item(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Item>> {
    Ok(Json(db::get_item(&state.db, id).await?))
}
