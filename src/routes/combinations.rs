//! Bundle administration
//!
//! Members must already carry a base price in the bundle's list.

use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::db;
use crate::error::{AppError, Result};
use crate::pricing::models::CombinationDetail;
use crate::pricing::validation::validate_combination_members;
use crate::AppState;

/// Body for creating a bundle
#[derive(Debug, Clone, Deserialize)]
pub struct CombinationPayload {
    pub name: String,
    pub item_ids: Vec<i64>,
}

impl CombinationPayload {
    /// Trimmed name and deduplicated member ids
    pub fn into_parts(self) -> Result<(String, Vec<i64>)> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("name must not be empty".to_string()));
        }

        let mut item_ids = self.item_ids;
        item_ids.sort_unstable();
        item_ids.dedup();
        if item_ids.is_empty() {
            return Err(AppError::BadRequest(
                "a combination needs at least one item".to_string(),
            ));
        }

        Ok((name, item_ids))
    }
}

async fn check_members(state: &AppState, price_list_id: i64, item_ids: &[i64]) -> Result<()> {
    let priced: HashSet<i64> = db::get_base_prices(&state.db, price_list_id)
        .await?
        .into_iter()
        .map(|p| p.item_id)
        .collect();

    validate_combination_members(price_list_id, item_ids, &priced).map_err(AppError::Validation)
}

/// Bundles of a list
pub async fn list(
    State(state): State<AppState>,
    Path(price_list_id): Path<i64>,
) -> Result<Json<Vec<CombinationDetail>>> {
    db::get_price_list(&state.db, price_list_id).await?;
    Ok(Json(db::get_combinations(&state.db, price_list_id).await?))
}

/// Create a bundle in a list
pub async fn create(
    State(state): State<AppState>,
    Path(price_list_id): Path<i64>,
    Json(payload): Json<CombinationPayload>,
) -> Result<(StatusCode, Json<CombinationDetail>)> {
    let (name, item_ids) = payload.into_parts()?;

    db::get_price_list(&state.db, price_list_id).await?;
    check_members(&state, price_list_id, &item_ids).await?;

    let combination = db::insert_combination(&state.db, price_list_id, &name, &item_ids).await?;
    tracing::info!(
        combination_id = combination.id,
        price_list_id,
        members = combination.item_ids.len(),
        "Created combination"
    );

    Ok((StatusCode::CREATED, Json(combination)))
}

/// Get one bundle
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CombinationDetail>> {
    Ok(Json(db::get_combination(&state.db, id).await?))
}

/// Delete a bundle along with the rules that target it
pub async fn remove(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    db::delete_combination(&state.db, id).await?;
    tracing::info!(combination_id = id, "Deleted combination");
    Ok(StatusCode::NO_CONTENT)
}

/// Add an item to a bundle
pub async fn add_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i64, i64)>,
) -> Result<Json<CombinationDetail>> {
    let combination = db::find_combination(&state.db, id)
        .await?
        .ok_or(AppError::NotFound)?;
    check_members(&state, combination.price_list_id, &[item_id]).await?;

    db::add_combination_member(&state.db, id, item_id).await?;
    tracing::info!(combination_id = id, item_id, "Added combination member");

    Ok(Json(db::get_combination(&state.db, id).await?))
}

/// Remove an item from a bundle
pub async fn remove_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i64, i64)>,
) -> Result<StatusCode> {
    db::remove_combination_member(&state.db, id, item_id).await?;
    tracing::info!(combination_id = id, item_id, "Removed combination member");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::MemoryStore;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn payload(json: &str) -> CombinationPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_into_parts_dedups_members() {
        let (name, item_ids) = payload(r#"{"name":" Keyboard + Mouse ","item_ids":[3,2,3]}"#)
            .into_parts()
            .unwrap();

        assert_eq!(name, "Keyboard + Mouse");
        assert_eq!(item_ids, vec![2, 3]);
    }

    #[test]
    fn test_into_parts_rejects_empty_bundle() {
        assert!(matches!(
            payload(r#"{"name":"Empty","item_ids":[]}"#).into_parts(),
            Err(AppError::BadRequest(_))
        ));
        assert!(payload(r#"{"name":" ","item_ids":[1]}"#).into_parts().is_err());
    }

    #[tokio::test]
    async fn test_create_without_items_is_bad_request() {
        let db = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/pricing_test")
            .unwrap();
        let app = crate::app(AppState {
            db,
            store: Arc::new(MemoryStore::new()),
        });

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/price-lists/1/combinations")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"Combo","item_ids":[]}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
