//! Price list administration
//!
//! Create and update check that the company and branch exist, then run the
//! overlap check against the lists already stored for the same company,
//! before anything is written.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::db::{self, Reference};
use crate::error::{AppError, Result};
use crate::pricing::models::{DiscountRule, ItemBasePrice};
use crate::pricing::responses::PriceListResponse;
use crate::pricing::validation::{
    validate_base_price, validate_branch_scope, validate_price_list, validate_reference,
    PriceListDraft,
};
use crate::AppState;

/// Query parameters for listing price lists
#[derive(Debug, Default, Deserialize)]
pub struct ListFilter {
    pub company_id: Option<i64>,
}

/// Body for create and update
#[derive(Debug, Clone, Deserialize)]
pub struct PriceListPayload {
    pub company_id: i64,
    pub branch_id: Option<i64>,
    pub name: String,
    pub channel: String,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl PriceListPayload {
    /// Split into the trimmed name and a checked draft
    pub fn into_draft(self) -> Result<(String, PriceListDraft)> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("name must not be empty".to_string()));
        }
        let channel = self.channel.parse().map_err(AppError::BadRequest)?;

        Ok((
            name,
            PriceListDraft {
                company_id: self.company_id,
                branch_id: self.branch_id,
                channel,
                valid_from: self.valid_from,
                valid_to: self.valid_to,
                active: self.active,
            },
        ))
    }
}

/// Body for setting a base price
#[derive(Debug, Deserialize)]
pub struct BasePricePayload {
    pub base_price: Decimal,
}

/// Company must exist; a branch must exist and be the company's
async fn check_scope(state: &AppState, draft: &PriceListDraft) -> Result<()> {
    let company_exists =
        db::reference_exists(&state.db, Reference::Company, draft.company_id).await?;
    validate_reference(Reference::Company.label(), draft.company_id, company_exists)
        .map_err(AppError::Validation)?;

    let branch = match draft.branch_id {
        Some(branch_id) => db::find_branch(&state.db, branch_id).await?,
        None => None,
    };
    validate_branch_scope(draft.company_id, draft.branch_id, branch.as_ref())
        .map_err(AppError::Validation)
}

/// List price lists, optionally for one company
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<PriceListResponse>>> {
    let lists = db::get_price_lists(&state.db, filter.company_id).await?;
    Ok(Json(
        lists
            .into_iter()
            .map(|list| PriceListResponse::new(list, None))
            .collect(),
    ))
}

/// Get one price list
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PriceListResponse>> {
    let list = db::get_price_list(&state.db, id).await?;
    Ok(Json(PriceListResponse::new(list, None)))
}

/// Create a price list
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<PriceListPayload>,
) -> Result<(StatusCode, Json<PriceListResponse>)> {
    let (name, draft) = payload.into_draft()?;
    check_scope(&state, &draft).await?;

    let existing = db::get_price_lists(&state.db, Some(draft.company_id)).await?;
    validate_price_list(&draft, &existing, None).map_err(AppError::Validation)?;

    let list = db::insert_price_list(&state.db, &name, &draft).await?;
    tracing::info!(price_list_id = list.id, channel = %list.channel, "Created price list");

    Ok((StatusCode::CREATED, Json(PriceListResponse::new(list, None))))
}

/// Replace a price list
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<PriceListPayload>,
) -> Result<Json<PriceListResponse>> {
    let (name, draft) = payload.into_draft()?;

    // 404 before validation so a missing id is not reported as a clash
    db::get_price_list(&state.db, id).await?;
    check_scope(&state, &draft).await?;

    let existing = db::get_price_lists(&state.db, Some(draft.company_id)).await?;
    validate_price_list(&draft, &existing, Some(id)).map_err(AppError::Validation)?;

    let list = db::update_price_list(&state.db, id, &name, &draft).await?;
    tracing::info!(price_list_id = list.id, "Updated price list");

    Ok(Json(PriceListResponse::new(list, None)))
}

/// Delete a price list
pub async fn remove(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    db::delete_price_list(&state.db, id).await?;
    tracing::info!(price_list_id = id, "Deleted price list");
    Ok(StatusCode::NO_CONTENT)
}

/// Rules of a list in evaluation order
pub async fn rules(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<DiscountRule>>> {
    db::get_price_list(&state.db, id).await?;
    Ok(Json(db::get_discount_rules(&state.db, id).await?))
}

/// Base prices of a list
pub async fn base_prices(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ItemBasePrice>>> {
    db::get_price_list(&state.db, id).await?;
    Ok(Json(db::get_base_prices(&state.db, id).await?))
}

/// Set the base price of an item in a list
pub async fn set_base_price(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i64, i64)>,
    Json(payload): Json<BasePricePayload>,
) -> Result<Json<ItemBasePrice>> {
    validate_base_price(payload.base_price).map_err(AppError::Validation)?;

    db::get_price_list(&state.db, id).await?;
    db::get_item(&state.db, item_id).await?;

    let price = db::upsert_base_price(&state.db, id, item_id, payload.base_price).await?;
    Ok(Json(price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::models::SalesChannel;
    use crate::pricing::MemoryStore;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn payload(channel: &str, name: &str) -> PriceListPayload {
        PriceListPayload {
            company_id: 1,
            branch_id: Some(2),
            name: name.to_string(),
            channel: channel.to_string(),
            valid_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            valid_to: None,
            active: true,
        }
    }

    fn app() -> axum::Router {
        let db = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/pricing_test")
            .unwrap();
        crate::app(AppState {
            db,
            store: Arc::new(MemoryStore::new()),
        })
    }

    async fn send(method: Method, uri: &str, body: &str) -> StatusCode {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        app().oneshot(request).await.unwrap().status()
    }

    #[test]
    fn test_into_draft() {
        let (name, draft) = payload("ecommerce", "  Lima online ").into_draft().unwrap();
        assert_eq!(name, "Lima online");
        assert_eq!(draft.channel, SalesChannel::Ecommerce);
        assert!(draft.active);
    }

    #[test]
    fn test_into_draft_rejects_unknown_channel() {
        assert!(matches!(
            payload("phone", "List").into_draft(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_into_draft_rejects_blank_name() {
        assert!(payload("STORE", "   ").into_draft().is_err());
    }

    #[test]
    fn test_payload_defaults_to_active() {
        let payload: PriceListPayload = serde_json::from_str(
            r#"{"company_id":1,"name":"Base","channel":"ALL","valid_from":"2024-01-01"}"#,
        )
        .unwrap();
        assert!(payload.active);
        assert_eq!(payload.branch_id, None);
    }

    #[tokio::test]
    async fn test_create_with_unknown_channel_is_bad_request() {
        let status = send(
            Method::POST,
            "/api/price-lists",
            r#"{"company_id":1,"name":"Base","channel":"phone","valid_from":"2024-01-01"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_zero_base_price_is_rejected() {
        let status = send(Method::PUT, "/api/price-lists/1/prices/2", r#"{"base_price":"0"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
