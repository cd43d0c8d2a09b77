//! Pricing API routes

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Local;

use crate::AppState;

use super::requests::{ActiveListParams, CalculatePriceParams};
use super::responses::{PriceCalculationResponse, PriceListResponse, PricingErrorResponse};
use super::services::{self, PricingError};

/// Routes mounted under `/api/pricing`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/active-list", get(active_list))
        .route("/calculate", get(calculate))
}

impl IntoResponse for PricingError {
    fn into_response(self) -> Response {
        let status = match &self {
            PricingError::NoApplicableList
            | PricingError::NoBasePriceForItem { .. }
            | PricingError::ItemNotFound { .. } => StatusCode::NOT_FOUND,
            PricingError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PricingError::Store(e) => {
                tracing::error!("Pricing store error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            PricingError::Store(_) => "Data store error".to_string(),
            other => other.to_string(),
        };

        let body = PricingErrorResponse {
            error_type: self.error_type().to_string(),
            message,
            final_price: None,
        };

        (status, Json(body)).into_response()
    }
}

/// Resolve the price list that applies today
async fn active_list(
    State(state): State<AppState>,
    Query(params): Query<ActiveListParams>,
) -> Result<Json<PriceListResponse>, PricingError> {
    let query = params.into_query(Local::now().date_naive())?;

    let (list, tier) = services::resolve_active_list(state.store.as_ref(), &query)
        .await?
        .ok_or(PricingError::NoApplicableList)?;

    Ok(Json(PriceListResponse::new(list, Some(tier))))
}

/// Calculate the final price of one item
async fn calculate(
    State(state): State<AppState>,
    Query(params): Query<CalculatePriceParams>,
) -> Result<Json<PriceCalculationResponse>, PricingError> {
    let request = params.into_request(Local::now().date_naive())?;
    let calculation = services::calculate_final_price(state.store.as_ref(), &request).await?;
    Ok(Json(calculation.into()))
}
