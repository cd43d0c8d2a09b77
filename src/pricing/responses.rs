//! Response DTOs for pricing API endpoints.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::models::{PriceList, SalesChannel};
use super::resolver::ResolutionTier;
use super::services::PriceCalculation;

/// Resolved price list
#[derive(Debug, Serialize)]
pub struct PriceListResponse {
    pub id: i64,
    pub company_id: i64,
    pub branch_id: Option<i64>,
    pub name: String,
    pub channel: SalesChannel,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_tier: Option<ResolutionTier>,
}

impl PriceListResponse {
    pub fn new(list: PriceList, resolved_tier: Option<ResolutionTier>) -> Self {
        Self {
            id: list.id,
            company_id: list.company_id,
            branch_id: list.branch_id,
            name: list.name,
            channel: list.channel,
            valid_from: list.valid_from,
            valid_to: list.valid_to,
            active: list.active,
            resolved_tier,
        }
    }
}

/// Response for price calculation
#[derive(Debug, Serialize)]
pub struct PriceCalculationResponse {
    pub price_list: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub final_price: Decimal,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
    pub applied_rules: Vec<String>,
    pub authorized_below_cost: bool,
}

impl From<PriceCalculation> for PriceCalculationResponse {
    fn from(calc: PriceCalculation) -> Self {
        Self {
            price_list: calc.price_list_name,
            base_price: calc.base_price,
            final_price: calc.final_price,
            quantity: calc.quantity,
            total: calc.total,
            applied_rules: calc.applied_rules,
            authorized_below_cost: calc.authorized_below_cost,
        }
    }
}

/// Generic pricing error response. `final_price` is always null.
#[derive(Debug, Serialize)]
pub struct PricingErrorResponse {
    pub error_type: String,
    pub message: String,
    pub final_price: Option<Decimal>,
}
