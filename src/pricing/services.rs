//! Pricing service functions with data store access.
//!
//! Both operations are read-only: they fetch a fresh view of lists, prices and
//! rules through a `PricingStore` and hand it to the pure resolver and
//! calculators.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::calculators::{self, RuleContext};
use super::models::{PriceList, RuleTarget, SalesChannel};
use super::resolver::{self, ResolutionTier};
use super::store::PricingStore;

/// Inputs for list resolution
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub company_id: i64,
    pub channel: SalesChannel,
    pub branch_id: Option<i64>,
    pub as_of: NaiveDate,
}

/// Inputs for a price calculation
#[derive(Debug, Clone)]
pub struct PriceRequest {
    pub list: ListQuery,
    pub item_id: i64,
    pub quantity: i32,
    pub order_amount: Decimal,
    pub cart_item_ids: Vec<i64>,
}

/// Result of a successful price calculation
#[derive(Debug, Clone, PartialEq)]
pub struct PriceCalculation {
    pub price_list_id: i64,
    pub price_list_name: String,
    pub base_price: Decimal,
    pub final_price: Decimal,
    pub quantity: i32,
    pub total: Decimal,
    pub applied_rules: Vec<String>,
    pub authorized_below_cost: bool,
}

/// Pricing calculation error types
#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("No applicable price list was found")]
    NoApplicableList,

    #[error("Item {item_id} has no base price in price list '{list_name}'")]
    NoBasePriceForItem { item_id: i64, list_name: String },

    #[error("Item {item_id} does not exist")]
    ItemNotFound { item_id: i64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Data store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl PricingError {
    /// Stable identifier used in error payloads
    pub fn error_type(&self) -> &'static str {
        match self {
            PricingError::NoApplicableList => "no_applicable_list",
            PricingError::NoBasePriceForItem { .. } => "no_base_price_for_item",
            PricingError::ItemNotFound { .. } => "item_not_found",
            PricingError::InvalidInput(_) => "invalid_input",
            PricingError::Store(_) => "store_error",
        }
    }
}

/// Find the active price list for a company, channel and optional branch.
///
/// `Ok(None)` is a normal outcome: nothing applies.
pub async fn resolve_active_list(
    store: &dyn PricingStore,
    query: &ListQuery,
) -> Result<Option<(PriceList, ResolutionTier)>, PricingError> {
    let candidates = store
        .find_active_lists(query.company_id, query.branch_id, query.channel, query.as_of)
        .await?;

    let resolved = resolver::select_list(
        &candidates,
        query.company_id,
        query.channel,
        query.branch_id,
        query.as_of,
    )
    .map(|(list, tier)| (list.clone(), tier));

    match &resolved {
        Some((list, tier)) => debug!(
            company_id = query.company_id,
            channel = %query.channel,
            branch_id = ?query.branch_id,
            list_id = list.id,
            ?tier,
            "Price list resolved"
        ),
        None => debug!(
            company_id = query.company_id,
            channel = %query.channel,
            branch_id = ?query.branch_id,
            candidates = candidates.len(),
            "No applicable price list"
        ),
    }

    Ok(resolved)
}

/// Calculate the final unit price and line total for one item.
///
/// Steps: resolve the list, look up the base price, fold the list's rules in
/// priority order, then enforce the item's cost floor.
pub async fn calculate_final_price(
    store: &dyn PricingStore,
    request: &PriceRequest,
) -> Result<PriceCalculation, PricingError> {
    let (list, _) = resolve_active_list(store, &request.list)
        .await?
        .ok_or(PricingError::NoApplicableList)?;

    let base = store
        .get_base_price(list.id, request.item_id)
        .await?
        .ok_or_else(|| PricingError::NoBasePriceForItem {
            item_id: request.item_id,
            list_name: list.name.clone(),
        })?;

    let item = store
        .get_item(request.item_id)
        .await?
        .ok_or(PricingError::ItemNotFound {
            item_id: request.item_id,
        })?;

    let rules = store.get_rules_for_list(list.id).await?;

    // Only bundles referenced by this list's rules are needed
    let mut combinations: HashMap<i64, HashSet<i64>> = HashMap::new();
    for rule in &rules {
        if let RuleTarget::Combination(combination_id) = rule.target {
            if !combinations.contains_key(&combination_id) {
                let members = store.get_combination_members(combination_id).await?;
                combinations.insert(combination_id, members);
            }
        }
    }

    let cart = calculators::effective_cart(item.id, &request.cart_item_ids);
    let ctx = RuleContext {
        item: &item,
        quantity: request.quantity,
        order_amount: request.order_amount,
        cart: &cart,
        combinations: &combinations,
    };

    let outcome = calculators::apply_rules(base.base_price, &rules, &ctx);
    let floored = calculators::enforce_cost_floor(outcome, item.last_cost);

    let calculation = PriceCalculation {
        price_list_id: list.id,
        price_list_name: list.name,
        base_price: base.base_price,
        final_price: calculators::to_cents(floored.price),
        quantity: request.quantity,
        total: calculators::line_total(floored.price, request.quantity),
        applied_rules: floored.applied_rules,
        authorized_below_cost: floored.authorized_below_cost,
    };

    info!(
        list_id = calculation.price_list_id,
        item_id = request.item_id,
        quantity = request.quantity,
        final_price = %calculation.final_price,
        rules = calculation.applied_rules.len(),
        "Price calculated"
    );

    Ok(calculation)
}
