//! Discount rule administration

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::db::{self, Reference};
use crate::error::{AppError, Result};
use crate::pricing::models::{DiscountKind, DiscountRule, RuleCondition, RuleTarget};
use crate::pricing::validation::{
    validate_combination_scope, validate_reference, validate_rule, RuleDraft,
};
use crate::AppState;

/// Body for creating or replacing a rule
#[derive(Debug, Clone, Deserialize)]
pub struct DiscountRulePayload {
    pub price_list_id: i64,
    pub name: String,
    pub kind: String,
    pub value: Decimal,
    #[serde(default = "default_condition")]
    pub condition: String,
    #[serde(default)]
    pub threshold: Decimal,
    pub item_id: Option<i64>,
    pub group_id: Option<i64>,
    pub line_id: Option<i64>,
    pub combination_id: Option<i64>,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub allows_below_cost: bool,
}

fn default_condition() -> String {
    RuleCondition::MinQuantity.as_str().to_string()
}

fn default_priority() -> i32 {
    10
}

impl DiscountRulePayload {
    /// Parse and validate into an unsaved rule
    pub fn into_rule(self) -> Result<DiscountRule> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("name must not be empty".to_string()));
        }
        let kind: DiscountKind = self.kind.parse().map_err(AppError::BadRequest)?;
        let condition: RuleCondition = self.condition.parse().map_err(AppError::BadRequest)?;

        let target = validate_rule(&RuleDraft {
            kind,
            value: self.value,
            threshold: self.threshold,
            item_id: self.item_id,
            group_id: self.group_id,
            line_id: self.line_id,
            combination_id: self.combination_id,
        })
        .map_err(AppError::Validation)?;

        Ok(DiscountRule {
            id: 0,
            price_list_id: self.price_list_id,
            name,
            kind,
            value: self.value,
            condition,
            threshold: self.threshold,
            target,
            priority: self.priority,
            allows_below_cost: self.allows_below_cost,
        })
    }
}

/// Catalog row a target points at, if it is one
fn catalog_reference(target: &RuleTarget) -> Option<(Reference, i64)> {
    match *target {
        RuleTarget::Item(id) => Some((Reference::Item, id)),
        RuleTarget::Group(id) => Some((Reference::ItemGroup, id)),
        RuleTarget::Line(id) => Some((Reference::ItemLine, id)),
        RuleTarget::General | RuleTarget::Combination(_) => None,
    }
}

/// The list and target must exist; a bundle must belong to the rule's list
async fn check_references(state: &AppState, rule: &DiscountRule) -> Result<()> {
    let list_exists =
        db::reference_exists(&state.db, Reference::PriceList, rule.price_list_id).await?;
    validate_reference(Reference::PriceList.label(), rule.price_list_id, list_exists)
        .map_err(AppError::Validation)?;

    if let Some((reference, id)) = catalog_reference(&rule.target) {
        let exists = db::reference_exists(&state.db, reference, id).await?;
        validate_reference(reference.label(), id, exists).map_err(AppError::Validation)?;
    }

    if let RuleTarget::Combination(combination_id) = rule.target {
        let combination = db::find_combination(&state.db, combination_id).await?;
        validate_combination_scope(rule.price_list_id, combination_id, combination.as_ref())
            .map_err(AppError::Validation)?;
    }

    Ok(())
}

/// Create a rule
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<DiscountRulePayload>,
) -> Result<(StatusCode, Json<DiscountRule>)> {
    let draft = payload.into_rule()?;
    check_references(&state, &draft).await?;

    let rule = db::insert_discount_rule(&state.db, &draft).await?;
    tracing::info!(
        rule_id = rule.id,
        price_list_id = rule.price_list_id,
        target = ?rule.target,
        "Created discount rule"
    );

    Ok((StatusCode::CREATED, Json(rule)))
}

/// Replace a rule
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<DiscountRulePayload>,
) -> Result<Json<DiscountRule>> {
    let draft = payload.into_rule()?;
    check_references(&state, &draft).await?;

    let rule = db::update_discount_rule(&state.db, id, &draft).await?;
    tracing::info!(
        rule_id = rule.id,
        price_list_id = rule.price_list_id,
        target = ?rule.target,
        "Updated discount rule"
    );

    Ok(Json(rule))
}

/// Delete a rule
pub async fn remove(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    db::delete_discount_rule(&state.db, id).await?;
    tracing::info!(rule_id = id, "Deleted discount rule");
    Ok(StatusCode::NO_CONTENT)
}
