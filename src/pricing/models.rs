//! Pricing models.
//!
//! Row types use sqlx's FromRow derive for direct database deserialization.
//! Discount rules are read as `DiscountRuleRow` and converted into the domain
//! `DiscountRule`, whose target is a single tagged variant.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::warn;

/// Sales channel a price list is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalesChannel {
    /// Applies to every channel
    All,
    Ecommerce,
    Store,
}

impl SalesChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesChannel::All => "ALL",
            SalesChannel::Ecommerce => "ECOMMERCE",
            SalesChannel::Store => "STORE",
        }
    }
}

impl fmt::Display for SalesChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SalesChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(SalesChannel::All),
            "ECOMMERCE" => Ok(SalesChannel::Ecommerce),
            "STORE" => Ok(SalesChannel::Store),
            other => Err(format!("unknown sales channel '{}'", other)),
        }
    }
}

impl TryFrom<String> for SalesChannel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Price list from price_lists
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PriceList {
    pub id: i64,
    pub company_id: i64,
    /// `None` means the list applies company-wide
    pub branch_id: Option<i64>,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub channel: SalesChannel,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
    pub active: bool,
}

impl PriceList {
    /// Check if the list is active and its validity window covers `date`.
    /// Both bounds are inclusive; an open end never expires.
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        if !self.active {
            return false;
        }
        if self.valid_from > date {
            return false;
        }
        match self.valid_to {
            Some(end) => date <= end,
            None => true,
        }
    }
}

/// Base price of one item inside one list, from item_base_prices
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ItemBasePrice {
    pub id: i64,
    pub price_list_id: i64,
    pub item_id: i64,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_price: Decimal,
}

/// Named bundle of items, from combinations
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Combination {
    pub id: i64,
    pub price_list_id: i64,
    pub name: String,
}

/// Bundle together with its member item ids
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CombinationDetail {
    pub id: i64,
    pub price_list_id: i64,
    pub name: String,
    pub item_ids: Vec<i64>,
}

/// How a rule changes the running price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    /// `value` is a whole-number percentage (30 = 30%)
    Percentage,
    FixedAmount,
}

impl DiscountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountKind::Percentage => "PERCENTAGE",
            DiscountKind::FixedAmount => "FIXED_AMOUNT",
        }
    }
}

impl FromStr for DiscountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PERCENTAGE" => Ok(DiscountKind::Percentage),
            "FIXED_AMOUNT" => Ok(DiscountKind::FixedAmount),
            other => Err(format!("unknown discount kind '{}'", other)),
        }
    }
}

/// What has to hold for a rule to fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleCondition {
    MinQuantity,
    MinOrderAmount,
}

impl RuleCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCondition::MinQuantity => "MIN_QUANTITY",
            RuleCondition::MinOrderAmount => "MIN_ORDER_AMOUNT",
        }
    }
}

impl FromStr for RuleCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MIN_QUANTITY" => Ok(RuleCondition::MinQuantity),
            "MIN_ORDER_AMOUNT" => Ok(RuleCondition::MinOrderAmount),
            other => Err(format!("unknown rule condition '{}'", other)),
        }
    }
}

/// Which items a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum RuleTarget {
    /// Applies to any item
    General,
    Item(i64),
    Group(i64),
    Line(i64),
    Combination(i64),
}

impl RuleTarget {
    /// Combination targeting wins over item, group and line targeting.
    /// Returns the target and whether the row carried conflicting targets.
    pub fn from_columns(
        item_id: Option<i64>,
        group_id: Option<i64>,
        line_id: Option<i64>,
        combination_id: Option<i64>,
    ) -> (Self, bool) {
        let set = [item_id, group_id, line_id, combination_id]
            .iter()
            .filter(|id| id.is_some())
            .count();

        let target = match (combination_id, item_id, group_id, line_id) {
            (Some(id), _, _, _) => RuleTarget::Combination(id),
            (None, Some(id), _, _) => RuleTarget::Item(id),
            (None, None, Some(id), _) => RuleTarget::Group(id),
            (None, None, None, Some(id)) => RuleTarget::Line(id),
            (None, None, None, None) => RuleTarget::General,
        };

        (target, set > 1)
    }

    /// Split back into (item, group, line, combination) columns
    pub fn to_columns(&self) -> (Option<i64>, Option<i64>, Option<i64>, Option<i64>) {
        match *self {
            RuleTarget::General => (None, None, None, None),
            RuleTarget::Item(id) => (Some(id), None, None, None),
            RuleTarget::Group(id) => (None, Some(id), None, None),
            RuleTarget::Line(id) => (None, None, Some(id), None),
            RuleTarget::Combination(id) => (None, None, None, Some(id)),
        }
    }
}

/// Discount rule row from discount_rules
#[derive(Debug, Clone, FromRow)]
pub struct DiscountRuleRow {
    pub id: i64,
    pub price_list_id: i64,
    pub name: String,
    pub kind: String,
    pub value: Decimal,
    pub condition_kind: String,
    pub threshold: Decimal,
    pub item_id: Option<i64>,
    pub group_id: Option<i64>,
    pub line_id: Option<i64>,
    pub combination_id: Option<i64>,
    pub priority: i32,
    pub allows_below_cost: bool,
}

/// Discount rule ready for evaluation
#[derive(Debug, Clone, Serialize)]
pub struct DiscountRule {
    pub id: i64,
    pub price_list_id: i64,
    pub name: String,
    pub kind: DiscountKind,
    #[serde(with = "rust_decimal::serde::str")]
    pub value: Decimal,
    pub condition: RuleCondition,
    #[serde(with = "rust_decimal::serde::str")]
    pub threshold: Decimal,
    pub target: RuleTarget,
    /// Lower runs first
    pub priority: i32,
    pub allows_below_cost: bool,
}

impl TryFrom<DiscountRuleRow> for DiscountRule {
    type Error = String;

    fn try_from(row: DiscountRuleRow) -> Result<Self, Self::Error> {
        let (target, conflicting) =
            RuleTarget::from_columns(row.item_id, row.group_id, row.line_id, row.combination_id);
        if conflicting {
            warn!(
                rule_id = row.id,
                ?target,
                "Discount rule has more than one target set, using the highest precedence one"
            );
        }

        Ok(DiscountRule {
            id: row.id,
            price_list_id: row.price_list_id,
            name: row.name,
            kind: row.kind.parse()?,
            value: row.value,
            condition: row.condition_kind.parse()?,
            threshold: row.threshold,
            target,
            priority: row.priority,
            allows_below_cost: row.allows_below_cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn list(valid_from: NaiveDate, valid_to: Option<NaiveDate>, active: bool) -> PriceList {
        PriceList {
            id: 1,
            company_id: 1,
            branch_id: None,
            name: "Base".to_string(),
            channel: SalesChannel::All,
            valid_from,
            valid_to,
            active,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_sales_channel_parse_is_case_insensitive() {
        assert_eq!("ecommerce".parse::<SalesChannel>(), Ok(SalesChannel::Ecommerce));
        assert_eq!(" Store ".parse::<SalesChannel>(), Ok(SalesChannel::Store));
        assert_eq!("ALL".parse::<SalesChannel>(), Ok(SalesChannel::All));
        assert!("phone".parse::<SalesChannel>().is_err());
    }

    #[test]
    fn test_sales_channel_round_trips_through_str() {
        for channel in [SalesChannel::All, SalesChannel::Ecommerce, SalesChannel::Store] {
            assert_eq!(channel.as_str().parse::<SalesChannel>(), Ok(channel));
        }
    }

    #[test]
    fn test_is_valid_on_inclusive_bounds() {
        let l = list(date(2024, 1, 1), Some(date(2024, 1, 31)), true);
        assert!(l.is_valid_on(date(2024, 1, 1)));
        assert!(l.is_valid_on(date(2024, 1, 31)));
        assert!(!l.is_valid_on(date(2023, 12, 31)));
        assert!(!l.is_valid_on(date(2024, 2, 1)));
    }

    #[test]
    fn test_is_valid_on_open_ended() {
        let l = list(date(2024, 1, 1), None, true);
        assert!(l.is_valid_on(date(2099, 12, 31)));
    }

    #[test]
    fn test_is_valid_on_inactive() {
        let l = list(date(2024, 1, 1), None, false);
        assert!(!l.is_valid_on(date(2024, 6, 1)));
    }

    #[test]
    fn test_rule_target_combination_takes_precedence() {
        let (target, conflicting) = RuleTarget::from_columns(Some(1), None, None, Some(9));
        assert_eq!(target, RuleTarget::Combination(9));
        assert!(conflicting);
    }

    #[test]
    fn test_rule_target_single_column() {
        assert_eq!(
            RuleTarget::from_columns(None, Some(4), None, None),
            (RuleTarget::Group(4), false)
        );
        assert_eq!(
            RuleTarget::from_columns(None, None, None, None),
            (RuleTarget::General, false)
        );
        assert_eq!(RuleTarget::Line(3).to_columns(), (None, None, Some(3), None));
    }

    #[test]
    fn test_discount_rule_from_row() {
        let row = DiscountRuleRow {
            id: 7,
            price_list_id: 1,
            name: "Bulk".to_string(),
            kind: "fixed_amount".to_string(),
            value: dec!(10.00),
            condition_kind: "MIN_QUANTITY".to_string(),
            threshold: dec!(3),
            item_id: Some(2),
            group_id: None,
            line_id: None,
            combination_id: None,
            priority: 20,
            allows_below_cost: false,
        };

        let rule = DiscountRule::try_from(row).unwrap();
        assert_eq!(rule.kind, DiscountKind::FixedAmount);
        assert_eq!(rule.condition, RuleCondition::MinQuantity);
        assert_eq!(rule.target, RuleTarget::Item(2));
    }

    #[test]
    fn test_discount_rule_from_row_rejects_unknown_kind() {
        let row = DiscountRuleRow {
            id: 7,
            price_list_id: 1,
            name: "Broken".to_string(),
            kind: "BOGO".to_string(),
            value: dec!(1),
            condition_kind: "MIN_QUANTITY".to_string(),
            threshold: dec!(1),
            item_id: None,
            group_id: None,
            line_id: None,
            combination_id: None,
            priority: 1,
            allows_below_cost: false,
        };

        assert!(DiscountRule::try_from(row).is_err());
    }
}
