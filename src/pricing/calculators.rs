//! Core pricing calculation functions.
//!
//! Pure functions for pricing math - no database access. The rule engine is a
//! single ordered fold over the priority-sorted rules of one price list.

use std::collections::{HashMap, HashSet};

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::models::Item;

use super::models::{DiscountKind, DiscountRule, RuleCondition, RuleTarget};

/// Marker appended to the applied rules when the cost floor raised the price
pub const COST_FLOOR_MARKER: &str = "Adjusted to minimum cost";

/// Round to specified decimal places using banker's rounding (ROUND_HALF_EVEN).
///
/// Banker's rounding rounds to the nearest even number when the value is exactly
/// halfway between two possibilities. This reduces cumulative rounding bias.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use pricelist_engine::pricing::round_money;
///
/// assert_eq!(round_money(dec!(2.5), 0), dec!(2));   // rounds to even
/// assert_eq!(round_money(dec!(3.5), 0), dec!(4));   // rounds to even
/// assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
}

/// Build the effective cart: the supplied ids plus the item being priced
pub fn effective_cart(item_id: i64, cart_item_ids: &[i64]) -> HashSet<i64> {
    let mut cart: HashSet<i64> = cart_item_ids.iter().copied().collect();
    cart.insert(item_id);
    cart
}

/// Everything a rule can be checked against
#[derive(Debug, Clone)]
pub struct RuleContext<'a> {
    pub item: &'a Item,
    pub quantity: i32,
    pub order_amount: Decimal,
    pub cart: &'a HashSet<i64>,
    /// Combination id -> member item ids
    pub combinations: &'a HashMap<i64, HashSet<i64>>,
}

/// Running state after all rules were folded in
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub price: Decimal,
    pub applied_rules: Vec<String>,
    pub below_cost_permitted: bool,
}

/// Unit price after the cost floor
#[derive(Debug, Clone, PartialEq)]
pub struct FlooredPrice {
    pub price: Decimal,
    pub applied_rules: Vec<String>,
    pub authorized_below_cost: bool,
}

/// Apply every matching rule to `base_price`, lowest priority first.
///
/// Equal priorities keep id order. The price never drops below zero and the
/// below-cost permission, once granted by an applied rule, is never revoked.
pub fn apply_rules(
    base_price: Decimal,
    rules: &[DiscountRule],
    ctx: &RuleContext<'_>,
) -> RuleOutcome {
    let mut ordered: Vec<&DiscountRule> = rules.iter().collect();
    ordered.sort_by_key(|rule| (rule.priority, rule.id));

    ordered.into_iter().fold(
        RuleOutcome {
            price: base_price,
            applied_rules: Vec::new(),
            below_cost_permitted: false,
        },
        |mut outcome, rule| {
            if !rule_matches(rule, ctx) {
                debug!(rule_id = rule.id, rule = %rule.name, "Rule skipped");
                return outcome;
            }

            outcome.price = apply_discount(outcome.price, rule);
            outcome.applied_rules.push(rule.name.clone());
            outcome.below_cost_permitted |= rule.allows_below_cost;

            debug!(rule_id = rule.id, rule = %rule.name, price = %outcome.price, "Rule applied");
            outcome
        },
    )
}

/// Target gate followed by condition gate
fn rule_matches(rule: &DiscountRule, ctx: &RuleContext<'_>) -> bool {
    match rule.target {
        // Bundle rules carry their own trigger: the stated condition is ignored
        RuleTarget::Combination(combination_id) => {
            combination_complete(combination_id, ctx.item.id, ctx.cart, ctx.combinations)
        }
        RuleTarget::General => condition_met(rule, ctx),
        RuleTarget::Item(item_id) => item_id == ctx.item.id && condition_met(rule, ctx),
        RuleTarget::Group(group_id) => group_id == ctx.item.group_id && condition_met(rule, ctx),
        RuleTarget::Line(line_id) => line_id == ctx.item.line_id && condition_met(rule, ctx),
    }
}

/// The priced item belongs to the bundle and every member is in the cart
fn combination_complete(
    combination_id: i64,
    item_id: i64,
    cart: &HashSet<i64>,
    combinations: &HashMap<i64, HashSet<i64>>,
) -> bool {
    match combinations.get(&combination_id) {
        Some(members) => members.contains(&item_id) && members.is_subset(cart),
        None => false,
    }
}

fn condition_met(rule: &DiscountRule, ctx: &RuleContext<'_>) -> bool {
    match rule.condition {
        RuleCondition::MinQuantity => Decimal::from(ctx.quantity) >= rule.threshold,
        RuleCondition::MinOrderAmount => ctx.order_amount >= rule.threshold,
    }
}

fn apply_discount(price: Decimal, rule: &DiscountRule) -> Decimal {
    let discounted = match rule.kind {
        DiscountKind::Percentage => price - price * (rule.value / Decimal::ONE_HUNDRED),
        DiscountKind::FixedAmount => price - rule.value,
    };
    discounted.max(Decimal::ZERO)
}

/// Keep the unit price at or above `last_cost` unless an applied rule allowed
/// selling below it.
///
/// The comparison uses the price as it will be reported, rounded to cents, so
/// `authorized_below_cost` is only set when the reported price is under cost.
pub fn enforce_cost_floor(outcome: RuleOutcome, last_cost: Decimal) -> FlooredPrice {
    let RuleOutcome {
        price,
        mut applied_rules,
        below_cost_permitted,
    } = outcome;

    if to_cents(price) >= last_cost {
        return FlooredPrice {
            price,
            applied_rules,
            authorized_below_cost: false,
        };
    }

    if below_cost_permitted {
        return FlooredPrice {
            price,
            applied_rules,
            authorized_below_cost: true,
        };
    }

    info!(%price, %last_cost, "Price below cost without permission, raising to cost");
    applied_rules.push(COST_FLOOR_MARKER.to_string());
    FlooredPrice {
        price: last_cost,
        applied_rules,
        authorized_below_cost: false,
    }
}

/// Round to cents and always carry two decimal places
pub fn to_cents(amount: Decimal) -> Decimal {
    let mut cents = round_money(amount, 2);
    cents.rescale(2);
    cents
}

/// Line total for `quantity` units, rounded once to cents
pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    to_cents(unit_price * Decimal::from(quantity))
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_rule() -> impl Strategy<Value = DiscountRule> {
        (
            1i64..50,
            any::<bool>(),
            0u32..=10_000u32,
            0i32..5,
            any::<bool>(),
            0u32..4,
        )
            .prop_map(|(id, pct, value_cents, priority, below_cost, threshold)| DiscountRule {
                id,
                price_list_id: 1,
                name: format!("Rule {}", id),
                kind: if pct {
                    DiscountKind::Percentage
                } else {
                    DiscountKind::FixedAmount
                },
                value: if pct {
                    Decimal::from(value_cents % 101)
                } else {
                    Decimal::new(value_cents as i64, 2)
                },
                condition: RuleCondition::MinQuantity,
                threshold: Decimal::from(threshold),
                target: RuleTarget::General,
                priority,
                allows_below_cost: below_cost,
            })
    }

    proptest! {
        /// Reported price is never negative and never under cost unless authorized
        #[test]
        fn prop_price_respects_floor(
            base_cents in 1u32..1_000_000u32,
            cost_cents in 0u32..1_000_000u32,
            quantity in 1i32..10,
            rules in prop::collection::vec(arb_rule(), 0..8),
        ) {
            let item = Item::new(1, 1, 1, "SKU", Decimal::new(cost_cents as i64, 2));
            let cart = effective_cart(item.id, &[]);
            let combinations = HashMap::new();
            let ctx = RuleContext {
                item: &item,
                quantity,
                order_amount: Decimal::ZERO,
                cart: &cart,
                combinations: &combinations,
            };

            let outcome = apply_rules(Decimal::new(base_cents as i64, 2), &rules, &ctx);
            prop_assert!(outcome.price >= Decimal::ZERO);

            let floored = enforce_cost_floor(outcome.clone(), item.last_cost);
            prop_assert!(floored.price >= Decimal::ZERO);
            if floored.authorized_below_cost {
                prop_assert!(to_cents(floored.price) < item.last_cost);
            } else {
                prop_assert!(to_cents(floored.price) >= item.last_cost);
            }
            if floored.authorized_below_cost {
                prop_assert!(outcome.below_cost_permitted);
            }
        }

        /// Same input, same output regardless of the order rules are supplied in
        #[test]
        fn prop_rule_order_is_deterministic(
            rules in prop::collection::vec(arb_rule(), 0..8),
        ) {
            let item = Item::new(1, 1, 1, "SKU", Decimal::ZERO);
            let cart = effective_cart(item.id, &[]);
            let combinations = HashMap::new();
            let ctx = RuleContext {
                item: &item,
                quantity: 3,
                order_amount: Decimal::ZERO,
                cart: &cart,
                combinations: &combinations,
            };

            // Ids must be unique for the tiebreak to be total
            let mut unique = rules;
            unique.sort_by_key(|r| r.id);
            unique.dedup_by_key(|r| r.id);
            let mut reversed = unique.clone();
            reversed.reverse();

            let a = apply_rules(Decimal::from(1000), &unique, &ctx);
            let b = apply_rules(Decimal::from(1000), &reversed, &ctx);
            prop_assert_eq!(a, b);
        }
    }
}
