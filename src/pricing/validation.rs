//! Configuration checks run before price lists and rules are stored.
//!
//! The engine assumes at most one list wins per (company, branch, channel,
//! date); these checks keep the data in that shape.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::Branch;

use super::models::{Combination, DiscountKind, PriceList, RuleTarget, SalesChannel};

/// Fields of a price list being created or updated
#[derive(Debug, Clone)]
pub struct PriceListDraft {
    pub company_id: i64,
    pub branch_id: Option<i64>,
    pub channel: SalesChannel,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
    pub active: bool,
}

/// Fields of a discount rule being created
#[derive(Debug, Clone)]
pub struct RuleDraft {
    pub kind: DiscountKind,
    pub value: Decimal,
    pub threshold: Decimal,
    pub item_id: Option<i64>,
    pub group_id: Option<i64>,
    pub line_id: Option<i64>,
    pub combination_id: Option<i64>,
}

/// Closed date ranges, `None` end meaning open-ended
fn ranges_overlap(
    a_from: NaiveDate,
    a_to: Option<NaiveDate>,
    b_from: NaiveDate,
    b_to: Option<NaiveDate>,
) -> bool {
    let a_starts_before_b_ends = b_to.map_or(true, |end| a_from <= end);
    let b_starts_before_a_ends = a_to.map_or(true, |end| b_from <= end);
    a_starts_before_b_ends && b_starts_before_a_ends
}

/// Validate a list against the lists already stored for the same company.
///
/// `editing_id` excludes the list being updated from the comparison.
pub fn validate_price_list(
    draft: &PriceListDraft,
    existing: &[PriceList],
    editing_id: Option<i64>,
) -> Result<(), String> {
    if let Some(end) = draft.valid_to {
        if end < draft.valid_from {
            return Err("valid_to must not be earlier than valid_from".to_string());
        }
    }

    // Inactive lists never compete
    if !draft.active {
        return Ok(());
    }

    let clash = existing.iter().find(|other| {
        Some(other.id) != editing_id
            && other.active
            && other.company_id == draft.company_id
            && other.branch_id == draft.branch_id
            && other.channel == draft.channel
            && ranges_overlap(draft.valid_from, draft.valid_to, other.valid_from, other.valid_to)
    });

    match clash {
        Some(other) => Err(format!(
            "Validity dates overlap with existing price list '{}' (ID: {})",
            other.name, other.id
        )),
        None => Ok(()),
    }
}

/// Validate a rule and resolve its single target
pub fn validate_rule(draft: &RuleDraft) -> Result<RuleTarget, String> {
    if draft.value < Decimal::ZERO {
        return Err("value must not be negative".to_string());
    }
    if draft.kind == DiscountKind::Percentage && draft.value > Decimal::ONE_HUNDRED {
        return Err("a percentage value must not exceed 100".to_string());
    }
    if draft.threshold < Decimal::ZERO {
        return Err("threshold must not be negative".to_string());
    }

    let (target, conflicting) = RuleTarget::from_columns(
        draft.item_id,
        draft.group_id,
        draft.line_id,
        draft.combination_id,
    );
    if conflicting {
        return Err(
            "a rule may target at most one of item, group, line or combination".to_string(),
        );
    }

    Ok(target)
}

/// Base prices must be positive
pub fn validate_base_price(price: Decimal) -> Result<(), String> {
    if price <= Decimal::ZERO {
        return Err("base price must be greater than zero".to_string());
    }
    Ok(())
}

/// A row referenced by id must exist
pub fn validate_reference(label: &str, id: i64, exists: bool) -> Result<(), String> {
    if exists {
        Ok(())
    } else {
        Err(format!("{} {} does not exist", label, id))
    }
}

/// A list's branch must exist and belong to the list's company
pub fn validate_branch_scope(
    company_id: i64,
    branch_id: Option<i64>,
    branch: Option<&Branch>,
) -> Result<(), String> {
    let Some(branch_id) = branch_id else {
        return Ok(());
    };
    match branch {
        None => Err(format!("branch {} does not exist", branch_id)),
        Some(b) if b.company_id != company_id => Err(format!(
            "branch {} belongs to company {}, not {}",
            branch_id, b.company_id, company_id
        )),
        Some(_) => Ok(()),
    }
}

/// A bundle rule may only use a bundle of its own price list
pub fn validate_combination_scope(
    price_list_id: i64,
    combination_id: i64,
    combination: Option<&Combination>,
) -> Result<(), String> {
    match combination {
        None => Err(format!("combination {} does not exist", combination_id)),
        Some(c) if c.price_list_id != price_list_id => Err(format!(
            "combination {} belongs to price list {}, not {}",
            combination_id, c.price_list_id, price_list_id
        )),
        Some(_) => Ok(()),
    }
}

/// Bundle members must be priced in the bundle's list
pub fn validate_combination_members(
    price_list_id: i64,
    item_ids: &[i64],
    priced: &HashSet<i64>,
) -> Result<(), String> {
    match item_ids.iter().find(|id| !priced.contains(id)) {
        Some(id) => Err(format!(
            "item {} has no base price in price list {}",
            id, price_list_id
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stored(id: i64, from: NaiveDate, to: Option<NaiveDate>) -> PriceList {
        PriceList {
            id,
            company_id: 1,
            branch_id: Some(10),
            name: format!("List {}", id),
            channel: SalesChannel::Ecommerce,
            valid_from: from,
            valid_to: to,
            active: true,
        }
    }

    fn draft(from: NaiveDate, to: Option<NaiveDate>) -> PriceListDraft {
        PriceListDraft {
            company_id: 1,
            branch_id: Some(10),
            channel: SalesChannel::Ecommerce,
            valid_from: from,
            valid_to: to,
            active: true,
        }
    }

    #[test]
    fn test_overlap_detected_and_named() {
        let existing = vec![stored(3, date(2024, 1, 1), Some(date(2024, 1, 31)))];
        let err = validate_price_list(&draft(date(2024, 1, 31), None), &existing, None).unwrap_err();
        assert!(err.contains("'List 3' (ID: 3)"));
    }

    #[test]
    fn test_adjacent_ranges_do_not_overlap() {
        let existing = vec![stored(3, date(2024, 1, 1), Some(date(2024, 1, 31)))];
        assert!(validate_price_list(&draft(date(2024, 2, 1), None), &existing, None).is_ok());
    }

    #[test]
    fn test_open_ended_existing_blocks_later_lists() {
        let existing = vec![stored(3, date(2024, 1, 1), None)];
        let later = draft(date(2030, 1, 1), Some(date(2030, 12, 31)));
        assert!(validate_price_list(&later, &existing, None).is_err());
    }

    #[test]
    fn test_enclosing_range_overlaps() {
        let existing = vec![stored(3, date(2024, 3, 1), Some(date(2024, 3, 10)))];
        let wide = draft(date(2024, 1, 1), Some(date(2024, 12, 31)));
        assert!(validate_price_list(&wide, &existing, None).is_err());
    }

    #[test]
    fn test_different_scope_does_not_compete() {
        let mut other_channel = stored(3, date(2024, 1, 1), None);
        other_channel.channel = SalesChannel::Store;
        let mut company_wide = stored(4, date(2024, 1, 1), None);
        company_wide.branch_id = None;
        let mut inactive = stored(5, date(2024, 1, 1), None);
        inactive.active = false;

        let existing = vec![other_channel, company_wide, inactive];
        assert!(validate_price_list(&draft(date(2024, 1, 1), None), &existing, None).is_ok());
    }

    #[test]
    fn test_update_does_not_clash_with_itself() {
        let existing = vec![stored(3, date(2024, 1, 1), None)];
        let edit = draft(date(2024, 2, 1), None);
        assert!(validate_price_list(&edit, &existing, Some(3)).is_ok());
    }

    #[test]
    fn test_end_before_start_rejected() {
        let bad = draft(date(2024, 2, 1), Some(date(2024, 1, 1)));
        assert!(validate_price_list(&bad, &[], None).is_err());
    }

    fn rule_draft() -> RuleDraft {
        RuleDraft {
            kind: DiscountKind::Percentage,
            value: dec!(30),
            threshold: dec!(1),
            item_id: None,
            group_id: None,
            line_id: None,
            combination_id: None,
        }
    }

    #[test]
    fn test_rule_without_target_is_general() {
        assert_eq!(validate_rule(&rule_draft()), Ok(RuleTarget::General));
    }

    #[test]
    fn test_rule_with_two_targets_rejected() {
        let mut d = rule_draft();
        d.item_id = Some(1);
        d.combination_id = Some(2);
        assert!(validate_rule(&d).is_err());
    }

    #[test]
    fn test_rule_value_ranges() {
        let mut d = rule_draft();
        d.value = dec!(100.01);
        assert!(validate_rule(&d).is_err());

        d.kind = DiscountKind::FixedAmount;
        assert!(validate_rule(&d).is_ok());

        d.value = dec!(-1);
        assert!(validate_rule(&d).is_err());

        d.value = dec!(1);
        d.threshold = dec!(-5);
        assert!(validate_rule(&d).is_err());
    }

    #[test]
    fn test_missing_reference_named() {
        assert!(validate_reference("item", 7, true).is_ok());
        assert_eq!(
            validate_reference("item group", 7, false).unwrap_err(),
            "item group 7 does not exist"
        );
    }

    fn branch(id: i64, company_id: i64) -> Branch {
        Branch {
            id,
            company_id,
            name: format!("Branch {}", id),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_branch_scope() {
        assert!(validate_branch_scope(1, None, None).is_ok());
        assert!(validate_branch_scope(1, Some(10), Some(&branch(10, 1))).is_ok());

        let err = validate_branch_scope(1, Some(10), Some(&branch(10, 2))).unwrap_err();
        assert!(err.contains("belongs to company 2"));

        assert!(validate_branch_scope(1, Some(10), None)
            .unwrap_err()
            .contains("does not exist"));
    }

    #[test]
    fn test_combination_scope() {
        let combo = Combination {
            id: 4,
            price_list_id: 1,
            name: "Keyboard + Mouse".to_string(),
        };
        assert!(validate_combination_scope(1, 4, Some(&combo)).is_ok());
        assert!(validate_combination_scope(2, 4, Some(&combo))
            .unwrap_err()
            .contains("belongs to price list 1"));
        assert!(validate_combination_scope(1, 4, None).is_err());
    }

    #[test]
    fn test_combination_members_must_be_priced() {
        let priced = HashSet::from([2, 3]);
        assert!(validate_combination_members(1, &[2, 3], &priced).is_ok());
        assert_eq!(
            validate_combination_members(1, &[2, 9], &priced).unwrap_err(),
            "item 9 has no base price in price list 1"
        );
    }

    #[test]
    fn test_base_price_must_be_positive() {
        assert!(validate_base_price(dec!(0.01)).is_ok());
        assert!(validate_base_price(dec!(0)).is_err());
    }
}
