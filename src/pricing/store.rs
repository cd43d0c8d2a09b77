//! Data access seam for the pricing engine.
//!
//! The engine never writes. Every calculation re-reads what it needs through
//! `PricingStore`; implementations must not cache lists or rules.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::Item;

use super::models::{DiscountRule, ItemBasePrice, PriceList, SalesChannel};

pub type StoreResult<T> = std::result::Result<T, sqlx::Error>;

/// Lookups the engine performs against the data store
#[async_trait]
pub trait PricingStore: Send + Sync {
    /// Active, date-valid lists of `company_id` that could win resolution:
    /// scoped to `branch_id` or company-wide, on `channel` or ALL.
    /// Ordered by id.
    async fn find_active_lists(
        &self,
        company_id: i64,
        branch_id: Option<i64>,
        channel: SalesChannel,
        as_of: NaiveDate,
    ) -> StoreResult<Vec<PriceList>>;

    async fn get_base_price(&self, list_id: i64, item_id: i64) -> StoreResult<Option<ItemBasePrice>>;

    /// Rules of a list by ascending priority, then id
    async fn get_rules_for_list(&self, list_id: i64) -> StoreResult<Vec<DiscountRule>>;

    async fn get_combination_members(&self, combination_id: i64) -> StoreResult<HashSet<i64>>;

    async fn get_item(&self, item_id: i64) -> StoreResult<Option<Item>>;
}

/// In-memory snapshot store.
///
/// Used by tests and for evaluating prices against a fixed data set.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub price_lists: Vec<PriceList>,
    pub base_prices: Vec<ItemBasePrice>,
    pub items: HashMap<i64, Item>,
    /// Combination id -> member item ids
    pub combination_members: HashMap<i64, HashSet<i64>>,
    pub rules: Vec<DiscountRule>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list(mut self, list: PriceList) -> Self {
        self.price_lists.push(list);
        self
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.items.insert(item.id, item);
        self
    }

    pub fn with_base_price(mut self, price: ItemBasePrice) -> Self {
        self.base_prices.push(price);
        self
    }

    pub fn with_rule(mut self, rule: DiscountRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_combination(mut self, combination_id: i64, members: &[i64]) -> Self {
        self.combination_members
            .insert(combination_id, members.iter().copied().collect());
        self
    }
}

#[async_trait]
impl PricingStore for MemoryStore {
    async fn find_active_lists(
        &self,
        company_id: i64,
        branch_id: Option<i64>,
        channel: SalesChannel,
        as_of: NaiveDate,
    ) -> StoreResult<Vec<PriceList>> {
        let mut lists: Vec<PriceList> = self
            .price_lists
            .iter()
            .filter(|list| list.company_id == company_id && list.is_valid_on(as_of))
            .filter(|list| list.branch_id.is_none() || list.branch_id == branch_id)
            .filter(|list| list.channel == channel || list.channel == SalesChannel::All)
            .cloned()
            .collect();
        lists.sort_by_key(|list| list.id);
        Ok(lists)
    }

    async fn get_base_price(&self, list_id: i64, item_id: i64) -> StoreResult<Option<ItemBasePrice>> {
        Ok(self
            .base_prices
            .iter()
            .find(|price| price.price_list_id == list_id && price.item_id == item_id)
            .cloned())
    }

    async fn get_rules_for_list(&self, list_id: i64) -> StoreResult<Vec<DiscountRule>> {
        let mut rules: Vec<DiscountRule> = self
            .rules
            .iter()
            .filter(|rule| rule.price_list_id == list_id)
            .cloned()
            .collect();
        rules.sort_by_key(|rule| (rule.priority, rule.id));
        Ok(rules)
    }

    async fn get_combination_members(&self, combination_id: i64) -> StoreResult<HashSet<i64>> {
        Ok(self
            .combination_members
            .get(&combination_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_item(&self, item_id: i64) -> StoreResult<Option<Item>> {
        Ok(self.items.get(&item_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::models::{DiscountKind, RuleCondition, RuleTarget};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn list(id: i64, branch_id: Option<i64>, channel: SalesChannel) -> PriceList {
        PriceList {
            id,
            company_id: 1,
            branch_id,
            name: format!("List {}", id),
            channel,
            valid_from: date(2024, 1, 1),
            valid_to: None,
            active: true,
        }
    }

    fn rule(id: i64, priority: i32) -> DiscountRule {
        DiscountRule {
            id,
            price_list_id: 1,
            name: format!("Rule {}", id),
            kind: DiscountKind::FixedAmount,
            value: dec!(1),
            condition: RuleCondition::MinQuantity,
            threshold: dec!(1),
            target: RuleTarget::General,
            priority,
            allows_below_cost: false,
        }
    }

    #[tokio::test]
    async fn test_find_active_lists_filters_scope() {
        let store = MemoryStore::new()
            .with_list(list(3, None, SalesChannel::All))
            .with_list(list(1, Some(10), SalesChannel::Store))
            .with_list(list(2, Some(11), SalesChannel::Store))
            .with_list(list(4, None, SalesChannel::Ecommerce));

        let lists = store
            .find_active_lists(1, Some(10), SalesChannel::Store, date(2024, 5, 1))
            .await
            .unwrap();
        let ids: Vec<i64> = lists.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_rules_sorted_by_priority_then_id() {
        let store = MemoryStore::new()
            .with_rule(rule(3, 10))
            .with_rule(rule(1, 20))
            .with_rule(rule(2, 10));

        let rules = store.get_rules_for_list(1).await.unwrap();
        let ids: Vec<i64> = rules.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn test_combination_members() {
        let store = MemoryStore::new().with_combination(1, &[2, 3]);
        assert!(store.get_combination_members(42).await.unwrap().is_empty());
        assert_eq!(
            store.get_combination_members(1).await.unwrap(),
            HashSet::from([2, 3])
        );
    }
}
