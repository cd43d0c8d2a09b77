//! Database queries for pricing engine.
//!
//! `PgPricingStore` answers the engine's lookups straight from PostgreSQL.
//! Nothing is cached: each calculation sees the current rows.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::models::Item;

use super::models::{DiscountRule, DiscountRuleRow, ItemBasePrice, PriceList, SalesChannel};
use super::store::{PricingStore, StoreResult};

pub(crate) const PRICE_LIST_COLUMNS: &str =
    "id, company_id, branch_id, name, channel, valid_from, valid_to, active";

pub(crate) const DISCOUNT_RULE_COLUMNS: &str = "id, price_list_id, name, kind, value, condition_kind, threshold, \
     item_id, group_id, line_id, combination_id, priority, allows_below_cost";

/// PostgreSQL-backed `PricingStore`
#[derive(Debug, Clone)]
pub struct PgPricingStore {
    pool: PgPool,
}

impl PgPricingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Convert stored rule rows, failing on unknown kind/condition values
pub(crate) fn rules_from_rows(rows: Vec<DiscountRuleRow>) -> StoreResult<Vec<DiscountRule>> {
    rows.into_iter()
        .map(|row| DiscountRule::try_from(row).map_err(|e| sqlx::Error::Decode(e.into())))
        .collect()
}

#[async_trait]
impl PricingStore for PgPricingStore {
    async fn find_active_lists(
        &self,
        company_id: i64,
        branch_id: Option<i64>,
        channel: SalesChannel,
        as_of: NaiveDate,
    ) -> StoreResult<Vec<PriceList>> {
        let sql = format!(
            r#"
            SELECT {PRICE_LIST_COLUMNS}
            FROM price_lists
            WHERE company_id = $1
              AND active = true
              AND valid_from <= $4
              AND (valid_to IS NULL OR valid_to >= $4)
              AND (branch_id IS NULL OR branch_id = $2)
              AND channel IN ($3, 'ALL')
            ORDER BY id
            "#
        );

        sqlx::query_as::<_, PriceList>(&sql)
            .bind(company_id)
            .bind(branch_id)
            .bind(channel.as_str())
            .bind(as_of)
            .fetch_all(&self.pool)
            .await
    }

    async fn get_base_price(&self, list_id: i64, item_id: i64) -> StoreResult<Option<ItemBasePrice>> {
        sqlx::query_as::<_, ItemBasePrice>(
            r#"
            SELECT id, price_list_id, item_id, base_price
            FROM item_base_prices
            WHERE price_list_id = $1
              AND item_id = $2
            "#,
        )
        .bind(list_id)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_rules_for_list(&self, list_id: i64) -> StoreResult<Vec<DiscountRule>> {
        let sql = format!(
            r#"
            SELECT {DISCOUNT_RULE_COLUMNS}
            FROM discount_rules
            WHERE price_list_id = $1
            ORDER BY priority, id
            "#
        );

        let rows = sqlx::query_as::<_, DiscountRuleRow>(&sql)
            .bind(list_id)
            .fetch_all(&self.pool)
            .await?;

        rules_from_rows(rows)
    }

    async fn get_combination_members(&self, combination_id: i64) -> StoreResult<HashSet<i64>> {
        let members: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT item_id
            FROM combination_items
            WHERE combination_id = $1
            "#,
        )
        .bind(combination_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members.into_iter().collect())
    }

    async fn get_item(&self, item_id: i64) -> StoreResult<Option<Item>> {
        sqlx::query_as::<_, Item>(
            r#"
            SELECT id, line_id, group_id, sku, name, last_cost
            FROM items
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
    }
}
