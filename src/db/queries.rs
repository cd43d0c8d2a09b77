//! Database queries for the admin routes

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::{AppError, Result};
use crate::models::{Branch, Company, Item};
use crate::pricing::models::{
    Combination, CombinationDetail, DiscountRule, DiscountRuleRow, ItemBasePrice, PriceList,
};
use crate::pricing::queries::{rules_from_rows, DISCOUNT_RULE_COLUMNS, PRICE_LIST_COLUMNS};
use crate::pricing::validation::PriceListDraft;

/// Rows a payload may reference by id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Company,
    PriceList,
    Item,
    ItemGroup,
    ItemLine,
}

impl Reference {
    fn table(&self) -> &'static str {
        match self {
            Reference::Company => "companies",
            Reference::PriceList => "price_lists",
            Reference::Item => "items",
            Reference::ItemGroup => "item_groups",
            Reference::ItemLine => "item_lines",
        }
    }

    /// Name used in validation messages
    pub fn label(&self) -> &'static str {
        match self {
            Reference::Company => "company",
            Reference::PriceList => "price list",
            Reference::Item => "item",
            Reference::ItemGroup => "item group",
            Reference::ItemLine => "item line",
        }
    }
}

/// Check that a referenced row exists
pub async fn reference_exists(pool: &PgPool, reference: Reference, id: i64) -> Result<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
        reference.table()
    );

    let exists = sqlx::query_scalar::<_, bool>(&sql)
        .bind(id)
        .fetch_one(pool)
        .await?;

    Ok(exists)
}

/// Get all companies
pub async fn get_companies(pool: &PgPool) -> Result<Vec<Company>> {
    let companies = sqlx::query_as::<_, Company>(
        r#"
        SELECT id, name, created_at
        FROM companies
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(companies)
}

/// Get the branches of a company
pub async fn get_branches(pool: &PgPool, company_id: i64) -> Result<Vec<Branch>> {
    let branches = sqlx::query_as::<_, Branch>(
        r#"
        SELECT id, company_id, name, created_at
        FROM branches
        WHERE company_id = $1
        ORDER BY name
        "#,
    )
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    Ok(branches)
}

/// Find a branch by id
pub async fn find_branch(pool: &PgPool, id: i64) -> Result<Option<Branch>> {
    let branch = sqlx::query_as::<_, Branch>(
        r#"
        SELECT id, company_id, name, created_at
        FROM branches
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(branch)
}

/// Get an item by id
pub async fn get_item(pool: &PgPool, id: i64) -> Result<Item> {
    sqlx::query_as::<_, Item>(
        r#"
        SELECT id, line_id, group_id, sku, name, last_cost
        FROM items
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound)
}

/// Get price lists, optionally restricted to one company
pub async fn get_price_lists(pool: &PgPool, company_id: Option<i64>) -> Result<Vec<PriceList>> {
    let sql = format!(
        r#"
        SELECT {PRICE_LIST_COLUMNS}
        FROM price_lists
        WHERE ($1::BIGINT IS NULL OR company_id = $1)
        ORDER BY id
        "#
    );

    let lists = sqlx::query_as::<_, PriceList>(&sql)
        .bind(company_id)
        .fetch_all(pool)
        .await?;

    Ok(lists)
}

/// Get a price list by id
pub async fn get_price_list(pool: &PgPool, id: i64) -> Result<PriceList> {
    let sql = format!(
        r#"
        SELECT {PRICE_LIST_COLUMNS}
        FROM price_lists
        WHERE id = $1
        "#
    );

    sqlx::query_as::<_, PriceList>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)
}

/// Insert a price list
pub async fn insert_price_list(pool: &PgPool, name: &str, draft: &PriceListDraft) -> Result<PriceList> {
    let sql = format!(
        r#"
        INSERT INTO price_lists (company_id, branch_id, name, channel, valid_from, valid_to, active)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {PRICE_LIST_COLUMNS}
        "#
    );

    let list = sqlx::query_as::<_, PriceList>(&sql)
        .bind(draft.company_id)
        .bind(draft.branch_id)
        .bind(name)
        .bind(draft.channel.as_str())
        .bind(draft.valid_from)
        .bind(draft.valid_to)
        .bind(draft.active)
        .fetch_one(pool)
        .await?;

    Ok(list)
}

/// Replace every editable field of a price list
pub async fn update_price_list(
    pool: &PgPool,
    id: i64,
    name: &str,
    draft: &PriceListDraft,
) -> Result<PriceList> {
    let sql = format!(
        r#"
        UPDATE price_lists
        SET company_id = $2,
            branch_id = $3,
            name = $4,
            channel = $5,
            valid_from = $6,
            valid_to = $7,
            active = $8
        WHERE id = $1
        RETURNING {PRICE_LIST_COLUMNS}
        "#
    );

    sqlx::query_as::<_, PriceList>(&sql)
        .bind(id)
        .bind(draft.company_id)
        .bind(draft.branch_id)
        .bind(name)
        .bind(draft.channel.as_str())
        .bind(draft.valid_from)
        .bind(draft.valid_to)
        .bind(draft.active)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)
}

/// Delete a price list; its prices, bundles and rules cascade
pub async fn delete_price_list(pool: &PgPool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM price_lists WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Get base prices of a list
pub async fn get_base_prices(pool: &PgPool, price_list_id: i64) -> Result<Vec<ItemBasePrice>> {
    let prices = sqlx::query_as::<_, ItemBasePrice>(
        r#"
        SELECT id, price_list_id, item_id, base_price
        FROM item_base_prices
        WHERE price_list_id = $1
        ORDER BY item_id
        "#,
    )
    .bind(price_list_id)
    .fetch_all(pool)
    .await?;

    Ok(prices)
}

/// Insert or replace the base price of an item in a list
pub async fn upsert_base_price(
    pool: &PgPool,
    price_list_id: i64,
    item_id: i64,
    base_price: Decimal,
) -> Result<ItemBasePrice> {
    let price = sqlx::query_as::<_, ItemBasePrice>(
        r#"
        INSERT INTO item_base_prices (price_list_id, item_id, base_price)
        VALUES ($1, $2, $3)
        ON CONFLICT (price_list_id, item_id)
        DO UPDATE SET base_price = EXCLUDED.base_price
        RETURNING id, price_list_id, item_id, base_price
        "#,
    )
    .bind(price_list_id)
    .bind(item_id)
    .bind(base_price)
    .fetch_one(pool)
    .await?;

    Ok(price)
}

/// Get the rules of a list in evaluation order
pub async fn get_discount_rules(pool: &PgPool, price_list_id: i64) -> Result<Vec<DiscountRule>> {
    let sql = format!(
        r#"
        SELECT {DISCOUNT_RULE_COLUMNS}
        FROM discount_rules
        WHERE price_list_id = $1
        ORDER BY priority, id
        "#
    );

    let rows = sqlx::query_as::<_, DiscountRuleRow>(&sql)
        .bind(price_list_id)
        .fetch_all(pool)
        .await?;

    rules_from_rows(rows).map_err(|e| AppError::Internal(e.to_string()))
}

/// Insert a discount rule. The database assigns the id; `rule.id` is ignored.
pub async fn insert_discount_rule(pool: &PgPool, rule: &DiscountRule) -> Result<DiscountRule> {
    let (item_id, group_id, line_id, combination_id) = rule.target.to_columns();
    let sql = format!(
        r#"
        INSERT INTO discount_rules
            (price_list_id, name, kind, value, condition_kind, threshold,
             item_id, group_id, line_id, combination_id, priority, allows_below_cost)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING {DISCOUNT_RULE_COLUMNS}
        "#
    );

    let row = sqlx::query_as::<_, DiscountRuleRow>(&sql)
        .bind(rule.price_list_id)
        .bind(&rule.name)
        .bind(rule.kind.as_str())
        .bind(rule.value)
        .bind(rule.condition.as_str())
        .bind(rule.threshold)
        .bind(item_id)
        .bind(group_id)
        .bind(line_id)
        .bind(combination_id)
        .bind(rule.priority)
        .bind(rule.allows_below_cost)
        .fetch_one(pool)
        .await?;

    DiscountRule::try_from(row).map_err(AppError::Internal)
}

/// Delete a discount rule
pub async fn delete_discount_rule(pool: &PgPool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM discount_rules WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Update a discount rule in place. `rule.id` is ignored in favour of `id`.
pub async fn update_discount_rule(
    pool: &PgPool,
    id: i64,
    rule: &DiscountRule,
) -> Result<DiscountRule> {
    let (item_id, group_id, line_id, combination_id) = rule.target.to_columns();
    let sql = format!(
        r#"
        UPDATE discount_rules
        SET price_list_id = $2,
            name = $3,
            kind = $4,
            value = $5,
            condition_kind = $6,
            threshold = $7,
            item_id = $8,
            group_id = $9,
            line_id = $10,
            combination_id = $11,
            priority = $12,
            allows_below_cost = $13
        WHERE id = $1
        RETURNING {DISCOUNT_RULE_COLUMNS}
        "#
    );

    let row = sqlx::query_as::<_, DiscountRuleRow>(&sql)
        .bind(id)
        .bind(rule.price_list_id)
        .bind(&rule.name)
        .bind(rule.kind.as_str())
        .bind(rule.value)
        .bind(rule.condition.as_str())
        .bind(rule.threshold)
        .bind(item_id)
        .bind(group_id)
        .bind(line_id)
        .bind(combination_id)
        .bind(rule.priority)
        .bind(rule.allows_below_cost)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)?;

    DiscountRule::try_from(row).map_err(AppError::Internal)
}

const COMBINATION_DETAIL_SELECT: &str = r#"
    SELECT c.id, c.price_list_id, c.name,
           COALESCE(
               array_agg(ci.item_id ORDER BY ci.item_id) FILTER (WHERE ci.item_id IS NOT NULL),
               '{}'
           ) AS item_ids
    FROM combinations c
    LEFT JOIN combination_items ci ON ci.combination_id = c.id
"#;

/// Find a bundle by id, without its members
pub async fn find_combination(pool: &PgPool, id: i64) -> Result<Option<Combination>> {
    let combination = sqlx::query_as::<_, Combination>(
        "SELECT id, price_list_id, name FROM combinations WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(combination)
}

/// Get the bundles of a list with their members
pub async fn get_combinations(
    pool: &PgPool,
    price_list_id: i64,
) -> Result<Vec<CombinationDetail>> {
    let sql = format!(
        "{COMBINATION_DETAIL_SELECT} WHERE c.price_list_id = $1 GROUP BY c.id ORDER BY c.id"
    );

    let combinations = sqlx::query_as::<_, CombinationDetail>(&sql)
        .bind(price_list_id)
        .fetch_all(pool)
        .await?;

    Ok(combinations)
}

/// Get one bundle with its members
pub async fn get_combination(pool: &PgPool, id: i64) -> Result<CombinationDetail> {
    let sql = format!("{COMBINATION_DETAIL_SELECT} WHERE c.id = $1 GROUP BY c.id");

    sqlx::query_as::<_, CombinationDetail>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)
}

/// Insert a bundle and its members in one transaction
pub async fn insert_combination(
    pool: &PgPool,
    price_list_id: i64,
    name: &str,
    item_ids: &[i64],
) -> Result<CombinationDetail> {
    let mut tx = pool.begin().await?;

    let combination = sqlx::query_as::<_, Combination>(
        r#"
        INSERT INTO combinations (price_list_id, name)
        VALUES ($1, $2)
        RETURNING id, price_list_id, name
        "#,
    )
    .bind(price_list_id)
    .bind(name)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO combination_items (combination_id, item_id)
        SELECT $1, UNNEST($2::BIGINT[])
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(combination.id)
    .bind(item_ids)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let mut members = item_ids.to_vec();
    members.sort_unstable();
    members.dedup();

    Ok(CombinationDetail {
        id: combination.id,
        price_list_id: combination.price_list_id,
        name: combination.name,
        item_ids: members,
    })
}

/// Delete a bundle; its members and the rules pointing at it cascade
pub async fn delete_combination(pool: &PgPool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM combinations WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Add an item to a bundle. Adding an existing member is a no-op.
pub async fn add_combination_member(pool: &PgPool, combination_id: i64, item_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO combination_items (combination_id, item_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(combination_id)
    .bind(item_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove an item from a bundle
pub async fn remove_combination_member(
    pool: &PgPool,
    combination_id: i64,
    item_id: i64,
) -> Result<()> {
    let result =
        sqlx::query("DELETE FROM combination_items WHERE combination_id = $1 AND item_id = $2")
            .bind(combination_id)
            .bind(item_id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
