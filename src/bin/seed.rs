//! # Seed Data Loader
//!
//! Replaces the database contents with a small demonstration data set.
//!
//! ## Usage
//! ```bash
//! DATABASE_URL=postgres://localhost/pricing cargo run --bin seed
//! ```
//!
//! ## Loaded Data
//! - One company with branches in Lima and Arequipa
//! - Four items across two lines and groups
//! - An e-commerce list for Lima (started 30 days ago) and a store list for
//!   Arequipa (starting today)
//! - Five discount rules, one of them for a keyboard and mouse bundle
//!
//! Calculations worth trying afterwards:
//! - Laptop on the Lima e-commerce list: the 30% rule would go below cost and
//!   is floored at 1500.00
//! - Laptop on the Arequipa store list: 40% is allowed below cost, 1260.00

use chrono::{Duration, Local};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use pricelist_engine::config::Config;
use pricelist_engine::db;
use pricelist_engine::pricing::models::{
    DiscountKind, DiscountRule, RuleCondition, RuleTarget, SalesChannel,
};
use pricelist_engine::pricing::validation::PriceListDraft;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    println!("Price List Seed Data Loader");
    println!("===========================");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await?;
    println!("✓ Connected to database");

    sqlx::migrate!("./migrations").run(&pool).await?;
    println!("✓ Migrations applied");

    clear(&pool).await?;
    println!("✓ Old data removed");

    // Companies and branches
    let company = insert_named(&pool, "companies", "Empresa Principal S.A.").await?;
    let lima = insert_branch(&pool, company, "Sucursal Lima").await?;
    let arequipa = insert_branch(&pool, company, "Sucursal Arequipa").await?;
    println!("✓ Company and branches");

    // Catalog
    let technology = insert_named(&pool, "item_lines", "Tecnología").await?;
    let home = insert_named(&pool, "item_lines", "Hogar").await?;
    let laptops = insert_named(&pool, "item_groups", "Laptops").await?;
    let furniture = insert_named(&pool, "item_groups", "Muebles").await?;

    let laptop = insert_item(&pool, technology, laptops, "TEC-LAP-001", "Laptop Pro Modelo X", dec!(1500.00)).await?;
    let mouse = insert_item(&pool, technology, laptops, "TEC-LAP-002", "Mouse Gamer", dec!(80.00)).await?;
    let keyboard = insert_item(&pool, technology, laptops, "TEC-LAP-003", "Teclado Mecánico", dec!(120.00)).await?;
    let chair = insert_item(&pool, home, furniture, "HOG-MUE-001", "Silla de Oficina", dec!(200.00)).await?;
    println!("✓ 4 items");

    // Price lists
    let today = Local::now().date_naive();

    let ecommerce = db::insert_price_list(
        &pool,
        "Lista E-commerce Lima",
        &PriceListDraft {
            company_id: company,
            branch_id: Some(lima),
            channel: SalesChannel::Ecommerce,
            valid_from: today - Duration::days(30),
            valid_to: None,
            active: true,
        },
    )
    .await?;

    let store = db::insert_price_list(
        &pool,
        "Lista Tienda Arequipa",
        &PriceListDraft {
            company_id: company,
            branch_id: Some(arequipa),
            channel: SalesChannel::Store,
            valid_from: today,
            valid_to: None,
            active: true,
        },
    )
    .await?;
    println!("✓ 2 price lists");

    let base_prices = [
        (ecommerce.id, laptop, dec!(2000.00)),
        (ecommerce.id, mouse, dec!(120.00)),
        (ecommerce.id, keyboard, dec!(180.00)),
        (store.id, chair, dec!(300.00)),
        (store.id, laptop, dec!(2100.00)),
    ];
    for (list_id, item_id, price) in base_prices {
        db::upsert_base_price(&pool, list_id, item_id, price).await?;
    }
    println!("✓ {} base prices", base_prices.len());

    let combo = db::insert_combination(&pool, ecommerce.id, "Combo Teclado + Mouse", &[mouse, keyboard])
        .await?
        .id;
    println!("✓ Keyboard and mouse bundle");

    let rules = [
        rule(ecommerce.id, "Cyberday Laptop (sin permiso)", DiscountKind::Percentage, dec!(30.00))
            .on(RuleTarget::Item(laptop))
            .min_quantity(dec!(1))
            .priority(10),
        rule(store.id, "Cyberday Laptop (con permiso)", DiscountKind::Percentage, dec!(40.00))
            .on(RuleTarget::Item(laptop))
            .min_quantity(dec!(1))
            .priority(10)
            .below_cost(),
        rule(ecommerce.id, "Descuento x3 Mouse", DiscountKind::FixedAmount, dec!(10.00))
            .on(RuleTarget::Item(mouse))
            .min_quantity(dec!(3))
            .priority(20),
        rule(ecommerce.id, "Descuento 10% en pedidos > 5000", DiscountKind::Percentage, dec!(10.00))
            .min_order_amount(dec!(5000.00))
            .priority(100),
        rule(ecommerce.id, "Descuento Combo Teclado+Mouse", DiscountKind::FixedAmount, dec!(25.00))
            .on(RuleTarget::Combination(combo))
            .min_quantity(dec!(1))
            .priority(5),
    ];
    for r in &rules {
        db::insert_discount_rule(&pool, &r.0).await?;
    }
    println!("✓ {} discount rules", rules.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

async fn clear(pool: &PgPool) -> sqlx::Result<()> {
    sqlx::query(
        "TRUNCATE discount_rules, combination_items, combinations, item_base_prices, \
         price_lists, items, item_groups, item_lines, branches, companies \
         RESTART IDENTITY CASCADE",
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Insert into a table with only a `name` column besides the id
async fn insert_named(pool: &PgPool, table: &str, name: &str) -> sqlx::Result<i64> {
    sqlx::query_scalar(&format!("INSERT INTO {table} (name) VALUES ($1) RETURNING id"))
        .bind(name)
        .fetch_one(pool)
        .await
}

async fn insert_branch(pool: &PgPool, company_id: i64, name: &str) -> sqlx::Result<i64> {
    sqlx::query_scalar("INSERT INTO branches (company_id, name) VALUES ($1, $2) RETURNING id")
        .bind(company_id)
        .bind(name)
        .fetch_one(pool)
        .await
}

async fn insert_item(
    pool: &PgPool,
    line_id: i64,
    group_id: i64,
    sku: &str,
    name: &str,
    last_cost: Decimal,
) -> sqlx::Result<i64> {
    sqlx::query_scalar(
        r#"
        INSERT INTO items (line_id, group_id, sku, name, last_cost)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(line_id)
    .bind(group_id)
    .bind(sku)
    .bind(name)
    .bind(last_cost)
    .fetch_one(pool)
    .await
}

/// Small builder so the rule table above stays readable
struct SeedRule(DiscountRule);

fn rule(price_list_id: i64, name: &str, kind: DiscountKind, value: Decimal) -> SeedRule {
    SeedRule(DiscountRule {
        id: 0,
        price_list_id,
        name: name.to_string(),
        kind,
        value,
        condition: RuleCondition::MinQuantity,
        threshold: Decimal::ZERO,
        target: RuleTarget::General,
        priority: 10,
        allows_below_cost: false,
    })
}

impl SeedRule {
    fn on(mut self, target: RuleTarget) -> Self {
        self.0.target = target;
        self
    }

    fn min_quantity(mut self, threshold: Decimal) -> Self {
        self.0.condition = RuleCondition::MinQuantity;
        self.0.threshold = threshold;
        self
    }

    fn min_order_amount(mut self, threshold: Decimal) -> Self {
        self.0.condition = RuleCondition::MinOrderAmount;
        self.0.threshold = threshold;
        self
    }

    fn priority(mut self, priority: i32) -> Self {
        self.0.priority = priority;
        self
    }

    fn below_cost(mut self) -> Self {
        self.0.allows_below_cost = true;
        self
    }
}
