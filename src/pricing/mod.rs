//! Pricing engine module.
//!
//! Resolves the price list that applies to a company, channel and branch, then
//! prices an item by folding the list's discount rules over its base price.

pub mod calculators;
pub mod models;
pub mod queries;
pub mod requests;
pub mod resolver;
pub mod responses;
pub mod routes;
pub mod services;
pub mod store;
pub mod validation;

// Re-export commonly used items
pub use calculators::round_money;
pub use queries::PgPricingStore;
pub use routes::router;
pub use services::{calculate_final_price, resolve_active_list, PriceCalculation, PricingError};
pub use store::{MemoryStore, PricingStore};
