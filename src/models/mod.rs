//! Catalog models shared by the pricing engine and the admin routes

pub mod catalog;

pub use catalog::{Branch, Company, Item};
