//! Database access for the admin routes

pub mod queries;

pub use queries::*;
