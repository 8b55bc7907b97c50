//! Sourcing domain - automated discovery of candidate products.

pub mod activities;
pub mod models;
pub mod sources;
