//! Published directory: entries, categories and enrichment logs.

pub mod models;
