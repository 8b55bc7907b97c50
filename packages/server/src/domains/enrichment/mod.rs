//! Enrichment domain - turns a website into structured product content,
//! media and an enrichment snapshot.

pub mod activities;
pub mod models;
