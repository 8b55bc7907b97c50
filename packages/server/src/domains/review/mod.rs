//! Review domain - LLM classification behind a confidence gate.

pub mod activities;
pub mod models;
