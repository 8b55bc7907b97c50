// Agent Directory - submission pipeline core
//
// Drives product candidates from discovery or form submission through
// enrichment and confidence-gated review to a published directory entry.
//
// Activities are organized per-domain in domains/*/activities/

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
