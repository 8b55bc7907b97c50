//! URL filters - classification, normalization and cross-run deduplication
//! of candidate product URLs.

pub mod classifier;
pub mod dedup;
pub mod models;
pub mod normalize;

pub use classifier::UrlClassifier;
pub use dedup::DedupSet;
pub use models::{UrlClassification, UrlFilterConfig};
pub use normalize::{domain_of, normalize_url};
