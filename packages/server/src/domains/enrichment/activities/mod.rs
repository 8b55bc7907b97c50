pub mod entries;
pub mod media;
pub mod scrape;
pub mod submissions;

pub use entries::{enrich_entries, enrich_entry, ENRICHABLE_FIELDS};
pub use scrape::scrape_product;
pub use submissions::{
    enrich_submission, enrich_submissions, EnrichSubmissionsResult, SubmissionEnrichment,
};
