// Business domains
pub mod directory;
pub mod enrichment;
pub mod review;
pub mod sourcing;
pub mod submissions;
pub mod url_filters;
