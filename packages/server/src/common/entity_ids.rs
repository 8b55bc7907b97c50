//! Typed ID aliases for every persisted entity.

pub use super::id::Id;

/// Marker for pipeline submissions (form or discovered).
pub struct Submission;

/// Marker for published directory entries.
pub struct Entry;

pub struct Category;

pub struct SourcingRun;

pub struct EnrichmentLog;

pub type SubmissionId = Id<Submission>;
pub type EntryId = Id<Entry>;
pub type CategoryId = Id<Category>;
pub type SourcingRunId = Id<SourcingRun>;
pub type EnrichmentLogId = Id<EnrichmentLog>;
