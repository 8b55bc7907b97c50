pub mod prompt;
pub mod review;

pub use prompt::{build_review_prompt, REVIEW_INSTRUCTIONS};
pub use review::{
    classify_candidate, review_entry, review_submission, review_submissions, ReviewBatchResult,
    ReviewedSubmission,
};
