pub mod approve;
pub mod cleanup;
pub mod intake;
pub mod reject;

pub use approve::{
    approve_submission, approve_submissions, ApprovalOutcome, BatchApproval, BatchApprovalResult,
};
pub use cleanup::{cleanup_submissions, CleanupAction, CleanupOptions, CleanupReport};
pub use intake::{submit_form, SubmissionForm};
pub use reject::{reject_submission, reject_submissions, reopen_submission, BatchRejectionResult};
