use thiserror::Error;

/// Domain failures callers are expected to branch on.
///
/// Everything else travels as `anyhow::Error` with context attached.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bad input, rejected before any external call.
    #[error("{0}")]
    Validation(String),

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Cannot {action} submission '{name}': status is {status}")]
    InvalidTransition {
        name: String,
        action: &'static str,
        status: String,
    },

    #[error("Submission '{name}' has no enrichment data. Run enrichment first.")]
    EnrichmentRequired { name: String },

    #[error("Submission '{name}' enrichment failed: {reason}. Re-run enrichment before approving.")]
    EnrichmentFailed { name: String, reason: String },
}

impl PipelineError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
