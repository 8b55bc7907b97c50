//! Form intake.

use anyhow::Result;
use tracing::info;

use crate::common::text::non_blank;
use crate::common::PipelineError;
use crate::domains::submissions::models::{NewSubmission, Submission, SubmissionSource};
use crate::kernel::ServerDeps;

pub const NAME_MAX: usize = 200;
pub const WEBSITE_MAX: usize = 255;

#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    pub name: String,
    pub website: String,
    pub description: Option<String>,
    pub email: Option<String>,
}

/// Validates a form submission and stores it as pending.
///
/// Nothing external is called; enrichment and review run later.
pub async fn submit_form(form: SubmissionForm, deps: &ServerDeps) -> Result<Submission> {
    let new = validate_form(&form)?;
    let submission = deps.store.insert_submission(&new).await?;
    info!(submission_id = %submission.id, name = %submission.name, "Form submission received");
    Ok(submission)
}

pub fn validate_form(form: &SubmissionForm) -> Result<NewSubmission, PipelineError> {
    let name = non_blank(Some(&form.name))
        .ok_or_else(|| PipelineError::Validation("Name is required".into()))?;
    if name.chars().count() > NAME_MAX {
        return Err(PipelineError::Validation(format!(
            "Name must be at most {} characters",
            NAME_MAX
        )));
    }

    let website = normalize_form_website(&form.website)?;

    let email = non_blank(form.email.as_deref()).map(str::to_string);
    if let Some(email) = &email {
        let valid = email
            .split_once('@')
            .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
        if !valid {
            return Err(PipelineError::Validation(format!("Invalid email: {}", email)));
        }
    }

    Ok(NewSubmission::builder()
        .name(name)
        .website(website)
        .description(non_blank(form.description.as_deref()).map(str::to_string))
        .email(email)
        .source(SubmissionSource::Form)
        .build())
}

/// Adds `https://` when the scheme is missing and requires an http(s) URL
/// with a dotted host.
pub fn normalize_form_website(raw: &str) -> Result<String, PipelineError> {
    let raw = non_blank(Some(raw))
        .ok_or_else(|| PipelineError::Validation("Website is required".into()))?;

    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let invalid = || PipelineError::Validation(format!("Invalid website URL: {}", raw));
    let parsed = url::Url::parse(&candidate).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid());
    }
    if !parsed.host_str().is_some_and(|h| h.contains('.')) {
        return Err(invalid());
    }
    if candidate.chars().count() > WEBSITE_MAX {
        return Err(PipelineError::Validation(format!(
            "Website must be at most {} characters",
            WEBSITE_MAX
        )));
    }

    Ok(candidate)
}
