use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
    NeedsReview,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::NeedsReview => "needs_review",
        }
    }
}

impl std::fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue codes the classifier may attach to a verdict.
pub const REVIEW_FLAGS: &[&str] = &[
    "is_template_page",
    "is_feature_not_product",
    "is_aggregator_listing",
    "is_article_not_landing",
    "is_academic_paper",
    "prohibited_content",
];

/// Attached when the review gateway itself failed.
pub const REVIEW_ERROR_FLAG: &str = "review_error";

/// What the review gateway returns for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReviewVerdict {
    /// approved, rejected, or needs_review when uncertain
    pub decision: ReviewDecision,
    /// Whether the product is an AI agent at all
    pub is_ai_agent: bool,
    /// Confidence in the decision between 0.0 and 1.0
    pub confidence: f64,
    /// Short explanation of the decision
    pub reasoning: String,
    /// Zero or more issue codes from the review instructions
    pub flags: Vec<String>,
}

/// Review outcome stored on a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub decision: ReviewDecision,
    #[serde(alias = "is_valid")]
    pub is_ai_agent: bool,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub needs_manual_review: bool,
    /// True when the decision was applied without a human actor.
    #[serde(default)]
    pub auto_applied: bool,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewResult {
    /// Normalizes a gateway verdict: confidence clamped to [0, 1] (NaN becomes 0),
    /// flags trimmed and deduplicated.
    pub fn from_verdict(verdict: ReviewVerdict, reviewed_at: DateTime<Utc>) -> Self {
        let confidence = if verdict.confidence.is_nan() {
            0.0
        } else {
            verdict.confidence.clamp(0.0, 1.0)
        };

        let mut flags: Vec<String> = Vec::with_capacity(verdict.flags.len());
        for flag in verdict.flags {
            let flag = flag.trim().to_lowercase();
            if !flag.is_empty() && !flags.contains(&flag) {
                flags.push(flag);
            }
        }

        Self {
            decision: verdict.decision,
            is_ai_agent: verdict.is_ai_agent,
            confidence,
            reasoning: verdict.reasoning.trim().to_string(),
            flags,
            needs_manual_review: false,
            auto_applied: false,
            reviewed_at,
        }
    }

    /// Safe result used when the gateway call failed.
    pub fn from_error(error: &str, reviewed_at: DateTime<Utc>) -> Self {
        Self {
            decision: ReviewDecision::NeedsReview,
            is_ai_agent: false,
            confidence: 0.0,
            reasoning: format!("Review failed due to error: {}", error),
            flags: vec![REVIEW_ERROR_FLAG.to_string()],
            needs_manual_review: true,
            auto_applied: false,
            reviewed_at,
        }
    }

    pub fn is_error(&self) -> bool {
        self.flags.iter().any(|f| f == REVIEW_ERROR_FLAG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(confidence: f64, flags: &[&str]) -> ReviewVerdict {
        ReviewVerdict {
            decision: ReviewDecision::Approved,
            is_ai_agent: true,
            confidence,
            reasoning: "  Autonomous coding agent.  ".into(),
            flags: flags.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn confidence_is_clamped() {
        let now = Utc::now();
        assert_eq!(ReviewResult::from_verdict(verdict(1.7, &[]), now).confidence, 1.0);
        assert_eq!(ReviewResult::from_verdict(verdict(-0.2, &[]), now).confidence, 0.0);
        assert_eq!(ReviewResult::from_verdict(verdict(f64::NAN, &[]), now).confidence, 0.0);
    }

    #[test]
    fn flags_are_normalized() {
        let result = ReviewResult::from_verdict(
            verdict(0.9, &["Is_Template_Page", " is_template_page", ""]),
            Utc::now(),
        );
        assert_eq!(result.flags, vec!["is_template_page"]);
        assert_eq!(result.reasoning, "Autonomous coding agent.");
    }

    #[test]
    fn error_result_is_safe() {
        let result = ReviewResult::from_error("timeout", Utc::now());

        assert_eq!(result.decision, ReviewDecision::NeedsReview);
        assert_eq!(result.confidence, 0.0);
        assert!(!result.is_ai_agent);
        assert_eq!(result.reasoning, "Review failed due to error: timeout");
        assert!(result.is_error());
    }

    #[test]
    fn stored_results_accept_is_valid_alias() {
        let json = serde_json::json!({
            "decision": "rejected",
            "is_valid": false,
            "confidence": 0.8,
            "reasoning": "Blog post",
            "reviewed_at": "2026-01-01T00:00:00Z"
        });

        let result: ReviewResult = serde_json::from_value(json).unwrap();
        assert_eq!(result.decision, ReviewDecision::Rejected);
        assert!(!result.is_ai_agent);
        assert!(result.flags.is_empty());
        assert!(!result.auto_applied);
    }
}
