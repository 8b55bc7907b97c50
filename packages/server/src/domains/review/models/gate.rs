use serde::{Deserialize, Serialize};

use super::verdict::{ReviewDecision, ReviewResult};

/// Status change the gate allows to happen without a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoTransition {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    pub needs_manual_review: bool,
    pub auto_transition: Option<AutoTransition>,
}

/// Confidence gate for automated review decisions.
///
/// A result below the threshold always needs manual review. The optional
/// per-decision thresholds replace the global one for approvals or
/// rejections and default to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceGate {
    pub threshold: f64,
    pub approve_threshold: Option<f64>,
    pub reject_threshold: Option<f64>,
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::new(0.7)
    }
}

impl ConfidenceGate {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            approve_threshold: None,
            reject_threshold: None,
        }
    }

    pub fn threshold_for(&self, decision: ReviewDecision) -> f64 {
        match decision {
            ReviewDecision::Approved => self.approve_threshold.unwrap_or(self.threshold),
            ReviewDecision::Rejected => self.reject_threshold.unwrap_or(self.threshold),
            ReviewDecision::NeedsReview => self.threshold,
        }
    }

    pub fn evaluate(&self, result: &ReviewResult, auto_apply: bool) -> GateDecision {
        let needs_manual_review = result.confidence < self.threshold_for(result.decision);

        let auto_transition = if auto_apply && !needs_manual_review {
            match result.decision {
                ReviewDecision::Approved => Some(AutoTransition::Approve),
                ReviewDecision::Rejected => Some(AutoTransition::Reject),
                ReviewDecision::NeedsReview => None,
            }
        } else {
            None
        };

        GateDecision {
            needs_manual_review,
            auto_transition,
        }
    }
}
