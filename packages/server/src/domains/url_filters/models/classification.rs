use serde::{Deserialize, Serialize};

/// Outcome of classifying a candidate URL. Exactly one tag applies per URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlClassification {
    /// Never becomes a submission
    Blocked,
    /// Listing page on a directory site; the real product URL must be extracted
    Aggregator,
    Github,
    Allowlist,
    /// Deep link rather than a product homepage
    NonRoot,
    Normal,
}

impl UrlClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocked => "blocked",
            Self::Aggregator => "aggregator",
            Self::Github => "github",
            Self::Allowlist => "allowlist",
            Self::NonRoot => "non_root",
            Self::Normal => "normal",
        }
    }

    /// Uncertain enough to surface to a human before any AI review runs.
    pub fn needs_manual_review(&self) -> bool {
        matches!(self, Self::NonRoot | Self::Github)
    }
}

impl std::fmt::Display for UrlClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UrlClassification {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "blocked" => Ok(Self::Blocked),
            "aggregator" => Ok(Self::Aggregator),
            "github" => Ok(Self::Github),
            "allowlist" => Ok(Self::Allowlist),
            "non_root" => Ok(Self::NonRoot),
            "normal" => Ok(Self::Normal),
            _ => Err(anyhow::anyhow!("Invalid URL classification: {}", s)),
        }
    }
}
