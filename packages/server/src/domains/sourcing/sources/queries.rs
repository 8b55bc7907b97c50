//! Search query sets for SERP discovery.

use std::collections::HashSet;

use chrono::{Datelike, Utc};

pub const BASIC: &[&str] = &[
    "AI agent tool",
    "AI agent software",
    "AI agent platform",
    "autonomous AI agent",
    "AI automation agent",
    "LLM agent",
    "AI digital worker",
];

/// Vertical query sets in rotation order.
pub const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "coding",
        &[
            "AI coding agent",
            "AI developer assistant",
            "AI pair programming",
            "AI code generation agent",
        ],
    ),
    (
        "sales",
        &[
            "AI sales agent",
            "AI SDR agent",
            "AI lead generation agent",
            "AI outbound agent",
        ],
    ),
    (
        "marketing",
        &[
            "AI marketing agent",
            "AI content marketing agent",
            "AI SEO agent",
            "AI social media agent",
        ],
    ),
    (
        "customer_support",
        &[
            "AI customer support agent",
            "AI helpdesk agent",
            "AI chatbot agent",
        ],
    ),
    (
        "research",
        &[
            "AI research agent",
            "AI research assistant",
            "AI data analysis agent",
        ],
    ),
    (
        "writing",
        &[
            "AI writing agent",
            "AI copywriting agent",
            "AI content creation agent",
        ],
    ),
    (
        "productivity",
        &[
            "AI scheduling agent",
            "AI workflow agent",
            "AI personal assistant agent",
        ],
    ),
    (
        "hr",
        &["AI recruiting agent", "AI hiring agent", "AI HR agent"],
    ),
    (
        "finance",
        &["AI finance agent", "AI accounting agent", "AI trading agent"],
    ),
    ("legal", &["AI legal agent", "AI contract agent"]),
    (
        "data",
        &[
            "AI data agent",
            "AI web scraping agent",
            "AI data extraction agent",
        ],
    ),
];

const CATEGORIES_PER_DAY: usize = 2;
const TRENDING_PER_DAY: usize = 3;
const QUERIES_PER_CATEGORY_PER_DAY: usize = 2;

/// Which query set a SERP source runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySet {
    Basic,
    Trending,
    Category(String),
    All,
    Daily,
}

impl std::str::FromStr for QuerySet {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "basic" => Ok(Self::Basic),
            "trending" => Ok(Self::Trending),
            "all" => Ok(Self::All),
            "daily" => Ok(Self::Daily),
            other => match other.strip_prefix("category:") {
                Some(name) if category_queries(name).is_some() => Ok(Self::Category(name.into())),
                _ => Err(anyhow::anyhow!(
                    "Unknown query set '{}'. Use basic, trending, all, daily or category:<{}>",
                    other,
                    category_names().join("|")
                )),
            },
        }
    }
}

impl QuerySet {
    pub fn queries(&self) -> Vec<String> {
        let year = Utc::now().year();
        match self {
            Self::Basic => to_strings(BASIC),
            Self::Trending => trending(year),
            Self::Category(name) => category_queries(name).map(to_strings).unwrap_or_default(),
            Self::All => all(year),
            Self::Daily => daily(Utc::now().weekday().num_days_from_monday() as usize, year),
        }
    }
}

pub fn trending(year: i32) -> Vec<String> {
    vec![
        format!("new AI agent {}", year),
        format!("AI agent launched {}", year),
        format!("best AI agents {}", year),
        "AI agent startup funding".to_string(),
        "AI agent product launch".to_string(),
        "emerging AI agents".to_string(),
        "AI agents to watch".to_string(),
    ]
}

pub fn category_names() -> Vec<&'static str> {
    CATEGORIES.iter().map(|(name, _)| *name).collect()
}

pub fn category_queries(name: &str) -> Option<&'static [&'static str]> {
    CATEGORIES
        .iter()
        .find(|(category, _)| *category == name)
        .map(|(_, queries)| *queries)
}

/// Basic, trending and every category, deduplicated case-insensitively in
/// that order.
pub fn all(year: i32) -> Vec<String> {
    let mut queries = to_strings(BASIC);
    queries.extend(trending(year));
    for (_, category) in CATEGORIES {
        queries.extend(to_strings(category));
    }

    let mut seen = HashSet::new();
    queries.retain(|q| seen.insert(q.to_lowercase()));
    queries
}

/// Top trending queries plus the first queries of two categories that
/// rotate with `day` (0 is Monday).
pub fn daily(day: usize, year: i32) -> Vec<String> {
    let start = (day * CATEGORIES_PER_DAY) % CATEGORIES.len();

    let mut queries: Vec<String> = trending(year).into_iter().take(TRENDING_PER_DAY).collect();
    for offset in 0..CATEGORIES_PER_DAY {
        let (_, category) = CATEGORIES[(start + offset) % CATEGORIES.len()];
        queries.extend(
            category
                .iter()
                .take(QUERIES_PER_CATEGORY_PER_DAY)
                .map(|q| q.to_string()),
        );
    }
    queries
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trending_uses_the_given_year() {
        let queries = trending(2026);
        assert_eq!(queries[0], "new AI agent 2026");
        assert_eq!(queries.len(), 7);
    }

    #[test]
    fn all_is_deduplicated_case_insensitively() {
        let queries = all(2026);
        let lowered: HashSet<String> = queries.iter().map(|q| q.to_lowercase()).collect();
        assert_eq!(lowered.len(), queries.len());
        assert_eq!(&queries[..BASIC.len()], &to_strings(BASIC)[..]);
    }

    #[test]
    fn daily_rotation_wraps_around() {
        let monday = daily(0, 2026);
        assert_eq!(monday.len(), 7);
        assert_eq!(&monday[3..5], &["AI coding agent", "AI developer assistant"]);
        assert_eq!(&monday[5..], &["AI sales agent", "AI SDR agent"]);

        // day 5: start 10, "data" then wraps to "coding"
        let saturday = daily(5, 2026);
        assert_eq!(&saturday[3..5], &["AI data agent", "AI web scraping agent"]);
        assert_eq!(&saturday[5..], &["AI coding agent", "AI developer assistant"]);
    }

    #[test]
    fn query_sets_parse() {
        assert_eq!("daily".parse::<QuerySet>().unwrap(), QuerySet::Daily);
        assert_eq!(
            "category:legal".parse::<QuerySet>().unwrap(),
            QuerySet::Category("legal".into())
        );
        assert!("category:cooking".parse::<QuerySet>().is_err());
        assert_eq!(
            QuerySet::Category("legal".into()).queries(),
            vec!["AI legal agent", "AI contract agent"]
        );
    }
}
