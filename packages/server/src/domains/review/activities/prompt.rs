//! Review prompt construction.

use crate::common::text::truncate_chars;
use crate::domains::enrichment::models::ExtractedContent;

/// Page content beyond this many characters is cut from the prompt.
pub const MARKDOWN_PROMPT_LIMIT: usize = 4000;

pub const REVIEW_INSTRUCTIONS: &str = r#"You are a reviewer for a curated directory of AI agents.

Your task is to determine if the submitted product qualifies for inclusion.

## What qualifies as an AI Agent:
- Autonomous software that performs tasks using AI/ML
- Software agents that can take actions on behalf of users
- AI-powered automation tools with agent-like capabilities
- Companies/agencies that BUILD AI agents (AI agencies)
- Open source AI agent frameworks or libraries (from GitHub)

## What does NOT qualify:
- Regular SaaS tools without agent/autonomous capabilities
- Simple chatbots or basic API wrappers
- Static websites or landing pages
- Products unrelated to AI agents
- General AI tools that aren't agents (e.g., image generators without automation)

## IMPORTANT: Detect and REJECT these page types:

### Template/Workflow Pages (REJECT with flag "is_template_page"):
- n8n workflow templates or integrations
- Make.com (Integromat) scenarios or templates
- Zapier integrations or templates
- Relay.app playbooks
- Any page showing a user-built automation, not a product

### Feature Pages of Larger Products (REJECT with flag "is_feature_not_product"):
- A feature page within a larger company's website (e.g., "ProductX Agent" as a feature)
- Sub-products that aren't standalone offerings
- Plugin or extension pages for other platforms

### Directory/Aggregator Listings (REJECT with flag "is_aggregator_listing"):
- Pages from AI agent directories listing other products
- Product Hunt, YCombinator, Crunchbase company pages
- News articles or blog posts ABOUT an agent (not the agent itself)
- Review sites or comparison pages

### Blog Posts/Articles (REJECT with flag "is_article_not_landing"):
- Blog posts discussing AI agents
- News articles about AI agent releases
- Tutorial or documentation pages
- Help center or support pages

### Academic/Research (REJECT with flag "is_academic_paper"):
- arXiv papers or preprints
- Academic research pages
- Conference paper listings

## Prohibited content (must reject with flag "prohibited_content"):
- Adult/NSFW content
- Illegal services or products
- Scams, fraud, or deceptive products
- Malware or security threats

## Input you will receive:
1. AGENT NAME: The name of the product/company
2. WEBSITE: The URL of the product
3. ENRICHMENT DATA: Structured data extracted from the website (description, features, use cases, etc.)
4. RAW MARKDOWN (optional): The full page content if available for additional context

## Your output:
- decision: "approved" if it qualifies, "rejected" if not, "needs_review" if uncertain
- is_ai_agent: true if it's an AI agent or AI agency
- confidence: 0.0 to 1.0 (how confident you are in your decision)
- reasoning: Clear explanation of your decision
- flags: List any issues found (use the specific flags mentioned above)

## Decision guidelines:
- APPROVE: Clearly an AI agent product with its own landing page
- REJECT: Matches any of the "REJECT" patterns above, or is clearly not an AI agent
- NEEDS_REVIEW: Uncertain cases, edge cases, or when you can't determine from available data

Be thorough but fair. Use specific flags to explain rejection reasons."#;

/// Builds the per-candidate prompt. The enrichment section is present
/// whenever `content` is, even if every field in it is empty.
pub fn build_review_prompt(
    name: &str,
    website: &str,
    content: Option<&ExtractedContent>,
    markdown: Option<&str>,
) -> String {
    let mut parts = vec![
        format!("## AGENT NAME\n{}", name),
        format!("\n## WEBSITE\n{}", website),
    ];

    if let Some(content) = content {
        parts.push("\n## ENRICHMENT DATA (structured extraction from website)".to_string());

        if let Some(short) = &content.short_description {
            parts.push(format!("\n**Short Description:** {}", short));
        }
        if let Some(description) = &content.description {
            parts.push(format!("\n**Full Description:** {}", description));
        }
        if !content.features.is_empty() {
            parts.push(format!("\n**Features:**\n{}", bullets(&content.features)));
        }
        if !content.use_cases.is_empty() {
            parts.push(format!("\n**Use Cases:**\n{}", bullets(&content.use_cases)));
        }
        if let Some(category) = &content.category {
            parts.push(format!("\n**Category:** {}", category));
        }
        if let Some(industry) = &content.industry {
            parts.push(format!("\n**Industry:** {}", industry));
        }
        if let Some(pricing) = &content.pricing_model {
            parts.push(format!("\n**Pricing:** {}", pricing));
        }
    }

    if let Some(markdown) = markdown.filter(|m| !m.is_empty()) {
        let mut page = truncate_chars(markdown, MARKDOWN_PROMPT_LIMIT);
        if markdown.chars().count() > MARKDOWN_PROMPT_LIMIT {
            page.push_str("\n\n[... content truncated ...]");
        }
        parts.push(format!("\n## RAW MARKDOWN (full page content)\n{}", page));
    }

    parts.join("\n")
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_sections_follow_available_data() {
        let content = ExtractedContent {
            short_description: Some("Autonomous QA agent".into()),
            features: vec!["Runs tests".into(), "Files bugs".into()],
            pricing_model: Some("FREEMIUM".into()),
            ..Default::default()
        };

        let prompt = build_review_prompt("Foo", "https://foo.ai", Some(&content), None);

        assert!(prompt.starts_with("## AGENT NAME\nFoo\n\n## WEBSITE\nhttps://foo.ai"));
        assert!(prompt.contains("**Short Description:** Autonomous QA agent"));
        assert!(prompt.contains("**Features:**\n- Runs tests\n- Files bugs"));
        assert!(prompt.contains("**Pricing:** FREEMIUM"));
        assert!(!prompt.contains("**Use Cases:**"));
        assert!(!prompt.contains("RAW MARKDOWN"));
    }

    #[test]
    fn no_enrichment_means_no_enrichment_section() {
        let prompt = build_review_prompt("Foo", "https://foo.ai", None, None);
        assert!(!prompt.contains("ENRICHMENT DATA"));
    }

    #[test]
    fn long_markdown_is_truncated() {
        let markdown = "a".repeat(MARKDOWN_PROMPT_LIMIT + 10);
        let prompt = build_review_prompt("Foo", "https://foo.ai", None, Some(&markdown));

        assert!(prompt.ends_with("\n\n[... content truncated ...]"));
        assert!(!prompt.contains(&"a".repeat(MARKDOWN_PROMPT_LIMIT + 1)));

        let short = build_review_prompt("Foo", "https://foo.ai", None, Some("# Foo"));
        assert!(short.ends_with("## RAW MARKDOWN (full page content)\n# Foo"));
    }
}
