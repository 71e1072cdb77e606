//! Prompt rendering for single-item and multi-item analysis calls.
//!
//! Content bodies are embedded verbatim. If the backend has an input limit,
//! enforcing it is the backend's job.

use std::fmt::Write as _;

use oppdb_core::ContentItem;

const NOT_SPECIFIED: &str = "not specified";

const OPPORTUNITY_SHAPE: &str = r#"{
      "title": "Short, descriptive title",
      "description": "Detailed description of the pain point or opportunity",
      "category": "pain_point|improvement_opportunity|feature_request",
      "severity": "low|medium|high|critical",
      "keywords": ["keyword1", "keyword2", "keyword3"]
    }"#;

/// Renders analysis prompts with a fixed cap on opportunities per item.
#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder {
    max_opportunities: usize,
}

impl PromptBuilder {
    #[must_use]
    pub fn new(max_opportunities: usize) -> Self {
        Self { max_opportunities }
    }

    #[must_use]
    pub fn max_opportunities(&self) -> usize {
        self.max_opportunities
    }

    /// Prompt asking for the opportunities found in one content item.
    ///
    /// The reply contract is `{"opportunities": [ ... ]}`.
    #[must_use]
    pub fn item_prompt(&self, item: &ContentItem) -> String {
        let mut prompt = String::with_capacity(item.content.len() + 1536);
        prompt.push_str(
            "Analyze the following customer content and identify pain points, \
             improvement opportunities, or feature requests.\n\n",
        );
        prompt.push_str("**CONTENT INFORMATION:**\n");
        write_item_header(&mut prompt, item);
        prompt.push_str("\n**CONTENT TO ANALYZE:**\n");
        prompt.push_str(&item.content);
        prompt.push_str("\n\n");
        self.write_instructions(&mut prompt);
        prompt.push_str("\n**RESPONSE FORMAT (JSON):**\n");
        let _ = write!(
            prompt,
            "{{\n  \"opportunities\": [\n    {OPPORTUNITY_SHAPE}\n  ]\n}}\n"
        );
        prompt.push_str("\n**RESPONSE:**\n");
        prompt
    }

    /// Prompt asking for the opportunities of several items in one call.
    ///
    /// The reply contract is
    /// `{"results": [{"item_id": "...", "opportunities": [ ... ]}]}` with one
    /// entry per item, keyed by the item id.
    #[must_use]
    pub fn batch_prompt(&self, items: &[ContentItem]) -> String {
        let body_len: usize = items.iter().map(|i| i.content.len() + 256).sum();
        let mut prompt = String::with_capacity(body_len + 2048);
        let _ = write!(
            prompt,
            "Analyze each of the following {} customer content items independently and \
             identify pain points, improvement opportunities, or feature requests.\n\n",
            items.len()
        );
        for (index, item) in items.iter().enumerate() {
            let _ = writeln!(prompt, "### ITEM {}", index + 1);
            write_item_header(&mut prompt, item);
            prompt.push_str("Content:\n");
            prompt.push_str(&item.content);
            prompt.push_str("\n\n");
        }
        self.write_instructions(&mut prompt);
        prompt.push_str(
            "5. Return exactly one entry in \"results\" per item, using the item ID \
             shown above as \"item_id\".\n",
        );
        prompt.push_str("\n**RESPONSE FORMAT (JSON):**\n");
        let _ = write!(
            prompt,
            "{{\n  \"results\": [\n    {{\n      \"item_id\": \"ID of the item\",\n      \
             \"opportunities\": [\n    {OPPORTUNITY_SHAPE}\n      ]\n    }}\n  ]\n}}\n"
        );
        prompt.push_str("\n**RESPONSE:**\n");
        prompt
    }

    fn write_instructions(&self, prompt: &mut String) {
        prompt.push_str("**INSTRUCTIONS:**\n");
        let _ = writeln!(
            prompt,
            "1. Identify at most {} main opportunities per item",
            self.max_opportunities
        );
        prompt.push_str(
            "2. For each opportunity provide:\n\
             \x20  - A concise, descriptive title\n\
             \x20  - A detailed description of the pain point or opportunity\n\
             \x20  - Category: \"pain_point\", \"improvement_opportunity\", or \"feature_request\"\n\
             \x20  - Severity: \"low\", \"medium\", \"high\", or \"critical\"\n\
             \x20  - Related keywords (3-5 words)\n",
        );
        prompt.push_str(
            "3. Only report REAL and SPECIFIC opportunities. Do not invent problems.\n",
        );
        prompt.push_str("4. If there are no clear opportunities, return an empty list.\n");
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(3)
    }
}

fn write_item_header(prompt: &mut String, item: &ContentItem) {
    let _ = writeln!(prompt, "- ID: {}", item.id);
    let _ = writeln!(prompt, "- Type: {}", item.content_type);
    let _ = writeln!(
        prompt,
        "- Customer: {}",
        item.customer_id.as_deref().unwrap_or(NOT_SPECIFIED)
    );
    let _ = writeln!(prompt, "- Source file: {}", item.source_file);
}
