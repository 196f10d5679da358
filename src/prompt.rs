//! Prompt templates and placeholder substitution.

use std::collections::HashMap;

/// Named templates known to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateName {
    Outline,
    Content,
    Summary,
    Keywords,
}

const OUTLINE_TEMPLATE: &str = "You are an experienced editor planning a {articleType}.
Write a detailed outline for an article titled \"{title}\".

Requirements:
1. Use numbered sections with short bullet points under each section
2. Keep a logical progression from introduction to conclusion
3. Match a {style} tone
4. Write the outline in {language}
{wordCount}
Return only the outline.";

const CONTENT_TEMPLATE: &str = "You are a professional writer. Write a complete {articleType} that follows this outline:

{outline}

Requirements:
1. Cover every section of the outline in order
2. Use clear paragraphs and smooth transitions
3. Match a {style} tone
4. Write in {language}
{wordCount}
Return only the article body.";

const SUMMARY_TEMPLATE: &str = "Summarize the following article in no more than 250 words. Write the summary in {language}.

{content}

Return only the summary.";

const KEYWORDS_TEMPLATE: &str = "Extract 1-2 keywords that best describe the following article.

{content}

Return ONLY a JSON array of strings, for example: [\"keyword one\", \"keyword two\"]";

/// Look up the template text for a name.
pub fn template(name: TemplateName) -> &'static str {
    match name {
        TemplateName::Outline => OUTLINE_TEMPLATE,
        TemplateName::Content => CONTENT_TEMPLATE,
        TemplateName::Summary => SUMMARY_TEMPLATE,
        TemplateName::Keywords => KEYWORDS_TEMPLATE,
    }
}

/// Values substituted into `{key}` placeholders.
#[derive(Debug, Clone, Default)]
pub struct PromptVars {
    data: HashMap<String, String>,
}

impl PromptVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(|s| s.as_str())
    }
}

/// Substitute `{key}` placeholders in `template` with values from `vars`.
///
/// A placeholder is `{` followed by an identifier and `}`. Placeholders with
/// no value render as the empty string; any other brace is kept verbatim.
pub fn render(template: &str, vars: &PromptVars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_placeholder_name(&after[..close]) => {
                out.push_str(vars.get(&after[..close]).unwrap_or(""));
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Length instruction appended to prompts, empty when no target is given.
pub fn word_count_fragment(word_count: Option<u32>) -> String {
    match word_count {
        Some(words) => format!("5. Aim for approximately {} words in total", words),
        None => String::new(),
    }
}
