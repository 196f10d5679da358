//! Parsing of structured stage output.
//!
//! The keywords stage must come back as a JSON array of strings. Models
//! often wrap it in a Markdown fence, a `<think>` block or a sentence of
//! prose, so the array is located before parsing. Nothing beyond locating
//! the array is attempted: a reply without one is an error.

use crate::{error::Result, PipelineError};

/// Parse the keywords stage output as a JSON array of strings.
pub fn parse_keywords(text: &str) -> Result<Vec<String>> {
    let cleaned = strip_thinking(text);
    let trimmed = cleaned.trim();

    if trimmed.is_empty() {
        return Err(PipelineError::KeywordParse("empty response".to_string()));
    }

    // Valid JSON must already be the array; no digging inside objects
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return serde_json::from_value::<Vec<String>>(value)
            .map_err(|e| PipelineError::KeywordParse(format!("not an array of strings: {}", e)));
    }

    if let Some(block) = extract_json_block(trimmed) {
        if let Ok(keywords) = serde_json::from_str::<Vec<String>>(&block) {
            return Ok(keywords);
        }
    }

    // First '[' through last ']'
    if let (Some(start), Some(end)) = (trimmed.find('['), trimmed.rfind(']')) {
        if start < end {
            if let Ok(keywords) = serde_json::from_str::<Vec<String>>(&trimmed[start..=end]) {
                return Ok(keywords);
            }
        }
    }

    Err(PipelineError::KeywordParse(format!(
        "expected a JSON array of strings, got: {}",
        truncate(trimmed, 200)
    )))
}

/// Remove `<think>...</think>` reasoning blocks (DeepSeek R1 style).
///
/// An unclosed block is stripped to the end of the text.
pub fn strip_thinking(text: &str) -> String {
    let mut result = text.to_string();
    while let Some(start) = result.find("<think>") {
        match result[start..].find("</think>") {
            Some(end) => {
                result.replace_range(start..start + end + "</think>".len(), "");
            }
            None => {
                result.truncate(start);
                break;
            }
        }
    }
    result
}

/// Extract the body of the first ```json ... ``` (or bare ```) code block.
fn extract_json_block(text: &str) -> Option<String> {
    let markers = ["```json", "```JSON", "```"];
    for marker in markers {
        if let Some(start) = text.find(marker) {
            let content_start = start + marker.len();
            if let Some(end) = text[content_start..].find("```") {
                return Some(text[content_start..content_start + end].trim().to_string());
            }
        }
    }
    None
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_array() {
        let keywords = parse_keywords(r#"["rust", "async"]"#).unwrap();
        assert_eq!(keywords, vec!["rust", "async"]);
    }

    #[test]
    fn test_parse_markdown_block() {
        let text = "Here you go:\n```json\n[\"人工智能\", \"就业\"]\n```";
        assert_eq!(parse_keywords(text).unwrap(), vec!["人工智能", "就业"]);
    }

    #[test]
    fn test_parse_after_thinking() {
        let text = "<think>the article is about ownership</think>\n[\"ownership\"]";
        assert_eq!(parse_keywords(text).unwrap(), vec!["ownership"]);
    }

    #[test]
    fn test_parse_embedded_in_prose() {
        let text = "The keywords are [\"tokio\", \"runtime\"] as requested.";
        assert_eq!(parse_keywords(text).unwrap(), vec!["tokio", "runtime"]);
    }

    #[test]
    fn test_empty_array_is_valid() {
        assert!(parse_keywords("[]").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_prose() {
        let err = parse_keywords("rust, async, tokio").unwrap_err();
        assert!(matches!(err, PipelineError::KeywordParse(_)));
    }

    #[test]
    fn test_rejects_non_string_items() {
        assert!(parse_keywords("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_rejects_object() {
        assert!(parse_keywords(r#"{"keywords": ["a"]}"#).is_err());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(parse_keywords("   ").is_err());
        assert!(parse_keywords("<think>hmm</think>").is_err());
    }

    #[test]
    fn test_strip_thinking_unclosed() {
        assert_eq!(strip_thinking("answer <think>still going"), "answer ");
    }

    #[test]
    fn test_extract_json_block_none() {
        assert_eq!(extract_json_block("no code block"), None);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("关键词关键词", 3), "关键词");
        assert_eq!(truncate("ab", 5), "ab");
    }
}
