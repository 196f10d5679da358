use crate::article_type::ArticleType;
use crate::client::LlmConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output language requested for the article.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Zh,
    En,
}

impl Language {
    /// Label used inside prompt text.
    pub fn label(self) -> &'static str {
        match self {
            Language::Zh => "Chinese",
            Language::En => "English",
        }
    }
}

/// Writing register for the outline and body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStyle {
    #[default]
    Professional,
    Casual,
    Academic,
}

impl ArticleStyle {
    pub fn label(self) -> &'static str {
        match self {
            ArticleStyle::Professional => "professional",
            ArticleStyle::Casual => "casual",
            ArticleStyle::Academic => "academic",
        }
    }
}

/// Per-call access to the completion service.
///
/// Never cached: every pipeline run builds its client from the credentials on
/// the request it was handed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub api_key: String,
    pub base_url: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Input to a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Subject of the article. Reused verbatim as the title.
    pub topic: String,

    #[serde(default)]
    pub language: Language,

    #[serde(default)]
    pub article_type: ArticleType,

    #[serde(default)]
    pub style: ArticleStyle,

    /// Target length. When absent no length instruction is given at all.
    #[serde(default)]
    pub word_count: Option<u32>,

    pub credentials: Credentials,

    /// Model, temperature, streaming flag and other completion tuning.
    #[serde(flatten)]
    pub llm: LlmConfig,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            topic: topic.into(),
            language: Language::default(),
            article_type: ArticleType::default(),
            style: ArticleStyle::default(),
            word_count: None,
            credentials,
            llm: LlmConfig::default(),
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_article_type(mut self, article_type: ArticleType) -> Self {
        self.article_type = article_type;
        self
    }

    pub fn with_style(mut self, style: ArticleStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_word_count(mut self, words: u32) -> Self {
        self.word_count = Some(words);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.llm.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.llm.temperature = temp;
        self
    }

    pub fn with_streaming(mut self, enabled: bool) -> Self {
        self.llm.streaming = enabled;
        self
    }

    pub fn with_llm_config(mut self, config: LlmConfig) -> Self {
        self.llm = config;
        self
    }
}

/// Which optional stages run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationOptions {
    pub generate_summary: bool,
    pub generate_keywords: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            generate_summary: true,
            generate_keywords: true,
        }
    }
}

impl GenerationOptions {
    pub fn with_summary(mut self, enabled: bool) -> Self {
        self.generate_summary = enabled;
        self
    }

    pub fn with_keywords(mut self, enabled: bool) -> Self {
        self.generate_keywords = enabled;
        self
    }
}

/// Identifies the stage a chunk of output belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageTag {
    Outline,
    Content,
    Summary,
    Keywords,
}

impl StageTag {
    pub fn as_str(self) -> &'static str {
        match self {
            StageTag::Outline => "outline",
            StageTag::Content => "content",
            StageTag::Summary => "summary",
            StageTag::Keywords => "keywords",
        }
    }
}

impl fmt::Display for StageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A piece of stage output forwarded to the caller during a streamed run.
///
/// Serializes to the server-sent event payload `{"type": ..., "content": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkEvent {
    #[serde(rename = "type")]
    pub stage: StageTag,

    #[serde(rename = "content")]
    pub text: String,
}

impl ChunkEvent {
    pub fn new(stage: StageTag, text: impl Into<String>) -> Self {
        Self {
            stage,
            text: text.into(),
        }
    }
}

/// The assembled article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub title: String,
    pub outline: String,
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}
