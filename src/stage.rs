//! The ordered stage table interpreted by the pipeline driver.

use crate::{
    prompt::{word_count_fragment, PromptVars, TemplateName},
    types::{GenerationOptions, GenerationRequest, StageTag},
};

/// Which accumulated output a stage's prompt is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageInput {
    /// The request's topic, used as the title.
    Topic,
    Outline,
    Content,
}

/// How a stage is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// Whatever strategy the run selected (batch or streaming).
    Runner,
    /// Always one whole-result call, whatever the strategy.
    SingleShot,
}

/// How a stage's text is turned into its result field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Text,
    KeywordList,
}

/// Descriptor for one step of the article pipeline.
#[derive(Clone, Copy)]
pub struct Stage {
    pub tag: StageTag,
    pub template: TemplateName,
    pub input: StageInput,
    pub execution: Execution,
    pub output: OutputKind,
    /// Whether the stage runs for the given options.
    pub enabled: fn(&GenerationOptions) -> bool,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("tag", &self.tag)
            .field("input", &self.input)
            .field("execution", &self.execution)
            .field("output", &self.output)
            .finish()
    }
}

fn always(_: &GenerationOptions) -> bool {
    true
}

fn wants_summary(options: &GenerationOptions) -> bool {
    options.generate_summary
}

fn wants_keywords(options: &GenerationOptions) -> bool {
    options.generate_keywords
}

/// Outline, content, summary, keywords; in that order.
pub const ARTICLE_STAGES: [Stage; 4] = [
    Stage {
        tag: StageTag::Outline,
        template: TemplateName::Outline,
        input: StageInput::Topic,
        execution: Execution::Runner,
        output: OutputKind::Text,
        enabled: always,
    },
    Stage {
        tag: StageTag::Content,
        template: TemplateName::Content,
        input: StageInput::Outline,
        execution: Execution::Runner,
        output: OutputKind::Text,
        enabled: always,
    },
    Stage {
        tag: StageTag::Summary,
        template: TemplateName::Summary,
        input: StageInput::Content,
        execution: Execution::Runner,
        output: OutputKind::Text,
        enabled: wants_summary,
    },
    Stage {
        tag: StageTag::Keywords,
        template: TemplateName::Keywords,
        input: StageInput::Content,
        execution: Execution::SingleShot,
        output: OutputKind::KeywordList,
        enabled: wants_keywords,
    },
];

impl Stage {
    pub fn is_enabled(&self, options: &GenerationOptions) -> bool {
        (self.enabled)(options)
    }

    /// Template variables for this stage.
    ///
    /// Request metadata (type, style, language, length) is always present;
    /// the text the stage works on comes only from `input`.
    pub fn prompt_vars(&self, request: &GenerationRequest, outputs: &StageOutputs) -> PromptVars {
        let mut vars = PromptVars::new()
            .insert("articleType", request.article_type.describe())
            .insert("style", request.style.label())
            .insert("language", request.language.label())
            .insert("wordCount", word_count_fragment(request.word_count));

        match self.input {
            StageInput::Topic => vars.set("title", request.topic.as_str()),
            StageInput::Outline => vars.set("outline", outputs.outline.as_deref().unwrap_or("")),
            StageInput::Content => vars.set("content", outputs.content.as_deref().unwrap_or("")),
        }
        vars
    }
}

/// Accumulated outputs of a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOutputs {
    pub outline: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub keywords: Option<Vec<String>>,
}

impl StageOutputs {
    pub fn set_text(&mut self, tag: StageTag, text: String) {
        match tag {
            StageTag::Outline => self.outline = Some(text),
            StageTag::Content => self.content = Some(text),
            StageTag::Summary => self.summary = Some(text),
            StageTag::Keywords => {}
        }
    }
}
