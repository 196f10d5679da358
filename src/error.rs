use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Completion service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Completion service error: {0}")]
    Provider(String),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse keywords: {0}")]
    KeywordParse(String),

    #[error("Pipeline was cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Broad classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The completion service rejected or failed a call.
    Provider,
    /// A stage's output could not be turned into structured data.
    Parse,
    /// The request or pipeline was set up incorrectly.
    Configuration,
    /// The run was cancelled by the caller.
    Cancelled,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Request(_) | Self::Http { .. } | Self::Provider(_) => ErrorKind::Provider,
            Self::Json(_) | Self::KeywordParse(_) => ErrorKind::Parse,
            Self::InvalidConfig(_) => ErrorKind::Configuration,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Provider(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
