//! # Article Pipeline
//!
//! Multi-stage long-form article generation over OpenAI-compatible
//! completion APIs, with streaming and batch execution.
//!
//! A run turns a topic into an outline, then a body written from that
//! outline, then (optionally) a summary and a keyword list derived from the
//! body. Every stage is one completion call and stages always run in order.
//!
//! ## Features
//!
//! - **Two execution modes** — whole-result calls, or fragments forwarded to
//!   a caller-supplied sink as they arrive
//! - **Per-request credentials** — each run builds its own client from the
//!   API key, base URL and model on the request
//! - **Optional stages** — summary and keywords can be switched off
//! - **Structured keywords** — the keyword stage is parsed as a JSON array
//! - **Cancellation** — interrupt a run mid-stream via `AtomicBool`
//!
//! ## Quick Start
//!
//! ```no_run
//! use article_pipeline::{
//!     ArticlePipeline, ArticleType, ChunkEvent, Credentials, GenerationOptions,
//!     GenerationRequest,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = ArticlePipeline::default();
//!
//!     let request = GenerationRequest::new(
//!         "The impact of AI on the future of work",
//!         Credentials::new("sk-...", "https://api.openai.com/v1"),
//!     )
//!     .with_article_type(ArticleType::Opinion)
//!     .with_word_count(1200);
//!
//!     let mut sink = |event: ChunkEvent| print!("{}", event.text);
//!     let article = pipeline
//!         .execute_streaming(&request, GenerationOptions::default(), &mut sink)
//!         .await?;
//!
//!     println!("\n\nKeywords: {:?}", article.keywords);
//!     Ok(())
//! }
//! ```

pub mod article_type;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod stage;
pub mod types;

pub use article_type::ArticleType;
pub use client::{ClientFactory, CompletionService, FragmentStream, LlmConfig, OpenAiClientFactory};
pub use config::EnvConfig;
pub use error::{ErrorKind, PipelineError, Result};
pub use executor::{channel_sink, ChunkSink, StageRunner};
pub use pipeline::{ArticlePipeline, ArticlePipelineBuilder};
pub use types::{
    ArticleStyle, ChunkEvent, Credentials, GenerationOptions, GenerationRequest, GenerationResult,
    Language, StageTag,
};
