use crate::{
    client::{ClientFactory, CompletionService, OpenAiClientFactory},
    error::Result,
    executor::{check_cancelled, invoke, render, BatchRunner, ChunkSink, StageRunner, StreamingRunner},
    parser::parse_keywords,
    stage::{Execution, OutputKind, Stage, StageOutputs, ARTICLE_STAGES},
    types::{GenerationOptions, GenerationRequest, GenerationResult, StageTag},
    PipelineError,
};
use std::sync::{atomic::AtomicBool, Arc};
use tracing::{debug, error, info, info_span, Instrument};

/// Article generation pipeline.
///
/// Runs outline, content, summary and keywords stages in order against a
/// completion service built fresh for every call from the request's
/// credentials. Holds no per-request state, so one pipeline can serve
/// concurrent requests.
pub struct ArticlePipeline {
    factory: Arc<dyn ClientFactory>,
    cancellation: Option<Arc<AtomicBool>>,
}

impl std::fmt::Debug for ArticlePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArticlePipeline")
            .field(
                "stages",
                &ARTICLE_STAGES.iter().map(|s| s.tag).collect::<Vec<_>>(),
            )
            .field("has_cancellation", &self.cancellation.is_some())
            .finish()
    }
}

impl Default for ArticlePipeline {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ArticlePipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> ArticlePipelineBuilder {
        ArticlePipelineBuilder::new()
    }

    /// The stage table this pipeline interprets.
    pub fn stages(&self) -> &'static [Stage] {
        &ARTICLE_STAGES
    }

    /// Execute with whole-result stage calls and no intermediate output.
    ///
    /// The request must have `streaming` turned off.
    pub async fn execute(
        &self,
        request: &GenerationRequest,
        options: GenerationOptions,
    ) -> Result<GenerationResult> {
        self.generate(request, None, options).await
    }

    /// Execute, forwarding stage output to `sink` as it is produced.
    pub async fn execute_streaming(
        &self,
        request: &GenerationRequest,
        options: GenerationOptions,
        sink: &mut dyn ChunkSink,
    ) -> Result<GenerationResult> {
        self.generate(request, Some(sink), options).await
    }

    /// Run the pipeline.
    ///
    /// With no sink every stage runs as one whole-result call. With a sink,
    /// outline, content and summary are forwarded fragment by fragment (or
    /// as one event each when `request.llm.streaming` is off); keywords are
    /// always fetched in one call and forwarded as a serialized JSON array.
    ///
    /// The first failure aborts the run and is returned as is. Chunks already
    /// forwarded are not retracted.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        sink: Option<&mut dyn ChunkSink>,
        options: GenerationOptions,
    ) -> Result<GenerationResult> {
        validate(request, sink.is_some())?;

        let mode = match (&sink, request.llm.streaming) {
            (None, _) => "batch",
            (Some(_), true) => "streaming",
            (Some(_), false) => "forwarding",
        };
        let span = info_span!(
            "article_pipeline",
            topic = %request.topic,
            model = %request.llm.model,
            mode
        );

        let mut runner: Box<dyn StageRunner + '_> = match sink {
            Some(sink) => Box::new(
                StreamingRunner::new(sink)
                    .incremental(request.llm.streaming)
                    .with_cancellation(self.cancellation.clone()),
            ),
            None => Box::new(BatchRunner),
        };

        self.run_stages(request, options, runner.as_mut())
            .instrument(span)
            .await
    }

    async fn run_stages(
        &self,
        request: &GenerationRequest,
        options: GenerationOptions,
        runner: &mut dyn StageRunner,
    ) -> Result<GenerationResult> {
        let service = self.factory.build(&request.credentials, &request.llm);
        let mut outputs = StageOutputs::default();

        for stage in &ARTICLE_STAGES {
            if !stage.is_enabled(&options) {
                debug!(stage = %stage.tag, "stage skipped");
                continue;
            }
            check_cancelled(self.cancellation.as_ref())?;

            debug!(stage = %stage.tag, "stage started");
            if let Err(e) = self
                .run_stage(stage, request, service.as_ref(), runner, &mut outputs)
                .await
            {
                error!(stage = %stage.tag, error = %e, "stage failed");
                return Err(e);
            }
        }

        Ok(GenerationResult {
            title: request.topic.clone(),
            outline: outputs.outline.unwrap_or_default(),
            content: outputs.content.unwrap_or_default(),
            summary: outputs.summary,
            keywords: outputs.keywords,
        })
    }

    /// Run a single stage and store its output.
    async fn run_stage(
        &self,
        stage: &Stage,
        request: &GenerationRequest,
        service: &dyn CompletionService,
        runner: &mut dyn StageRunner,
        outputs: &mut StageOutputs,
    ) -> Result<()> {
        let prompt = render(stage.template, &stage.prompt_vars(request, outputs));

        let text = match stage.execution {
            Execution::Runner => runner.run(service, stage.tag, &prompt).await?,
            Execution::SingleShot => invoke(service, &prompt).await?,
        };

        match stage.output {
            OutputKind::Text => {
                // Content is written from the outline, so a blank one stops the run here
                if stage.tag == StageTag::Outline && text.trim().is_empty() {
                    return Err(PipelineError::Provider(
                        "outline stage returned no text".to_string(),
                    ));
                }
                info!(stage = %stage.tag, chars = text.chars().count(), "stage complete");
                outputs.set_text(stage.tag, text);
            }
            OutputKind::KeywordList => {
                let keywords = parse_keywords(&text)?;
                runner.forward(stage.tag, &serde_json::to_string(&keywords)?);
                info!(stage = %stage.tag, count = keywords.len(), "stage complete");
                outputs.keywords = Some(keywords);
            }
        }
        Ok(())
    }
}

fn validate(request: &GenerationRequest, has_sink: bool) -> Result<()> {
    if request.topic.trim().is_empty() {
        return Err(PipelineError::InvalidConfig(
            "topic must not be empty".to_string(),
        ));
    }
    if request.word_count == Some(0) {
        return Err(PipelineError::InvalidConfig(
            "wordCount must be greater than zero".to_string(),
        ));
    }
    if request.credentials.api_key.trim().is_empty() {
        return Err(PipelineError::InvalidConfig(
            "credentials.apiKey is required".to_string(),
        ));
    }
    if request.credentials.base_url.trim().is_empty() {
        return Err(PipelineError::InvalidConfig(
            "credentials.baseUrl is required".to_string(),
        ));
    }
    if request.llm.streaming && !has_sink {
        return Err(PipelineError::InvalidConfig(
            "streaming was requested but no chunk sink was supplied".to_string(),
        ));
    }
    Ok(())
}

/// Builder for [`ArticlePipeline`].
pub struct ArticlePipelineBuilder {
    factory: Arc<dyn ClientFactory>,
    cancellation: Option<Arc<AtomicBool>>,
}

impl ArticlePipelineBuilder {
    pub fn new() -> Self {
        Self {
            factory: Arc::new(OpenAiClientFactory::new()),
            cancellation: None,
        }
    }

    /// Use a different completion client factory.
    pub fn with_client_factory(mut self, factory: Arc<dyn ClientFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Set a cancellation flag that can be used to abort execution.
    pub fn with_cancellation(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancellation = Some(cancel);
        self
    }

    pub fn build(self) -> ArticlePipeline {
        ArticlePipeline {
            factory: self.factory,
            cancellation: self.cancellation,
        }
    }
}

impl Default for ArticlePipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
