//! Stage execution: prompt rendering, completion calls, and the two ways of
//! running a stage (whole-result and fragment-by-fragment).

use crate::{
    client::{CompletionService, FragmentStream},
    error::Result,
    prompt::{self, PromptVars, TemplateName},
    types::{ChunkEvent, StageTag},
    PipelineError,
};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Receives chunk events during a streamed run.
///
/// Any `FnMut(ChunkEvent) + Send` closure is a sink.
pub trait ChunkSink: Send {
    fn emit(&mut self, event: ChunkEvent);
}

impl<F> ChunkSink for F
where
    F: FnMut(ChunkEvent) + Send,
{
    fn emit(&mut self, event: ChunkEvent) {
        self(event)
    }
}

/// Adapt a Tokio channel into a sink. Events sent after the receiver is
/// dropped are discarded.
pub fn channel_sink(tx: UnboundedSender<ChunkEvent>) -> impl FnMut(ChunkEvent) + Send {
    move |event| {
        if tx.send(event).is_err() {
            debug!("chunk receiver dropped, discarding event");
        }
    }
}

/// Render a registered template.
pub fn render(name: TemplateName, vars: &PromptVars) -> String {
    prompt::render(prompt::template(name), vars)
}

/// Run `prompt` and wait for the whole completion.
pub async fn invoke(service: &dyn CompletionService, prompt: &str) -> Result<String> {
    service.complete_once(prompt).await
}

/// Run `prompt` and return its fragments as they arrive.
pub async fn invoke_streaming(
    service: &dyn CompletionService,
    prompt: &str,
) -> Result<FragmentStream> {
    service.complete_stream(prompt).await
}

pub(crate) fn check_cancelled(cancel: Option<&Arc<AtomicBool>>) -> Result<()> {
    if let Some(cancel) = cancel {
        if cancel.load(Ordering::Relaxed) {
            return Err(PipelineError::Cancelled);
        }
    }
    Ok(())
}

/// Strategy for running a stage, picked once per pipeline run.
#[async_trait]
pub trait StageRunner: Send {
    /// Execute `prompt` for `stage` and return the stage's full output.
    async fn run(
        &mut self,
        service: &dyn CompletionService,
        stage: StageTag,
        prompt: &str,
    ) -> Result<String>;

    /// Hand a stage's already-complete output to the caller, if anyone is
    /// listening.
    fn forward(&mut self, stage: StageTag, text: &str);
}

/// Whole-result execution with no intermediate visibility.
#[derive(Debug, Default)]
pub struct BatchRunner;

#[async_trait]
impl StageRunner for BatchRunner {
    async fn run(
        &mut self,
        service: &dyn CompletionService,
        _stage: StageTag,
        prompt: &str,
    ) -> Result<String> {
        invoke(service, prompt).await
    }

    fn forward(&mut self, _stage: StageTag, _text: &str) {}
}

/// Execution that reports output to a [`ChunkSink`].
///
/// When `incremental` every fragment is forwarded as it arrives; otherwise
/// each stage runs as one call and its output is forwarded as a single event.
pub struct StreamingRunner<'a> {
    sink: &'a mut dyn ChunkSink,
    incremental: bool,
    cancellation: Option<Arc<AtomicBool>>,
}

impl<'a> StreamingRunner<'a> {
    pub fn new(sink: &'a mut dyn ChunkSink) -> Self {
        Self {
            sink,
            incremental: true,
            cancellation: None,
        }
    }

    pub fn incremental(mut self, enabled: bool) -> Self {
        self.incremental = enabled;
        self
    }

    pub fn with_cancellation(mut self, cancel: Option<Arc<AtomicBool>>) -> Self {
        self.cancellation = cancel;
        self
    }
}

#[async_trait]
impl<'a> StageRunner for StreamingRunner<'a> {
    async fn run(
        &mut self,
        service: &dyn CompletionService,
        stage: StageTag,
        prompt: &str,
    ) -> Result<String> {
        if !self.incremental {
            let text = invoke(service, prompt).await?;
            self.forward(stage, &text);
            return Ok(text);
        }

        let mut fragments = invoke_streaming(service, prompt).await?;
        let mut accumulated = String::new();
        let mut count = 0usize;

        loop {
            check_cancelled(self.cancellation.as_ref())?;
            let Some(fragment) = fragments.next().await else {
                break;
            };
            let fragment = fragment?;
            accumulated.push_str(&fragment);
            self.sink.emit(ChunkEvent::new(stage, fragment));
            count += 1;
        }

        debug!(stage = %stage, fragments = count, "stage stream drained");
        Ok(accumulated)
    }

    fn forward(&mut self, stage: StageTag, text: &str) {
        self.sink.emit(ChunkEvent::new(stage, text));
    }
}
