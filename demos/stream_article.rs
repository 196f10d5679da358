use article_pipeline::{
    channel_sink, ArticlePipeline, ChunkEvent, EnvConfig, GenerationOptions, GenerationRequest, StageTag,
};
use std::io::Write;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let env = EnvConfig::from_env()?;
    let topic = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "人工智能对未来工作的影响".to_string());
    let request = GenerationRequest::new(topic, env.credentials).with_llm_config(env.llm);

    // Print events as server-sent events, the way an HTTP host would frame them
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ChunkEvent>();
    let printer = tokio::spawn(async move {
        let mut stdout = std::io::stdout();
        let mut current: Option<StageTag> = None;
        while let Some(event) = rx.recv().await {
            if current != Some(event.stage) {
                eprintln!("\n=== {} ===", event.stage);
                current = Some(event.stage);
            }
            if let Ok(payload) = serde_json::to_string(&event) {
                write!(stdout, "data: {}\n\n", payload)?;
                stdout.flush()?;
            }
        }
        Ok::<(), std::io::Error>(())
    });

    let mut sink = channel_sink(tx);
    let result = ArticlePipeline::default()
        .execute_streaming(&request, GenerationOptions::default(), &mut sink)
        .await;
    drop(sink);
    printer.await??;

    match result {
        Ok(article) => eprintln!("\nKeywords: {:?}", article.keywords.unwrap_or_default()),
        Err(e) => eprintln!("\nGeneration failed ({:?}): {}", e.kind(), e),
    }
    Ok(())
}
