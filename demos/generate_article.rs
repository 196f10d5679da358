use article_pipeline::{
    ArticlePipeline, ArticleType, EnvConfig, GenerationOptions, GenerationRequest, Language,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let env = EnvConfig::from_env()?;
    let topic = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "The impact of AI on the future of work".to_string());

    let request = GenerationRequest::new(topic, env.credentials)
        .with_llm_config(env.llm.with_streaming(false))
        .with_language(Language::En)
        .with_article_type(ArticleType::Opinion)
        .with_word_count(800);

    let pipeline = ArticlePipeline::default();
    let article = pipeline
        .execute(&request, GenerationOptions::default())
        .await?;

    println!("{}", serde_json::to_string_pretty(&article)?);
    Ok(())
}
