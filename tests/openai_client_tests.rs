use article_pipeline::*;
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials(server: &MockServer) -> Credentials {
    Credentials::new("test-key", format!("{}/v1", server.uri()))
}

fn completion(text: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": text }, "finish_reason": "stop" }
        ]
    })
}

fn sse(fragments: &[&str]) -> String {
    let mut body = String::new();
    body.push_str("data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n");
    for fragment in fragments {
        let event = json!({ "choices": [{ "index": 0, "delta": { "content": fragment } }] });
        body.push_str(&format!("data: {}\n\n", event));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn client(server: &MockServer, config: LlmConfig) -> Arc<dyn CompletionService> {
    OpenAiClientFactory::new().build(&credentials(server), &config)
}

#[tokio::test]
async fn complete_once_happy_path() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "stream": false,
            "max_tokens": 2000,
            "messages": [{ "role": "user", "content": "hello" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let service = client(&server, LlmConfig::default().with_model("gpt-4o-mini"));
    let text = service.complete_once("hello").await.unwrap();
    assert_eq!(text, "hi there");
}

#[tokio::test]
async fn complete_once_maps_http_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = client(&server, LlmConfig::default())
        .complete_once("hello")
        .await
        .unwrap_err();
    match err {
        PipelineError::Http { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid api key");
        }
        other => panic!("Expected Http error, got {:?}", other),
    }
}

#[tokio::test]
async fn complete_once_without_choices_is_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let err = client(&server, LlmConfig::default())
        .complete_once("hello")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Provider(_)));
}

#[tokio::test]
async fn complete_stream_yields_fragments_in_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "stream": true })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse(&["Hel", "lo, ", "世界"]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let stream = client(&server, LlmConfig::default())
        .complete_stream("hello")
        .await
        .unwrap();
    let fragments: Vec<String> = stream.map(|f| f.unwrap()).collect().await;
    assert_eq!(fragments, vec!["Hel", "lo, ", "世界"]);
}

#[tokio::test]
async fn complete_stream_surfaces_error_events() {
    let server = MockServer::start().await;

    let body = format!(
        "{}data: {}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"par\"}}]}\n\n",
        json!({ "error": { "message": "rate limit reached" } })
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let mut stream = client(&server, LlmConfig::default())
        .complete_stream("hello")
        .await
        .unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), "par");
    match stream.next().await.unwrap() {
        Err(PipelineError::Provider(msg)) => assert!(msg.contains("rate limit")),
        other => panic!("Expected provider error, got {:?}", other),
    }
    assert!(stream.next().await.is_none());
}

async fn mount_article_stages(server: &MockServer, streaming: bool) {
    let stages = [
        ("detailed outline", "1. Why\n2. How"),
        ("follows this outline", "Body of the article."),
        ("Summarize the following", "Short."),
    ];
    for (marker, reply) in stages {
        let response = if streaming {
            let chars: Vec<char> = reply.chars().collect();
            let pieces: Vec<String> = chars.chunks(3).map(|c| c.iter().collect()).collect();
            let refs: Vec<&str> = pieces.iter().map(|s| s.as_str()).collect();
            ResponseTemplate::new(200).set_body_raw(sse(&refs), "text/event-stream")
        } else {
            ResponseTemplate::new(200).set_body_json(completion(reply))
        };
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains(marker))
            .respond_with(response)
            .expect(1)
            .mount(server)
            .await;
    }

    // Keywords are fetched in one call even in a streamed run
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("Extract 1-2 keywords"))
        .and(body_partial_json(json!({ "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "```json\n[\"why\", \"how\"]\n```",
        )))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn pipeline_batch_run_against_http_service() {
    let server = MockServer::start().await;
    mount_article_stages(&server, false).await;

    let request = GenerationRequest::new("Why and how", credentials(&server)).with_streaming(false);
    let result = ArticlePipeline::default()
        .execute(&request, GenerationOptions::default())
        .await
        .unwrap();

    assert_eq!(result.title, "Why and how");
    assert_eq!(result.outline, "1. Why\n2. How");
    assert_eq!(result.content, "Body of the article.");
    assert_eq!(result.summary.as_deref(), Some("Short."));
    assert_eq!(
        result.keywords,
        Some(vec!["why".to_string(), "how".to_string()])
    );
}

#[tokio::test]
async fn pipeline_streaming_run_against_http_service() {
    let server = MockServer::start().await;
    mount_article_stages(&server, true).await;

    let request = GenerationRequest::new("Why and how", credentials(&server));
    let mut events: Vec<ChunkEvent> = Vec::new();
    let mut sink = |e: ChunkEvent| events.push(e);
    let result = ArticlePipeline::default()
        .execute_streaming(&request, GenerationOptions::default(), &mut sink)
        .await
        .unwrap();

    let outline: String = events
        .iter()
        .filter(|e| e.stage == StageTag::Outline)
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(outline, result.outline);
    assert_eq!(result.outline, "1. Why\n2. How");

    let last = events.last().unwrap();
    assert_eq!(last.stage, StageTag::Keywords);
    assert_eq!(last.text, r#"["why","how"]"#);
}
