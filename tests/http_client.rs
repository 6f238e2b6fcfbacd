//! HTTP transport tests against a wiremock server.
//!
//! Response bodies follow the OpenAI-style chat completion format served by
//! Groq and Cerebras.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use webnovel_summarizer::{
    CompletionClient, CompletionRequest, HttpCompletionClient, ProviderCatalog,
    ProviderDescriptor, RetryPolicy, SummaryError, SummaryOrchestrator, SummaryType,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_completion_response(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1677652288,
        "model": "llama-3.3-70b-versatile",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": content
            },
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 120,
            "completion_tokens": 40,
            "total_tokens": 160
        }
    })
}

fn provider(server: &MockServer, name: &str) -> ProviderDescriptor {
    ProviderDescriptor::new(
        name,
        "test-api-key",
        "llama-3.3-70b-versatile",
        server.uri(),
        10_000,
        3,
    )
    .with_inter_chunk_delay(Duration::ZERO)
}

fn request() -> CompletionRequest {
    CompletionRequest::new("You summarize chapters.", "Summarize: the hero wakes up.", 800)
}

async fn mount_status(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({
            "error": {"message": "upstream says no", "type": "error"}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_request_wire_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-api-key"))
        .and(header("Content-Type", "application/json"))
        .and(header("User-Agent", "Novel-Summary-App/1.0"))
        .and(body_partial_json(json!({
            "model": "llama-3.3-70b-versatile",
            "messages": [
                {"role": "system", "content": "You summarize chapters."},
                {"role": "user", "content": "Summarize: the hero wakes up."}
            ],
            "max_tokens": 800,
            "top_p": 1.0
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_completion_response("  The hero wakes.  ")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpCompletionClient::new();
    let provider = provider(&server, "groq").with_header("User-Agent", "Novel-Summary-App/1.0");
    let completion = client.complete(&provider, &request()).await.unwrap();

    assert_eq!(completion.content, "The hero wakes.");
    assert_eq!(completion.model, "llama-3.3-70b-versatile");
    assert_eq!(completion.usage.prompt_tokens, 120);
    assert_eq!(completion.usage.completion_tokens, 40);
    assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn test_status_classification() {
    let cases: [(u16, fn(&SummaryError) -> bool); 6] = [
        (401, |e| matches!(e, SummaryError::AuthFailure { status: 401, .. })),
        (403, |e| matches!(e, SummaryError::AuthFailure { status: 403, .. })),
        (413, |e| matches!(e, SummaryError::PayloadTooLarge { .. })),
        (429, |e| matches!(e, SummaryError::RateLimited { .. })),
        (503, |e| matches!(e, SummaryError::ServerError { status: 503, .. })),
        (400, |e| {
            matches!(e, SummaryError::ApiError { status: 400, message, .. } if message == "upstream says no")
        }),
    ];

    for (status, check) in cases {
        let server = MockServer::start().await;
        mount_status(&server, status).await;

        let client = HttpCompletionClient::new();
        let error = client
            .complete(&provider(&server, "groq"), &request())
            .await
            .unwrap_err();
        assert!(check(&error), "status {} produced {:?}", status, error);
    }
}

#[tokio::test]
async fn test_updated_headers_reach_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("X-Tenant", "old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_response("Old.")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("X-Tenant", "new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_response("New.")))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpCompletionClient::new();
    let old = provider(&server, "groq").with_header("X-Tenant", "old");
    let new = provider(&server, "groq").with_header("X-Tenant", "new");

    let first = client.complete(&old, &request()).await.unwrap();
    assert_eq!(first.content, "Old.");

    let second = client.complete(&new, &request()).await.unwrap();
    assert_eq!(second.content, "New.");
}

#[tokio::test]
async fn test_updated_timeout_takes_effect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_completion_response("late"))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let client = HttpCompletionClient::new();
    let patient = provider(&server, "groq");
    assert!(client.complete(&patient, &request()).await.is_ok());

    let impatient = provider(&server, "groq").with_timeout(Duration::from_millis(50));
    assert!(matches!(
        client.complete(&impatient, &request()).await,
        Err(SummaryError::TransportError(_))
    ));
}

#[tokio::test]
async fn test_client_never_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpCompletionClient::new();
    let result = client.complete(&provider(&server, "groq"), &request()).await;
    assert!(matches!(result, Err(SummaryError::RateLimited { .. })));
}

#[tokio::test]
async fn test_empty_content_is_empty_response() {
    for body in [
        json!({"choices": []}),
        json!({"choices": [{"index": 0, "message": {"role": "assistant"}}]}),
        chat_completion_response("   \n "),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = HttpCompletionClient::new();
        let result = client.complete(&provider(&server, "groq"), &request()).await;
        assert!(
            matches!(result, Err(SummaryError::EmptyResponse { ref provider }) if provider == "groq"),
            "got {:?}",
            result
        );
    }
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_completion_response("late"))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = HttpCompletionClient::new();
    let provider = provider(&server, "slow").with_timeout(Duration::from_millis(50));
    let result = client.complete(&provider, &request()).await;

    match result {
        Err(error @ SummaryError::TransportError(_)) => {
            assert!(error.user_description().contains("timeout"));
        }
        other => panic!("Expected TransportError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_orchestrator_retries_rate_limit_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_response("Done.")))
        .with_priority(2)
        .mount(&server)
        .await;

    let orchestrator = SummaryOrchestrator::new(
        Arc::new(HttpCompletionClient::new()),
        ProviderCatalog::new(vec![provider(&server, "groq")]),
    )
    .with_retry_policy(RetryPolicy {
        max_attempts: 3,
        rate_limit_step: Duration::from_millis(10),
        server_error_step: Duration::from_millis(5),
    });

    let summary = orchestrator
        .generate("A short chapter about a hero.", SummaryType::Short)
        .await
        .unwrap();

    assert_eq!(summary.text, "Done.");
    assert_eq!(summary.calls, 2);
    assert_eq!(summary.usage.completion_tokens, 40);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_orchestrator_falls_back_across_servers() {
    let unauthorized = MockServer::start().await;
    mount_status(&unauthorized, 401).await;

    let healthy = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-api-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_completion_response("From Cerebras.")),
        )
        .expect(1)
        .mount(&healthy)
        .await;

    let orchestrator = SummaryOrchestrator::new(
        Arc::new(HttpCompletionClient::new()),
        ProviderCatalog::new(vec![
            provider(&unauthorized, "Groq Primary (70B)"),
            provider(&healthy, "Cerebras"),
        ]),
    );

    let summary = orchestrator
        .generate("Chapter text.", SummaryType::Detailed)
        .await
        .unwrap();
    assert_eq!(summary.provider, "Cerebras");
    assert_eq!(summary.text, "From Cerebras.");
    assert_eq!(unauthorized.received_requests().await.unwrap().len(), 1);
}
