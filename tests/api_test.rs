//! HTTP API tests
//!
//! Starts the real router on a local port and talks to it with reqwest.
//! The OpenAI API is replaced by a mockito server.

use article_pipeline::config::{Config, ExportConfig, OpenAiConfig, ServerConfig};
use article_pipeline::generation::OpenAiSettings;
use article_pipeline::pipeline::PipelineConfig;
use article_pipeline::state::AppState;
use mockito::{Matcher, Server};
use serde_json::{json, Value};
use serial_test::serial;
use std::time::Duration;

fn test_config(base_url: &str, api_key: Option<&str>, output_dir: &str) -> Config {
    Config {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
        },
        openai: OpenAiConfig {
            api_key: api_key.map(str::to_string),
            settings: OpenAiSettings {
                base_url: base_url.to_string(),
                text_timeout: Duration::from_secs(10),
                image_timeout: Duration::from_secs(10),
                ..Default::default()
            },
        },
        pipeline: PipelineConfig {
            retry_backoff_ms: 0,
            ..Default::default()
        },
        export: ExportConfig {
            output_dir: output_dir.to_string(),
            session_max_age: Duration::from_secs(3600),
            download_timeout: Duration::from_secs(10),
        },
    }
}

/// Serve the app on an ephemeral port and return its base URL
async fn spawn_app(config: Config) -> String {
    let state = AppState::new(&config, reqwest::Client::new()).into_shared();
    let app = article_pipeline::app(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });
    format!("http://{}", addr)
}

/// Parse an SSE body into its `data:` payloads
fn sse_payloads(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter_map(|event| event.strip_prefix("data: "))
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_health() {
    let base = spawn_app(test_config("http://127.0.0.1:9", None, "output")).await;
    let response = reqwest::get(format!("{}/api/health", base)).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_config_roundtrip_and_validation() {
    let base = spawn_app(test_config("http://127.0.0.1:9", None, "output")).await;
    let client = reqwest::Client::new();

    let current: Value = client
        .get(format!("{}/api/config", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["concurrency_limit"], 5);

    let updated = client
        .post(format!("{}/api/config", base))
        .json(&json!({"concurrency_limit": 2, "max_retries": 0}))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status(), 200);
    let updated: Value = updated.json().await.unwrap();
    assert_eq!(updated["concurrency_limit"], 2);
    assert_eq!(updated["max_retries"], 0);

    let rejected = client
        .post(format!("{}/api/config", base))
        .json(&json!({"concurrency_limit": 0}))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), 400);
    let body: Value = rejected.json().await.unwrap();
    assert_eq!(body["status"], 400);

    let current: Value = client
        .get(format!("{}/api/config", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["concurrency_limit"], 2);
}

#[tokio::test]
async fn test_generate_rejects_bad_input_before_streaming() {
    let base = spawn_app(test_config("http://127.0.0.1:9", None, "output")).await;
    let client = reqwest::Client::new();

    let missing_key = client
        .post(format!("{}/api/generate", base))
        .json(&json!({"topic": "Rust", "section_count": 3}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_key.status(), 400);
    let body: Value = missing_key.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("API key"));

    let bad_count = client
        .post(format!("{}/api/generate", base))
        .json(&json!({"topic": "Rust", "section_count": 0, "api_key": "sk-test"}))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_count.status(), 400);

    let empty_topic = client
        .post(format!("{}/api/generate", base))
        .json(&json!({"topic": "  ", "section_count": 2, "api_key": "sk-test"}))
        .send()
        .await
        .unwrap();
    assert_eq!(empty_topic.status(), 400);
}

#[tokio::test]
#[serial]
async fn test_generate_streams_progress_and_document() {
    let mut openai = Server::new_async().await;
    let outline = json!({
        "outline": [
            {"heading": "Ownership", "brief": "Moves and borrows"},
            {"heading": "Traits", "brief": "Shared behavior"}
        ]
    })
    .to_string();

    let outline_mock = openai
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(
            json!({"response_format": {"type": "json_object"}}),
        ))
        .with_status(200)
        .with_body(json!({"choices": [{"message": {"content": outline}}]}).to_string())
        .expect(1)
        .create_async()
        .await;
    let section_mock = openai
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("Section heading: ".to_string()))
        .with_status(200)
        .with_body(
            json!({"choices": [{"message": {"content": "Body text.\n<!--END_SECTION-->"}}]})
                .to_string(),
        )
        .expect(2)
        .create_async()
        .await;
    let image_mock = openai
        .mock("POST", "/images/generations")
        .with_status(200)
        .with_body(json!({"data": [{"url": "https://img.example/a.png"}]}).to_string())
        .expect(2)
        .create_async()
        .await;

    let base = spawn_app(test_config(&openai.url(), Some("sk-test"), "output")).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/generate", base))
        .json(&json!({"topic": "Rust", "section_count": 2}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
    let payloads = sse_payloads(&response.text().await.unwrap());

    outline_mock.assert_async().await;
    section_mock.assert_async().await;
    image_mock.assert_async().await;

    assert_eq!(payloads.last().map(String::as_str), Some("[DONE]"));
    let events: Vec<Value> = payloads[..payloads.len() - 1]
        .iter()
        .map(|p| serde_json::from_str(p).unwrap())
        .collect();

    assert_eq!(events[0], json!({"type": "outline_ready", "section_count": 2}));
    let document = events.last().unwrap();
    assert_eq!(document["type"], "document");
    assert_eq!(document["status"]["outcome"], "all_succeeded");
    assert_eq!(
        document["markdown"],
        "# Rust\n\n## 1. Ownership\n\n![Ownership](https://img.example/a.png)\n\nBody text.\n\n---\n\n\
## 2. Traits\n\n![Traits](https://img.example/a.png)\n\nBody text.\n\n---\n"
    );
    assert!(events
        .iter()
        .any(|e| e["type"] == "finished" && e["status"]["outcome"] == "all_succeeded"));
}

#[tokio::test]
#[serial]
async fn test_generate_reports_outline_failure_in_stream() {
    let mut openai = Server::new_async().await;
    let _auth = openai
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body(r#"{"error": {"message": "Incorrect API key provided"}}"#)
        .create_async()
        .await;

    let base = spawn_app(test_config(&openai.url(), None, "output")).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/generate", base))
        .json(&json!({"topic": "Rust", "section_count": 2, "api_key": "sk-wrong"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let payloads = sse_payloads(&response.text().await.unwrap());
    assert_eq!(payloads.len(), 2);
    let error: Value = serde_json::from_str(&payloads[0]).unwrap();
    assert_eq!(error["type"], "error");
    assert!(error["error"].as_str().unwrap().contains("Incorrect API key"));
    assert_eq!(payloads[1], "[DONE]");
}

#[tokio::test]
#[serial]
async fn test_generate_with_export_writes_session() {
    let mut openai = Server::new_async().await;
    let outline = json!({"outline": [{"heading": "Only", "brief": "One section"}]}).to_string();
    let _outline = openai
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(
            json!({"response_format": {"type": "json_object"}}),
        ))
        .with_status(200)
        .with_body(json!({"choices": [{"message": {"content": outline}}]}).to_string())
        .create_async()
        .await;
    let _section = openai
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("Section heading: ".to_string()))
        .with_status(200)
        .with_body(json!({"choices": [{"message": {"content": "Body."}}]}).to_string())
        .create_async()
        .await;
    let image_url = format!("{}/files/only.png", openai.url());
    let _image = openai
        .mock("POST", "/images/generations")
        .with_status(200)
        .with_body(json!({"data": [{"url": image_url}]}).to_string())
        .create_async()
        .await;
    let _download = openai
        .mock("GET", "/files/only.png")
        .with_status(200)
        .with_body("PNG")
        .create_async()
        .await;

    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let base = spawn_app(test_config(
        &openai.url(),
        Some("sk-test"),
        output.path().to_str().unwrap(),
    ))
    .await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/generate", base))
        .json(&json!({"topic": "Rust", "section_count": 1, "export": true}))
        .send()
        .await
        .unwrap();

    let payloads = sse_payloads(&response.text().await.unwrap());
    let document: Value = serde_json::from_str(&payloads[payloads.len() - 2]).unwrap();
    assert_eq!(document["type"], "document");
    let session_dir = document["export"]["session_dir"].as_str().unwrap();
    let session = std::path::Path::new(session_dir);

    assert!(session.join("outline.json").is_file());
    assert!(session.join("manifest.json").is_file());
    assert!(session.join("articles/section_01.md").is_file());
    assert_eq!(std::fs::read(session.join("images/section_01.png")).unwrap(), b"PNG");
    let combined = std::fs::read_to_string(session.join("article_combined.md")).unwrap();
    assert!(combined.contains("![Only](images/section_01.png)"));
}
