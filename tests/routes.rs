use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

use groundwater_chat::{
    error::AppError,
    models::Dataset,
    routes,
    services::llm_agent::LanguageModel,
    AppState,
};

struct EchoModel;

#[async_trait]
impl LanguageModel for EchoModel {
    async fn complete(&self, prompt: &str) -> Result<String, AppError> {
        let focus = if prompt.contains("CITY DATA ANALYSIS") { "district" } else { "dataset" };
        Ok(format!(
            "Here's a more detailed analysis of the groundwater data: answered from {}",
            focus
        ))
    }
}

struct DownModel;

#[async_trait]
impl LanguageModel for DownModel {
    async fn complete(&self, _prompt: &str) -> Result<String, AppError> {
        Err(AppError::LlmError("upstream unavailable".to_string()))
    }
}

fn dataset() -> Dataset {
    Dataset::from_cells(
        &["STATE", "DISTRICT", "Year", "pH", "TDS"],
        &[
            vec!["Gujarat", "Surat", "2019", "7.4", "520"],
            vec!["Gujarat", "Rajkot", "2020", "8.0", "890"],
            vec!["Gujarat", "Surat", "2021", "7.6", "610"],
        ],
    )
    .unwrap()
}

fn app(model: Arc<dyn LanguageModel>) -> Router {
    routes::app(Arc::new(AppState::new(dataset(), model)))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, JsonValue) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, body)
}

fn post_chat(body: JsonValue) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_check_responds() {
    let response = app(Arc::new(EchoModel)).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn summary_exposes_aggregates_and_text() {
    let (status, body) = send(app(Arc::new(EchoModel)), get("/dataset/summary")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["row_count"], 3);
    assert_eq!(body["state_count"], 1);
    assert_eq!(body["district_count"], 2);
    assert_eq!(body["year_range"], json!([2019, 2021]));
    assert_eq!(body["roles"]["district"], "DISTRICT");
    assert!(body["text"].as_str().unwrap().contains("- Years: 2019-2021"));
}

#[tokio::test]
async fn overview_filters_by_district() {
    let (status, body) = send(app(Arc::new(EchoModel)), get("/dataset/overview?district=surat")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data_points"], 2);
    assert_eq!(body["districts"], 1);
    assert_eq!(body["coverage_pct"], 66);
    assert_eq!(body["scatter"]["x_column"], "Year");
    assert_eq!(body["scatter"]["y_column"], "pH");
}

#[tokio::test]
async fn profile_lists_every_column() {
    let (status, body) = send(app(Arc::new(EchoModel)), get("/dataset/profile")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body.as_array().unwrap().iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["STATE", "DISTRICT", "Year", "pH", "TDS"]);
    assert_eq!(body[0]["role"], "State");
}

#[tokio::test]
async fn chat_appends_turns_to_the_callers_transcript() {
    let request = post_chat(json!({
        "prompt": "What about Rajkot hardness?",
        "transcript": [
            {"role": "user", "content": "hello"},
            {"role": "assistant", "content": "hi"}
        ],
        "analysis_mode": "predictive"
    }));

    let (status, body) = send(app(Arc::new(EchoModel)), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["district"], "Rajkot");
    assert_eq!(body["reply"], "answered from district");

    let transcript = body["transcript"].as_array().unwrap();
    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript[2], json!({"role": "user", "content": "What about Rajkot hardness?"}));
    assert_eq!(transcript[3], json!({"role": "assistant", "content": "answered from district"}));
}

#[tokio::test]
async fn chat_without_district_uses_dataset_summary() {
    let (status, body) = send(app(Arc::new(EchoModel)), post_chat(json!({"prompt": "Which years are covered?"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["district"], JsonValue::Null);
    assert_eq!(body["reply"], "answered from dataset");
}

#[tokio::test]
async fn blank_prompt_is_rejected() {
    let (status, body) = send(app(Arc::new(EchoModel)), post_chat(json!({"prompt": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Prompt must not be empty"));
}

#[tokio::test]
async fn model_failure_surfaces_as_service_unavailable() {
    let (status, body) = send(app(Arc::new(DownModel)), post_chat(json!({"prompt": "Surat?"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "LLM error: upstream unavailable");
}
