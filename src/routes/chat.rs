use axum::{
    extract::State,
    routing::post,
    Router,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use crate::{
    AppState,
    error::AppError,
    models::{AnalysisMode, Transcript},
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat", post(chat))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    prompt: String,
    #[serde(default)]
    transcript: Transcript,
    #[serde(default)]
    analysis_mode: AnalysisMode,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    reply: String,
    district: Option<String>,
    transcript: Transcript,
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::InvalidInput("Prompt must not be empty".to_string()));
    }

    tracing::info!(
        "Chat request: {} prior turns, mode: {}",
        request.transcript.len(),
        request.analysis_mode
    );

    let mut transcript = request.transcript;
    let outcome = state
        .agent
        .answer(&state.dataset, &mut transcript, prompt, request.analysis_mode)
        .await?;

    Ok(Json(ChatResponse {
        reply: outcome.reply,
        district: outcome.district,
        transcript,
    }))
}
