use axum::{
    extract::{Query, State},
    routing::get,
    Router,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use crate::{
    AppState,
    error::AppError,
    services::{
        profile::{self, ColumnProfile, Overview},
        summarizer::{self, Summary},
        utils::run_blocking,
    },
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dataset/summary", get(get_summary))
        .route("/dataset/overview", get(get_overview))
        .route("/dataset/profile", get(get_profile))
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    #[serde(flatten)]
    summary: Summary,
    text: String,
}

#[derive(Debug, Deserialize)]
pub struct OverviewParams {
    district: Option<String>,
}

async fn get_summary(State(state): State<Arc<AppState>>) -> Json<SummaryResponse> {
    let summary = summarizer::summarize(&state.dataset);
    tracing::debug!(
        "Summary: {} rows, {} states, {} districts, years {}",
        summary.row_count,
        summary.state_count,
        summary.district_count,
        summary.year_range
    );
    let text = summary.render();
    Json(SummaryResponse { summary, text })
}

async fn get_overview(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OverviewParams>,
) -> Result<Json<Overview>, AppError> {
    let dataset = Arc::clone(&state.dataset);
    let overview = run_blocking(move || profile::overview(&dataset, params.district.as_deref())).await?;
    Ok(Json(overview))
}

async fn get_profile(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ColumnProfile>>, AppError> {
    let profiles = profile::describe_shared(Arc::clone(&state.dataset)).await?;
    Ok(Json(profiles))
}
