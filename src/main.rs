use anyhow::{Context, Result};
use std::sync::Arc;

use groundwater_chat::{
    config, logging, routes,
    services::{dataset_loader, llm_agent::OpenAiModel, summarizer},
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::load_config()?;

    let source = config.dataset_source();
    let dataset = dataset_loader::load_dataset(&source)
        .await
        .with_context(|| format!("failed to load dataset from {}", source))?;

    let summary = summarizer::summarize(&dataset);
    tracing::info!(
        "Dataset loaded: {} groundwater samples, {} states, {} districts, years {}",
        summary.row_count,
        summary.state_count,
        summary.district_count,
        summary.year_range
    );

    let model = OpenAiModel::new(&config.llm_api_key, &config.llm_api_base, &config.llm_model);
    tracing::info!("Using model {} at {}", config.llm_model, config.llm_api_base);

    // Build our application state
    let state = Arc::new(AppState::new(dataset, Arc::new(model)));
    let app = routes::app(state);

    // Run it
    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
