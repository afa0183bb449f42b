use std::sync::Arc;

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

use models::Dataset;
use services::llm_agent::{LanguageModel, LlmAgent};

/// Shared, read-only state: the dataset loaded at startup and the model client.
#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub agent: Arc<LlmAgent>,
}

impl AppState {
    pub fn new(dataset: Dataset, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            dataset: Arc::new(dataset),
            agent: Arc::new(LlmAgent::new(model)),
        }
    }
}
