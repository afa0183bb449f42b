use serde::Deserialize;
use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;

use crate::services::dataset_loader::DatasetSource;

pub const DEFAULT_DATASET_SOURCE: &str = "data/gujarat_groundwater_merged_final.csv";
pub const DEFAULT_LLM_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_LLM_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

// Checked in order; the first one set wins.
const API_KEY_VARS: [&str; 3] = ["LLM_API_KEY", "GOOGLE_API_KEY", "OPENAI_API_KEY"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub dataset_source: String,
    pub llm_api_key: String,
    pub llm_model: String,
    pub llm_api_base: String,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let llm_api_key = API_KEY_VARS
            .iter()
            .find_map(|key| non_empty(*key))
            .ok_or_else(|| anyhow::anyhow!("Failed to load an API key: set one of {}", API_KEY_VARS.join(", ")))?;

        let bind_addr = non_empty("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid BIND_ADDR '{}': {}", bind_addr, e))?;

        Ok(Config {
            dataset_source: non_empty("DATASET_SOURCE").unwrap_or_else(|| DEFAULT_DATASET_SOURCE.to_string()),
            llm_api_key,
            llm_model: non_empty("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_api_base: non_empty("LLM_API_BASE").unwrap_or_else(|| DEFAULT_LLM_API_BASE.to_string()),
            bind_addr,
        })
    }

    pub fn dataset_source(&self) -> DatasetSource {
        DatasetSource::parse(&self.dataset_source)
    }
}

pub fn load_config() -> Result<Config> {
    Config::new()
}
