pub mod dataset_loader;
pub mod llm_agent;
pub mod profile;
pub mod summarizer;
pub mod utils;
