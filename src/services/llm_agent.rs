use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, Role, CreateChatCompletionRequest,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent,
    },
    Client,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

use crate::error::AppError;
use crate::models::{AnalysisMode, ChatRole, Dataset, Transcript};
use super::profile::{describe, filter_by_district, render_describe};
use super::summarizer::{district_names, find_mentioned_district, summarize, RoleColumns};
use super::utils::run_blocking;

/// Lead-in the model tends to prepend; removed verbatim from every reply.
pub const BOILERPLATE: &str = "Here's a more detailed analysis of the groundwater data:";

const DISTRICT_SAMPLE_ROWS: usize = 5;

/// Text in, text out. Replies are not deterministic.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, AppError>;
}

pub struct OpenAiModel {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiModel {
    pub fn new(api_key: &str, api_base: &str, model: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
        }
    }

    fn system_prompt(&self) -> String {
        let current_date = Utc::now().format("%Y-%m-%d").to_string();
        format!(
            "You are HydroAI, a water quality expert analyzing groundwater data. \
             Use ONLY the dataset text provided in the request. \
             If a metric is unavailable, say so briefly. The current date is {}.",
            current_date
        )
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn complete(&self, prompt: &str) -> Result<String, AppError> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: self.system_prompt(),
                    name: None,
                    role: Role::System,
                }
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
                    name: None,
                    role: Role::User,
                }
            ),
        ];

        let request = CreateChatCompletionRequest {
            model: self.model.clone(),
            messages,
            ..Default::default()
        };

        let response = self.client
            .chat()
            .create(request)
            .await
            .map_err(|e| AppError::LlmError(e.to_string()))?;

        response.choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| AppError::LlmError("Model returned no content".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatOutcome {
    pub reply: String,
    pub district: Option<String>,
}

pub struct LlmAgent {
    model: Arc<dyn LanguageModel>,
}

impl LlmAgent {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Answers one question and records both turns in `transcript`.
    ///
    /// When the model call fails the error is returned and `transcript` is left as it was.
    pub async fn answer(
        &self,
        dataset: &Arc<Dataset>,
        transcript: &mut Transcript,
        prompt: &str,
        mode: AnalysisMode,
    ) -> Result<ChatOutcome, AppError> {
        let roles = RoleColumns::detect(dataset.columns());
        let districts = district_names(dataset, &roles);
        let district = find_mentioned_district(prompt, districts.as_slice());

        // Summaries and per-column stats are CPU-bound; build the prompt off the request worker.
        let context = {
            let dataset = Arc::clone(dataset);
            let focus = district.clone().zip(roles.district);
            let prompt = prompt.to_string();
            run_blocking(move || match focus {
                Some((city, column)) => {
                    tracing::info!("Focusing prompt on district {}", city);
                    district_prompt(&dataset, &column, &city, &prompt, mode)
                }
                None => general_prompt(&dataset, &prompt, mode),
            })
            .await?
        };

        let start = std::time::Instant::now();
        let raw = self.model.complete(&context).await?;
        tracing::info!("LLM responded in {:?}", start.elapsed());

        let reply = strip_boilerplate(&raw);
        transcript.push(ChatRole::User, prompt);
        transcript.push(ChatRole::Assistant, reply.clone());

        Ok(ChatOutcome { reply, district })
    }
}

/// Removes every occurrence of [`BOILERPLATE`] and trims. Nothing else is touched.
pub fn strip_boilerplate(text: &str) -> String {
    text.replace(BOILERPLATE, "").trim().to_string()
}

pub fn general_prompt(dataset: &Dataset, prompt: &str, mode: AnalysisMode) -> String {
    let summary = summarize(dataset);
    format!(
        r#"
    You are HydroAI, an advanced groundwater intelligence system for Gujarat.
    Current Analysis Mode: {mode}

    GUJARAT GROUNDWATER DATASET:
    {summary}

    USER QUERY: {prompt}

    Provide insights based on the dataset with:
    1. Quantitative analysis with specific numbers
    2. Regional patterns and trends
    3. Water quality assessment
    4. Actionable recommendations

    Be concise but comprehensive.
    "#,
        mode = mode,
        summary = summary.render(),
        prompt = prompt
    )
}

pub fn district_prompt(
    dataset: &Dataset,
    column: &str,
    city: &str,
    prompt: &str,
    mode: AnalysisMode,
) -> String {
    let city_data = filter_by_district(dataset, column, city);
    let city_summary = render_describe(&describe(&city_data));

    format!(
        r#"
    You are HydroAI, an advanced groundwater intelligence system analyzing data for {city}
    Current Analysis Mode: {mode}

    CITY DATA ANALYSIS - {city_upper}:
    - Total samples: {count}
    - Data parameters: {params}

    SAMPLE DATA (Latest {limit} readings):
    {sample}

    STATISTICAL OVERVIEW:
    {city_summary}

    USER QUERY: {prompt}

    Provide a comprehensive analysis with:
    1. Key findings and insights
    2. Water quality assessment
    3. Potential concerns or recommendations
    4. Future predictions if applicable
    "#,
        city = city,
        city_upper = city.to_uppercase(),
        mode = mode,
        count = city_data.len(),
        params = city_data.columns().join(", "),
        limit = DISTRICT_SAMPLE_ROWS,
        sample = city_data.head_table(DISTRICT_SAMPLE_ROWS),
        city_summary = city_summary,
        prompt = prompt
    )
}
