//! LLM Tutor Backend
//!
//! Every stage that needs language generation talks to a [`TutorBackend`].
//! The backend returns raw text; extracting scores from it is the caller's
//! job (see [`crate::markers`]), so a backend never has to guess at defaults.

use anyhow::{Context, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

use crate::state::MASTERY_THRESHOLD;

/// Prompt templates an [`OpenAICompatibleClient`] cannot work without.
pub const REQUIRED_PROMPTS: [&str; 5] = [
    "summarize_context",
    "judge_relevance",
    "generate_questions",
    "grade_answers",
    "feynman_explanation",
];

/// Everything the remediation backend sees about a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationRequest {
    pub topic: String,
    pub objectives: String,
    pub context: String,
    pub questions: String,
    pub answers: String,
    pub score: u8,
}

/// Defines the contract for the language backend used by the checkpoint stages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TutorBackend: Send + Sync {
    /// Turns raw retrieved snippets into a structured study guide.
    async fn summarize(&self, topic: &str, objectives: &str, raw_content: &str) -> Result<String>;

    /// Judges whether `context` covers the objectives. The reply should carry a
    /// `FINAL_SCORE: <1-5>` marker.
    async fn judge_relevance(&self, topic: &str, objectives: &str, context: &str)
    -> Result<String>;

    /// Produces exactly five numbered multiple-choice questions without an answer key.
    async fn generate_questions(
        &self,
        context: &str,
        topic: &str,
        objectives: &str,
    ) -> Result<String>;

    /// Grades the answers. The reply should carry a `FINAL_PERCENTAGE: <0-100>` marker.
    async fn grade(&self, context: &str, questions: &str, answers: &str) -> Result<String>;

    /// Writes a simplified Feynman-style explanation targeting the learner's gaps.
    async fn explain(&self, request: &RemediationRequest) -> Result<String>;
}

/// An implementation of `TutorBackend` for any OpenAI-compatible chat API.
///
/// Prompts are plain templates keyed by name; placeholders such as `{topic}`
/// are substituted before each call.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
    prompts: HashMap<String, String>,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The model identifier to use for chat completions (e.g., "gpt-4o").
    /// * `prompts` - Template strings; must contain every key in [`REQUIRED_PROMPTS`].
    pub fn new(config: OpenAIConfig, model: String, prompts: HashMap<String, String>) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            prompts,
        }
    }

    fn render(&self, key: &str, vars: &[(&str, &str)]) -> Result<String> {
        let template = self
            .prompts
            .get(key)
            .with_context(|| format!("Missing prompt template: '{}'", key))?;
        Ok(render_template(template, vars))
    }

    async fn complete(&self, key: &str, vars: &[(&str, &str)]) -> Result<String> {
        let prompt = self.render(key, vars)?;
        debug!(prompt = key, model = %self.model, "Requesting completion");

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(0.0)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content("You are a patient, precise tutor.")
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?
                    .into(),
            ])
            .build()?;

        let response = self.client.chat().create(request).await?;

        let answer = response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .clone()
            .context("No content in LLM response")?;

        Ok(answer)
    }
}

/// Substitutes every `{name}` placeholder with its value.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{}}}", name), value)
    })
}

#[async_trait]
impl TutorBackend for OpenAICompatibleClient {
    async fn summarize(&self, topic: &str, objectives: &str, raw_content: &str) -> Result<String> {
        self.complete(
            "summarize_context",
            &[
                ("topic", topic),
                ("objectives", objectives),
                ("raw_content", raw_content),
            ],
        )
        .await
    }

    async fn judge_relevance(
        &self,
        topic: &str,
        objectives: &str,
        context: &str,
    ) -> Result<String> {
        self.complete(
            "judge_relevance",
            &[
                ("topic", topic),
                ("objectives", objectives),
                ("context", context),
            ],
        )
        .await
    }

    async fn generate_questions(
        &self,
        context: &str,
        topic: &str,
        objectives: &str,
    ) -> Result<String> {
        self.complete(
            "generate_questions",
            &[
                ("context", context),
                ("topic", topic),
                ("objectives", objectives),
            ],
        )
        .await
    }

    async fn grade(&self, context: &str, questions: &str, answers: &str) -> Result<String> {
        self.complete(
            "grade_answers",
            &[
                ("context", context),
                ("questions", questions),
                ("answers", answers),
            ],
        )
        .await
    }

    async fn explain(&self, request: &RemediationRequest) -> Result<String> {
        let score = request.score.to_string();
        let threshold = MASTERY_THRESHOLD.to_string();
        self.complete(
            "feynman_explanation",
            &[
                ("topic", request.topic.as_str()),
                ("objectives", request.objectives.as_str()),
                ("context", request.context.as_str()),
                ("questions", request.questions.as_str()),
                ("answers", request.answers.as_str()),
                ("score", score.as_str()),
                ("threshold", threshold.as_str()),
            ],
        )
        .await
    }
}
