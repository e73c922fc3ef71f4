//! Question Generator
//!
//! Calls an external reasoning service (OpenAI-compatible chat
//! completions endpoint) once per (proposition, factor) pair to produce
//! a candidate clarifying question, its justification, and the cited
//! evidence identifiers.
//!
//! Single attempt per pair, no internal retry; every failure maps to a
//! `GenerationError` variant and the orchestrator handles isolation.

use crate::types::{GeneratedQuestion, ObservationRecord};
use async_trait::async_trait;
use clarify_common::config::ReasoningConfig;
use clarify_common::factors;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Method tag reported when the service response carries none
const DEFAULT_METHOD: &str = "llm_single_call";

/// Generation failure, fatal for the pair it belongs to
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Network-level failure (connect, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Service returned an error status
    #[error("Service error: {0}")]
    Api(String),

    /// Response could not be decomposed into the expected fields
    #[error("Parse error: {0}")]
    Parse(String),

    /// Service returned no usable content
    #[error("Empty response: {0}")]
    Empty(String),
}

/// Everything the generator needs for one pair
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub prop_id: i64,
    pub prop_text: &'a str,
    /// Resolved factor identifier (1-12)
    pub factor_id: u8,
    /// Bounded evidence list, at most 5, most recent first
    pub observations: &'a [ObservationRecord],
    pub prop_reasoning: Option<&'a str>,
}

/// Seam for the reasoning service; tests substitute a scripted fake
#[async_trait]
pub trait QuestionBackend: Send + Sync {
    /// Model identifier recorded with each stored question
    fn model(&self) -> &str;

    /// One generation attempt for one pair
    async fn generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<GeneratedQuestion, GenerationError>;
}

/// Reasoning service client (OpenAI-compatible chat completions)
pub struct ReasoningClient {
    http_client: Client,
    api_base: String,
    api_key: String,
    model: String,
    temperature: f64,
}

impl ReasoningClient {
    /// Create a new client from resolved configuration
    pub fn new(api_key: String, config: &ReasoningConfig) -> Result<Self, GenerationError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GenerationError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    /// Build the user prompt for one pair
    ///
    /// Carries the proposition context, the factor's definition, and
    /// the bounded evidence with visible observation ids so the model
    /// can cite them.
    fn build_prompt(&self, request: &GenerationRequest<'_>) -> String {
        let factor_name =
            factors::factor_name_from_id(request.factor_id).unwrap_or("unknown");
        let factor_definition =
            factors::factor_definition(request.factor_id).unwrap_or("");

        let mut evidence_block = String::new();
        for (i, obs) in request.observations.iter().enumerate() {
            evidence_block.push_str(&format!("[{}] (ID: {}) {}\n", i + 1, obs.id, obs.text));
        }
        if evidence_block.is_empty() {
            evidence_block.push_str("No observations available.\n");
        }

        format!(
            "A behavioral proposition about a user was flagged for clarification on the \
             risk factor \"{factor_name}\": {factor_definition}\n\
             \n\
             Proposition (id {prop_id}): {prop_text}\n\
             Reasoning behind the proposition: {reasoning}\n\
             \n\
             Observations backing the proposition:\n{evidence_block}\
             \n\
             Write ONE clarifying question to ask the user that addresses this risk factor. \
             Return a JSON object with exactly these fields:\n\
             - \"question\": the clarifying question text\n\
             - \"reasoning\": why this question addresses the factor\n\
             - \"evidence\": list of observation IDs (from the ID markers above) the question is grounded in\n\
             - \"method\": short tag describing how the question was derived",
            factor_name = factor_name,
            factor_definition = factor_definition,
            prop_id = request.prop_id,
            prop_text = request.prop_text,
            reasoning = request.prop_reasoning.unwrap_or("No reasoning provided"),
            evidence_block = evidence_block,
        )
    }
}

#[async_trait]
impl QuestionBackend for ReasoningClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<GeneratedQuestion, GenerationError> {
        debug!(
            prop_id = request.prop_id,
            factor_id = request.factor_id,
            "Requesting clarifying question from reasoning service"
        );

        let url = format!("{}/chat/completions", self.api_base);
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "response_format": { "type": "json_object" },
            "messages": [
                {
                    "role": "system",
                    "content": "You are an expert in cognitive psychology reviewing behavioral \
                                propositions about users. Always return valid JSON."
                },
                { "role": "user", "content": self.build_prompt(request) }
            ]
        });

        let response = self
            .http_client
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Network(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(GenerationError::Api(format!("rate limited: {}", body)));
            }
            return Err(GenerationError::Api(format!(
                "service returned {}: {}",
                status, body
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(format!("invalid completion envelope: {}", e)))?;

        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| GenerationError::Empty("no choices in response".to_string()))?;

        let generated = parse_payload(content)?;

        debug!(
            prop_id = request.prop_id,
            factor_id = request.factor_id,
            evidence_count = generated.evidence.len(),
            "Question generated"
        );

        Ok(generated)
    }
}

/// Decompose the model's JSON payload into the four result fields
///
/// Missing question or reasoning text decodes to an empty string;
/// structural completeness is the validator's call, so such results
/// flow through as annotated validation failures rather than
/// generation failures.
pub fn parse_payload(content: &str) -> Result<GeneratedQuestion, GenerationError> {
    let payload: QuestionPayload = serde_json::from_str(content)
        .map_err(|e| GenerationError::Parse(format!("invalid question payload: {}", e)))?;

    // Evidence ids may arrive as strings or numbers
    let evidence = payload
        .evidence
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect();

    Ok(GeneratedQuestion {
        question: payload.question.unwrap_or_default(),
        reasoning: payload.reasoning.unwrap_or_default(),
        evidence,
        method: payload
            .method
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_METHOD.to_string()),
    })
}

// ============================================================================
// Reasoning Service Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct QuestionPayload {
    question: Option<String>,
    reasoning: Option<String>,
    #[serde(default)]
    evidence: Vec<Value>,
    method: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================
