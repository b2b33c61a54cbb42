//! Gemini `generateContent` client.
//!
//! Structured operations (plan, queries, decision, outline, fill-in) request
//! JSON output against a hand-declared response schema; summarization returns
//! plain text. Safety and recitation blocks surface as
//! [`GenerationError::ContentBlocked`], empty candidates as
//! [`GenerationError::NoResponse`], so the retry policy can classify them.

use crate::llm::client::{
    Generated, GenerationClient, GenerationError, GenerationResult, ReportOutline,
};
use crate::llm::prompts;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// Public Gemini API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Finish reasons that indicate filtered output.
const BLOCKED_REASONS: &[&str] = &["SAFETY", "RECITATION", "PROHIBITED_CONTENT", "BLOCKLIST"];

/// Gemini client for API-based generation.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a client against the public endpoint.
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL.to_string())
    }

    /// Create a client against a custom endpoint (used by tests).
    pub fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            base_url,
        }
    }

    /// Issue one `generateContent` call and extract (text, tokens).
    async fn call(&self, prompt: &str, config: Value) -> Result<(String, u64), GenerationError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": config,
        });

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Service(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GenerationError::Service(format!(
                "Gemini API error {}: {}",
                status, detail
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Service(format!("malformed response body: {}", e)))?;

        let tokens = parsed
            .usage_metadata
            .as_ref()
            .and_then(|u| u.total_token_count)
            .unwrap_or(0);

        if let Some(reason) = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(GenerationError::ContentBlocked(reason.to_string()));
        }

        let candidate = parsed
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or(GenerationError::NoResponse)?;

        if let Some(reason) = candidate.finish_reason.as_deref() {
            if BLOCKED_REASONS.contains(&reason) {
                return Err(GenerationError::ContentBlocked(reason.to_string()));
            }
        }

        let text: String = candidate
            .content
            .and_then(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        if text.trim().is_empty() {
            return Err(GenerationError::NoResponse);
        }

        Ok((text, tokens))
    }

    /// Plain-text generation.
    async fn generate_text(&self, prompt: &str, temperature: f32) -> GenerationResult<String> {
        let (text, tokens) = self
            .call(prompt, json!({"temperature": temperature}))
            .await?;
        Ok(Generated::new(text, tokens))
    }

    /// JSON generation against `schema`, parsed into `T`.
    ///
    /// Output that fails to parse against the declared schema is treated as
    /// an empty response, which makes it retryable.
    async fn generate_structured<T: serde::de::DeserializeOwned>(
        &self,
        prompt: &str,
        schema: Value,
        temperature: f32,
    ) -> GenerationResult<T> {
        let config = json!({
            "temperature": temperature,
            "responseMimeType": "application/json",
            "responseSchema": schema,
        });
        let (text, tokens) = self.call(prompt, config).await?;
        let value: T = serde_json::from_str(&text).map_err(|e| {
            tracing::debug!(error = %e, "structured output did not match schema");
            GenerationError::NoResponse
        })?;
        Ok(Generated::new(value, tokens))
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn plan_steps(&self, topic: &str) -> GenerationResult<Vec<String>> {
        let schema = json!({
            "type": "OBJECT",
            "required": ["steps"],
            "properties": {
                "steps": {"type": "ARRAY", "items": {"type": "STRING"}}
            }
        });
        let plan: Generated<PlanPayload> = self
            .generate_structured(&prompts::research_plan(topic), schema, 1.0)
            .await?;
        if plan.value.steps.is_empty() {
            return Err(GenerationError::NoResponse);
        }
        Ok(Generated::new(plan.value.steps, plan.tokens))
    }

    async fn synthesize_queries(
        &self,
        vertical: &str,
        topic: &str,
        plan_done: &[String],
        past_queries: &[String],
        context: &str,
        n: usize,
    ) -> GenerationResult<Vec<String>> {
        let schema = json!({
            "type": "OBJECT",
            "required": ["branches"],
            "properties": {
                "branches": {"type": "ARRAY", "items": {"type": "STRING"}}
            }
        });
        let prompt = prompts::search_queries(
            vertical,
            topic,
            &prompts::done_list(plan_done),
            &prompts::done_list(past_queries),
            context,
            n,
        );
        let queries: Generated<QueriesPayload> =
            self.generate_structured(&prompt, schema, 1.0).await?;
        if queries.value.branches.is_empty() {
            return Err(GenerationError::NoResponse);
        }
        let mut branches = queries.value.branches;
        branches.truncate(n);
        Ok(Generated::new(branches, queries.tokens))
    }

    async fn continue_branch(
        &self,
        plan_done: &[String],
        query: &str,
        past_queries: &[String],
        context: &str,
    ) -> GenerationResult<bool> {
        let schema = json!({
            "type": "OBJECT",
            "required": ["decision"],
            "properties": {
                "decision": {"type": "BOOLEAN"}
            }
        });
        let prompt = prompts::continue_branch(
            &prompts::done_list(plan_done),
            query,
            &prompts::done_list(past_queries),
            context,
        );
        let decision: Generated<DecisionPayload> =
            self.generate_structured(&prompt, schema, 0.3).await?;
        Ok(Generated::new(decision.value.decision, decision.tokens))
    }

    async fn summarize(&self, query: &str, findings: &str) -> GenerationResult<String> {
        self.generate_text(&prompts::site_summary(query, findings), 0.2)
            .await
    }

    async fn outline(&self, topic: &str, context: &str) -> GenerationResult<ReportOutline> {
        let schema = json!({
            "type": "OBJECT",
            "required": ["title", "headings"],
            "properties": {
                "title": {"type": "STRING"},
                "headings": {"type": "ARRAY", "items": {"type": "STRING"}}
            }
        });
        let outline: Generated<ReportOutline> = self
            .generate_structured(&prompts::report_outline(topic, context), schema, 0.3)
            .await?;
        if outline.value.headings.is_empty() {
            return Err(GenerationError::NoResponse);
        }
        Ok(outline)
    }

    async fn fill_heading(
        &self,
        topic: &str,
        context: &str,
        outline_done: &[String],
        heading: &str,
    ) -> GenerationResult<String> {
        let schema = json!({
            "type": "OBJECT",
            "required": ["content"],
            "properties": {
                "content": {"type": "STRING"}
            }
        });
        let prompt = prompts::report_fillin(
            topic,
            context,
            &prompts::done_list(outline_done),
            heading,
        );
        let fillin: Generated<FillinPayload> =
            self.generate_structured(&prompt, schema, 0.3).await?;
        Ok(Generated::new(fillin.value.content, fillin.tokens))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============= Wire Types =============

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PlanPayload {
    steps: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct QueriesPayload {
    branches: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DecisionPayload {
    decision: bool,
}

#[derive(Debug, Deserialize)]
struct FillinPayload {
    content: String,
}
