//! HTTP client for the hosted reasoner service.
//!
//! Three remote surfaces share one `generateContent` transport: intake
//! analysis (schema-constrained), the two-stage finalize pipeline
//! (grounded reasoning, then structuring), and single-shot grounded
//! search for voice sessions. Transport errors map onto the retry
//! taxonomy: 429 and 5xx are transient, other rejections are final.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::extract::{parse_intake_response, parse_outcome_response};
use super::fallback::degraded_intake;
use super::prompt::{
    build_grounded_prompt, build_intake_prompt, build_structuring_prompt, grounding_tools,
    intake_response_schema, outcome_response_schema, retrieval_tool_config, schema_system_instruction,
    search_tools, SYSTEM_INSTRUCTION,
};
use super::retry::{retry_with_backoff, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
use super::sanitize::sanitize_for_reasoner;
use super::{GroundedSearch, IntakeAnalysis, Reasoner, ReasonerError};
use crate::config;
use crate::geo::{self, GeoProvider};
use crate::models::{Answer, GroundingLink, PatientProfile, Question, TriageOutcome};

/// Per-request transport timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Reasoning used by stage 2 when the grounded stage yields nothing.
const NEUTRAL_REASONING: &str = "Location context unavailable. Standard clinical triage applied.";

/// Client for the hosted Gemini reasoner.
pub struct GeminiReasoner {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    geo: Arc<dyn GeoProvider>,
    max_attempts: u32,
    base_delay: Duration,
}

impl GeminiReasoner {
    pub fn new(api_key: impl Into<String>, geo: Arc<dyn GeoProvider>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: config::REASONER_BASE_URL.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            geo,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }

    /// Build from the environment; `None` when no API key is configured.
    pub fn from_env(geo: Arc<dyn GeoProvider>) -> Option<Self> {
        let key = std::env::var(config::API_KEY_ENV).ok()?;
        if key.trim().is_empty() {
            return None;
        }
        Some(Self::new(key, geo))
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Override the retry attempt count and backoff base delay.
    pub fn with_retry_policy(mut self, max_attempts: u32, base_delay: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.base_delay = base_delay;
        self
    }

    /// One transport round trip, mapped onto the retry taxonomy.
    async fn generate(&self, model: &str, body: &GenerateRequest) -> Result<GenerateReply, ReasonerError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReasonerError::Connectivity(format!(
                        "request timed out after {}s",
                        REQUEST_TIMEOUT.as_secs()
                    ))
                } else {
                    ReasonerError::Connectivity(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ReasonerError::RateLimited);
        }
        if status.is_server_error() {
            return Err(ReasonerError::ServerError {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReasonerError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ReasonerError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl Reasoner for GeminiReasoner {
    async fn analyze_intake(
        &self,
        profile: &PatientProfile,
        symptoms: &str,
    ) -> Result<IntakeAnalysis, ReasonerError> {
        let clean = sanitize_for_reasoner(symptoms);
        let body = GenerateRequest::text(build_intake_prompt(profile, &clean))
            .with_system(schema_system_instruction())
            .with_schema(intake_response_schema());

        let reply = retry_with_backoff(self.max_attempts, self.base_delay, || {
            self.generate(config::REASONER_MODEL, &body)
        })
        .await?;

        match reply.text() {
            Some(text) => Ok(parse_intake_response(&text)),
            None => {
                tracing::warn!("Empty intake reply, asking for clarification");
                Ok(degraded_intake())
            }
        }
    }

    async fn finalize(
        &self,
        profile: &PatientProfile,
        symptoms: &str,
        answers: &[Answer],
    ) -> Result<TriageOutcome, ReasonerError> {
        let clean = sanitize_for_reasoner(symptoms);
        let position = geo::resolve_position(self.geo.as_ref()).await;

        // Stage 1: grounded reasoning over local health context. Any
        // failure here degrades to neutral reasoning and the pipeline
        // continues.
        let mut reasoning = NEUTRAL_REASONING.to_string();
        let mut links = Vec::new();
        let grounded = GenerateRequest::text(build_grounded_prompt(
            position.lat,
            position.lng,
            profile,
            &clean,
            answers,
        ))
        .with_tools(grounding_tools())
        .with_tool_config(retrieval_tool_config(position.lat, position.lng));

        match retry_with_backoff(self.max_attempts, self.base_delay, || {
            self.generate(config::GROUNDED_MODEL, &grounded)
        })
        .await
        {
            Ok(reply) => {
                links = reply.grounding_links();
                if let Some(text) = reply.text() {
                    reasoning = text;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Grounded stage unavailable, continuing without local context");
            }
        }

        // Stage 2: structure the reasoning into the strict outcome
        // shape. Failures here propagate; the driver substitutes the
        // constant fallback.
        let structuring = GenerateRequest::text(build_structuring_prompt(&reasoning, profile, &clean))
            .with_system(SYSTEM_INSTRUCTION.to_string())
            .with_schema(outcome_response_schema());

        let reply = retry_with_backoff(self.max_attempts, self.base_delay, || {
            self.generate(config::REASONER_MODEL, &structuring)
        })
        .await?;

        let text = reply.text().ok_or(ReasonerError::EmptyResponse)?;
        let mut outcome = parse_outcome_response(&text)?;
        outcome.grounding_links = links;
        Ok(outcome)
    }
}

#[async_trait]
impl GroundedSearch for GeminiReasoner {
    async fn search(&self, query: &str) -> Result<String, ReasonerError> {
        // Single shot: voice tool responses cannot wait out a backoff.
        let body = GenerateRequest::text(query.to_string()).with_tools(search_tools());
        let reply = self.generate(config::REASONER_MODEL, &body).await?;
        reply.text().ok_or(ReasonerError::EmptyResponse)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Wire types for generateContent
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Value>,
    #[serde(rename = "toolConfig", skip_serializing_if = "Option::is_none")]
    tool_config: Option<Value>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
    #[serde(rename = "responseSchema")]
    response_schema: Value,
}

impl GenerateRequest {
    fn text(prompt: String) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: None,
            generation_config: None,
            tools: None,
            tool_config: None,
        }
    }

    fn with_system(mut self, instruction: String) -> Self {
        self.system_instruction = Some(Content {
            parts: vec![Part { text: instruction }],
        });
        self
    }

    fn with_schema(mut self, schema: Value) -> Self {
        self.generation_config = Some(GenerationConfig {
            response_mime_type: "application/json",
            response_schema: schema,
        });
        self
    }

    fn with_tools(mut self, tools: Value) -> Self {
        self.tools = Some(tools);
        self
    }

    fn with_tool_config(mut self, tool_config: Value) -> Self {
        self.tool_config = Some(tool_config);
        self
    }
}

#[derive(Deserialize)]
struct GenerateReply {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ReplyContent>,
    #[serde(rename = "groundingMetadata")]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct ReplyContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GroundingMetadata {
    #[serde(rename = "groundingChunks", default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    web: Option<GroundingLink>,
    maps: Option<GroundingLink>,
}

impl GenerateReply {
    /// Concatenated text of the first candidate; `None` when blank.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Cited web and maps sources, flattened in arrival order.
    fn grounding_links(&self) -> Vec<GroundingLink> {
        let Some(metadata) = self
            .candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
        else {
            return Vec::new();
        };
        metadata
            .grounding_chunks
            .iter()
            .flat_map(|chunk| chunk.web.iter().chain(chunk.maps.iter()).cloned())
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Mock reasoner
// ═══════════════════════════════════════════════════════════════════════════

/// Scripted reasoner for tests and offline demos.
pub struct MockReasoner {
    analysis: IntakeAnalysis,
    outcome: TriageOutcome,
}

impl MockReasoner {
    pub fn new(analysis: IntakeAnalysis, outcome: TriageOutcome) -> Self {
        Self { analysis, outcome }
    }

    /// Non-emergency intake with the given follow-up questions.
    pub fn with_questions(questions: Vec<Question>, outcome: TriageOutcome) -> Self {
        Self::new(
            IntakeAnalysis {
                is_emergency: false,
                questions,
                initial_outcome: None,
            },
            outcome,
        )
    }

    /// Immediate emergency; the outcome doubles as the initial verdict.
    pub fn emergency(outcome: TriageOutcome) -> Self {
        Self::new(
            IntakeAnalysis {
                is_emergency: true,
                questions: Vec::new(),
                initial_outcome: Some(outcome.clone()),
            },
            outcome,
        )
    }
}

#[async_trait]
impl Reasoner for MockReasoner {
    async fn analyze_intake(
        &self,
        _profile: &PatientProfile,
        _symptoms: &str,
    ) -> Result<IntakeAnalysis, ReasonerError> {
        Ok(self.analysis.clone())
    }

    async fn finalize(
        &self,
        _profile: &PatientProfile,
        _symptoms: &str,
        _answers: &[Answer],
    ) -> Result<TriageOutcome, ReasonerError> {
        Ok(self.outcome.clone())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
