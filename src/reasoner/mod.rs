//! Remote reasoning boundary.
//!
//! Everything that talks to the hosted reasoner lives here: input
//! sanitization, prompt and schema construction, retry with backoff,
//! response-to-structure extraction, the HTTP client, and the constant
//! fallback used when finalization is exhausted. The rest of the crate
//! only sees the [`Reasoner`] trait.

pub mod client;
pub mod extract;
pub mod fallback;
pub mod prompt;
pub mod retry;
pub mod sanitize;

pub use client::{GeminiReasoner, MockReasoner};
pub use extract::extract_json;
pub use fallback::{clarification_question, degraded_intake, fallback_outcome};
pub use retry::retry_with_backoff;
pub use sanitize::sanitize_for_reasoner;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Answer, PatientProfile, Question, TriageOutcome};

/// Verdict of the intake analysis call.
///
/// Exactly one of two shapes is valid: an emergency with a populated
/// initial outcome, or a non-emergency with at least one follow-up
/// question. [`client`] normalizes anything else before it reaches the
/// session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeAnalysis {
    pub is_emergency: bool,
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Populated when `is_emergency` is set; becomes the session outcome
    /// without asking any questions.
    #[serde(default, rename = "initialTriage", skip_serializing_if = "Option::is_none")]
    pub initial_outcome: Option<TriageOutcome>,
}

/// The remote reasoning capability the triage flow is built against.
///
/// `symptoms` is the already-flattened narrative blob; implementations
/// sanitize it before it leaves the process.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Decide whether the intake is an immediate emergency or which
    /// follow-up questions to ask.
    async fn analyze_intake(
        &self,
        profile: &PatientProfile,
        symptoms: &str,
    ) -> Result<IntakeAnalysis, ReasonerError>;

    /// Produce the final outcome from the full interview. Errors here
    /// mean the pipeline is exhausted; the driver substitutes the
    /// fallback outcome rather than surfacing them.
    async fn finalize(
        &self,
        profile: &PatientProfile,
        symptoms: &str,
        answers: &[Answer],
    ) -> Result<TriageOutcome, ReasonerError>;
}

/// Single-shot grounded lookup used by voice sessions to answer the
/// environmental-context tool. Not retried.
#[async_trait]
pub trait GroundedSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<String, ReasonerError>;
}

#[derive(Error, Debug)]
pub enum ReasonerError {
    #[error("Reasoner rate limited the request")]
    RateLimited,

    #[error("Reasoner service error (status {status})")]
    ServerError { status: u16 },

    #[error("Cannot reach the reasoner service: {0}")]
    Connectivity(String),

    #[error("Reasoner rejected the request (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Empty response from the reasoner")]
    EmptyResponse,

    #[error("Malformed reasoner response: {0}")]
    MalformedResponse(String),

    #[error("No structured result found in reasoner response")]
    NoStructuredResult,
}

impl ReasonerError {
    /// Transient failures worth retrying: rate limits, 5xx, transport.
    /// Everything else fails immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReasonerError::RateLimited
                | ReasonerError::ServerError { .. }
                | ReasonerError::Connectivity(_)
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification_matches_retry_policy() {
        assert!(ReasonerError::RateLimited.is_transient());
        assert!(ReasonerError::ServerError { status: 503 }.is_transient());
        assert!(ReasonerError::Connectivity("dns failure".to_string()).is_transient());

        assert!(!ReasonerError::Rejected {
            status: 400,
            body: "bad schema".to_string()
        }
        .is_transient());
        assert!(!ReasonerError::EmptyResponse.is_transient());
        assert!(!ReasonerError::MalformedResponse("trailing comma".to_string()).is_transient());
        assert!(!ReasonerError::NoStructuredResult.is_transient());
    }

    #[test]
    fn intake_analysis_reads_initial_triage_key() {
        let json = r#"{
            "isEmergency": true,
            "questions": [],
            "initialTriage": {
                "level": "RED",
                "explanationEn": "Go now.", "explanationHi": "अभी जाएं।",
                "doNowEn": [], "doNowHi": [],
                "dangerSignsEn": [], "dangerSignsHi": [],
                "summaryEn": "Emergency", "summaryHi": "आपातकाल"
            }
        }"#;
        let analysis: IntakeAnalysis = serde_json::from_str(json).unwrap();
        assert!(analysis.is_emergency);
        assert!(analysis.questions.is_empty());
        assert!(analysis.initial_outcome.is_some());
    }
}
