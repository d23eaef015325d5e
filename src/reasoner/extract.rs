//! Structured-output extraction.
//!
//! The reasoner is asked for strict JSON, but replies sometimes arrive
//! wrapped in prose or markdown fences. Extraction is two-stage: parse
//! the raw text directly, and if that fails parse the first balanced
//! `{...}` span found in it. Only when neither yields JSON does the
//! caller see an error.

use serde::de::DeserializeOwned;

use super::fallback::{clarification_question, degraded_intake};
use super::{IntakeAnalysis, ReasonerError};
use crate::models::TriageOutcome;

/// Parse a structured payload out of reasoner response text.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, ReasonerError> {
    if let Ok(value) = serde_json::from_str::<T>(text) {
        return Ok(value);
    }
    let span = first_object_span(text).ok_or(ReasonerError::NoStructuredResult)?;
    serde_json::from_str(span).map_err(|e| ReasonerError::MalformedResponse(e.to_string()))
}

/// Find the first balanced top-level `{...}` span in `text`.
///
/// Tracks string literals and escapes so braces inside JSON strings do
/// not unbalance the scan.
fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
// Response interpretation
// ═══════════════════════════════════════════════════════════════════════════

/// Interpret an intake-analysis reply. Total: anything unusable degrades
/// to a single clarification question rather than failing, so intake
/// always yields either an emergency verdict or questions to ask.
pub fn parse_intake_response(text: &str) -> IntakeAnalysis {
    let mut analysis: IntakeAnalysis = match extract_json(text) {
        Ok(analysis) => analysis,
        Err(e) => {
            tracing::warn!(error = %e, "Intake reply unusable, asking for clarification");
            return degraded_intake();
        }
    };

    if analysis.is_emergency && analysis.initial_outcome.is_none() {
        // An emergency verdict is unusable without its outcome.
        tracing::warn!("Emergency verdict arrived without an outcome, asking for clarification");
        return degraded_intake();
    }
    if !analysis.is_emergency && analysis.questions.is_empty() {
        tracing::warn!("Intake reply carried no questions, substituting clarification");
        analysis.questions = vec![clarification_question()];
    }
    analysis
}

/// Interpret a finalize (structuring) reply. Failures propagate; the
/// driver substitutes the constant fallback outcome.
pub fn parse_outcome_response(text: &str) -> Result<TriageOutcome, ReasonerError> {
    extract_json(text)
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
