//! Prompt and response-schema construction for reasoner calls.
//!
//! The persona is fixed: a safety-first triage assistant for India that
//! always answers bilingually. Structured calls additionally pin the
//! response shape with a JSON schema so stage outputs stay parseable.

use serde_json::{json, Value};

use crate::models::{Answer, PatientProfile};

pub const SYSTEM_INSTRUCTION: &str = r#"You are Aayu, an AI assistant designed for medical triage in India.
Your goal is to help users decide the right next step: GREEN (Home care), YELLOW (Clinic visit), or RED (Urgent/Emergency).
You are NOT a diagnostic tool. You must emphasize safety and clear escalation.
Always communicate in both simple English and simple Hindi.

Context Awareness:
- Use grounding to check for local outbreaks, extreme weather, or public health advisories.
- If symptoms align with current local risks, prioritize safety.
- For final triage, assign a level: GREEN, YELLOW, or RED."#;

/// Outcome fields the reasoner must populate. The same set gates the
/// voice tool that records a result.
pub const OUTCOME_REQUIRED_FIELDS: [&str; 9] = [
    "level",
    "explanationEn",
    "explanationHi",
    "doNowEn",
    "doNowHi",
    "dangerSignsEn",
    "dangerSignsHi",
    "summaryEn",
    "summaryHi",
];

/// System instruction for schema-constrained calls.
pub fn schema_system_instruction() -> String {
    format!("{SYSTEM_INSTRUCTION}\nStrictly adhere to the JSON schema for this specific response.")
}

/// Build the intake-analysis prompt.
pub fn build_intake_prompt(profile: &PatientProfile, symptoms: &str) -> String {
    let profile_json = serde_json::to_string(profile).unwrap_or_default();
    format!(
        r#"Analyze this patient intake.
Profile: {profile_json}
Symptoms: {symptoms}
Decide: Is this an immediate RED emergency based on clinical red flags, or do you need 3-5 follow-up questions?"#
    )
}

/// Build the grounded stage-1 prompt. Free-form text output; the model
/// reasons over local health context near the given position.
pub fn build_grounded_prompt(
    lat: f64,
    lng: f64,
    profile: &PatientProfile,
    symptoms: &str,
    answers: &[Answer],
) -> String {
    let profile_json = serde_json::to_string(profile).unwrap_or_default();
    let answers_json = serde_json::to_string(answers).unwrap_or_default();
    format!(
        r#"Finalize medical triage.
Location: {lat}, {lng}.
User Profile: {profile_json}.
Symptoms: {symptoms}.
Follow-up Answers: {answers_json}.
Provide a triage decision (GREEN/YELLOW/RED) and explain why based on local health context."#
    )
}

/// Build the stage-2 prompt that turns free-form reasoning into the
/// strict outcome shape.
pub fn build_structuring_prompt(reasoning: &str, profile: &PatientProfile, symptoms: &str) -> String {
    let profile_json = serde_json::to_string(profile).unwrap_or_default();
    format!(
        r#"Structure the following medical triage reasoning into the requested JSON schema.
Reasoning: {reasoning}
Original Profile: {profile_json}
Original Symptoms: {symptoms}"#
    )
}

// ═══════════════════════════════════════════════════════════════════════════
// Response schemas (reasoner REST format, uppercase type names)
// ═══════════════════════════════════════════════════════════════════════════

/// Property schemas shared by the outcome reply and the voice
/// result-recording tool.
pub(crate) fn outcome_properties() -> Value {
    json!({
        "level": { "type": "STRING", "enum": ["GREEN", "YELLOW", "RED"] },
        "explanationEn": { "type": "STRING" },
        "explanationHi": { "type": "STRING" },
        "doNowEn": { "type": "ARRAY", "items": { "type": "STRING" } },
        "doNowHi": { "type": "ARRAY", "items": { "type": "STRING" } },
        "dangerSignsEn": { "type": "ARRAY", "items": { "type": "STRING" } },
        "dangerSignsHi": { "type": "ARRAY", "items": { "type": "STRING" } },
        "summaryEn": { "type": "STRING" },
        "summaryHi": { "type": "STRING" }
    })
}

/// Schema for the intake analysis reply: emergency flag, follow-up
/// questions, and an optional immediate outcome.
pub fn intake_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "isEmergency": { "type": "BOOLEAN" },
            "questions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "textEn": { "type": "STRING" },
                        "textHi": { "type": "STRING" },
                        "type": { "type": "STRING", "enum": ["boolean", "choice", "number"] },
                        "optionsEn": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "optionsHi": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "whyEn": { "type": "STRING" },
                        "whyHi": { "type": "STRING" }
                    },
                    "required": ["id", "textEn", "textHi", "type"]
                }
            },
            "initialTriage": {
                "type": "OBJECT",
                "properties": outcome_properties(),
                "required": OUTCOME_REQUIRED_FIELDS
            }
        },
        "required": ["isEmergency"]
    })
}

/// Schema for the final outcome reply.
pub fn outcome_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": outcome_properties(),
        "required": OUTCOME_REQUIRED_FIELDS
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Grounding tool configuration
// ═══════════════════════════════════════════════════════════════════════════

/// Tools enabled for the grounded reasoning stage.
pub fn grounding_tools() -> Value {
    json!([{ "googleMaps": {} }, { "googleSearch": {} }])
}

/// Tools for single-shot environmental lookups (voice sessions).
pub fn search_tools() -> Value {
    json!([{ "googleSearch": {} }])
}

/// Pin retrieval to the patient's position.
pub fn retrieval_tool_config(lat: f64, lng: f64) -> Value {
    json!({ "retrievalConfig": { "latLng": { "latitude": lat, "longitude": lng } } })
}
