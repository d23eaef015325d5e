//! Patient profile and symptom narrative.
//!
//! These are the inputs collected at intake. Wire shapes use camelCase
//! field names so that serialized profiles match the JSON embedded in
//! reasoner prompts and stored in history records.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════
// Patient profile
// ═══════════════════════════════════════════════════════════════════════════

/// Broad patient category. Drives which intake fields are mandatory
/// (pregnant patients must report gestation weeks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatientType {
    Adult,
    Child,
    Pregnant,
    Elderly,
}

impl PatientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientType::Adult => "Adult",
            PatientType::Child => "Child",
            PatientType::Pregnant => "Pregnant",
            PatientType::Elderly => "Elderly",
        }
    }
}

/// Demographic context sent alongside every reasoner call.
///
/// `age` stays free-text: callers report "34", "6 months", or
/// "N/A (Voice)" for voice-only sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    #[serde(rename = "type")]
    pub patient_type: PatientType,
    pub age: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weeks_pregnant: Option<String>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
}

impl PatientProfile {
    pub fn new(patient_type: PatientType, age: impl Into<String>) -> Self {
        Self {
            patient_type,
            age: age.into(),
            sex: None,
            weeks_pregnant: None,
            risk_factors: Vec::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Symptom narrative
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Hours,
    Days,
    Weeks,
}

impl DurationUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationUnit::Hours => "hours",
            DurationUnit::Days => "days",
            DurationUnit::Weeks => "weeks",
        }
    }
}

/// Free-text symptom description plus a structured duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomNarrative {
    pub text: String,
    pub duration_value: u32,
    pub duration_unit: DurationUnit,
}

impl SymptomNarrative {
    pub fn new(text: impl Into<String>, duration_value: u32, duration_unit: DurationUnit) -> Self {
        Self {
            text: text.into(),
            duration_value,
            duration_unit,
        }
    }

    /// Single text blob sent to the reasoner and stored in history.
    pub fn flattened(&self) -> String {
        format!(
            "{} (duration: {} {})",
            self.text, self.duration_value, self.duration_unit.as_str()
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    // ─── Wire shape ──────────────────────────────────────────────────────────

    #[test]
    fn profile_serializes_with_camel_case_keys() {
        let mut profile = PatientProfile::new(PatientType::Pregnant, "29");
        profile.weeks_pregnant = Some("22".to_string());
        profile.risk_factors = vec!["Diabetes".to_string()];

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["type"], "Pregnant");
        assert_eq!(json["age"], "29");
        assert_eq!(json["weeksPregnant"], "22");
        assert_eq!(json["riskFactors"][0], "Diabetes");
        // Unset optionals stay off the wire.
        assert!(json.get("sex").is_none());
    }

    #[test]
    fn profile_deserializes_without_optionals() {
        let profile: PatientProfile =
            serde_json::from_str(r#"{"type":"Child","age":"6"}"#).unwrap();
        assert_eq!(profile.patient_type, PatientType::Child);
        assert!(profile.risk_factors.is_empty());
        assert!(profile.weeks_pregnant.is_none());
    }

    // ─── Narrative flattening ────────────────────────────────────────────────

    #[test]
    fn narrative_flattens_to_single_blob() {
        let narrative = SymptomNarrative::new("fever and chills", 3, DurationUnit::Days);
        assert_eq!(narrative.flattened(), "fever and chills (duration: 3 days)");
    }

    #[test]
    fn duration_unit_uses_lowercase_wire_names() {
        assert_eq!(serde_json::to_value(DurationUnit::Hours).unwrap(), "hours");
        let unit: DurationUnit = serde_json::from_str("\"weeks\"").unwrap();
        assert_eq!(unit, DurationUnit::Weeks);
    }
}
