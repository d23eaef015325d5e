//! Triage outcomes and persisted history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::profile::PatientProfile;

/// Urgency verdict. Wire names are the uppercase level strings the
/// reasoner is instructed to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriageLevel {
    #[serde(rename = "GREEN")]
    Green,
    #[serde(rename = "YELLOW")]
    Yellow,
    #[serde(rename = "RED")]
    Red,
}

impl TriageLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriageLevel::Green => "GREEN",
            TriageLevel::Yellow => "YELLOW",
            TriageLevel::Red => "RED",
        }
    }

    /// Red outcomes raise the emergency alert wherever they surface.
    pub fn is_emergency(&self) -> bool {
        matches!(self, TriageLevel::Red)
    }
}

/// A web or maps source the grounded reasoning stage cited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingLink {
    pub uri: String,
    pub title: String,
}

/// The complete bilingual triage verdict.
///
/// Every field except `grounding_links` is mandatory in the reasoner's
/// structured output; the same field set is enforced when a voice
/// session records a result through its tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageOutcome {
    pub level: TriageLevel,
    pub explanation_en: String,
    pub explanation_hi: String,
    pub do_now_en: Vec<String>,
    pub do_now_hi: Vec<String>,
    pub danger_signs_en: Vec<String>,
    pub danger_signs_hi: Vec<String>,
    pub summary_en: String,
    pub summary_hi: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grounding_links: Vec<GroundingLink>,
}

/// A completed session as stored in the bounded history log.
/// `id` and `timestamp` are stamped at persist time, never earlier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub profile: PatientProfile,
    /// Flattened symptom blob as it was sent to the reasoner.
    pub symptoms: String,
    #[serde(rename = "result")]
    pub outcome: TriageOutcome,
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatientType;

    fn sample_outcome(level: TriageLevel) -> TriageOutcome {
        TriageOutcome {
            level,
            explanation_en: "Rest at home.".to_string(),
            explanation_hi: "घर पर आराम करें।".to_string(),
            do_now_en: vec!["Drink fluids".to_string()],
            do_now_hi: vec!["तरल पदार्थ पिएं".to_string()],
            danger_signs_en: vec!["High fever".to_string()],
            danger_signs_hi: vec!["तेज़ बुखार".to_string()],
            summary_en: "Mild viral illness.".to_string(),
            summary_hi: "हल्का वायरल बुखार।".to_string(),
            grounding_links: Vec::new(),
        }
    }

    #[test]
    fn level_uses_uppercase_wire_names() {
        assert_eq!(serde_json::to_value(TriageLevel::Green).unwrap(), "GREEN");
        let level: TriageLevel = serde_json::from_str("\"RED\"").unwrap();
        assert_eq!(level, TriageLevel::Red);
        assert!(level.is_emergency());
        assert!(!TriageLevel::Yellow.is_emergency());
    }

    #[test]
    fn outcome_omits_empty_grounding_links() {
        let json = serde_json::to_value(sample_outcome(TriageLevel::Green)).unwrap();
        assert!(json.get("groundingLinks").is_none());
        assert_eq!(json["doNowEn"][0], "Drink fluids");
        assert_eq!(json["dangerSignsHi"][0], "तेज़ बुखार");
    }

    #[test]
    fn outcome_parses_without_grounding_links() {
        let json = r#"{
            "level": "YELLOW",
            "explanationEn": "See a clinic.",
            "explanationHi": "क्लिनिक जाएं।",
            "doNowEn": [], "doNowHi": [],
            "dangerSignsEn": [], "dangerSignsHi": [],
            "summaryEn": "s", "summaryHi": "s"
        }"#;
        let outcome: TriageOutcome = serde_json::from_str(json).unwrap();
        assert_eq!(outcome.level, TriageLevel::Yellow);
        assert!(outcome.grounding_links.is_empty());
    }

    #[test]
    fn history_record_round_trips_with_result_key() {
        let record = HistoryRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            profile: PatientProfile::new(PatientType::Adult, "40"),
            symptoms: "cough (duration: 2 days)".to_string(),
            outcome: sample_outcome(TriageLevel::Yellow),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("result").is_some());
        assert!(json.get("outcome").is_none());

        let back: HistoryRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
