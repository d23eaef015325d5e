//! Adaptive follow-up questions and their answers.
//!
//! The reasoner proposes between three and five questions per intake.
//! Every question carries paired English and Hindi text so the caller
//! can render either language without a second round trip.

use serde::{Deserialize, Serialize};

/// Input widget the question expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Boolean,
    Choice,
    Number,
}

/// A single follow-up question from the intake analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text_en: String,
    pub text_hi: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    /// Choice options, present only when `kind` is [`QuestionKind::Choice`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_en: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_hi: Option<Vec<String>>,
    /// Short clinical rationale shown under the question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why_hi: Option<String>,
}

/// Answer payloads mirror the question kinds. Untagged so the wire value
/// is the bare scalar (`true`, `4`, `"Sharp pain"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

/// An answer recorded against a question, keyed by the question id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    pub value: AnswerValue,
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_parses_from_reasoner_wire_shape() {
        let json = r#"{
            "id": "q1",
            "textEn": "Do you have a fever?",
            "textHi": "क्या आपको बुखार है?",
            "type": "boolean",
            "whyEn": "Fever points to infection."
        }"#;
        let question: Question = serde_json::from_str(json).unwrap();
        assert_eq!(question.id, "q1");
        assert_eq!(question.kind, QuestionKind::Boolean);
        assert!(question.options_en.is_none());
        assert_eq!(question.why_en.as_deref(), Some("Fever points to infection."));
    }

    #[test]
    fn choice_question_keeps_paired_options() {
        let json = r#"{
            "id": "q2",
            "textEn": "What kind of pain?",
            "textHi": "दर्द कैसा है?",
            "type": "choice",
            "optionsEn": ["Sharp", "Dull"],
            "optionsHi": ["तेज़", "हल्का"]
        }"#;
        let question: Question = serde_json::from_str(json).unwrap();
        assert_eq!(question.kind, QuestionKind::Choice);
        assert_eq!(question.options_en.as_ref().unwrap().len(), 2);
        assert_eq!(question.options_hi.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn answer_values_serialize_as_bare_scalars() {
        let boolean = Answer {
            question_id: "q1".to_string(),
            value: AnswerValue::Boolean(true),
        };
        let json = serde_json::to_value(&boolean).unwrap();
        assert_eq!(json["value"], true);

        let number: AnswerValue = serde_json::from_str("4").unwrap();
        assert_eq!(number, AnswerValue::Number(4.0));

        let text: AnswerValue = serde_json::from_str("\"Sharp\"").unwrap();
        assert_eq!(text, AnswerValue::Text("Sharp".to_string()));
    }
}
