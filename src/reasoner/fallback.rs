//! Constant safe outputs for exhausted reasoner pipelines.
//!
//! When finalization cannot produce a verdict the session must still
//! reach a result, so it gets this fixed YELLOW outcome: never home
//! care, never a false emergency, always "see a clinic". Intake
//! failures degrade to a single clarification question instead.

use crate::models::{Question, QuestionKind, TriageLevel, TriageOutcome};

use super::IntakeAnalysis;

/// The outcome substituted when finalize is exhausted. Pure and
/// deterministic; every call returns identical content.
pub fn fallback_outcome() -> TriageOutcome {
    TriageOutcome {
        level: TriageLevel::Yellow,
        explanation_en: "Unable to complete full AI analysis. For your safety, please consult a clinic for professional advice.".to_string(),
        explanation_hi: "पूरी तरह से विश्लेषण नहीं हो सका। सुरक्षा के लिए, कृपया सलाह के लिए डॉक्टर से मिलें।".to_string(),
        do_now_en: vec![
            "Stay hydrated".to_string(),
            "Monitor symptoms".to_string(),
            "Consult a clinician if feeling worse".to_string(),
        ],
        do_now_hi: vec![
            "पर्याप्त पानी पिएं".to_string(),
            "लक्षणों पर नज़र रखें".to_string(),
            "तबीयत खराब होने पर डॉक्टर को दिखाएं".to_string(),
        ],
        danger_signs_en: vec![
            "Breathlessness".to_string(),
            "High fever".to_string(),
            "Severe pain".to_string(),
        ],
        danger_signs_hi: vec![
            "साँस लेने में तकलीफ".to_string(),
            "तेज़ बुखार".to_string(),
            "तेज़ दर्द".to_string(),
        ],
        summary_en: "System Error during triage. Recommended caution.".to_string(),
        summary_hi: "त्रुटि के कारण सावधानी बरतने की सलाह दी जाती है।".to_string(),
        grounding_links: Vec::new(),
    }
}

/// The single question asked when intake analysis yields nothing usable.
pub fn clarification_question() -> Question {
    Question {
        id: "err".to_string(),
        text_en: "Could you please describe your symptoms in more detail?".to_string(),
        text_hi: "क्या आप अपने लक्षणों के बारे में विस्तार से बता सकते हैं?".to_string(),
        kind: QuestionKind::Boolean,
        options_en: None,
        options_hi: None,
        why_en: None,
        why_hi: None,
    }
}

/// Degraded intake analysis: not an emergency, ask for clarification.
pub fn degraded_intake() -> IntakeAnalysis {
    IntakeAnalysis {
        is_emergency: false,
        questions: vec![clarification_question()],
        initial_outcome: None,
    }
}
