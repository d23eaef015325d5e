//! Triage session state machine and flow driver.
//!
//! [`TriageSession`] is the pure state machine: every user event is a
//! method that validates the transition and returns a [`SessionAction`]
//! for the caller to perform. It never does I/O itself, which keeps
//! every transition unit-testable without a reasoner or a disk.
//!
//! [`TriageFlow`] is the async driver that owns a session, a reasoner,
//! and a history store, and performs the actions: issuing remote calls,
//! feeding results back in, and persisting completed outcomes. Remote
//! results carry the [`CallTicket`] they were issued under; a result
//! whose ticket no longer matches the session's outstanding call is
//! discarded, so a user who navigated away never sees a stale verdict.

use std::sync::Arc;

use thiserror::Error;

use crate::history::HistoryStore;
use crate::models::{
    Answer, AnswerValue, PatientProfile, PatientType, Question, SymptomNarrative, TriageOutcome,
};
use crate::reasoner::{fallback_outcome, IntakeAnalysis, Reasoner, ReasonerError};

// ═══════════════════════════════════════════════════════════
// Banners and fixed content
// ═══════════════════════════════════════════════════════════

/// Dismissible bilingual error banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Banner {
    pub text_en: &'static str,
    pub text_hi: &'static str,
}

/// Shown when intake analysis cannot be reached.
pub const INTAKE_ERROR_BANNER: Banner = Banner {
    text_en: "Service unavailable. Please check your connection and try again.",
    text_hi: "सेवा वर्तमान में उपलब्ध नहीं है। कृपया बाद में पुनः प्रयास करें।",
};

/// Shown when finalization fails outside the fallback path.
pub const RESULT_ERROR_BANNER: Banner = Banner {
    text_en: "Failed to generate results. Please try again.",
    text_hi: "परिणाम तैयार करने में समस्या हुई।",
};

/// Symptom label recorded for sessions completed by voice.
const VOICE_SESSION_LABEL: &str = "Voice-Assisted Session";

/// Profile recorded for sessions completed by voice, which skip intake.
fn voice_profile() -> PatientProfile {
    PatientProfile::new(PatientType::Adult, "N/A (Voice)")
}

// ═══════════════════════════════════════════════════════════
// Phases, tickets, actions
// ═══════════════════════════════════════════════════════════

/// Which remote call a `Loading` phase is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingKind {
    IntakeAnalysis,
    Finalize,
}

/// Session phase. `Result` and `EmergencyResult` are terminal until
/// `restart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Intake,
    Loading(LoadingKind),
    Questioning,
    Result,
    EmergencyResult,
    VoiceTriage,
}

/// Tag for one outstanding remote call. Tokens increase monotonically
/// for the session's lifetime, so a call issued before any navigation
/// can never match a call issued after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTicket {
    token: u64,
    kind: LoadingKind,
}

/// What the driver must do after an event is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Nothing to drive; wait for the next user event.
    None,
    /// Run the intake analysis call, tagged with the ticket.
    AnalyzeIntake {
        ticket: CallTicket,
        profile: PatientProfile,
        symptoms: String,
    },
    /// Run the finalize call, tagged with the ticket.
    Finalize {
        ticket: CallTicket,
        profile: PatientProfile,
        symptoms: String,
        answers: Vec<Answer>,
    },
    /// Append a completed outcome to history.
    Persist {
        profile: PatientProfile,
        symptoms: String,
        outcome: TriageOutcome,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Event '{event}' is not valid in phase {phase:?}")]
    InvalidTransition { phase: Phase, event: &'static str },

    #[error("Missing required intake field: {field}")]
    MissingField { field: &'static str },
}

// ═══════════════════════════════════════════════════════════
// TriageSession — the state machine
// ═══════════════════════════════════════════════════════════

/// One triage session. Owns all in-progress data; produces at most one
/// persisted outcome per completed run.
pub struct TriageSession {
    phase: Phase,
    profile: Option<PatientProfile>,
    /// Flattened narrative blob, fixed at submit time.
    symptoms: Option<String>,
    questions: Vec<Question>,
    current_index: usize,
    answers: Vec<Answer>,
    outcome: Option<TriageOutcome>,
    banner: Option<Banner>,
    emergency_alert: bool,
    call_seq: u64,
    pending: Option<CallTicket>,
}

impl TriageSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            profile: None,
            symptoms: None,
            questions: Vec::new(),
            current_index: 0,
            answers: Vec::new(),
            outcome: None,
            banner: None,
            emergency_alert: false,
            call_seq: 0,
            pending: None,
        }
    }

    // ── Accessors ────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn profile(&self) -> Option<&PatientProfile> {
        self.profile.as_ref()
    }

    /// Flattened symptom blob for the current session, if submitted.
    pub fn symptoms(&self) -> Option<&str> {
        self.symptoms.as_deref()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn outcome(&self) -> Option<&TriageOutcome> {
        self.outcome.as_ref()
    }

    pub fn banner(&self) -> Option<Banner> {
        self.banner
    }

    pub fn emergency_alert(&self) -> bool {
        self.emergency_alert
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn dismiss_emergency_alert(&mut self) {
        self.emergency_alert = false;
    }

    // ── Events ───────────────────────────────────────────

    /// `Idle → Intake`: begin a new guided session.
    pub fn start_intake(&mut self) -> Result<SessionAction, SessionError> {
        self.require_phase(Phase::Idle, "start_intake")?;
        self.phase = Phase::Intake;
        Ok(SessionAction::None)
    }

    /// `Idle → VoiceTriage`: begin a voice session instead.
    pub fn start_voice(&mut self) -> Result<SessionAction, SessionError> {
        self.require_phase(Phase::Idle, "start_voice")?;
        self.phase = Phase::VoiceTriage;
        Ok(SessionAction::None)
    }

    /// `Intake → Loading`: validate the form and issue the intake
    /// analysis call. Re-submission starts a fresh questionnaire.
    pub fn submit_intake(
        &mut self,
        profile: PatientProfile,
        narrative: SymptomNarrative,
    ) -> Result<SessionAction, SessionError> {
        self.require_phase(Phase::Intake, "submit_intake")?;
        validate_intake(&profile, &narrative)?;

        let symptoms = narrative.flattened();
        self.profile = Some(profile.clone());
        self.symptoms = Some(symptoms.clone());
        self.questions.clear();
        self.answers.clear();
        self.current_index = 0;
        self.outcome = None;
        self.banner = None;
        self.emergency_alert = false;

        let ticket = self.issue_ticket(LoadingKind::IntakeAnalysis);
        self.phase = Phase::Loading(LoadingKind::IntakeAnalysis);
        tracing::info!(token = ticket.token, "Intake submitted, analyzing");

        Ok(SessionAction::AnalyzeIntake {
            ticket,
            profile,
            symptoms,
        })
    }

    /// Intake analysis resolved. Stale tickets are discarded.
    pub fn intake_succeeded(
        &mut self,
        ticket: CallTicket,
        analysis: IntakeAnalysis,
    ) -> Result<SessionAction, SessionError> {
        if !self.accepts(ticket) {
            tracing::debug!(token = ticket.token, "Discarding stale intake result");
            return Ok(SessionAction::None);
        }
        self.pending = None;

        if analysis.is_emergency {
            let Some(outcome) = analysis.initial_outcome else {
                tracing::warn!("Emergency verdict without outcome, returning to intake");
                self.phase = Phase::Intake;
                self.banner = Some(INTAKE_ERROR_BANNER);
                return Ok(SessionAction::None);
            };
            tracing::info!(level = outcome.level.as_str(), "Emergency short-circuit");
            self.outcome = Some(outcome.clone());
            self.emergency_alert = true;
            self.phase = Phase::EmergencyResult;
            return Ok(self.persist_action(outcome));
        }

        if analysis.questions.is_empty() {
            tracing::warn!("Intake analysis returned no questions, returning to intake");
            self.phase = Phase::Intake;
            self.banner = Some(INTAKE_ERROR_BANNER);
            return Ok(SessionAction::None);
        }

        tracing::info!(count = analysis.questions.len(), "Follow-up questions ready");
        self.questions = analysis.questions;
        self.current_index = 0;
        self.phase = Phase::Questioning;
        Ok(SessionAction::None)
    }

    /// Intake analysis failed after retries: back to the form with a
    /// banner, data intact.
    pub fn intake_failed(
        &mut self,
        ticket: CallTicket,
        error: &ReasonerError,
    ) -> Result<SessionAction, SessionError> {
        if !self.accepts(ticket) {
            tracing::debug!(token = ticket.token, "Discarding stale intake failure");
            return Ok(SessionAction::None);
        }
        self.pending = None;
        tracing::warn!(error = %error, "Intake analysis failed, returning to form");
        self.phase = Phase::Intake;
        self.banner = Some(INTAKE_ERROR_BANNER);
        Ok(SessionAction::None)
    }

    /// Record an answer for the current question. Advances, or issues
    /// the finalize call after the last question. Re-answering a
    /// question that already has an answer (after `edit_answers` or a
    /// failed finalize) replaces it in place.
    pub fn answer(&mut self, value: AnswerValue) -> Result<SessionAction, SessionError> {
        self.require_phase(Phase::Questioning, "answer")?;
        let Some(question) = self.questions.get(self.current_index) else {
            return Err(SessionError::InvalidTransition {
                phase: self.phase,
                event: "answer",
            });
        };

        let answer = Answer {
            question_id: question.id.clone(),
            value,
        };
        if self.answers.len() > self.current_index {
            self.answers[self.current_index] = answer;
        } else {
            self.answers.push(answer);
        }

        if self.current_index + 1 < self.questions.len() {
            self.current_index += 1;
            return Ok(SessionAction::None);
        }

        // Last question answered: finalize.
        let (Some(profile), Some(symptoms)) = (self.profile.clone(), self.symptoms.clone()) else {
            return Err(SessionError::InvalidTransition {
                phase: self.phase,
                event: "answer",
            });
        };
        self.banner = None;
        let ticket = self.issue_ticket(LoadingKind::Finalize);
        self.phase = Phase::Loading(LoadingKind::Finalize);
        tracing::info!(token = ticket.token, answers = self.answers.len(), "Finalizing triage");

        Ok(SessionAction::Finalize {
            ticket,
            profile,
            symptoms,
            answers: self.answers.clone(),
        })
    }

    /// Step back one question, discarding its answer; from the first
    /// question, return to the intake form (state kept).
    pub fn back(&mut self) -> Result<SessionAction, SessionError> {
        self.require_phase(Phase::Questioning, "back")?;
        if self.current_index == 0 {
            self.phase = Phase::Intake;
            return Ok(SessionAction::None);
        }
        self.answers.pop();
        self.current_index -= 1;
        Ok(SessionAction::None)
    }

    /// Finalize resolved. Stale tickets are discarded.
    pub fn finalize_succeeded(
        &mut self,
        ticket: CallTicket,
        outcome: TriageOutcome,
    ) -> Result<SessionAction, SessionError> {
        if !self.accepts(ticket) {
            tracing::debug!(token = ticket.token, "Discarding stale finalize result");
            return Ok(SessionAction::None);
        }
        self.pending = None;
        tracing::info!(level = outcome.level.as_str(), "Triage complete");
        self.outcome = Some(outcome.clone());
        self.emergency_alert = outcome.level.is_emergency();
        self.phase = Phase::Result;
        Ok(self.persist_action(outcome))
    }

    /// Finalize failed outside the fallback path: back to the last
    /// question with a banner, answers intact.
    pub fn finalize_failed(
        &mut self,
        ticket: CallTicket,
        error: &ReasonerError,
    ) -> Result<SessionAction, SessionError> {
        if !self.accepts(ticket) {
            tracing::debug!(token = ticket.token, "Discarding stale finalize failure");
            return Ok(SessionAction::None);
        }
        self.pending = None;
        tracing::warn!(error = %error, "Finalize failed, returning to questions");
        self.phase = Phase::Questioning;
        self.banner = Some(RESULT_ERROR_BANNER);
        Ok(SessionAction::None)
    }

    /// `Result → Questioning` at the last answered index. Unlike
    /// `back`, this keeps every answer; re-answering replaces in place.
    pub fn edit_answers(&mut self) -> Result<SessionAction, SessionError> {
        self.require_phase(Phase::Result, "edit_answers")?;
        if self.questions.is_empty() {
            // Nothing to revisit (outcome was loaded from history).
            return Err(SessionError::InvalidTransition {
                phase: self.phase,
                event: "edit_answers",
            });
        }
        self.current_index = self.questions.len() - 1;
        self.banner = None;
        self.phase = Phase::Questioning;
        Ok(SessionAction::None)
    }

    /// Display a past record from `Idle`. Never re-appends to history.
    pub fn view_history(
        &mut self,
        record: &crate::models::HistoryRecord,
    ) -> Result<SessionAction, SessionError> {
        self.require_phase(Phase::Idle, "view_history")?;
        self.profile = Some(record.profile.clone());
        self.symptoms = Some(record.symptoms.clone());
        self.outcome = Some(record.outcome.clone());
        self.questions.clear();
        self.answers.clear();
        self.current_index = 0;
        self.emergency_alert = false;
        self.phase = Phase::Result;
        Ok(SessionAction::None)
    }

    /// A voice session recorded its outcome: surface and persist it
    /// under the fixed voice placeholder profile.
    pub fn voice_completed(
        &mut self,
        outcome: TriageOutcome,
    ) -> Result<SessionAction, SessionError> {
        self.require_phase(Phase::VoiceTriage, "voice_completed")?;
        self.profile = Some(voice_profile());
        self.symptoms = Some(VOICE_SESSION_LABEL.to_string());
        self.outcome = Some(outcome.clone());
        self.emergency_alert = outcome.level.is_emergency();
        self.phase = Phase::Result;
        Ok(self.persist_action(outcome))
    }

    /// Return to `Idle` from anywhere, clearing all session data.
    pub fn restart(&mut self) -> SessionAction {
        self.phase = Phase::Idle;
        self.profile = None;
        self.symptoms = None;
        self.questions.clear();
        self.answers.clear();
        self.current_index = 0;
        self.outcome = None;
        self.banner = None;
        self.emergency_alert = false;
        self.pending = None;
        // call_seq keeps counting so tickets never repeat.
        SessionAction::None
    }

    // ── Internals ────────────────────────────────────────

    fn require_phase(&self, expected: Phase, event: &'static str) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                phase: self.phase,
                event,
            })
        }
    }

    fn issue_ticket(&mut self, kind: LoadingKind) -> CallTicket {
        self.call_seq += 1;
        let ticket = CallTicket {
            token: self.call_seq,
            kind,
        };
        self.pending = Some(ticket);
        ticket
    }

    /// A result is accepted only while its call is the outstanding one.
    fn accepts(&self, ticket: CallTicket) -> bool {
        self.phase == Phase::Loading(ticket.kind) && self.pending == Some(ticket)
    }

    fn persist_action(&self, outcome: TriageOutcome) -> SessionAction {
        // Both are set on every path that reaches a result.
        let profile = self.profile.clone().unwrap_or_else(voice_profile);
        let symptoms = self.symptoms.clone().unwrap_or_default();
        SessionAction::Persist {
            profile,
            symptoms,
            outcome,
        }
    }
}

impl Default for TriageSession {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_intake(
    profile: &PatientProfile,
    narrative: &SymptomNarrative,
) -> Result<(), SessionError> {
    if profile.age.trim().is_empty() {
        return Err(SessionError::MissingField { field: "age" });
    }
    if narrative.text.trim().is_empty() {
        return Err(SessionError::MissingField { field: "symptoms" });
    }
    if profile.patient_type == PatientType::Pregnant
        && profile
            .weeks_pregnant
            .as_deref()
            .map_or(true, |w| w.trim().is_empty())
    {
        return Err(SessionError::MissingField {
            field: "weeksPregnant",
        });
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// TriageFlow — async driver
// ═══════════════════════════════════════════════════════════

/// Owns a session plus its collaborators and drives remote calls to
/// completion. Finalize exhaustion never surfaces: the constant
/// fallback outcome is substituted so a session always reaches a
/// terminal result.
pub struct TriageFlow {
    session: TriageSession,
    reasoner: Arc<dyn Reasoner>,
    history: HistoryStore,
}

impl TriageFlow {
    pub fn new(reasoner: Arc<dyn Reasoner>, history: HistoryStore) -> Self {
        Self {
            session: TriageSession::new(),
            reasoner,
            history,
        }
    }

    pub fn session(&self) -> &TriageSession {
        &self.session
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn start_intake(&mut self) -> Result<(), SessionError> {
        self.session.start_intake().map(|_| ())
    }

    pub fn start_voice(&mut self) -> Result<(), SessionError> {
        self.session.start_voice().map(|_| ())
    }

    /// Submit the intake form and run analysis to its next phase.
    pub async fn submit_intake(
        &mut self,
        profile: PatientProfile,
        narrative: SymptomNarrative,
    ) -> Result<(), SessionError> {
        let action = self.session.submit_intake(profile, narrative)?;
        self.drive(action).await;
        Ok(())
    }

    /// Answer the current question, finalizing after the last one.
    pub async fn answer(&mut self, value: AnswerValue) -> Result<(), SessionError> {
        let action = self.session.answer(value)?;
        self.drive(action).await;
        Ok(())
    }

    pub fn back(&mut self) -> Result<(), SessionError> {
        self.session.back().map(|_| ())
    }

    pub fn edit_answers(&mut self) -> Result<(), SessionError> {
        self.session.edit_answers().map(|_| ())
    }

    pub fn view_history(
        &mut self,
        record: &crate::models::HistoryRecord,
    ) -> Result<(), SessionError> {
        self.session.view_history(record).map(|_| ())
    }

    /// Record a voice-session outcome and persist it.
    pub async fn voice_completed(&mut self, outcome: TriageOutcome) -> Result<(), SessionError> {
        let action = self.session.voice_completed(outcome)?;
        self.drive(action).await;
        Ok(())
    }

    pub fn restart(&mut self) {
        self.session.restart();
    }

    /// Perform driver actions until the session settles.
    async fn drive(&mut self, mut action: SessionAction) {
        loop {
            action = match action {
                SessionAction::None => break,

                SessionAction::AnalyzeIntake {
                    ticket,
                    profile,
                    symptoms,
                } => match self.reasoner.analyze_intake(&profile, &symptoms).await {
                    Ok(analysis) => next_action(self.session.intake_succeeded(ticket, analysis)),
                    Err(e) => next_action(self.session.intake_failed(ticket, &e)),
                },

                SessionAction::Finalize {
                    ticket,
                    profile,
                    symptoms,
                    answers,
                } => match self.reasoner.finalize(&profile, &symptoms, &answers).await {
                    Ok(outcome) => next_action(self.session.finalize_succeeded(ticket, outcome)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Finalize exhausted, substituting safe fallback");
                        next_action(self.session.finalize_succeeded(ticket, fallback_outcome()))
                    }
                },

                SessionAction::Persist {
                    profile,
                    symptoms,
                    outcome,
                } => {
                    if let Err(e) = self.history.append(profile, symptoms, outcome) {
                        tracing::warn!(error = %e, "Could not persist triage record");
                    }
                    break;
                }
            };
        }
    }
}

fn next_action(result: Result<SessionAction, SessionError>) -> SessionAction {
    match result {
        Ok(action) => action,
        Err(e) => {
            tracing::error!(error = %e, "Session rejected driver event");
            SessionAction::None
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
