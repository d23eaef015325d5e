//! Voice triage adapter.
//!
//! An audio-duplex alternative to the guided questionnaire: the remote
//! model conducts the interview by voice and records its verdict
//! through a declared tool, converging on the same [`TriageOutcome`]
//! contract as the text pipeline. [`VoiceSession`] holds the testable
//! session state; [`run_voice_session`] drives it over a transport
//! channel pair until the model records a result or the link ends.
//!
//! No partial outcome is ever synthesized here: a session that fails
//! or hangs up before the verdict tool fires yields nothing, and the
//! caller offers only a restart.

pub mod messages;

pub use messages::{VoiceIncoming, VoiceOutgoing};

use std::collections::VecDeque;
use std::mem;

use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config;
use crate::models::TriageOutcome;
use crate::reasoner::prompt::{outcome_properties, OUTCOME_REQUIRED_FIELDS};
use crate::reasoner::GroundedSearch;

// ═══════════════════════════════════════════════════════════
// Session constants
// ═══════════════════════════════════════════════════════════

/// Tool the model invokes to emit its final structured verdict.
pub const TOOL_RECORD_RESULT: &str = "recordTriageResult";

/// Tool the model invokes for best-effort local health context.
pub const TOOL_ENVIRONMENT_CONTEXT: &str = "getEnvironmentalContext";

/// Microphone capture rate (Hz).
pub const INPUT_SAMPLE_RATE: u32 = 16_000;

/// Model speech playback rate (Hz).
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// Queue depth for the transport channel pair.
pub const VOICE_CHANNEL_CAPACITY: usize = 64;

/// Persona for the duplex session. The clinical guidelines themselves
/// live on the remote side; this only fixes the bedside manner.
pub const VOICE_SYSTEM_INSTRUCTION: &str = r#"You are Dr. Aayu, a warm, patient family physician. Greeting: "Hello, I am Dr. Aayu. How can I help you today?". Follow the provided clinical interaction guidelines strictly."#;

/// Tool declarations for the live session. The verdict tool requires
/// the same nine fields as the text pipeline's outcome schema.
pub fn voice_tool_declarations() -> Value {
    json!([{
        "functionDeclarations": [
            {
                "name": TOOL_RECORD_RESULT,
                "parameters": {
                    "type": "OBJECT",
                    "description": "Finalizes the triage process and saves results.",
                    "properties": outcome_properties(),
                    "required": OUTCOME_REQUIRED_FIELDS
                }
            },
            {
                "name": TOOL_ENVIRONMENT_CONTEXT,
                "parameters": {
                    "type": "OBJECT",
                    "description": "Grounds the triage in real-time weather and public health data.",
                    "properties": {
                        "location": {
                            "type": "STRING",
                            "description": "User's location (city, state)."
                        }
                    },
                    "required": ["location"]
                }
            }
        ]
    }])
}

/// Query for the environmental-context lookup.
pub fn context_query(location: &str) -> String {
    format!(
        "Current local health outbreaks, air quality, and extreme weather in {location}, India."
    )
}

// ═══════════════════════════════════════════════════════════
// Errors and status
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum VoiceError {
    /// The incoming stream dropped without the remote side closing.
    #[error("Voice connection lost")]
    Disconnected,

    /// The outgoing channel is gone; the transport task has stopped.
    #[error("Voice transport closed")]
    TransportClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceStatus {
    Idle,
    Connecting,
    Active,
    Error,
}

#[derive(Debug, Error)]
enum ToolCallError {
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Malformed tool arguments: {0}")]
    Malformed(#[from] serde_json::Error),
}

// ═══════════════════════════════════════════════════════════
// Session state
// ═══════════════════════════════════════════════════════════

/// One completed conversational turn.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Exchange {
    pub user: String,
    pub model: String,
}

/// What the driver must do after a transport message is applied.
#[derive(Debug, PartialEq)]
pub enum VoiceAction {
    None,
    /// Send a tool response built by the session (errors included).
    Respond {
        id: String,
        name: String,
        response: Value,
    },
    /// Run the environmental lookup, then respond to the tool call.
    FetchContext { id: String, location: String },
    /// The model recorded its verdict; acknowledge and finish.
    Complete { id: String, outcome: TriageOutcome },
}

/// Voice session state. Transport messages are applied through
/// [`VoiceSession::handle`]; audio payloads stay base64-encoded, the
/// adapter never decodes them.
pub struct VoiceSession {
    status: VoiceStatus,
    /// Model speech chunks awaiting playback.
    queued_audio: VecDeque<String>,
    live_user: String,
    live_model: String,
    exchanges: Vec<Exchange>,
}

impl VoiceSession {
    pub fn new() -> Self {
        Self {
            status: VoiceStatus::Idle,
            queued_audio: VecDeque::new(),
            live_user: String::new(),
            live_model: String::new(),
            exchanges: Vec::new(),
        }
    }

    pub fn status(&self) -> VoiceStatus {
        self.status
    }

    /// Next model-speech chunk for the playback layer.
    pub fn next_audio(&mut self) -> Option<String> {
        self.queued_audio.pop_front()
    }

    pub fn queued_chunks(&self) -> usize {
        self.queued_audio.len()
    }

    /// In-progress transcript of the current user utterance.
    pub fn live_user(&self) -> &str {
        &self.live_user
    }

    /// In-progress transcript of the current model utterance.
    pub fn live_model(&self) -> &str {
        &self.live_model
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    /// Apply one transport message and report what to do next.
    pub fn handle(&mut self, msg: VoiceIncoming) -> VoiceAction {
        match msg {
            VoiceIncoming::SetupComplete {} => {
                tracing::info!("Voice session live");
                self.status = VoiceStatus::Active;
                VoiceAction::None
            }
            VoiceIncoming::AudioChunk { data } => {
                self.queued_audio.push_back(data);
                VoiceAction::None
            }
            VoiceIncoming::InputTranscript { text } => {
                self.live_user.push_str(&text);
                VoiceAction::None
            }
            VoiceIncoming::OutputTranscript { text } => {
                self.live_model.push_str(&text);
                VoiceAction::None
            }
            VoiceIncoming::Interrupted {} => {
                // Flush pending playback; transcripts stay.
                self.queued_audio.clear();
                VoiceAction::None
            }
            VoiceIncoming::TurnComplete {} => {
                if !self.live_user.is_empty() || !self.live_model.is_empty() {
                    self.exchanges.push(Exchange {
                        user: mem::take(&mut self.live_user),
                        model: mem::take(&mut self.live_model),
                    });
                }
                VoiceAction::None
            }
            VoiceIncoming::ToolCall { id, name, args } => self.handle_tool_call(id, name, args),
            VoiceIncoming::Closed {} => {
                self.status = VoiceStatus::Idle;
                VoiceAction::None
            }
        }
    }

    fn handle_tool_call(&mut self, id: String, name: String, args: Value) -> VoiceAction {
        match name.as_str() {
            TOOL_RECORD_RESULT => match parse_outcome_args(args) {
                Ok(outcome) => {
                    tracing::info!(level = outcome.level.as_str(), "Voice session recorded a verdict");
                    VoiceAction::Complete { id, outcome }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Rejecting malformed verdict from voice tool");
                    VoiceAction::Respond {
                        id,
                        name,
                        response: json!({ "error": e.to_string() }),
                    }
                }
            },
            TOOL_ENVIRONMENT_CONTEXT => match args.get("location").and_then(Value::as_str) {
                Some(location) => VoiceAction::FetchContext {
                    id,
                    location: location.to_string(),
                },
                None => VoiceAction::Respond {
                    id,
                    name,
                    response: json!({ "error": "Missing required field 'location'" }),
                },
            },
            _ => {
                tracing::warn!(tool = %name, "Voice model invoked an undeclared tool");
                VoiceAction::Respond {
                    id,
                    name,
                    response: json!({ "error": "Unknown tool" }),
                }
            }
        }
    }

    fn begin(&mut self) {
        self.status = VoiceStatus::Connecting;
    }

    fn hang_up(&mut self) {
        self.status = VoiceStatus::Idle;
    }

    fn fail(&mut self) {
        self.status = VoiceStatus::Error;
    }
}

impl Default for VoiceSession {
    fn default() -> Self {
        Self::new()
    }
}

/// The verdict tool's arguments must carry every required outcome
/// field before they are trusted as a [`TriageOutcome`].
fn parse_outcome_args(args: Value) -> Result<TriageOutcome, ToolCallError> {
    for field in OUTCOME_REQUIRED_FIELDS {
        if args.get(field).is_none() {
            return Err(ToolCallError::MissingField(field));
        }
    }
    Ok(serde_json::from_value(args)?)
}

// ═══════════════════════════════════════════════════════════
// Transport driver
// ═══════════════════════════════════════════════════════════

/// Adapter end of the transport: messages out, messages in.
pub struct VoiceChannel {
    pub outgoing: mpsc::Sender<VoiceOutgoing>,
    pub incoming: mpsc::Receiver<VoiceIncoming>,
}

impl VoiceChannel {
    /// Build a connected pair: the adapter end plus the transport's
    /// two ends.
    pub fn pair() -> (
        Self,
        mpsc::Sender<VoiceIncoming>,
        mpsc::Receiver<VoiceOutgoing>,
    ) {
        let (out_tx, out_rx) = mpsc::channel(VOICE_CHANNEL_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel(VOICE_CHANNEL_CAPACITY);
        (
            Self {
                outgoing: out_tx,
                incoming: in_rx,
            },
            in_tx,
            out_rx,
        )
    }
}

/// Drive a voice session until the model records an outcome, either
/// side hangs up, or the transport fails.
///
/// `mic` carries base64 PCM chunks from the capture layer; it closing
/// is the local hang-up. Returns the recorded outcome, or `None` when
/// the session ended without one.
pub async fn run_voice_session(
    session: &mut VoiceSession,
    channel: VoiceChannel,
    search: &dyn GroundedSearch,
    mut mic: mpsc::Receiver<String>,
) -> Result<Option<TriageOutcome>, VoiceError> {
    let VoiceChannel {
        outgoing,
        mut incoming,
    } = channel;

    session.begin();
    deliver(
        session,
        &outgoing,
        VoiceOutgoing::Setup {
            model: config::VOICE_MODEL.to_string(),
            system_instruction: VOICE_SYSTEM_INSTRUCTION.to_string(),
            tools: voice_tool_declarations(),
            input_sample_rate: INPUT_SAMPLE_RATE,
            output_sample_rate: OUTPUT_SAMPLE_RATE,
        },
    )
    .await?;

    loop {
        tokio::select! {
            chunk = mic.recv() => match chunk {
                Some(data) => {
                    deliver(session, &outgoing, VoiceOutgoing::AudioIn { data }).await?;
                }
                None => {
                    tracing::info!("Microphone released, ending voice session");
                    let _ = outgoing.send(VoiceOutgoing::End {}).await;
                    session.hang_up();
                    return Ok(None);
                }
            },
            msg = incoming.recv() => {
                let Some(msg) = msg else {
                    tracing::warn!("Voice transport dropped mid-session");
                    session.fail();
                    return Err(VoiceError::Disconnected);
                };
                let closed = matches!(msg, VoiceIncoming::Closed {});
                match session.handle(msg) {
                    VoiceAction::None => {
                        if closed {
                            return Ok(None);
                        }
                    }
                    VoiceAction::Respond { id, name, response } => {
                        deliver(
                            session,
                            &outgoing,
                            VoiceOutgoing::ToolResponse { id, name, response },
                        )
                        .await?;
                    }
                    VoiceAction::FetchContext { id, location } => {
                        let response = match search.search(&context_query(&location)).await {
                            Ok(context) => json!({ "context": context }),
                            Err(e) => {
                                tracing::warn!(error = %e, "Environmental lookup failed");
                                json!({ "error": "Grounding failed" })
                            }
                        };
                        deliver(
                            session,
                            &outgoing,
                            VoiceOutgoing::ToolResponse {
                                id,
                                name: TOOL_ENVIRONMENT_CONTEXT.to_string(),
                                response,
                            },
                        )
                        .await?;
                    }
                    VoiceAction::Complete { id, outcome } => {
                        deliver(
                            session,
                            &outgoing,
                            VoiceOutgoing::ToolResponse {
                                id,
                                name: TOOL_RECORD_RESULT.to_string(),
                                response: json!({ "status": "recorded" }),
                            },
                        )
                        .await?;
                        let _ = outgoing.send(VoiceOutgoing::End {}).await;
                        session.hang_up();
                        return Ok(Some(outcome));
                    }
                }
            }
        }
    }
}

async fn deliver(
    session: &mut VoiceSession,
    outgoing: &mpsc::Sender<VoiceOutgoing>,
    msg: VoiceOutgoing,
) -> Result<(), VoiceError> {
    if outgoing.send(msg).await.is_err() {
        session.fail();
        return Err(VoiceError::TransportClosed);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TriageLevel;
    use crate::reasoner::ReasonerError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn valid_outcome_args() -> Value {
        json!({
            "level": "GREEN",
            "explanationEn": "Likely a mild viral infection.",
            "explanationHi": "संभवतः हल्का वायरल संक्रमण।",
            "doNowEn": ["Rest", "Drink fluids"],
            "doNowHi": ["आराम करें", "तरल पदार्थ पिएं"],
            "dangerSignsEn": ["Breathlessness"],
            "dangerSignsHi": ["सांस फूलना"],
            "summaryEn": "Adult with mild fever",
            "summaryHi": "हल्के बुखार वाला वयस्क"
        })
    }

    /// Search stub recording the query it was given.
    struct StubSearch {
        reply: Option<String>,
        last_query: Mutex<Option<String>>,
    }

    impl StubSearch {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                last_query: Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                last_query: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl GroundedSearch for StubSearch {
        async fn search(&self, query: &str) -> Result<String, ReasonerError> {
            *self.last_query.lock().unwrap() = Some(query.to_string());
            match &self.reply {
                Some(text) => Ok(text.clone()),
                None => Err(ReasonerError::ServerError { status: 503 }),
            }
        }
    }

    // ─── Pure session state ──────────────────────────────────────────────────

    #[test]
    fn setup_complete_activates_and_close_idles() {
        let mut session = VoiceSession::new();
        assert_eq!(session.status(), VoiceStatus::Idle);

        session.handle(VoiceIncoming::SetupComplete {});
        assert_eq!(session.status(), VoiceStatus::Active);

        session.handle(VoiceIncoming::Closed {});
        assert_eq!(session.status(), VoiceStatus::Idle);
    }

    #[test]
    fn interruption_flushes_audio_but_keeps_transcripts() {
        let mut session = VoiceSession::new();
        session.handle(VoiceIncoming::AudioChunk { data: "AAAA".into() });
        session.handle(VoiceIncoming::AudioChunk { data: "BBBB".into() });
        session.handle(VoiceIncoming::OutputTranscript { text: "Namaste, I am".into() });
        assert_eq!(session.queued_chunks(), 2);

        session.handle(VoiceIncoming::Interrupted {});

        assert_eq!(session.queued_chunks(), 0);
        assert!(session.next_audio().is_none());
        assert_eq!(session.live_model(), "Namaste, I am");
    }

    #[test]
    fn turn_complete_folds_live_transcripts_into_exchanges() {
        let mut session = VoiceSession::new();
        session.handle(VoiceIncoming::InputTranscript { text: "I have".into() });
        session.handle(VoiceIncoming::InputTranscript { text: " a fever".into() });
        session.handle(VoiceIncoming::OutputTranscript { text: "Since when?".into() });
        session.handle(VoiceIncoming::TurnComplete {});

        assert_eq!(session.exchanges().len(), 1);
        assert_eq!(session.exchanges()[0].user, "I have a fever");
        assert_eq!(session.exchanges()[0].model, "Since when?");
        assert!(session.live_user().is_empty());
        assert!(session.live_model().is_empty());

        // An empty turn folds nothing.
        session.handle(VoiceIncoming::TurnComplete {});
        assert_eq!(session.exchanges().len(), 1);
    }

    #[test]
    fn playback_drains_in_arrival_order() {
        let mut session = VoiceSession::new();
        session.handle(VoiceIncoming::AudioChunk { data: "first".into() });
        session.handle(VoiceIncoming::AudioChunk { data: "second".into() });

        assert_eq!(session.next_audio().as_deref(), Some("first"));
        assert_eq!(session.next_audio().as_deref(), Some("second"));
        assert!(session.next_audio().is_none());
    }

    // ─── Tool calls ──────────────────────────────────────────────────────────

    #[test]
    fn valid_verdict_completes_the_state_machine() {
        let mut session = VoiceSession::new();
        let action = session.handle(VoiceIncoming::ToolCall {
            id: "call-1".into(),
            name: TOOL_RECORD_RESULT.into(),
            args: valid_outcome_args(),
        });

        let VoiceAction::Complete { id, outcome } = action else {
            panic!("expected Complete, got {action:?}");
        };
        assert_eq!(id, "call-1");
        assert_eq!(outcome.level, TriageLevel::Green);
        assert!(outcome.grounding_links.is_empty());
    }

    #[test]
    fn verdict_missing_fields_is_rejected_with_tool_error() {
        let mut session = VoiceSession::new();
        let action = session.handle(VoiceIncoming::ToolCall {
            id: "call-2".into(),
            name: TOOL_RECORD_RESULT.into(),
            args: json!({ "level": "GREEN" }),
        });

        let VoiceAction::Respond { response, .. } = action else {
            panic!("expected Respond, got {action:?}");
        };
        let error = response["error"].as_str().unwrap();
        assert!(error.contains("explanationEn"), "got {error}");
    }

    #[test]
    fn environment_tool_requires_a_location() {
        let mut session = VoiceSession::new();

        let action = session.handle(VoiceIncoming::ToolCall {
            id: "call-3".into(),
            name: TOOL_ENVIRONMENT_CONTEXT.into(),
            args: json!({}),
        });
        assert!(matches!(action, VoiceAction::Respond { ref response, .. }
            if response["error"].as_str().unwrap().contains("location")));

        let action = session.handle(VoiceIncoming::ToolCall {
            id: "call-4".into(),
            name: TOOL_ENVIRONMENT_CONTEXT.into(),
            args: json!({ "location": "Delhi, Delhi" }),
        });
        assert_eq!(
            action,
            VoiceAction::FetchContext {
                id: "call-4".into(),
                location: "Delhi, Delhi".into(),
            }
        );
    }

    #[test]
    fn unknown_tool_is_refused() {
        let mut session = VoiceSession::new();
        let action = session.handle(VoiceIncoming::ToolCall {
            id: "call-5".into(),
            name: "openPharmacy".into(),
            args: json!({}),
        });
        assert!(matches!(action, VoiceAction::Respond { ref response, .. }
            if response["error"] == "Unknown tool"));
    }

    #[test]
    fn tool_declarations_cover_both_tools() {
        let tools = voice_tool_declarations();
        let declarations = tools[0]["functionDeclarations"].as_array().unwrap();
        assert_eq!(declarations.len(), 2);
        assert_eq!(declarations[0]["name"], TOOL_RECORD_RESULT);
        assert_eq!(declarations[1]["name"], TOOL_ENVIRONMENT_CONTEXT);

        let required = declarations[0]["parameters"]["required"].as_array().unwrap();
        assert_eq!(required.len(), OUTCOME_REQUIRED_FIELDS.len());
    }

    #[test]
    fn context_query_names_the_location() {
        let query = context_query("Jaipur, Rajasthan");
        assert!(query.contains("Jaipur, Rajasthan"));
        assert!(query.contains("India"));
    }

    // ─── Driver ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn model_verdict_completes_the_session() {
        let (channel, to_adapter, mut from_adapter) = VoiceChannel::pair();
        let (mic_tx, mic_rx) = mpsc::channel(8);
        let mut session = VoiceSession::new();
        let search = StubSearch::ok("clear skies");

        let feed = async {
            to_adapter.send(VoiceIncoming::SetupComplete {}).await.unwrap();
            to_adapter
                .send(VoiceIncoming::ToolCall {
                    id: "call-1".into(),
                    name: TOOL_RECORD_RESULT.into(),
                    args: valid_outcome_args(),
                })
                .await
                .unwrap();
        };
        let (result, ()) =
            tokio::join!(run_voice_session(&mut session, channel, &search, mic_rx), feed);

        let outcome = result.unwrap().expect("verdict expected");
        assert_eq!(outcome.level, TriageLevel::Green);
        assert_eq!(session.status(), VoiceStatus::Idle);

        let Some(VoiceOutgoing::Setup {
            model,
            input_sample_rate,
            output_sample_rate,
            ..
        }) = from_adapter.recv().await
        else {
            panic!("expected setup");
        };
        assert_eq!(model, config::VOICE_MODEL);
        assert_eq!(input_sample_rate, INPUT_SAMPLE_RATE);
        assert_eq!(output_sample_rate, OUTPUT_SAMPLE_RATE);
        let Some(VoiceOutgoing::ToolResponse { name, response, .. }) = from_adapter.recv().await
        else {
            panic!("expected tool response");
        };
        assert_eq!(name, TOOL_RECORD_RESULT);
        assert_eq!(response["status"], "recorded");
        assert!(matches!(from_adapter.recv().await, Some(VoiceOutgoing::End {})));

        drop(mic_tx);
    }

    #[tokio::test]
    async fn local_hang_up_ends_without_an_outcome() {
        let (channel, to_adapter, mut from_adapter) = VoiceChannel::pair();
        let (mic_tx, mic_rx) = mpsc::channel(8);
        let mut session = VoiceSession::new();
        let search = StubSearch::ok("clear skies");

        let feed = async {
            mic_tx.send("AAAA".to_string()).await.unwrap();
            drop(mic_tx);
        };
        let (result, ()) =
            tokio::join!(run_voice_session(&mut session, channel, &search, mic_rx), feed);

        assert!(result.unwrap().is_none());
        assert_eq!(session.status(), VoiceStatus::Idle);

        assert!(matches!(from_adapter.recv().await, Some(VoiceOutgoing::Setup { .. })));
        assert!(matches!(from_adapter.recv().await, Some(VoiceOutgoing::AudioIn { .. })));
        assert!(matches!(from_adapter.recv().await, Some(VoiceOutgoing::End {})));

        drop(to_adapter);
    }

    #[tokio::test]
    async fn transport_drop_is_a_connection_error() {
        let (channel, to_adapter, _from_adapter) = VoiceChannel::pair();
        let (mic_tx, mic_rx) = mpsc::channel::<String>(8);
        let mut session = VoiceSession::new();
        let search = StubSearch::ok("clear skies");

        let feed = async {
            drop(to_adapter);
        };
        let (result, ()) =
            tokio::join!(run_voice_session(&mut session, channel, &search, mic_rx), feed);

        assert!(matches!(result, Err(VoiceError::Disconnected)));
        assert_eq!(session.status(), VoiceStatus::Error);

        drop(mic_tx);
    }

    #[tokio::test]
    async fn environment_lookup_feeds_context_back() {
        let (channel, to_adapter, mut from_adapter) = VoiceChannel::pair();
        let (mic_tx, mic_rx) = mpsc::channel(8);
        let mut session = VoiceSession::new();
        let search = StubSearch::ok("AQI is severe in Delhi today.");

        let feed = async {
            to_adapter.send(VoiceIncoming::SetupComplete {}).await.unwrap();
            to_adapter
                .send(VoiceIncoming::ToolCall {
                    id: "call-9".into(),
                    name: TOOL_ENVIRONMENT_CONTEXT.into(),
                    args: json!({ "location": "Delhi, Delhi" }),
                })
                .await
                .unwrap();
            to_adapter.send(VoiceIncoming::Closed {}).await.unwrap();
        };
        let (result, ()) =
            tokio::join!(run_voice_session(&mut session, channel, &search, mic_rx), feed);

        assert!(result.unwrap().is_none());

        let query = search.last_query.lock().unwrap().clone().unwrap();
        assert!(query.contains("Delhi, Delhi"));

        assert!(matches!(from_adapter.recv().await, Some(VoiceOutgoing::Setup { .. })));
        let Some(VoiceOutgoing::ToolResponse { name, response, .. }) = from_adapter.recv().await
        else {
            panic!("expected tool response");
        };
        assert_eq!(name, TOOL_ENVIRONMENT_CONTEXT);
        assert_eq!(response["context"], "AQI is severe in Delhi today.");

        drop(mic_tx);
    }

    #[tokio::test]
    async fn environment_lookup_failure_reports_a_tool_error() {
        let (channel, to_adapter, mut from_adapter) = VoiceChannel::pair();
        let (mic_tx, mic_rx) = mpsc::channel(8);
        let mut session = VoiceSession::new();
        let search = StubSearch::failing();

        let feed = async {
            to_adapter
                .send(VoiceIncoming::ToolCall {
                    id: "call-9".into(),
                    name: TOOL_ENVIRONMENT_CONTEXT.into(),
                    args: json!({ "location": "Delhi, Delhi" }),
                })
                .await
                .unwrap();
            to_adapter.send(VoiceIncoming::Closed {}).await.unwrap();
        };
        let (result, ()) =
            tokio::join!(run_voice_session(&mut session, channel, &search, mic_rx), feed);

        // The lookup failing never aborts the session.
        assert!(result.unwrap().is_none());

        assert!(matches!(from_adapter.recv().await, Some(VoiceOutgoing::Setup { .. })));
        let Some(VoiceOutgoing::ToolResponse { response, .. }) = from_adapter.recv().await else {
            panic!("expected tool response");
        };
        assert_eq!(response["error"], "Grounding failed");

        drop(mic_tx);
    }
}
