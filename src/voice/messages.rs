//! Bridge protocol between the voice adapter and its audio transport.
//!
//! The transport side owns the realtime link to the remote model (the
//! socket, audio capture and playback scheduling). The adapter sees it
//! only as a pair of channels speaking these messages, so the session
//! logic is testable without any audio or network machinery.

use serde::{Deserialize, Serialize};

/// Transport → adapter messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VoiceIncoming {
    /// The remote session accepted our setup and is live.
    SetupComplete {},
    /// One chunk of model speech: base64 16-bit PCM at 24 kHz.
    AudioChunk { data: String },
    /// Incremental transcript of what the user is saying.
    InputTranscript { text: String },
    /// Incremental transcript of what the model is saying.
    OutputTranscript { text: String },
    /// The user spoke over the model; queued playback must be flushed.
    Interrupted {},
    /// The model finished a full conversational turn.
    TurnComplete {},
    /// The model invoked one of the declared tools.
    ToolCall {
        id: String,
        name: String,
        args: serde_json::Value,
    },
    /// The remote side ended the session.
    Closed {},
}

/// Adapter → transport messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VoiceOutgoing {
    /// Open the remote session: which live model to dial, the persona,
    /// the tool declarations, and the PCM rates for both directions.
    Setup {
        model: String,
        system_instruction: String,
        tools: serde_json::Value,
        input_sample_rate: u32,
        output_sample_rate: u32,
    },
    /// One chunk of microphone audio: base64 16-bit PCM at 16 kHz.
    AudioIn { data: String },
    /// Reply to a [`VoiceIncoming::ToolCall`].
    ToolResponse {
        id: String,
        name: String,
        response: serde_json::Value,
    },
    /// Close the session from our side.
    End {},
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
