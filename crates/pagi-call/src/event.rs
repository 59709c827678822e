//! Speech leg wire types.
//!
//! Inbound events are parsed into the closed [`SpeechEvent`] enum; anything the
//! bridge does not act on lands in [`SpeechEvent::Other`]. Outbound control
//! messages are the four kinds in [`ControlMessage`].

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::BridgeResult;

/// Response metadata attached to lifecycle events, logged with each transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResponseInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Error payload of an `error` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorDetail {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Events received from the speech leg.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum SpeechEvent {
    #[serde(rename = "response.started", alias = "response.created")]
    ResponseStarted {
        #[serde(default)]
        response: Option<ResponseInfo>,
    },

    #[serde(rename = "response.completed", alias = "response.done")]
    ResponseCompleted {
        #[serde(default)]
        response: Option<ResponseInfo>,
    },

    #[serde(rename = "response.canceled", alias = "response.cancelled")]
    ResponseCanceled {
        #[serde(default)]
        response: Option<ResponseInfo>,
    },

    #[serde(rename = "response.failed")]
    ResponseFailed {
        #[serde(default)]
        response: Option<ResponseInfo>,
    },

    /// Base64 encoded 16-bit PCM.
    #[serde(rename = "response.audio.delta", alias = "response.output_audio.delta")]
    AudioDelta { delta: String },

    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: Option<ErrorDetail>,
    },

    /// Session acks, transcripts, rate limits...
    #[serde(other)]
    Other,
}

impl SpeechEvent {
    /// Parse one JSON text message.
    pub fn from_json(text: &str) -> BridgeResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SpeechEvent::ResponseStarted { .. } => "response-started",
            SpeechEvent::ResponseCompleted { .. } => "response-completed",
            SpeechEvent::ResponseCanceled { .. } => "response-canceled",
            SpeechEvent::ResponseFailed { .. } => "response-failed",
            SpeechEvent::AudioDelta { .. } => "audio-delta",
            SpeechEvent::Error { .. } => "error",
            SpeechEvent::Other => "other",
        }
    }

    /// Response metadata of a lifecycle event, if the remote sent any.
    pub fn response(&self) -> Option<&ResponseInfo> {
        match self {
            SpeechEvent::ResponseStarted { response }
            | SpeechEvent::ResponseCompleted { response }
            | SpeechEvent::ResponseCanceled { response }
            | SpeechEvent::ResponseFailed { response } => response.as_ref(),
            _ => None,
        }
    }

    /// True for the three events that end a response turn.
    pub fn ends_response(&self) -> bool {
        matches!(
            self,
            SpeechEvent::ResponseCompleted { .. }
                | SpeechEvent::ResponseCanceled { .. }
                | SpeechEvent::ResponseFailed { .. }
        )
    }
}

/// Options carried by `response.create`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Control messages sent to the speech leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Caller audio, base64 encoded.
    #[serde(rename = "input_audio_buffer.append")]
    AppendAudio { audio: String },

    #[serde(rename = "response.cancel")]
    CancelResponse,

    #[serde(rename = "response.create")]
    CreateResponse {
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<ResponseOptions>,
    },

    #[serde(rename = "input_text")]
    InputText { text: String },
}

impl ControlMessage {
    pub fn append_audio(pcm: &[u8]) -> Self {
        ControlMessage::AppendAudio {
            audio: B64.encode(pcm),
        }
    }

    /// `response.create`, with modalities only when some are configured.
    pub fn create_response(modalities: &[String]) -> Self {
        let response = if modalities.is_empty() {
            None
        } else {
            Some(ResponseOptions {
                modalities: Some(modalities.to_vec()),
                instructions: None,
            })
        };
        ControlMessage::CreateResponse { response }
    }

    pub fn input_text(text: impl Into<String>) -> Self {
        ControlMessage::InputText { text: text.into() }
    }

    pub fn to_json(&self) -> BridgeResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Decode an `audio-delta` payload into raw PCM bytes.
pub fn decode_audio(delta: &str) -> BridgeResult<Vec<u8>> {
    Ok(B64.decode(delta)?)
}
