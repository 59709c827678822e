//! The two duplex connections a call is bridged between.
//!
//! Each leg is split into a receive half, owned by exactly one relay, and a
//! send half shared by every activity of the call. Transport adapters (axum
//! sockets, tungstenite clients, test doubles) implement these traits.

use crate::error::BridgeResult;
use crate::event::{ControlMessage, SpeechEvent};
use async_trait::async_trait;
use std::sync::Arc;

/// A unit received from the telephony connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelephonyFrame {
    /// Raw 16-bit PCM from the caller.
    Audio(Vec<u8>),
    /// Non-audio text frame (connection metadata, DTMF...). Not relayed.
    Control(String),
}

#[async_trait]
pub trait TelephonySource: Send {
    /// Next frame, or `None` once the caller has disconnected.
    async fn recv(&mut self) -> Option<TelephonyFrame>;
}

#[async_trait]
pub trait TelephonySink: Send + Sync {
    async fn send_audio(&self, pcm: Vec<u8>) -> BridgeResult<()>;
    async fn close(&self) -> BridgeResult<()>;
}

#[async_trait]
pub trait SpeechSource: Send {
    /// Next event.
    ///
    /// `None` means the stream ended. `Err(BridgeError::Decode)` is a single
    /// malformed message and the caller may keep reading; any other error is
    /// unrecoverable.
    async fn recv(&mut self) -> Option<BridgeResult<SpeechEvent>>;
}

#[async_trait]
pub trait SpeechSink: Send + Sync {
    async fn send(&self, message: ControlMessage) -> BridgeResult<()>;
    async fn close(&self) -> BridgeResult<()>;
}

/// An accepted telephony connection.
pub struct TelephonyLeg {
    pub source: Box<dyn TelephonySource>,
    pub sink: Arc<dyn TelephonySink>,
}

/// An established speech connection, already configured for the call.
pub struct SpeechLeg {
    pub source: Box<dyn SpeechSource>,
    pub sink: Arc<dyn SpeechSink>,
}

/// Opens the speech leg for a new call.
#[async_trait]
pub trait SpeechConnector: Send + Sync {
    async fn connect(&self) -> BridgeResult<SpeechLeg>;
}
