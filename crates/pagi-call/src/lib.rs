//! # PAGI Call - Telephony to Realtime Speech Bridge
//!
//! Bridges a caller's PCM audio stream to a realtime speech-generation leg and
//! back. Handles barge-in (caller talking over synthesized speech cancels the
//! response), outbound gain, idle nudges, and a time-boxed call lifecycle.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         Call Bridge                            │
//! │  ┌──────────────┐   peak / barge-in   ┌──────────────────┐    │
//! │  │  Telephony   │ ──────────────────→ │   Speech Leg     │    │
//! │  │  (caller)    │ ←────────────────── │  (realtime API)  │    │
//! │  └──────────────┘   gain / re-arm     └──────────────────┘    │
//! │         ↑                                       ↑              │
//! │  ┌──────────────┐                    ┌──────────────────┐     │
//! │  │ Idle Watcher │                    │ Lifecycle Timer  │     │
//! │  │ (7s silence) │                    │ (240s / 300s)    │     │
//! │  └──────────────┘                    └──────────────────┘     │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! All four activities share one [`CallSession`]. Whichever one finishes first
//! tears the call down, which closes both legs and signals the rest to stop.

pub mod audio;
pub mod config;
pub mod error;
pub mod event;
pub mod idle;
pub mod inbound;
pub mod leg;
pub mod lifecycle;
pub mod orchestrator;
pub mod outbound;
pub mod session;

pub use audio::{apply_gain, peak_amplitude, DEFAULT_GAIN};
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use event::{ControlMessage, ErrorDetail, ResponseInfo, ResponseOptions, SpeechEvent};
pub use leg::{
    SpeechConnector, SpeechLeg, SpeechSink, SpeechSource, TelephonyFrame, TelephonyLeg,
    TelephonySink, TelephonySource,
};
pub use orchestrator::CallBridge;
pub use session::{CallSession, CallSummary, SessionState};
