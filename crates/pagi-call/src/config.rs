//! Per-call tuning knobs.

use crate::audio::DEFAULT_GAIN;
use crate::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one bridged call.
///
/// Thresholds are peak amplitudes on the 16-bit scale. Time values are plain
/// integers so the struct can be filled from TOML files and environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Peak above which caller audio cancels an active response (default: 1200)
    pub barge_in_threshold: u16,

    /// Peak above which caller audio counts as activity for the idle watcher (default: 500)
    pub speech_threshold: u16,

    /// Multiplier applied to synthesized audio before it reaches the caller (default: 1.3)
    pub gain: f32,

    /// Caller silence before an idle nudge (default: 7000ms)
    pub silence_threshold_ms: u64,

    /// Idle watcher polling interval (default: 1000ms)
    pub idle_poll_ms: u64,

    /// Offset from call start of the closing announcement (default: 240s)
    pub warning_offset_secs: u64,

    /// Offset from call start of the forced hangup (default: 300s)
    pub hard_close_offset_secs: u64,

    /// Instruction sent when the caller has gone quiet
    pub idle_prompt: String,

    /// Instruction sent at the warning offset
    pub closing_prompt: String,

    /// Modalities requested with every `response.create`; empty sends none
    pub response_modalities: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            barge_in_threshold: 1200,
            speech_threshold: 500,
            gain: DEFAULT_GAIN,
            silence_threshold_ms: 7_000,
            idle_poll_ms: 1_000,
            warning_offset_secs: 240,
            hard_close_offset_secs: 300,
            idle_prompt: "The caller has been quiet for a while. Ask them one short, friendly \
                          question about what you were just talking about to keep the \
                          conversation going."
                .to_string(),
            closing_prompt: "The call has to end in about one minute. Tell the caller warmly, \
                             in the language you are already speaking with them, that you need \
                             to say goodbye soon, and start wrapping up."
                .to_string(),
            response_modalities: vec!["audio".to_string(), "text".to_string()],
        }
    }
}

impl BridgeConfig {
    pub fn silence_threshold(&self) -> Duration {
        Duration::from_millis(self.silence_threshold_ms)
    }

    pub fn idle_poll_interval(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn warning_offset(&self) -> Duration {
        Duration::from_secs(self.warning_offset_secs)
    }

    pub fn hard_close_offset(&self) -> Duration {
        Duration::from_secs(self.hard_close_offset_secs)
    }

    /// Reject combinations the lifecycle cannot honour.
    pub fn validate(&self) -> BridgeResult<()> {
        if !self.gain.is_finite() || self.gain <= 0.0 {
            return Err(BridgeError::Config(format!(
                "gain must be a positive number, got {}",
                self.gain
            )));
        }
        if self.idle_poll_ms == 0 {
            return Err(BridgeError::Config(
                "idle_poll_ms must be greater than zero".to_string(),
            ));
        }
        if self.hard_close_offset_secs <= self.warning_offset_secs {
            return Err(BridgeError::Config(format!(
                "hard close offset ({}s) must come after the warning offset ({}s)",
                self.hard_close_offset_secs, self.warning_offset_secs
            )));
        }
        Ok(())
    }
}
