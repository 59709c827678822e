//! Per-call shared state and the idempotent teardown.
//!
//! One [`CallSession`] is created per call and handed to the four activities as
//! an `Arc`. Every flag only ever moves `false -> true` except
//! `response_active`, which the outbound relay toggles, and the caller
//! activity clock, which only advances.

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::event::ControlMessage;
use crate::leg::{SpeechSink, TelephonySink};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, info, warn};

/// Upper bound on a single leg close during teardown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Flags and timestamps shared by the activities of one call.
#[derive(Debug)]
pub struct SessionState {
    response_active: AtomicBool,
    closing_phase: AtomicBool,
    hangup_requested: AtomicBool,
    connections_closed: AtomicBool,
    cancel_sent: AtomicBool,
    /// Milliseconds since `call_start` of the last caller speech.
    last_caller_activity_ms: AtomicU64,
    call_start: Instant,
}

impl SessionState {
    pub fn new(call_start: Instant) -> Self {
        Self {
            response_active: AtomicBool::new(false),
            closing_phase: AtomicBool::new(false),
            hangup_requested: AtomicBool::new(false),
            connections_closed: AtomicBool::new(false),
            cancel_sent: AtomicBool::new(false),
            last_caller_activity_ms: AtomicU64::new(0),
            call_start,
        }
    }

    pub fn call_start(&self) -> Instant {
        self.call_start
    }

    pub fn response_active(&self) -> bool {
        self.response_active.load(Ordering::SeqCst)
    }

    /// Any lifecycle event starts a fresh response, so the barge-in latch is cleared too.
    pub fn set_response_active(&self, active: bool) {
        self.response_active.store(active, Ordering::SeqCst);
        self.cancel_sent.store(false, Ordering::SeqCst);
    }

    /// Claim the single barge-in cancel for the current response.
    pub fn try_claim_cancel(&self) -> bool {
        self.cancel_sent
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Give the cancel back after a failed send so a later loud frame can retry.
    pub fn release_cancel(&self) {
        self.cancel_sent.store(false, Ordering::SeqCst);
    }

    pub fn closing_phase(&self) -> bool {
        self.closing_phase.load(Ordering::SeqCst)
    }

    /// Returns true for the call that entered the closing phase.
    pub fn enter_closing_phase(&self) -> bool {
        !self.closing_phase.swap(true, Ordering::SeqCst)
    }

    pub fn hangup_requested(&self) -> bool {
        self.hangup_requested.load(Ordering::SeqCst)
    }

    pub fn request_hangup(&self) {
        self.hangup_requested.store(true, Ordering::SeqCst);
    }

    pub fn connections_closed(&self) -> bool {
        self.connections_closed.load(Ordering::SeqCst)
    }

    /// Check-and-set for teardown. Only the first caller gets `true`.
    fn try_mark_closed(&self) -> bool {
        self.connections_closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Record caller activity at `now`. Never moves the clock backwards.
    pub fn note_caller_activity(&self, now: Instant) {
        let ms = now.saturating_duration_since(self.call_start).as_millis() as u64;
        self.last_caller_activity_ms.fetch_max(ms, Ordering::SeqCst);
    }

    /// Time since the caller was last heard (or since the call started).
    pub fn silence_at(&self, now: Instant) -> Duration {
        let last = self.call_start
            + Duration::from_millis(self.last_caller_activity_ms.load(Ordering::SeqCst));
        now.saturating_duration_since(last)
    }
}

#[derive(Debug, Default)]
struct CallStats {
    frames_in: AtomicU64,
    frames_out: AtomicU64,
    barge_ins: AtomicU64,
    idle_nudges: AtomicU64,
    turns_rearmed: AtomicU64,
}

/// End-of-call report returned by the orchestrator.
#[derive(Debug, Clone)]
pub struct CallSummary {
    pub call_id: String,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub frames_in: u64,
    pub frames_out: u64,
    pub barge_ins: u64,
    pub idle_nudges: u64,
    pub turns_rearmed: u64,
    pub reached_closing_phase: bool,
}

/// Handle shared by the activities of one call.
pub struct CallSession {
    id: String,
    config: BridgeConfig,
    state: SessionState,
    speech: Arc<dyn SpeechSink>,
    telephony: Arc<dyn TelephonySink>,
    shutdown: CancellationToken,
    started_at: DateTime<Utc>,
    stats: CallStats,
}

impl CallSession {
    pub fn new(
        id: impl Into<String>,
        config: BridgeConfig,
        speech: Arc<dyn SpeechSink>,
        telephony: Arc<dyn TelephonySink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            config,
            state: SessionState::new(Instant::now()),
            speech,
            telephony,
            shutdown: CancellationToken::new(),
            started_at: Utc::now(),
            stats: CallStats::default(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Resolves once teardown has closed both legs.
    pub fn shutdown_signal(&self) -> WaitForCancellationFuture<'_> {
        self.shutdown.cancelled()
    }

    /// Whether activities may still start a new response turn.
    pub fn may_initiate(&self) -> bool {
        !self.state.hangup_requested() && !self.state.connections_closed()
    }

    pub async fn send_speech(&self, message: ControlMessage) -> BridgeResult<()> {
        if self.state.connections_closed() {
            return Err(BridgeError::Closed);
        }
        self.speech.send(message).await
    }

    pub async fn send_telephony(&self, pcm: Vec<u8>) -> BridgeResult<()> {
        if self.state.connections_closed() {
            return Err(BridgeError::Closed);
        }
        self.telephony.send_audio(pcm).await?;
        self.stats.frames_out.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Ask the speech leg for the next response turn.
    pub async fn request_turn(&self) -> BridgeResult<()> {
        self.send_speech(ControlMessage::create_response(&self.config.response_modalities))
            .await
    }

    /// Give the speech leg an instruction, then ask it to respond.
    pub async fn prompt_turn(&self, instruction: &str) -> BridgeResult<()> {
        self.send_speech(ControlMessage::input_text(instruction)).await?;
        self.request_turn().await
    }

    /// Close both legs exactly once. Returns true for the caller that did the work.
    pub async fn teardown(&self) -> bool {
        if !self.state.try_mark_closed() {
            debug!(call_id = %self.id, "teardown already done");
            return false;
        }
        info!(call_id = %self.id, "🔌 Closing call legs");

        match tokio::time::timeout(CLOSE_TIMEOUT, self.speech.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(call_id = %self.id, "Speech leg close failed: {}", e),
            Err(_) => warn!(call_id = %self.id, "Speech leg close timed out"),
        }
        match tokio::time::timeout(CLOSE_TIMEOUT, self.telephony.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(call_id = %self.id, "Telephony leg close failed: {}", e),
            Err(_) => warn!(call_id = %self.id, "Telephony leg close timed out"),
        }

        self.shutdown.cancel();
        true
    }

    pub(crate) fn count_frame_in(&self) {
        self.stats.frames_in.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_barge_in(&self) {
        self.stats.barge_ins.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_idle_nudge(&self) {
        self.stats.idle_nudges.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_rearm(&self) {
        self.stats.turns_rearmed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> CallSummary {
        CallSummary {
            call_id: self.id.clone(),
            started_at: self.started_at,
            duration: Instant::now().saturating_duration_since(self.state.call_start()),
            frames_in: self.stats.frames_in.load(Ordering::Relaxed),
            frames_out: self.stats.frames_out.load(Ordering::Relaxed),
            barge_ins: self.stats.barge_ins.load(Ordering::Relaxed),
            idle_nudges: self.stats.idle_nudges.load(Ordering::Relaxed),
            turns_rearmed: self.stats.turns_rearmed.load(Ordering::Relaxed),
            reached_closing_phase: self.state.closing_phase(),
        }
    }
}
