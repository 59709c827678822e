//! Idle watcher: nudges the conversation when the caller goes quiet.

use crate::session::CallSession;
use std::sync::Arc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Poll caller silence until the call starts hanging up.
///
/// Never nudges while a response is playing. After a nudge the silence clock
/// restarts, so a caller who stays quiet is nudged once per threshold, not once
/// per tick.
pub async fn run_idle_watcher(session: Arc<CallSession>) {
    let config = session.config();
    let mut ticker = tokio::time::interval(config.idle_poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = session.shutdown_signal() => break,
            _ = ticker.tick() => {}
        }

        let state = session.state();
        if state.connections_closed() || state.hangup_requested() {
            break;
        }
        if state.response_active() {
            continue;
        }

        let now = Instant::now();
        let silence = state.silence_at(now);
        if silence <= config.silence_threshold() {
            continue;
        }

        state.note_caller_activity(now);
        session.count_idle_nudge();
        info!(
            call_id = %session.id(),
            silence_ms = silence.as_millis() as u64,
            "🤫 Caller idle, prompting re-engagement"
        );
        if let Err(e) = session.prompt_turn(&config.idle_prompt).await {
            warn!(call_id = %session.id(), "Idle nudge failed: {}", e);
        }
    }
}
