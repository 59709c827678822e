//! Lifecycle timer: the closing announcement and the hard hangup.
//!
//! Both deadlines are measured from call start on the wall clock. Conversation
//! activity never pushes them back.

use crate::session::CallSession;
use std::sync::Arc;
use tokio::time::sleep_until;
use tracing::{info, warn};

pub async fn run_lifecycle_timer(session: Arc<CallSession>) {
    let config = session.config();
    let start = session.state().call_start();

    tokio::select! {
        biased;
        _ = session.shutdown_signal() => return,
        _ = sleep_until(start + config.warning_offset()) => {}
    }

    let state = session.state();
    if state.connections_closed() {
        return;
    }
    if state.enter_closing_phase() && session.may_initiate() {
        info!(
            call_id = %session.id(),
            remaining_secs = config.hard_close_offset_secs.saturating_sub(config.warning_offset_secs),
            "⏱️ Call entering closing phase"
        );
        if let Err(e) = session.prompt_turn(&config.closing_prompt).await {
            warn!(call_id = %session.id(), "Closing announcement failed: {}", e);
        }
    }

    tokio::select! {
        biased;
        _ = session.shutdown_signal() => return,
        _ = sleep_until(start + config.hard_close_offset()) => {}
    }

    if !session.state().connections_closed() {
        info!(call_id = %session.id(), "⏱️ Call time limit reached, hanging up");
        session.state().request_hangup();
        session.teardown().await;
    }
}
