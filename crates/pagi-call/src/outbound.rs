//! Outbound relay: speech leg events → caller audio.
//!
//! Tracks the response lifecycle for barge-in and re-arms the next turn as soon
//! as a response ends, unless the call is hanging up.

use crate::audio::apply_gain;
use crate::error::{BridgeError, BridgeResult};
use crate::event::{decode_audio, SpeechEvent};
use crate::leg::SpeechSource;
use crate::session::CallSession;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Run until the speech stream ends, the call is torn down, or the caller can no longer be reached.
pub async fn run_outbound(session: Arc<CallSession>, mut source: Box<dyn SpeechSource>) {
    loop {
        let next = tokio::select! {
            biased;
            _ = session.shutdown_signal() => break,
            next = source.recv() => next,
        };

        let event = match next {
            None => {
                info!(call_id = %session.id(), "Speech leg stream ended");
                break;
            }
            Some(Ok(event)) => event,
            Some(Err(BridgeError::Decode(reason))) => {
                warn!(call_id = %session.id(), "Skipping malformed speech event: {}", reason);
                continue;
            }
            Some(Err(e)) => {
                warn!(call_id = %session.id(), "Speech leg receive failed: {}", e);
                break;
            }
        };

        if let Err(e) = handle_event(&session, event).await {
            warn!(call_id = %session.id(), "Outbound relay stopping: {}", e);
            break;
        }
    }

    session.state().request_hangup();
    session.teardown().await;
}

async fn handle_event(session: &CallSession, event: SpeechEvent) -> BridgeResult<()> {
    if event.ends_response() {
        let response = event.response();
        debug!(
            call_id = %session.id(),
            kind = event.kind(),
            response_id = ?response.and_then(|r| r.id.as_deref()),
            status = ?response.and_then(|r| r.status.as_deref()),
            "Response ended"
        );
        session.state().set_response_active(false);
        if session.may_initiate() {
            match session.request_turn().await {
                Ok(()) => session.count_rearm(),
                Err(e) => warn!(call_id = %session.id(), "Failed to re-arm next turn: {}", e),
            }
        }
        return Ok(());
    }

    match event {
        SpeechEvent::ResponseStarted { response } => {
            debug!(
                call_id = %session.id(),
                response_id = ?response.and_then(|r| r.id),
                "Response started"
            );
            session.state().set_response_active(true);
        }
        SpeechEvent::AudioDelta { delta } => {
            let boosted = match decode_audio(&delta)
                .and_then(|pcm| apply_gain(&pcm, session.config().gain))
            {
                Ok(boosted) => boosted,
                Err(e) => {
                    warn!(call_id = %session.id(), "Skipping audio delta: {}", e);
                    return Ok(());
                }
            };
            if !boosted.is_empty() {
                session.send_telephony(boosted).await?;
            }
        }
        SpeechEvent::Error { error } => {
            let detail = error.unwrap_or_default();
            warn!(
                call_id = %session.id(),
                kind = ?detail.kind,
                code = ?detail.code,
                "Speech leg error: {}",
                detail.message.as_deref().unwrap_or("<no message>")
            );
        }
        _ => {
            trace!(call_id = %session.id(), "Ignoring speech event");
        }
    }
    Ok(())
}
