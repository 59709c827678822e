//! Inbound relay: caller audio → speech leg, with barge-in.
//!
//! Every audio frame is measured before it is forwarded, so a cancel triggered
//! by a frame always goes out ahead of that frame's `input_audio_buffer.append`.

use crate::audio::peak_amplitude;
use crate::error::BridgeResult;
use crate::event::ControlMessage;
use crate::leg::{TelephonyFrame, TelephonySource};
use crate::session::CallSession;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// Run until the caller disconnects, the call is torn down, or forwarding fails.
pub async fn run_inbound(session: Arc<CallSession>, mut source: Box<dyn TelephonySource>) {
    loop {
        let frame = tokio::select! {
            biased;
            _ = session.shutdown_signal() => break,
            frame = source.recv() => frame,
        };

        let pcm = match frame {
            None => {
                info!(call_id = %session.id(), "📴 Caller disconnected");
                break;
            }
            Some(TelephonyFrame::Control(text)) => {
                debug!(call_id = %session.id(), "Ignoring telephony control frame: {}", text);
                continue;
            }
            Some(TelephonyFrame::Audio(pcm)) if pcm.is_empty() => continue,
            Some(TelephonyFrame::Audio(pcm)) => pcm,
        };

        if let Err(e) = relay_frame(&session, pcm).await {
            warn!(call_id = %session.id(), "Inbound relay stopping: {}", e);
            break;
        }
    }

    session.state().request_hangup();
    session.teardown().await;
}

async fn relay_frame(session: &CallSession, pcm: Vec<u8>) -> BridgeResult<()> {
    let peak = match peak_amplitude(&pcm) {
        Ok(peak) => peak,
        Err(e) => {
            warn!(call_id = %session.id(), "Skipping caller frame: {}", e);
            return Ok(());
        }
    };
    trace!(call_id = %session.id(), peak, bytes = pcm.len(), "caller frame");

    let config = session.config();
    let state = session.state();

    if peak > config.speech_threshold {
        state.note_caller_activity(Instant::now());
    }

    if peak > config.barge_in_threshold && state.response_active() && state.try_claim_cancel() {
        info!(call_id = %session.id(), peak, "⚡ Barge-in: caller spoke over the response, cancelling");
        match session.send_speech(ControlMessage::CancelResponse).await {
            Ok(()) => session.count_barge_in(),
            Err(e) => {
                warn!(call_id = %session.id(), "Failed to send response.cancel: {}", e);
                state.release_cancel();
            }
        }
    }

    session.send_speech(ControlMessage::append_audio(&pcm)).await?;
    session.count_frame_in();
    Ok(())
}
