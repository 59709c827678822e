//! Call Bridge - the per-call coordination layer
//!
//! Connects the speech leg, builds the shared [`CallSession`] and runs the four
//! activities side by side until every one of them has returned.

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::idle::run_idle_watcher;
use crate::inbound::run_inbound;
use crate::leg::{SpeechConnector, SpeechLeg, TelephonyLeg};
use crate::lifecycle::run_lifecycle_timer;
use crate::outbound::run_outbound;
use crate::session::{CallSession, CallSummary};
use tracing::{error, info, info_span, warn, Instrument};

/// Bridges calls using one shared configuration.
///
/// Cheap to share between connections; each call gets its own session.
#[derive(Debug, Clone)]
pub struct CallBridge {
    config: BridgeConfig,
}

impl CallBridge {
    /// Create a bridge, rejecting invalid configuration up front.
    pub fn new(config: BridgeConfig) -> BridgeResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Bridge one accepted telephony connection.
    ///
    /// If the speech leg cannot be established the telephony leg is closed and
    /// the error returned; there is no retry.
    pub async fn run(
        &self,
        call_id: impl Into<String>,
        telephony: TelephonyLeg,
        connector: &dyn SpeechConnector,
    ) -> BridgeResult<CallSummary> {
        let call_id = call_id.into();
        let speech = match connector
            .connect()
            .instrument(info_span!("call", call_id = %call_id))
            .await
        {
            Ok(speech) => speech,
            Err(e) => {
                error!(call_id = %call_id, "Speech leg unavailable, dropping call: {}", e);
                if let Err(close_err) = telephony.sink.close().await {
                    warn!(call_id = %call_id, "Telephony leg close failed: {}", close_err);
                }
                return Err(match e {
                    BridgeError::SpeechLegConnect(reason) => BridgeError::SpeechLegConnect(reason),
                    other => BridgeError::SpeechLegConnect(other.to_string()),
                });
            }
        };

        Ok(self.run_connected(call_id, telephony, speech).await)
    }

    /// Bridge two already established legs.
    pub async fn run_connected(
        &self,
        call_id: impl Into<String>,
        telephony: TelephonyLeg,
        speech: SpeechLeg,
    ) -> CallSummary {
        let session = CallSession::new(call_id, self.config.clone(), speech.sink, telephony.sink);
        let span = info_span!("call", call_id = %session.id());

        async move {
            info!(
                "📞 Call bridged (barge-in > {}, gain {}, closing at {}s, hangup at {}s)",
                self.config.barge_in_threshold,
                self.config.gain,
                self.config.warning_offset_secs,
                self.config.hard_close_offset_secs
            );

            tokio::join!(
                run_inbound(session.clone(), telephony.source),
                run_outbound(session.clone(), speech.source),
                run_idle_watcher(session.clone()),
                run_lifecycle_timer(session.clone()),
            );

            let summary = session.summary();
            info!(
                duration_secs = summary.duration.as_secs(),
                frames_in = summary.frames_in,
                frames_out = summary.frames_out,
                barge_ins = summary.barge_ins,
                idle_nudges = summary.idle_nudges,
                "✅ Call ended"
            );
            summary
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_rejects_invalid_config() {
        let config = BridgeConfig {
            warning_offset_secs: 10,
            hard_close_offset_secs: 10,
            ..Default::default()
        };
        assert!(matches!(CallBridge::new(config), Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_bridge_keeps_config() {
        let bridge = CallBridge::new(BridgeConfig::default()).unwrap();
        assert_eq!(bridge.config().gain, BridgeConfig::default().gain);
    }
}
