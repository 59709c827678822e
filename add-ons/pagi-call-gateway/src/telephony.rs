//! Telephony leg over an accepted axum WebSocket.
//!
//! The provider streams raw PCM as binary frames and occasional JSON metadata
//! as text frames. Synthesized audio goes back as binary frames.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use pagi_call::{BridgeError, BridgeResult, TelephonyFrame, TelephonyLeg, TelephonySink, TelephonySource};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// What a single socket message means for the call.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Inbound {
    Frame(TelephonyFrame),
    Ignore,
    Hangup,
}

pub(crate) fn classify(message: Message) -> Inbound {
    match message {
        Message::Binary(pcm) => Inbound::Frame(TelephonyFrame::Audio(pcm)),
        Message::Text(text) => Inbound::Frame(TelephonyFrame::Control(text)),
        Message::Ping(_) | Message::Pong(_) => Inbound::Ignore,
        Message::Close(_) => Inbound::Hangup,
    }
}

pub struct SocketSource {
    stream: SplitStream<WebSocket>,
}

#[async_trait]
impl TelephonySource for SocketSource {
    async fn recv(&mut self) -> Option<TelephonyFrame> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => {
                    warn!("Telephony socket receive error: {}", e);
                    return None;
                }
            };
            match classify(message) {
                Inbound::Frame(frame) => return Some(frame),
                Inbound::Ignore => continue,
                Inbound::Hangup => {
                    debug!("Telephony socket closed by provider");
                    return None;
                }
            }
        }
    }
}

pub struct SocketSink {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

#[async_trait]
impl TelephonySink for SocketSink {
    async fn send_audio(&self, pcm: Vec<u8>) -> BridgeResult<()> {
        self.sink
            .lock()
            .await
            .send(Message::Binary(pcm))
            .await
            .map_err(|e| BridgeError::Send(e.to_string()))
    }

    async fn close(&self) -> BridgeResult<()> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| BridgeError::Send(e.to_string()))
    }
}

/// Split an upgraded socket into the two halves of a telephony leg.
pub fn telephony_leg(socket: WebSocket) -> TelephonyLeg {
    let (sink, stream) = socket.split();
    TelephonyLeg {
        source: Box::new(SocketSource { stream }),
        sink: Arc::new(SocketSink {
            sink: Mutex::new(sink),
        }),
    }
}
