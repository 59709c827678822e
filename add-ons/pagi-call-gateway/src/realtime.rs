//! Realtime speech leg over a tungstenite client connection.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use pagi_call::{
    BridgeError, BridgeResult, ControlMessage, SpeechConnector, SpeechEvent, SpeechLeg,
    SpeechSink, SpeechSource,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

type RealtimeStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Sample rate of `pcm16` audio on the realtime leg (mono, 16-bit LE).
pub const PCM16_SAMPLE_RATE: u32 = 24_000;

/// Opens one realtime session per call.
#[derive(Clone)]
pub struct RealtimeConnector {
    url: String,
    api_key: Option<String>,
    voice: String,
    instructions: Option<String>,
}

impl RealtimeConnector {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        voice: impl Into<String>,
        instructions: Option<String>,
    ) -> Self {
        Self {
            url: url.into(),
            api_key,
            voice: voice.into(),
            instructions,
        }
    }

    /// The one configuration message sent right after the handshake.
    pub fn session_update(&self) -> Value {
        let mut session = json!({
            "input_audio_format": "pcm16",
            "output_audio_format": "pcm16",
            "voice": self.voice,
            "turn_detection": { "type": "server_vad" },
        });
        if let Some(instructions) = &self.instructions {
            session["instructions"] = Value::String(instructions.clone());
        }
        json!({ "type": "session.update", "session": session })
    }
}

#[async_trait]
impl SpeechConnector for RealtimeConnector {
    async fn connect(&self) -> BridgeResult<SpeechLeg> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| BridgeError::SpeechLegConnect("OPENAI_API_KEY missing".to_string()))?;

        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| BridgeError::SpeechLegConnect(e.to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| BridgeError::SpeechLegConnect(e.to_string()))?;
        request.headers_mut().insert("Authorization", bearer);
        request
            .headers_mut()
            .insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

        let (mut stream, _) = connect_async(request)
            .await
            .map_err(|e| BridgeError::SpeechLegConnect(e.to_string()))?;

        stream
            .send(Message::Text(self.session_update().to_string().into()))
            .await
            .map_err(|e| BridgeError::SpeechLegConnect(e.to_string()))?;
        info!(voice = %self.voice, "🔗 Realtime session opened");

        let (sink, stream) = stream.split();
        Ok(SpeechLeg {
            source: Box::new(RealtimeSource { stream }),
            sink: Arc::new(RealtimeSink {
                sink: Mutex::new(sink),
            }),
        })
    }
}

pub struct RealtimeSource {
    stream: SplitStream<RealtimeStream>,
}

#[async_trait]
impl SpeechSource for RealtimeSource {
    async fn recv(&mut self) -> Option<BridgeResult<SpeechEvent>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(SpeechEvent::from_json(text.as_str())),
                Ok(Message::Close(frame)) => {
                    debug!("Realtime session closed: {:?}", frame);
                    return None;
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(BridgeError::Receive(e.to_string()))),
            }
        }
    }
}

pub struct RealtimeSink {
    sink: Mutex<SplitSink<RealtimeStream, Message>>,
}

#[async_trait]
impl SpeechSink for RealtimeSink {
    async fn send(&self, message: ControlMessage) -> BridgeResult<()> {
        let text = message.to_json()?;
        self.sink
            .lock()
            .await
            .send(Message::Text(text.into()))
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
