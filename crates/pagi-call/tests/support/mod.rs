//! Channel-backed call legs that record everything the bridge sends.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use pagi_call::{
    BridgeConfig, BridgeError, BridgeResult, ControlMessage, SpeechConnector, SpeechEvent,
    SpeechLeg, SpeechSink, SpeechSource, TelephonyFrame, TelephonyLeg, TelephonySink,
    TelephonySource,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const IDLE_PROMPT: &str = "idle nudge";
pub const CLOSING_PROMPT: &str = "closing announcement";

pub fn test_config() -> BridgeConfig {
    BridgeConfig {
        barge_in_threshold: 1200,
        speech_threshold: 500,
        idle_prompt: IDLE_PROMPT.to_string(),
        closing_prompt: CLOSING_PROMPT.to_string(),
        ..Default::default()
    }
}

/// A frame of alternating-sign samples with the given magnitude.
pub fn pcm_frame(amplitude: i16, samples: usize) -> Vec<u8> {
    (0..samples)
        .map(|i| if i % 2 == 0 { amplitude } else { -amplitude })
        .flat_map(|s| s.to_le_bytes())
        .collect()
}

pub fn pcm_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|p| i16::from_le_bytes([p[0], p[1]]))
        .collect()
}

pub fn audio_delta(pcm: &[u8]) -> SpeechEvent {
    SpeechEvent::AudioDelta {
        delta: B64.encode(pcm),
    }
}

pub fn started() -> SpeechEvent {
    SpeechEvent::ResponseStarted { response: None }
}

pub fn completed() -> SpeechEvent {
    SpeechEvent::ResponseCompleted { response: None }
}

pub fn canceled() -> SpeechEvent {
    SpeechEvent::ResponseCanceled { response: None }
}

pub fn failed() -> SpeechEvent {
    SpeechEvent::ResponseFailed { response: None }
}

/// Let the bridge tasks drain whatever was just queued.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

pub struct ChannelTelephonySource {
    rx: mpsc::UnboundedReceiver<TelephonyFrame>,
}

#[async_trait]
impl TelephonySource for ChannelTelephonySource {
    async fn recv(&mut self) -> Option<TelephonyFrame> {
        self.rx.recv().await
    }
}

#[derive(Default)]
pub struct RecordingTelephonySink {
    sent: Mutex<Vec<Vec<u8>>>,
    closes: AtomicUsize,
    pub fail_close: AtomicBool,
}

impl RecordingTelephonySink {
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TelephonySink for RecordingTelephonySink {
    async fn send_audio(&self, pcm: Vec<u8>) -> BridgeResult<()> {
        self.sent.lock().unwrap().push(pcm);
        Ok(())
    }

    async fn close(&self) -> BridgeResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(BridgeError::Send("telephony close refused".to_string()));
        }
        Ok(())
    }
}

pub struct ChannelSpeechSource {
    rx: mpsc::UnboundedReceiver<BridgeResult<SpeechEvent>>,
}

#[async_trait]
impl SpeechSource for ChannelSpeechSource {
    async fn recv(&mut self) -> Option<BridgeResult<SpeechEvent>> {
        self.rx.recv().await
    }
}

type SendFilter = Box<dyn Fn(&ControlMessage) -> bool + Send>;

#[derive(Default)]
pub struct RecordingSpeechSink {
    sent: Mutex<Vec<ControlMessage>>,
    refused: AtomicUsize,
    fail_next: Mutex<Option<SendFilter>>,
    closes: AtomicUsize,
    pub fail_sends: AtomicBool,
    pub fail_close: AtomicBool,
}

impl RecordingSpeechSink {
    /// Refuse the next message matching `pred`, then go back to accepting everything.
    pub fn fail_next(&self, pred: impl Fn(&ControlMessage) -> bool + Send + 'static) {
        *self.fail_next.lock().unwrap() = Some(Box::new(pred));
    }

    /// Messages refused so far (never recorded in `sent`).
    pub fn refused(&self) -> usize {
        self.refused.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<ControlMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&ControlMessage) -> bool) -> usize {
        self.sent.lock().unwrap().iter().filter(|m| pred(m)).count()
    }

    pub fn cancels(&self) -> usize {
        self.count(|m| matches!(m, ControlMessage::CancelResponse))
    }

    pub fn creates(&self) -> usize {
        self.count(|m| matches!(m, ControlMessage::CreateResponse { .. }))
    }

    pub fn appended(&self) -> usize {
        self.count(|m| matches!(m, ControlMessage::AppendAudio { .. }))
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|m| match m {
                ControlMessage::InputText { text } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSink for RecordingSpeechSink {
    async fn send(&self, message: ControlMessage) -> BridgeResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            self.refused.fetch_add(1, Ordering::SeqCst);
            return Err(BridgeError::Send("speech leg refused".to_string()));
        }
        {
            let mut filter = self.fail_next.lock().unwrap();
            if filter.as_ref().is_some_and(|pred| pred(&message)) {
                *filter = None;
                self.refused.fetch_add(1, Ordering::SeqCst);
                return Err(BridgeError::Send("speech leg refused once".to_string()));
            }
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn close(&self) -> BridgeResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(BridgeError::Send("speech close refused".to_string()));
        }
        Ok(())
    }
}

/// The test's side of a bridged call.
pub struct Harness {
    pub caller: mpsc::UnboundedSender<TelephonyFrame>,
    pub remote: mpsc::UnboundedSender<BridgeResult<SpeechEvent>>,
    pub telephony_sink: Arc<RecordingTelephonySink>,
    pub speech_sink: Arc<RecordingSpeechSink>,
}

impl Harness {
    pub fn speak(&self, pcm: Vec<u8>) {
        self.caller.send(TelephonyFrame::Audio(pcm)).unwrap();
    }

    pub fn emit(&self, event: SpeechEvent) {
        self.remote.send(Ok(event)).unwrap();
    }
}

pub fn legs() -> (Harness, TelephonyLeg, SpeechLeg) {
    let (caller, caller_rx) = mpsc::unbounded_channel();
    let (remote, remote_rx) = mpsc::unbounded_channel();
    let telephony_sink = Arc::new(RecordingTelephonySink::default());
    let speech_sink = Arc::new(RecordingSpeechSink::default());

    let telephony = TelephonyLeg {
        source: Box::new(ChannelTelephonySource { rx: caller_rx }),
        sink: telephony_sink.clone(),
    };
    let speech = SpeechLeg {
        source: Box::new(ChannelSpeechSource { rx: remote_rx }),
        sink: speech_sink.clone(),
    };

    (
        Harness {
            caller,
            remote,
            telephony_sink,
            speech_sink,
        },
        telephony,
        speech,
    )
}

/// Connector that hands out a prepared speech leg once, or fails.
pub struct StubConnector {
    leg: Mutex<Option<SpeechLeg>>,
}

impl StubConnector {
    pub fn with(leg: SpeechLeg) -> Self {
        Self {
            leg: Mutex::new(Some(leg)),
        }
    }

    pub fn failing() -> Self {
        Self {
            leg: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SpeechConnector for StubConnector {
    async fn connect(&self) -> BridgeResult<SpeechLeg> {
        self.leg
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| BridgeError::SpeechLegConnect("upstream refused".to_string()))
    }
}
