//! Gateway configuration: defaults, optional TOML file, then `CALL__*` environment.

use crate::realtime::PCM16_SAMPLE_RATE;
use pagi_call::BridgeConfig;
use serde::Deserialize;
use std::fmt;

/// Environment variable naming the config file (without extension).
pub const CONFIG_PATH_VAR: &str = "CALL_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/call-gateway";

/// Telephony audio format. Audio is relayed without resampling, so it has to
/// match the realtime leg's `pcm16` rate.
pub const DEFAULT_CONTENT_TYPE: &str = "audio/l16;rate=24000";

#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,

    /// Public URL of this gateway's `/ws` endpoint, handed to the telephony provider.
    pub ws_url: String,

    /// Realtime speech endpoint, model included in the query string.
    pub realtime_url: String,
    pub voice: String,
    #[serde(default)]
    pub instructions: Option<String>,

    /// Audio format announced for the telephony WebSocket.
    pub content_type: String,

    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Read from `OPENAI_API_KEY`; never from the config file.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("ws_url", &self.ws_url)
            .field("realtime_url", &self.realtime_url)
            .field("voice", &self.voice)
            .field("instructions", &self.instructions.as_ref().map(|_| "<set>"))
            .field("content_type", &self.content_type)
            .field("bridge", &self.bridge)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GatewayConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let builder = config::Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8000_i64)?
            .set_default("ws_url", "ws://localhost:8000/ws")?
            .set_default(
                "realtime_url",
                "wss://api.openai.com/v1/realtime?model=gpt-4o-realtime-preview",
            )?
            .set_default("voice", "alloy")?
            .set_default("content_type", DEFAULT_CONTENT_TYPE)?
            .add_source(config::File::with_name(&config_path).required(false))
            .add_source(
                config::Environment::with_prefix("CALL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        // Plain names used by the hosting platform take precedence.
        let builder = match std::env::var("WS_URL") {
            Ok(url) if !url.trim().is_empty() => builder.set_override("ws_url", url)?,
            _ => builder,
        };

        let mut loaded: Self = builder.build()?.try_deserialize()?;
        loaded.api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject a telephony format the speech leg would play at the wrong speed.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let expected = format!("rate={}", PCM16_SAMPLE_RATE);
        let matches = self
            .content_type
            .split(';')
            .any(|param| param.trim().eq_ignore_ascii_case(&expected));
        if !matches {
            return Err(config::ConfigError::Message(format!(
                "content_type {:?} must announce {} to match the realtime pcm16 format",
                self.content_type, expected
            )));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GatewayConfig {
        GatewayConfig {
            host: "127.0.0.1".to_string(),
            port: 9000,
            ws_url: "wss://calls.example.net/ws".to_string(),
            realtime_url: "wss://speech.example.net/v1/realtime".to_string(),
            voice: "alloy".to_string(),
            instructions: None,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            bridge: BridgeConfig::default(),
            api_key: Some("sk-secret".to_string()),
        }
    }

    #[test]
    fn test_bind_addr() {
        assert_eq!(sample().bind_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn test_default_format_matches_realtime_leg() {
        assert!(sample().validate().is_ok());
        assert!(DEFAULT_CONTENT_TYPE.ends_with(&format!("rate={}", PCM16_SAMPLE_RATE)));
    }

    #[test]
    fn test_mismatched_sample_rate_is_rejected() {
        let narrowband = GatewayConfig {
            content_type: "audio/l16;rate=16000".to_string(),
            ..sample()
        };
        assert!(narrowband.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let printed = format!("{:?}", sample());
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_bridge_section_deserializes_partially() {
        let built = config::Config::builder()
            .set_default("host", "0.0.0.0")
            .unwrap()
            .set_default("port", 8000_i64)
            .unwrap()
            .set_default("ws_url", "ws://x/ws")
            .unwrap()
            .set_default("realtime_url", "wss://y")
            .unwrap()
            .set_default("voice", "alloy")
            .unwrap()
            .set_default("content_type", DEFAULT_CONTENT_TYPE)
            .unwrap()
            .set_override("bridge.barge_in_threshold", 1500_i64)
            .unwrap()
            .build()
            .unwrap();
        let loaded: GatewayConfig = built.try_deserialize().unwrap();
        assert_eq!(loaded.bridge.barge_in_threshold, 1500);
        assert_eq!(loaded.bridge.speech_threshold, 500);
        assert_eq!(loaded.api_key, None);
    }
}
