//! Error types for the call bridge

use thiserror::Error;

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors that can occur while bridging a call
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Invalid audio frame: {0} bytes is not a whole number of 16-bit samples")]
    InvalidFrame(usize),

    #[error("Speech leg connection failed: {0}")]
    SpeechLegConnect(String),

    #[error("Send error: {0}")]
    Send(String),

    #[error("Receive error: {0}")]
    Receive(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Call legs already closed")]
    Closed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Decode(err.to_string())
    }
}

impl From<base64::DecodeError> for BridgeError {
    fn from(err: base64::DecodeError) -> Self {
        BridgeError::Decode(err.to_string())
    }
}
