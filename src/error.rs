use crate::types::ZoneId;
use thiserror::Error;

/// Result type for matrix amp operations
pub type Result<T> = std::result::Result<T, AmpError>;

/// Errors that can occur when driving a matrix amplifier
#[derive(Error, Debug)]
pub enum AmpError {
    /// Zone, input or volume outside the configured range. Nothing was sent.
    #[error("Invalid {what} {value}: {reason}")]
    InvalidOperand {
        /// Which operand was rejected ("output", "input", "volume", "source")
        what: &'static str,
        /// The rejected value, rendered for display
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// Zone is not part of the configured amplifier
    #[error("Unknown zone: {0}")]
    UnknownZone(ZoneId),

    /// Datagram could not be handed to the local network stack
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Local send did not complete within the configured deadline
    #[error("Send timed out after {0} ms")]
    SendTimeout(u64),

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A captured payload could not be parsed as a command
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Subscription receiver fell behind
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// The mirror publishing updates was dropped
    #[error("Channel closed")]
    ChannelClosed,
}

impl AmpError {
    pub(crate) fn invalid(what: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        AmpError::InvalidOperand {
            what,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// True for failures raised by the transport (socket errors and send timeouts)
    pub fn is_transport(&self) -> bool {
        matches!(self, AmpError::Transport(_) | AmpError::SendTimeout(_))
    }

    /// True when an operand was rejected before anything was encoded
    pub fn is_invalid_operand(&self) -> bool {
        matches!(self, AmpError::InvalidOperand { .. })
    }
}
