//! Inbound commands to the agent.
//!
//! Two sources: the operator console ([`LocalCommand`], one character per
//! line) and the cloud (`ControlRelay` direct method carrying a
//! [`RelayCommand`] payload, answered with a [`MethodResponse`]).

use serde::Deserialize;

use crate::error::DecodeError;

/// Remote method name routed to the relay handler.
pub const CONTROL_RELAY_METHOD: &str = "ControlRelay";

/// Operator console commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalCommand {
    /// Run the shutdown sequence and leave the console loop.
    Exit,
    /// Flip the actuator.
    ToggleActuator,
    /// Start the publisher, or stop it if it is running.
    ToggleTransmit,
    /// Prompt for a new transmit interval.
    ChangeInterval,
    /// Print actuator state and a fresh reading.
    Status,
    /// Anything else (carries the trimmed input).
    Unknown(String),
}

impl LocalCommand {
    /// Parse one console line.  Case-insensitive; surrounding whitespace
    /// is ignored.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "x" => Self::Exit,
            "h" => Self::ToggleActuator,
            "t" => Self::ToggleTransmit,
            "i" => Self::ChangeInterval,
            "s" => Self::Status,
            _ => Self::Unknown(trimmed.to_string()),
        }
    }
}

/// `ControlRelay` payload: `{"onoff": true}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RelayCommand {
    pub onoff: bool,
}

impl RelayCommand {
    /// Strict decode: the body must be a JSON object whose `onoff` is a bool.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// Result of a remote method invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodResponse {
    pub status: u16,
    pub message: String,
}

impl MethodResponse {
    pub const OK: u16 = 200;
    pub const BAD_REQUEST: u16 = 400;

    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: Self::OK,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: Self::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Response body as a JSON document, e.g. `{"message":"HVAC Remote On"}`.
    pub fn body(&self) -> Vec<u8> {
        serde_json::json!({ "message": self.message })
            .to_string()
            .into_bytes()
    }
}
