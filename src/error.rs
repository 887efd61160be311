//! Unified error types for the RTDMS agent.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! the startup path's error handling uniform.  Per-message failures
//! (bad remote payloads, bad interval input, failed publishes) have their
//! own small types and are reported, never escalated into a crash.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level agent error
// ---------------------------------------------------------------------------

/// Every fallible startup operation funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Configuration is missing or invalid.
    Config(ConfigError),
    /// The telemetry transport failed.
    Transport(TransportError),
    /// Peripheral initialisation failed.
    Init(String),
    /// A worker thread could not be spawned.
    Spawn(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Spawn(msg) => write!(f, "spawn: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Spawn(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from loading or validating `appsettings.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The settings file could not be read.
    Io(String),
    /// The settings file is not valid JSON or lacks required keys.
    Parse(String),
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Errors reported by a [`TelemetryTransport`](crate::app::ports::TelemetryTransport).
///
/// The agent logs these and moves on; retrying is the transport's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be established.
    ConnectFailed(String),
    /// An operation was attempted while disconnected.
    NotConnected,
    /// The broker refused or failed a publish.
    PublishFailed(String),
    /// A command handler could not be registered.
    RegistrationFailed(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed(msg) => write!(f, "connect failed: {msg}"),
            Self::NotConnected => write!(f, "not connected"),
            Self::PublishFailed(msg) => write!(f, "publish failed: {msg}"),
            Self::RegistrationFailed(msg) => write!(f, "handler registration failed: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Interval validation errors
// ---------------------------------------------------------------------------

/// Rejected transmit-interval input.  The prior interval is always kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalError {
    /// Input is not an integer.
    NotANumber(String),
    /// Input is an integer below 1 ms.
    NotPositive(i64),
    /// Input does not fit the interval type.
    TooLarge(i64),
    /// The operator input could not be read.
    Input(String),
}

impl fmt::Display for IntervalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotANumber(raw) => write!(f, "Unable to parse '{raw}'"),
            Self::NotPositive(_) => write!(f, "Polling rate must be at least 1ms"),
            Self::TooLarge(v) => write!(f, "Polling rate {v}ms is too large"),
            Self::Input(msg) => write!(f, "Unable to read polling rate: {msg}"),
        }
    }
}

impl std::error::Error for IntervalError {}

// ---------------------------------------------------------------------------
// Remote command decode errors
// ---------------------------------------------------------------------------

/// A remote method payload that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError(pub String);

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed command payload: {}", self.0)
    }
}

impl std::error::Error for DecodeError {}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        Self(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Agent-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
