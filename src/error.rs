//! Unified error types for the cadence gate.
//!
//! One `Error` enum that every subsystem converts into, so the monitor
//! loop and the binary can tell retryable conditions (frame, sensor, gate)
//! from fatal ones (configuration).  Leaf variants are `Copy` so they can
//! be passed through events without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A notification frame could not be decoded.
    Frame(FrameError),
    /// The sensor link failed.
    Sensor(SensorError),
    /// The gate service rejected or failed a call.
    Gate(GateError),
    /// Configuration is missing or invalid.
    Config(ConfigError),
}

impl Error {
    /// True for conditions that only matter at startup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(e) => write!(f, "frame: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Gate(e) => write!(f, "gate: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Frame errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Frame is empty or too short for the fields its flags announce.
    Malformed,
    /// Flags say the frame carries no crank revolution data.
    NoCrankData,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed measurement frame"),
            Self::NoCrankData => write!(f, "no crank revolution data"),
        }
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Liveness check reported the link down.
    LinkLost,
    /// Connection attempt failed.
    ConnectFailed,
    /// Connected, but notifications could not be enabled.
    SubscribeFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkLost => write!(f, "sensor link lost"),
            Self::ConnectFailed => write!(f, "sensor connect failed"),
            Self::SubscribeFailed => write!(f, "notification subscribe failed"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Gate errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    /// Service could not be reached.
    Unreachable,
    /// Call exceeded the configured timeout.
    Timeout,
    /// Login or API key rejected.
    Unauthorized,
    /// The rule id does not exist on the service.
    RuleNotFound,
    /// Service answered with a non-success status.
    Rejected(u16),
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable => write!(f, "gate service unreachable"),
            Self::Timeout => write!(f, "gate call timed out"),
            Self::Unauthorized => write!(f, "gate authentication rejected"),
            Self::RuleNotFound => write!(f, "rule not found"),
            Self::Rejected(status) => write!(f, "gate rejected request (status {status})"),
        }
    }
}

impl From<GateError> for Error {
    fn from(e: GateError) -> Self {
        Self::Gate(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Configuration problems.  Fatal at startup, before the loop begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No usable gate credential was supplied.
    MissingCredential(&'static str),
    /// An environment variable could not be parsed.
    InvalidValue(&'static str),
    /// A field failed range validation.
    ValidationFailed(&'static str),
    /// The config file could not be read.
    Unreadable,
    /// The config file is not valid JSON for [`MonitorConfig`](crate::config::MonitorConfig).
    Corrupted,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential(what) => write!(f, "missing credential: {what}"),
            Self::InvalidValue(key) => write!(f, "invalid value for {key}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Unreadable => write!(f, "config file unreadable"),
            Self::Corrupted => write!(f, "config file corrupted"),
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
// Startup errors
// ---------------------------------------------------------------------------

/// Failures that stop the monitor before the loop begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupError {
    /// Configuration missing or invalid.
    Config(ConfigError),
    /// The gate could not be queried while resolving the rule.
    Gate(GateError),
    /// No rule with this name exists on the gate.
    RuleNotFound(String),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Gate(e) => write!(f, "gate: {e}"),
            Self::RuleNotFound(name) => write!(f, "firewall rule '{name}' not found"),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<ConfigError> for StartupError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<GateError> for StartupError {
    fn from(e: GateError) -> Self {
        Self::Gate(e)
    }
}
