//! Error types for lograte.

use std::io;
use thiserror::Error;

/// Main error type for lograte operations.
///
/// Every session ends with either a full result or exactly one of these.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The device answered, but not the way a supported appliance would
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Rejected before any connection was attempted
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Short failure tag for callers that aggregate outcomes across hosts.
    ///
    /// Protocol failures map to `"device"` or `"empty"`; everything else
    /// maps to its layer name.
    pub fn reason(&self) -> &'static str {
        match self {
            Error::Transport(_) => "transport",
            Error::Protocol(e) => e.reason(),
            Error::Config(_) => "config",
        }
    }

    /// Whether this failure means the host is not a supported appliance.
    pub fn is_unsupported_device(&self) -> bool {
        matches!(self, Error::Protocol(ProtocolError::UnsupportedDevice))
    }
}

/// Transport layer errors (SSH connection, authentication, channel).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Host is not in known_hosts and strict checking is on
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Failed to open the PTY shell channel
    #[error("Failed to open shell channel: {0}")]
    ShellRequestFailed(String),

    /// Connection was closed before the session finished
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Protocol errors raised from the device's textual responses.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// The device rejected the diagnostic command set.
    #[error("device does not support the diagnostic commands")]
    UnsupportedDevice,

    /// The device list response carried no entries.
    #[error("device reported no connected devices")]
    NoDevices,
}

impl ProtocolError {
    /// Failure tag: `"device"` or `"empty"`.
    pub fn reason(&self) -> &'static str {
        match self {
            ProtocolError::UnsupportedDevice => "device",
            ProtocolError::NoDevices => "empty",
        }
    }
}

/// Invalid parameters supplied by the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required field was missing or empty
    #[error("{field} is required")]
    Missing { field: &'static str },

    /// A numeric field was out of range
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    /// The host list contained an entry that is not an address
    #[error("Invalid host list entry '{entry}'")]
    InvalidHostList { entry: String },

    /// A platform pattern failed to compile
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

impl From<regex::Error> for ConfigError {
    fn from(e: regex::Error) -> Self {
        ConfigError::InvalidPattern(e.to_string())
    }
}

/// Result type alias using lograte's Error.
pub type Result<T> = std::result::Result<T, Error>;
