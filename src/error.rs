//! Error types for Loopy.
//!
//! Only setup failures live here. A probe that times out or receives
//! garbage is an ordinary negative result (see [`crate::types::ProbeOutcome`]),
//! not an error.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Result type alias for Loopy operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Loopy.
#[derive(Error, Debug)]
pub enum Error {
    // Discovery errors
    #[error("failed to enumerate network interfaces: {0}")]
    Discovery(String),

    #[error("interface {0} has no usable index")]
    UnknownInterface(String),

    // Probe setup errors
    #[error("failed to open ICMPv6 socket on {interface}: {reason}")]
    SocketOpen { interface: String, reason: String },

    #[error("failed to marshal echo request: {0}")]
    Marshal(#[from] ProtocolError),

    #[error("failed to send echo request from {interface} to {dest}: {reason}")]
    Send {
        interface: String,
        dest: SocketAddr,
        reason: String,
    },

    // Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // General errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// ICMPv6 wire format errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("message truncated: {len} bytes, need at least {needed}")]
    Truncated { len: usize, needed: usize },

    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

impl Error {
    /// Check if the error is caused by missing privileges.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Error::Io(e) => e.kind() == io::ErrorKind::PermissionDenied,
            Error::SocketOpen { reason, .. } | Error::Send { reason, .. } => {
                reason.contains("Permission denied") || reason.contains("not permitted")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marshal_error_from_protocol() {
        let err: Error = ProtocolError::PayloadTooLarge { size: 2000, max: 1232 }.into();
        assert!(matches!(err, Error::Marshal(_)));
        assert_eq!(
            err.to_string(),
            "failed to marshal echo request: payload too large: 2000 bytes (max 1232)"
        );
    }

    #[test]
    fn test_permission_denied_detection() {
        let err = Error::SocketOpen {
            interface: "eth0".into(),
            reason: "Permission denied (os error 13)".into(),
        };
        assert!(err.is_permission_denied());

        let err = Error::Io(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(err.is_permission_denied());

        assert!(!Error::UnknownInterface("eth9".into()).is_permission_denied());
    }
}
