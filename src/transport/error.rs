//! Transport layer error types.
//!
//! Timeouts, ACK mismatches, and refused datagrams drive the retry loop and
//! only surface as [`TransportError::MaxRetriesExceeded`]. Codec and socket
//! failures are returned immediately.

use std::io;

use thiserror::Error;

use crate::core::CodecError;

/// Transport layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Frame encoding or decoding error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// I/O error (socket operations).
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// Server address did not resolve to anything usable.
    #[error("could not resolve server address {0:?}")]
    Unresolved(String),

    /// No acknowledgment within the ACK-phase deadline.
    #[error("acknowledgment timed out")]
    AckTimeout,

    /// A datagram arrived in the ACK phase but was not `ACK`.
    #[error("unexpected datagram while waiting for acknowledgment ({0} bytes)")]
    AckMismatch(usize),

    /// No reply within the request deadline.
    #[error("reply timed out")]
    ReplyTimeout,

    /// Every attempt failed.
    #[error("reached max retries after {attempts} attempts")]
    MaxRetriesExceeded {
        /// Number of datagrams transmitted.
        attempts: u32,
    },
}

impl TransportError {
    /// Check if this error restarts the attempt instead of failing the call.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::AckTimeout
            | TransportError::AckMismatch(_)
            | TransportError::ReplyTimeout => true,
            // ICMP port unreachable on a connected UDP socket
            TransportError::Io(e) => e.kind() == io::ErrorKind::ConnectionRefused,
            _ => false,
        }
    }

    /// Check if this error came from a malformed frame.
    pub fn is_malformed(&self) -> bool {
        matches!(self, TransportError::Codec(_))
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(TransportError::AckTimeout.is_retryable());
        assert!(TransportError::AckMismatch(5).is_retryable());
        assert!(TransportError::ReplyTimeout.is_retryable());
        assert!(
            TransportError::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
                .is_retryable()
        );

        assert!(!TransportError::Io(io::Error::other("test")).is_retryable());
        assert!(!TransportError::Codec(CodecError::InvalidUtf8).is_retryable());
    }

    #[test]
    fn test_malformed_errors() {
        assert!(TransportError::Codec(CodecError::truncated(4, 0)).is_malformed());
        assert!(!TransportError::AckTimeout.is_malformed());
    }

    #[test]
    fn test_max_retries_message() {
        let err = TransportError::MaxRetriesExceeded { attempts: 6 };
        assert_eq!(err.to_string(), "reached max retries after 6 attempts");
    }
}
