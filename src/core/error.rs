//! Error types for the wire codec.

use thiserror::Error;

/// Errors that can occur when encoding or decoding a frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Opcode outside the supported request set.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(u32),

    /// Not enough bytes to read the next field.
    #[error("truncated frame: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes required by the next field.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// Payload parsed to a different length than the header advertised.
    #[error("payload length mismatch: header says {declared}, payload used {consumed}")]
    PayloadLengthMismatch {
        /// Length from the frame header.
        declared: usize,
        /// Bytes actually consumed by the payload fields.
        consumed: usize,
    },

    /// Day byte is not an ASCII digit in `'0'..='6'`.
    #[error("invalid day code: {0:#04x}")]
    InvalidDay(u8),

    /// Minute count outside the clock range.
    #[error("invalid time: {0} minutes")]
    InvalidTime(u32),

    /// Clock string is not four ASCII digits of a valid time.
    #[error("invalid clock value: {0:?}")]
    InvalidClock(String),

    /// Facility name is not valid UTF-8.
    #[error("facility name is not valid UTF-8")]
    InvalidUtf8,

    /// Variable-length field longer than its u32 length prefix allows.
    #[error("field too long: {0} bytes")]
    FieldTooLong(usize),

    /// Encoded frame does not fit a single datagram.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Encoded frame size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },
}

impl CodecError {
    /// Shorthand for a truncation error.
    pub(crate) fn truncated(needed: usize, available: usize) -> Self {
        Self::Truncated { needed, available }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CodecError::UnsupportedOperation(999).to_string(),
            "unsupported operation: 999"
        );
        assert_eq!(
            CodecError::truncated(4, 1).to_string(),
            "truncated frame: needed 4 bytes, 1 available"
        );
        assert_eq!(CodecError::InvalidDay(b'9').to_string(), "invalid day code: 0x39");
    }
}
