//! Frame envelope shared by requests and replies.
//!
//! Wire format (16-byte header, all integers big-endian):
//! ```text
//! +------------+------------+------------+----------------+-----------------+
//! | Request ID | UID        | Operation  | Payload Length | Payload         |
//! | 4 bytes    | 4 bytes    | 4 bytes    | 4 bytes        | length bytes    |
//! +------------+------------+------------+----------------+-----------------+
//! ```

use crate::core::CodecError;
use crate::core::constants::{FRAME_HEADER_SIZE, MAX_DATAGRAM_SIZE};

/// Frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Caller-assigned request identifier, echoed by the server.
    pub request_id: u32,
    /// Target entity (booking id), 0 if none.
    pub uid: u32,
    /// Opcode in requests, status in replies.
    pub operation: u32,
    /// Number of payload bytes following the header.
    pub payload_length: u32,
}

impl FrameHeader {
    /// Serialize the header (16 bytes).
    pub fn to_bytes(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut buf = [0u8; FRAME_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.request_id.to_be_bytes());
        buf[4..8].copy_from_slice(&self.uid.to_be_bytes());
        buf[8..12].copy_from_slice(&self.operation.to_be_bytes());
        buf[12..16].copy_from_slice(&self.payload_length.to_be_bytes());
        buf
    }

    /// Parse a header from the start of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = WireReader::new(bytes);
        Ok(Self {
            request_id: reader.read_u32()?,
            uid: reader.read_u32()?,
            operation: reader.read_u32()?,
            payload_length: reader.read_u32()?,
        })
    }
}

/// A header plus its raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The envelope.
    pub header: FrameHeader,
    /// Payload bytes, exactly `header.payload_length` long.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Build a frame; the payload length is taken from `payload`.
    pub fn new(request_id: u32, uid: u32, operation: u32, payload: Vec<u8>) -> Result<Self, CodecError> {
        let payload_length =
            u32::try_from(payload.len()).map_err(|_| CodecError::FieldTooLong(payload.len()))?;
        Ok(Self {
            header: FrameHeader {
                request_id,
                uid,
                operation,
                payload_length,
            },
            payload,
        })
    }

    /// Serialize header and payload, enforcing the datagram size limit.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let size = FRAME_HEADER_SIZE + self.payload.len();
        if size > MAX_DATAGRAM_SIZE {
            return Err(CodecError::FrameTooLarge {
                size,
                max: MAX_DATAGRAM_SIZE,
            });
        }
        let mut buf = Vec::with_capacity(size);
        buf.extend_from_slice(&self.header.to_bytes());
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    /// Parse a frame from a datagram.
    ///
    /// Bytes beyond the advertised payload length are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let header = FrameHeader::from_bytes(bytes)?;
        let mut reader = WireReader::new(&bytes[FRAME_HEADER_SIZE..]);
        let payload = reader.read_bytes(header.payload_length as usize)?.to_vec();
        Ok(Self { header, payload })
    }

    /// Total encoded length of a frame whose header is already known.
    pub fn encoded_len(header: &FrameHeader) -> usize {
        FRAME_HEADER_SIZE + header.payload_length as usize
    }
}

/// Big-endian cursor over a payload.
#[derive(Debug)]
pub(crate) struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < len {
            return Err(CodecError::truncated(len, self.remaining()));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub(crate) fn read_clock(&mut self) -> Result<[u8; 4], CodecError> {
        self.read_array()
    }

    /// Read a u32 length prefix followed by that many bytes.
    pub(crate) fn read_prefixed(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }

    /// Read a length-prefixed UTF-8 string.
    pub(crate) fn read_string(&mut self) -> Result<String, CodecError> {
        let bytes = self.read_prefixed()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }
}

/// Append a u32 length prefix and the bytes of `value`.
pub(crate) fn put_prefixed(buf: &mut Vec<u8>, value: &[u8]) -> Result<(), CodecError> {
    let len = u32::try_from(value.len()).map_err(|_| CodecError::FieldTooLong(value.len()))?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(value);
    Ok(())
}
