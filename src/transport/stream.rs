//! Splits a pushed TCP byte stream into reply frames.
//!
//! Pushed updates use the same envelope as datagrams, so the header's
//! payload length is the only delimiter.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::codec::{Frame, FrameHeader, Reply};
use crate::core::CodecError;
use crate::core::constants::FRAME_HEADER_SIZE;

use super::error::TransportError;

/// Largest frame accepted on a push stream.
pub const MAX_STREAM_FRAME_SIZE: usize = 1 << 20;

/// [`Decoder`] yielding one [`Reply`] per complete frame.
#[derive(Debug, Clone, Copy)]
pub struct ReplyDecoder {
    max_frame_size: usize,
}

impl Default for ReplyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyDecoder {
    /// Create a decoder with the default frame size limit.
    pub fn new() -> Self {
        Self {
            max_frame_size: MAX_STREAM_FRAME_SIZE,
        }
    }

    /// Create a decoder with a custom frame size limit.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Decoder for ReplyDecoder {
    type Item = Reply;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Reply>, TransportError> {
        if src.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let header = FrameHeader::from_bytes(&src[..FRAME_HEADER_SIZE])?;
        let frame_len = Frame::encoded_len(&header);
        if frame_len > self.max_frame_size {
            return Err(CodecError::FrameTooLarge {
                size: frame_len,
                max: self.max_frame_size,
            }
            .into());
        }

        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let payload = src[FRAME_HEADER_SIZE..frame_len].to_vec();
        src.advance(frame_len);
        Ok(Some(Reply::from_frame(Frame { header, payload })?))
    }
}
