//! Facility Booking Protocol - Transport Layer
//!
//! Moves encoded frames between the client and the booking server:
//!
//! - **Request sockets**: [`RequestSocket`], a connected tokio UDP socket owned
//!   by one exchange
//! - **Reliable exchange**: [`ReliableTransport`] implementing send, ACK wait,
//!   reply wait, and bounded retransmission
//! - **Push streams**: [`ReplyDecoder`] splitting TCP push connections into
//!   reply frames
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       Session / Watch (client)          │
//! ├─────────────────────────────────────────┤
//! │         Transport Layer                 │  ← This module
//! │   UDP send/ACK/retry, TCP push frames   │
//! ├─────────────────────────────────────────┤
//! │           Wire Codec                    │
//! ├─────────────────────────────────────────┤
//! │          UDP  /  TCP                    │
//! └─────────────────────────────────────────┘
//! ```

mod error;
mod reliable;
mod socket;
mod stream;

pub use error::*;
pub use reliable::{ReliableTransport, SendOptions, SendReport};
pub use socket::*;
pub use stream::{ReplyDecoder, MAX_STREAM_FRAME_SIZE};
