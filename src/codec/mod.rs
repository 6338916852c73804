//! Wire codec for the facility booking protocol.
//!
//! Pure byte transformations, no I/O:
//!
//! - **Framing**: [`FrameHeader`] and [`Frame`], the 16-byte envelope shared by
//!   requests and replies
//! - **Requests**: [`Request`] with an [`Operation`] per opcode
//! - **Replies**: [`Reply`] with a typed [`ReplyStatus`] and [`ReplyBody`]
//!
//! All integers are big-endian. Strings are a u32 length followed by raw
//! bytes. Days and request clock times are ASCII digits; reply times are raw
//! u32 minute counts.

mod frame;
mod reply;
mod request;

pub use frame::{Frame, FrameHeader};
pub use reply::{FailureCode, Reply, ReplyBody, ReplyStatus};
pub use request::{Opcode, Operation, Request};
