//! # Facility Booking Client
//!
//! Client side of a small facility-booking protocol. Requests travel as UDP
//! datagrams with an optional `ACK` handshake and bounded retransmission;
//! watch subscriptions receive pushed updates over TCP.
//!
//! ## Feature Flags
//!
//! - `transport` (default): UDP request/reply exchange and TCP push framing
//! - `client` (default): configuration, sessions, and watch subscriptions
//!
//! ## Modules
//!
//! - [`core`]: Value types, constants, and codec errors (always included)
//! - [`codec`]: Frame, request, and reply encoding (always included)
//! - [`transport`]: Reliable exchange (requires `transport` feature)
//! - [`client`]: High-level API (requires `client` feature)
//!
//! ## Example Usage
//!
//! ```rust
//! use facility_booking_client::prelude::*;
//!
//! let request = Request::new(
//!     7,
//!     Operation::CreateBooking {
//!         facility: "Fitness Center".into(),
//!         day: Day::Wednesday,
//!         start: "0900".parse().unwrap(),
//!         end: "1030".parse().unwrap(),
//!     },
//! );
//! let datagram = request.encode().unwrap();
//! assert_eq!(&datagram[8..12], &102u32.to_be_bytes());
//!
//! let wire = Reply::new(7, 1234, 100, ReplyBody::Empty).encode().unwrap();
//! let reply = Reply::decode(&wire).unwrap();
//! assert_eq!(reply.created_booking_id(), Some(1234));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Wire codec (always included)
pub mod codec;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Client API (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::codec::*;
    pub use crate::core::*;

    #[cfg(feature = "transport")]
    pub use crate::transport::{
        ReliableTransport, SendOptions, SendReport, TransportError, TransportResult,
    };

    #[cfg(feature = "client")]
    pub use crate::client::{
        BookingClient, ClientConfig, ClientConfigBuilder, ClientError, PushedUpdate, Session,
        WatchError, WatchSummary,
    };
}

// Re-export commonly used items at crate root
pub use codec::{Opcode, Operation, Reply, ReplyStatus, Request};
pub use core::{CodecError, Day, HourMinutes};

#[cfg(feature = "client")]
pub use client::{BookingClient, Session};
