//! At-least-once request/reply over UDP.
//!
//! One exchange runs up to `max_retries + 1` attempts. Each attempt:
//!
//! ```text
//!  send request ──► [use_ack] wait ACK (ack_timeout) ──► wait reply (timeout) ──► decode
//!        ▲                     │ timeout / not "ACK"            │ timeout
//!        └─────────────────────┴────────────────────────────────┘
//! ```
//!
//! Only one attempt is in flight at a time. A reply that fails to decode ends
//! the exchange immediately; it is never retried.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::codec::{Reply, Request};
use crate::core::constants::{
    ACK_PAYLOAD, ACK_TIMEOUT_DIVISOR, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_USE_ACK,
};

use super::error::{TransportError, TransportResult};
use super::socket::RequestSocket;

/// Per-call transport parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    /// Deadline for the send and for the reply phase of each attempt.
    pub timeout: Duration,
    /// Wait for `ACK` before awaiting the reply.
    pub use_ack: bool,
    /// Retransmissions allowed after the first attempt.
    pub max_retries: u32,
    /// ACK-phase deadline; `timeout / 3` when unset.
    pub ack_timeout: Option<Duration>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            use_ack: DEFAULT_USE_ACK,
            max_retries: DEFAULT_MAX_RETRIES,
            ack_timeout: None,
        }
    }
}

impl SendOptions {
    /// Effective ACK-phase deadline.
    pub fn ack_deadline(&self) -> Duration {
        self.ack_timeout
            .unwrap_or(self.timeout / ACK_TIMEOUT_DIVISOR)
    }

    /// Upper bound on datagrams transmitted by one exchange.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Outcome of a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    /// Datagrams transmitted, including the successful one.
    pub attempts: u32,
    /// Decoded reply.
    pub reply: Reply,
}

/// Request/reply transport bound to one server address.
#[derive(Debug, Clone)]
pub struct ReliableTransport {
    server: String,
}

impl ReliableTransport {
    /// Create a transport for `server` (`host:port`).
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
        }
    }

    /// Get the server address.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Open a socket connected to the server.
    pub async fn open(&self) -> TransportResult<RequestSocket> {
        RequestSocket::connect(&self.server).await
    }

    /// Send `request` and wait for its reply.
    ///
    /// A fresh socket is opened for the call and closed on every exit path.
    pub async fn send(&self, request: &Request, options: &SendOptions) -> TransportResult<Reply> {
        Ok(self.send_with_report(request, options).await?.reply)
    }

    /// Like [`send`](Self::send), also reporting the attempt count.
    pub async fn send_with_report(
        &self,
        request: &Request,
        options: &SendOptions,
    ) -> TransportResult<SendReport> {
        // Encode before touching the network so caller errors never send
        let datagram = request.encode()?;
        let mut socket = self.open().await?;
        exchange_datagram(&mut socket, request.request_id, &datagram, options).await
    }

    /// Run the exchange over a caller-owned socket.
    pub async fn exchange(
        &self,
        socket: &mut RequestSocket,
        request: &Request,
        options: &SendOptions,
    ) -> TransportResult<SendReport> {
        let datagram = request.encode()?;
        exchange_datagram(socket, request.request_id, &datagram, options).await
    }
}

async fn exchange_datagram(
    socket: &mut RequestSocket,
    request_id: u32,
    datagram: &[u8],
    options: &SendOptions,
) -> TransportResult<SendReport> {
    let max_attempts = options.max_attempts();

    for attempt in 1..=max_attempts {
        debug!(request_id, attempt, max_attempts, "sending request");

        match run_attempt(socket, datagram, options).await {
            Ok(reply) => {
                debug!(request_id, attempt, status = reply.raw_status, "reply received");
                return Ok(SendReport {
                    attempts: attempt,
                    reply,
                });
            }
            Err(e) if e.is_retryable() => {
                warn!(request_id, attempt, error = %e, "attempt failed, retransmitting");
            }
            Err(e) => return Err(e),
        }
    }

    Err(TransportError::MaxRetriesExceeded {
        attempts: max_attempts,
    })
}

async fn run_attempt(
    socket: &mut RequestSocket,
    datagram: &[u8],
    options: &SendOptions,
) -> TransportResult<Reply> {
    socket.send_within(datagram, options.timeout).await?;

    if options.use_ack {
        match socket.recv_within(options.ack_deadline()).await? {
            Some(ack) if ack == ACK_PAYLOAD => {}
            Some(other) => return Err(TransportError::AckMismatch(other.len())),
            None => return Err(TransportError::AckTimeout),
        }
    }

    let deadline = Instant::now() + options.timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let Some(datagram) = socket.recv_within(remaining).await? else {
            return Err(TransportError::ReplyTimeout);
        };
        // Late ACKs for earlier retransmissions carry no reply
        if datagram.is_empty() || datagram == ACK_PAYLOAD {
            continue;
        }
        return Ok(Reply::decode(datagram)?);
    }
}
