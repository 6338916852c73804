//! Watch subscriptions: UDP registration followed by TCP push delivery.
//!
//! ```text
//!  Registering ──► AwaitingConnections ──► TimedOut
//!       │               │   ▲  (Receiving, one task per connection)
//!       ▼               ▼   │
//!     Failed          Failed
//! ```
//!
//! The server connects back to `udp_port + 1` on the client's address. The
//! acceptance task owns the TCP listener and spawns a reader per accepted
//! connection. When the watch timer fires the controller cancels the
//! acceptance task, which drops the listener, and waits for it to finish so
//! no bound socket outlives the call. Readers are left to finish on their own
//! when the server closes its side. Readers report each delivered update to
//! the controller over a channel; no state is shared between tasks.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::StreamExt;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::{FailureCode, Opcode, Operation, Reply, ReplyStatus, Request};
use crate::core::constants::{
    DEFAULT_ACK_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_USE_ACK, DEFAULT_WATCH_DURATION,
};
use crate::transport::{ReliableTransport, ReplyDecoder, SendOptions, TransportError};

/// Errors that end a watch.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The request is not a watch registration.
    #[error("expected a watch registration, got opcode {0:?}")]
    NotAWatch(Opcode),

    /// The UDP port leaves no room for a companion TCP port.
    #[error("no callback port available above UDP port {0}")]
    NoCallbackPort(u16),

    /// Registration round-trip failed.
    #[error("registration failed: {0}")]
    Registration(#[from] TransportError),

    /// The server refused the subscription.
    #[error("server rejected watch: {0}")]
    Rejected(FailureCode),

    /// The server answered with a status outside the protocol.
    #[error("unexpected registration status {0}")]
    UnexpectedStatus(u32),

    /// Binding the callback listener failed.
    #[error("failed to listen on {addr}: {source}")]
    Listen {
        /// Address we tried to bind.
        addr: SocketAddr,
        /// Underlying error.
        source: io::Error,
    },

    /// Accepting a push connection failed.
    #[error("accept failed: {0}")]
    Accept(io::Error),

    /// The acceptance task panicked or was aborted.
    #[error("acceptance task failed: {0}")]
    Task(#[from] JoinError),
}

/// Lifecycle of one watch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPhase {
    /// Registration round-trip in progress.
    Registering,
    /// Listening for push connections.
    AwaitingConnections,
    /// Watch duration elapsed (success).
    TimedOut,
    /// Registration, listen, or accept failed.
    Failed,
}

/// Parameters of one watch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// How long to accept pushed updates.
    pub duration: Duration,
    /// Per-attempt timeout for the registration round-trip.
    pub ack_timeout: Duration,
    /// Wait for `ACK` during registration.
    pub use_ack: bool,
    /// Registration retransmissions after the first attempt.
    pub max_retries: u32,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            duration: DEFAULT_WATCH_DURATION,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            use_ack: DEFAULT_USE_ACK,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl WatchOptions {
    fn registration(&self) -> SendOptions {
        SendOptions {
            timeout: self.ack_timeout,
            use_ack: self.use_ack,
            max_retries: self.max_retries,
            ack_timeout: None,
        }
    }
}

/// One reply pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushedUpdate {
    /// 1-based index of the push connection within this watch.
    pub connection: u32,
    /// Server-side address of the push connection.
    pub peer: SocketAddr,
    /// The decoded update.
    pub reply: Reply,
}

/// Result of a watch that ran to its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSummary {
    /// The server's registration reply.
    pub registration: Reply,
    /// TCP port the server was told to connect to.
    pub callback_port: u16,
    /// Push connections accepted.
    pub connections: u32,
    /// Updates handed to the receiver before the watch returned.
    pub updates: u64,
}

/// Runs watch subscriptions against one server.
#[derive(Debug, Clone)]
pub struct Watcher {
    transport: ReliableTransport,
}

impl Watcher {
    /// Create a watcher using `transport` for registration.
    pub fn new(transport: ReliableTransport) -> Self {
        Self { transport }
    }

    /// Register `request` and forward pushed updates to `updates` until
    /// `options.duration` elapses.
    ///
    /// Returns `Ok` when the timer fires. The callback port in `request` is
    /// overwritten with the companion port of the registration socket.
    pub async fn watch(
        &self,
        mut request: Request,
        options: &WatchOptions,
        updates: mpsc::Sender<PushedUpdate>,
    ) -> Result<WatchSummary, WatchError> {
        let request_id = request.request_id;
        enter(request_id, WatchPhase::Registering);

        let result = self.run(&mut request, options, updates).await;
        match &result {
            Ok(summary) => {
                info!(request_id, connections = summary.connections, "watch expired");
                enter(request_id, WatchPhase::TimedOut);
            }
            Err(e) => {
                warn!(request_id, error = %e, "watch failed");
                enter(request_id, WatchPhase::Failed);
            }
        }
        result
    }

    async fn run(
        &self,
        request: &mut Request,
        options: &WatchOptions,
        updates: mpsc::Sender<PushedUpdate>,
    ) -> Result<WatchSummary, WatchError> {
        let opcode = request.opcode();
        let Operation::RegisterWatch { callback_port, .. } = &mut request.operation else {
            return Err(WatchError::NotAWatch(opcode));
        };

        // The registration socket stays open for the whole watch so its port
        // (and therefore the companion port) stays ours
        let mut socket = self.transport.open().await?;
        let local = socket.local_addr().map_err(TransportError::from)?;
        let port = local
            .port()
            .checked_add(1)
            .ok_or(WatchError::NoCallbackPort(local.port()))?;
        *callback_port = port;
        debug!(
            request_id = request.request_id,
            udp = %local,
            tcp_port = port,
            "callback port selected"
        );

        // Listen before registering so an immediate push finds the backlog
        let listen_addr = SocketAddr::new(local.ip(), port);
        let listener = TcpListener::bind(listen_addr)
            .await
            .map_err(|source| WatchError::Listen {
                addr: listen_addr,
                source,
            })?;

        let registration = self
            .transport
            .exchange(&mut socket, request, &options.registration())
            .await?
            .reply;
        match registration.status {
            ReplyStatus::Success(Opcode::RegisterWatch) => {}
            ReplyStatus::Failure(code) => return Err(WatchError::Rejected(code)),
            ReplyStatus::Success(_) | ReplyStatus::Unrecognized(_) => {
                return Err(WatchError::UnexpectedStatus(registration.raw_status));
            }
        }

        enter(request.request_id, WatchPhase::AwaitingConnections);
        let token = CancellationToken::new();
        let (delivered_tx, mut delivered_rx) = mpsc::unbounded_channel();
        let mut acceptor = tokio::spawn(accept_loop(
            listener,
            token.clone(),
            updates,
            delivered_tx,
        ));

        let accepted = tokio::select! {
            _ = tokio::time::sleep(options.duration) => {
                token.cancel();
                (&mut acceptor).await?
            }
            // Only finishes early on an accept error
            result = &mut acceptor => result?,
        };
        let connections = accepted.map_err(WatchError::Accept)?;

        let mut delivered = 0u64;
        while delivered_rx.try_recv().is_ok() {
            delivered += 1;
        }

        Ok(WatchSummary {
            registration,
            callback_port: port,
            connections,
            updates: delivered,
        })
    }
}

fn enter(request_id: u32, phase: WatchPhase) {
    debug!(request_id, ?phase, "watch phase");
}

/// Accept push connections until cancelled. Owns the listener.
async fn accept_loop(
    listener: TcpListener,
    token: CancellationToken,
    updates: mpsc::Sender<PushedUpdate>,
    delivered: mpsc::UnboundedSender<u32>,
) -> io::Result<u32> {
    let mut connections = 0u32;
    loop {
        tokio::select! {
            biased;

            _ = token.cancelled() => {
                // Dropping the listener closes it
                drop(listener);
                return Ok(connections);
            }
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                connections += 1;
                debug!(%peer, connection = connections, "push connection accepted");
                tokio::spawn(read_pushes(
                    stream,
                    peer,
                    connections,
                    updates.clone(),
                    delivered.clone(),
                ));
            }
        }
    }
}

/// Forward every frame on one push connection until EOF or error.
async fn read_pushes(
    stream: TcpStream,
    peer: SocketAddr,
    connection: u32,
    updates: mpsc::Sender<PushedUpdate>,
    delivered: mpsc::UnboundedSender<u32>,
) {
    let mut frames = FramedRead::new(stream, ReplyDecoder::new());
    while let Some(frame) = frames.next().await {
        match frame {
            Ok(reply) => {
                let update = PushedUpdate {
                    connection,
                    peer,
                    reply,
                };
                if updates.send(update).await.is_err() {
                    debug!(%peer, connection, "update receiver dropped");
                    break;
                }
                // The controller stops listening once the watch returns
                let _ = delivered.send(connection);
            }
            Err(e) if e.is_malformed() => {
                warn!(%peer, connection, error = %e, "malformed push frame, dropping connection");
                break;
            }
            Err(e) => {
                warn!(%peer, connection, error = %e, "push connection failed");
                break;
            }
        }
    }
    debug!(%peer, connection, "push connection closed");
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;
    use tokio::net::UdpSocket;
    use tokio::sync::oneshot;

    use super::*;
    use crate::codec::ReplyBody;
    use crate::core::constants::ACK_PAYLOAD;

    /// Mock booking server: answers the registration with `status`, then
    /// opens one push connection per entry of `pushes`, writing each chunk
    /// in turn.
    async fn mock_server(
        status: u32,
        pushes: Vec<Vec<Vec<u8>>>,
    ) -> (SocketAddr, oneshot::Receiver<SocketAddr>) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let (callback_tx, callback_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut buf = [0u8; 2048];
            let (n, from) = socket.recv_from(&mut buf).await.unwrap();
            let request = Request::decode(&buf[..n]).unwrap();
            let Operation::RegisterWatch { callback_port, .. } = request.operation else {
                panic!("expected watch registration");
            };
            assert_eq!(callback_port, from.port() + 1);

            socket.send_to(ACK_PAYLOAD, from).await.unwrap();
            let reply = Reply::new(request.request_id, 0, status, ReplyBody::Empty);
            socket.send_to(&reply.encode().unwrap(), from).await.unwrap();

            let callback = SocketAddr::new(from.ip(), callback_port);
            let _ = callback_tx.send(callback);
            if !reply.is_success() {
                return;
            }

            let mut pushers = Vec::new();
            for chunks in pushes {
                pushers.push(tokio::spawn(async move {
                    let mut stream = TcpStream::connect(callback).await.unwrap();
                    for chunk in chunks {
                        // The client may already have hung up
                        if stream.write_all(&chunk).await.is_err() {
                            return;
                        }
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                    let _ = stream.shutdown().await;
                }));
            }
            for pusher in pushers {
                pusher.await.unwrap();
            }
        });

        (addr, callback_rx)
    }

    /// `per_connection` capacity updates for each of `connections`
    /// connections; connection `c` sends `c * 100 + i`.
    fn capacity_pushes(connections: u32, per_connection: u32) -> Vec<Vec<Vec<u8>>> {
        (0..connections)
            .map(|c| {
                (0..per_connection)
                    .map(|i| {
                        let seq = c * 100 + i;
                        Reply::new(seq, 0, 105, ReplyBody::Capacity(seq))
                            .encode()
                            .unwrap()
                    })
                    .collect()
            })
            .collect()
    }

    fn watch_request() -> Request {
        Request::new(
            42,
            Operation::RegisterWatch {
                facility: "Gym".into(),
                window_minutes: 1,
                callback_port: 0,
            },
        )
    }

    fn options(duration: Duration) -> WatchOptions {
        WatchOptions {
            duration,
            ack_timeout: Duration::from_millis(500),
            use_ack: true,
            max_retries: 1,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<PushedUpdate>) -> Vec<PushedUpdate> {
        let mut out = Vec::new();
        while let Ok(update) = rx.try_recv() {
            out.push(update);
        }
        out
    }

    #[tokio::test]
    async fn test_watch_times_out_cleanly() {
        let (addr, callback_rx) = mock_server(104, vec![]).await;
        let watcher = Watcher::new(ReliableTransport::new(addr.to_string()));
        let (tx, mut rx) = mpsc::channel(16);

        let summary = watcher
            .watch(watch_request(), &options(Duration::from_millis(200)), tx)
            .await
            .unwrap();

        assert_eq!(summary.connections, 0);
        assert_eq!(summary.updates, 0);
        assert!(summary.registration.is_success());
        assert!(drain(&mut rx).is_empty());

        // The listener is closed once watch returns
        let callback = callback_rx.await.unwrap();
        assert_eq!(callback.port(), summary.callback_port);
        assert!(TcpStream::connect(callback).await.is_err());
    }

    #[tokio::test]
    async fn test_watch_receives_concurrent_pushes() {
        let (addr, _) = mock_server(104, capacity_pushes(2, 3)).await;
        let watcher = Watcher::new(ReliableTransport::new(addr.to_string()));
        let (tx, mut rx) = mpsc::channel(16);

        let summary = watcher
            .watch(watch_request(), &options(Duration::from_millis(500)), tx)
            .await
            .unwrap();
        assert_eq!(summary.connections, 2);
        assert_eq!(summary.updates, 6);

        let updates = drain(&mut rx);
        assert_eq!(updates.len(), 6);

        // Each connection's updates arrive in that connection's order
        for connection in [1, 2] {
            let capacities: Vec<u32> = updates
                .iter()
                .filter(|u| u.connection == connection)
                .map(|u| u.reply.capacity().unwrap())
                .collect();
            assert_eq!(capacities.len(), 3);
            assert!(capacities.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[tokio::test]
    async fn test_watch_rejected() {
        let (addr, _) = mock_server(200, vec![]).await;
        let watcher = Watcher::new(ReliableTransport::new(addr.to_string()));
        let (tx, _rx) = mpsc::channel(16);

        let err = watcher
            .watch(watch_request(), &options(Duration::from_secs(5)), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, WatchError::Rejected(FailureCode::UnknownFacility)));
    }

    #[tokio::test]
    async fn test_watch_registration_exhausts_retries() {
        // Nobody answers
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let watcher = Watcher::new(ReliableTransport::new(
            silent.local_addr().unwrap().to_string(),
        ));
        let (tx, _rx) = mpsc::channel(16);

        let mut opts = options(Duration::from_secs(5));
        opts.ack_timeout = Duration::from_millis(60);
        let err = watcher.watch(watch_request(), &opts, tx).await.unwrap_err();

        assert!(matches!(
            err,
            WatchError::Registration(TransportError::MaxRetriesExceeded { attempts: 2 })
        ));
    }

    #[tokio::test]
    async fn test_watch_requires_registration_request() {
        let watcher = Watcher::new(ReliableTransport::new("127.0.0.1:9"));
        let (tx, _rx) = mpsc::channel(1);

        let err = watcher
            .watch(
                Request::new(1, Operation::ListFacilities),
                &WatchOptions::default(),
                tx,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WatchError::NotAWatch(Opcode::ListFacilities)));
    }

    #[tokio::test]
    async fn test_watch_requires_watch_confirmation() {
        // A capacity reply is a success status, but not for a watch
        let (addr, _) = mock_server(105, vec![]).await;
        let watcher = Watcher::new(ReliableTransport::new(addr.to_string()));
        let (tx, _rx) = mpsc::channel(16);

        let err = watcher
            .watch(watch_request(), &options(Duration::from_secs(5)), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, WatchError::UnexpectedStatus(105)));
    }

    #[tokio::test]
    async fn test_malformed_push_ends_only_its_connection() {
        // Capacity reply whose payload is two bytes short, then a valid
        // update the client must never see
        let mut truncated = Reply::new(7, 0, 105, ReplyBody::Capacity(7))
            .encode()
            .unwrap();
        truncated[12..16].copy_from_slice(&2u32.to_be_bytes());
        truncated.truncate(18);
        let after = Reply::new(8, 0, 105, ReplyBody::Capacity(999))
            .encode()
            .unwrap();

        let mut pushes = capacity_pushes(1, 3);
        pushes.push(vec![truncated, after]);
        let (addr, _) = mock_server(104, pushes).await;
        let watcher = Watcher::new(ReliableTransport::new(addr.to_string()));
        let (tx, mut rx) = mpsc::channel(16);

        let summary = watcher
            .watch(watch_request(), &options(Duration::from_millis(400)), tx)
            .await
            .unwrap();
        assert_eq!(summary.connections, 2);
        assert_eq!(summary.updates, 3);

        let updates = drain(&mut rx);
        assert_eq!(updates.len(), 3);
        assert!(updates.iter().all(|u| u.connection == updates[0].connection));
        assert!(updates.iter().all(|u| u.reply.capacity() != Some(999)));
    }

    #[tokio::test]
    async fn test_watch_outlives_dropped_receiver() {
        let (addr, _) = mock_server(104, capacity_pushes(1, 3)).await;
        let watcher = Watcher::new(ReliableTransport::new(addr.to_string()));
        let (tx, rx) = mpsc::channel(16);
        drop(rx);

        let duration = Duration::from_millis(300);
        let started = tokio::time::Instant::now();
        let summary = watcher
            .watch(watch_request(), &options(duration), tx)
            .await
            .unwrap();

        assert!(started.elapsed() >= duration);
        assert_eq!(summary.connections, 1);
        assert_eq!(summary.updates, 0);
    }
}
