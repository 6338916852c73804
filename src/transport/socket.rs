//! Connected UDP socket for one request/reply exchange.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;

use super::error::{TransportError, TransportResult};

/// Default receive buffer size.
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 65535;

/// UDP socket connected to a single server address.
///
/// Owned by exactly one exchange; dropping it closes the socket.
#[derive(Debug)]
pub struct RequestSocket {
    /// The underlying UDP socket.
    socket: UdpSocket,
    /// Receive buffer.
    recv_buffer: Vec<u8>,
    /// Resolved server address.
    peer: SocketAddr,
}

impl RequestSocket {
    /// Resolve `server`, bind an ephemeral local port, and connect.
    ///
    /// IPv4 addresses are preferred when the name resolves to both families.
    pub async fn connect(server: &str) -> TransportResult<Self> {
        let peer = resolve(server).await?;
        let bind_addr: SocketAddr = if peer.is_ipv4() {
            (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(peer).await?;
        Ok(Self::from_connected(socket, peer))
    }

    /// Wrap an already connected socket.
    pub fn from_connected(socket: UdpSocket, peer: SocketAddr) -> Self {
        Self {
            socket,
            recv_buffer: vec![0u8; DEFAULT_RECV_BUFFER_SIZE],
            peer,
        }
    }

    /// Get the local address.
    ///
    /// After `connect` this is the concrete interface address the kernel
    /// picked for the route to the server.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Get the server address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Send one datagram to the server, bounded by `deadline`.
    pub async fn send_within(&self, data: &[u8], deadline: Duration) -> TransportResult<()> {
        match timeout(deadline, self.socket.send(data)).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(TransportError::ReplyTimeout),
        }
    }

    /// Receive one datagram, or `None` if `deadline` passes first.
    pub async fn recv_within(&mut self, deadline: Duration) -> TransportResult<Option<&[u8]>> {
        match timeout(deadline, self.socket.recv(&mut self.recv_buffer)).await {
            Ok(result) => {
                let len = result?;
                Ok(Some(&self.recv_buffer[..len]))
            }
            Err(_) => Ok(None),
        }
    }
}

/// Resolve a `host:port` string, preferring IPv4.
pub async fn resolve(server: &str) -> TransportResult<SocketAddr> {
    let addrs: Vec<SocketAddr> = lookup_host(server).await?.collect();
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| TransportError::Unresolved(server.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_socket_connect() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();

        let socket = RequestSocket::connect(&server_addr.to_string()).await.unwrap();
        assert_eq!(socket.peer_addr(), server_addr);
        assert_ne!(socket.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_socket_send_recv() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();

        let mut client = RequestSocket::connect(&server_addr.to_string()).await.unwrap();
        client.send_within(b"hello", Duration::from_secs(1)).await.unwrap();

        let mut buf = [0u8; 16];
        let (n, from) = server.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello");

        server.send_to(b"ACK", from).await.unwrap();
        let received = client.recv_within(Duration::from_secs(1)).await.unwrap();
        assert_eq!(received, Some(&b"ACK"[..]));
    }

    #[tokio::test]
    async fn test_recv_deadline() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut client = RequestSocket::connect(&server.local_addr().unwrap().to_string())
            .await
            .unwrap();

        let received = client.recv_within(Duration::from_millis(50)).await.unwrap();
        assert!(received.is_none());
    }

    #[tokio::test]
    async fn test_resolve_localhost() {
        let addr = resolve("localhost:3000").await.unwrap();
        assert_eq!(addr.port(), 3000);
    }

    #[tokio::test]
    async fn test_resolve_garbage() {
        assert!(resolve("not an address").await.is_err());
    }
}
