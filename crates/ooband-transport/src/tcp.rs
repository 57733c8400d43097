// ============================================
// File: crates/ooband-transport/src/tcp.rs
// ============================================
//! # TCP Listeners
//!
//! Listening sockets for the SMTP and HTTP listeners, configured the same
//! way as [`crate::udp::UdpTransport`].

use std::net::SocketAddr;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;
use tracing::info;

use crate::error::{Result, TransportError};

/// Pending-connection queue length.
const LISTEN_BACKLOG: i32 = 1024;

/// Binds a Tokio `TcpListener` with `SO_REUSEADDR` set.
///
/// # Errors
/// - `AddressInUse` / `BindFailed`: bind failed
/// - `Io`: socket setup failed
pub fn bind_tcp(addr: SocketAddr) -> Result<TcpListener> {
    let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
        .map_err(|e| TransportError::io("creating TCP socket", e))?;
    socket
        .set_reuse_address(true)
        .map_err(|e| TransportError::io("setting SO_REUSEADDR", e))?;
    socket
        .set_nonblocking(true)
        .map_err(|e| TransportError::io("setting non-blocking", e))?;
    socket
        .bind(&addr.into())
        .map_err(|e| TransportError::from_bind(addr, &e))?;
    socket
        .listen(LISTEN_BACKLOG)
        .map_err(|e| TransportError::io("listening", e))?;

    let std_listener: std::net::TcpListener = socket.into();
    let listener = TcpListener::from_std(std_listener)
        .map_err(|e| TransportError::io("converting to Tokio listener", e))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| TransportError::io("getting local address", e))?;
    info!(%local_addr, "TCP listener bound");

    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn test_bind_and_accept() {
        let listener = bind_tcp("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(b"220 ready\r\n").await.unwrap();
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut buf = vec![0u8; 32];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"220 ready\r\n");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_double_bind_reports_error() {
        let first = bind_tcp("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = first.local_addr().unwrap();
        // SO_REUSEADDR does not allow two active listeners on one port.
        assert!(bind_tcp(addr).is_err());
    }
}
