// ============================================
// File: crates/ooband-transport/src/udp.rs
// ============================================
//! # UDP Transport
//!
//! Datagram socket for the DNS listener. Bound through socket2 so
//! `SO_REUSEADDR` is set before bind, then handed to Tokio.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::traits::{PacketSource, Transport};

/// Tokio UDP socket behind the [`Transport`] trait.
pub struct UdpTransport {
    socket: UdpSocket,
    local_addr: SocketAddr,
    shutdown: AtomicBool,
}

impl UdpTransport {
    /// Binds to `addr` given as text (e.g. `"0.0.0.0:53"`).
    ///
    /// # Errors
    /// - `InvalidAddress`: `addr` does not parse
    /// - `AddressInUse` / `BindFailed`: bind failed
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self> {
        let addr_str = addr.as_ref();
        let socket_addr: SocketAddr =
            addr_str.parse().map_err(|_| TransportError::InvalidAddress {
                addr: addr_str.to_string(),
            })?;
        Self::bind_addr(socket_addr).await
    }

    /// Binds to a socket address.
    ///
    /// # Errors
    /// Returns error if socket creation or binding fails.
    #[allow(clippy::unused_async)]
    pub async fn bind_addr(addr: SocketAddr) -> Result<Self> {
        let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))
            .map_err(|e| TransportError::io("creating UDP socket", e))?;
        socket
            .set_reuse_address(true)
            .map_err(|e| TransportError::io("setting SO_REUSEADDR", e))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| TransportError::io("setting non-blocking", e))?;
        socket
            .bind(&addr.into())
            .map_err(|e| TransportError::from_bind(addr, &e))?;

        let std_socket: std::net::UdpSocket = socket.into();
        let socket = UdpSocket::from_std(std_socket)
            .map_err(|e| TransportError::io("converting to Tokio socket", e))?;
        let local_addr = socket
            .local_addr()
            .map_err(|e| TransportError::io("getting local address", e))?;

        info!(%local_addr, "UDP transport bound");

        Ok(Self {
            socket,
            local_addr,
            shutdown: AtomicBool::new(false),
        })
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, PacketSource)> {
        if self.is_shutdown() {
            return Err(TransportError::ShuttingDown);
        }

        let (len, addr) = self
            .socket
            .recv_from(buf)
            .await
            .map_err(|e| TransportError::ReceiveFailed {
                reason: e.to_string(),
            })?;

        trace!(len, %addr, "UDP datagram received");
        Ok((len, PacketSource::new(addr)))
    }

    async fn send(&self, buf: &[u8], dest: &SocketAddr) -> Result<usize> {
        if self.is_shutdown() {
            return Err(TransportError::ShuttingDown);
        }

        let len = self
            .socket
            .send_to(buf, dest)
            .await
            .map_err(|e| TransportError::SendFailed {
                dest: *dest,
                reason: e.to_string(),
            })?;

        trace!(len, %dest, "UDP datagram sent");
        Ok(len)
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.local_addr)
    }

    async fn shutdown(&self) -> Result<()> {
        self.shutdown.store(true, Ordering::Release);
        debug!(local_addr = %self.local_addr, "UDP transport shut down");
        Ok(())
    }

    fn is_active(&self) -> bool {
        !self.is_shutdown()
    }
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("local_addr", &self.local_addr)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}
