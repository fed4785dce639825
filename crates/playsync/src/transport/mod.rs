// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UDP broadcast transport for pose frames.
//!
//! Owns two sockets: a send socket with `SO_BROADCAST` enabled, and a
//! receive socket bound to the well-known port with broadcast and
//! address-reuse enabled so several local processes can listen at once.
//! A dedicated background thread decodes inbound datagrams and hands
//! them to the consuming loop through an unbounded channel.
//!
//! ```text
//! send(frame) ----------------> 255.255.255.255:port
//!
//! 0.0.0.0:port -> rx thread -> decode_frame -> channel -> drain()
//! ```

mod listener;

use crate::config::BROADCAST_PORT;
use crate::wire::Position;
use crate::{Error, Result};
use crossbeam::channel::{unbounded, Receiver};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// One decoded inbound pose update, not yet filtered or applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerUpdate {
    pub name: String,
    pub position: Position,
}

/// Receive-path counters for diagnostics.
#[derive(Debug)]
pub struct RxMetrics {
    /// Total datagrams received (valid or not).
    pub datagrams_received: AtomicU64,
    /// Datagrams dropped as malformed (bad length or encoding).
    pub datagrams_dropped: AtomicU64,
    /// Total bytes received.
    pub bytes_received: AtomicU64,
}

impl RxMetrics {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            datagrams_received: AtomicU64::new(0),
            datagrams_dropped: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
        })
    }

    /// Snapshot of (received, dropped, bytes).
    pub fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.datagrams_received.load(Ordering::Relaxed),
            self.datagrams_dropped.load(Ordering::Relaxed),
            self.bytes_received.load(Ordering::Relaxed),
        )
    }
}

/// Broadcast send path plus background receive thread.
///
/// The send socket is owned by the caller's thread, the receive socket
/// by the rx thread. The channel between them is the only shared
/// mutable state. Dropping the transport stops and joins the thread.
pub struct BroadcastTransport {
    send_socket: UdpSocket,
    dest: SocketAddr,
    updates: Receiver<PeerUpdate>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    /// Receive-path counters.
    pub metrics: Arc<RxMetrics>,
}

impl BroadcastTransport {
    /// Open the transport on the well-known port.
    ///
    /// # Errors
    ///
    /// Returns `Error::BindFailed` if either socket cannot be
    /// configured or bound. Bind failure is fatal; the caller decides
    /// whether to restart.
    pub fn open() -> Result<Self> {
        Self::open_on_port(BROADCAST_PORT)
    }

    /// Open the transport on a specific port (testing and tooling).
    ///
    /// # Errors
    ///
    /// Returns `Error::BindFailed` on socket setup failure and
    /// `Error::SpawnFailed` if the rx thread cannot start.
    pub fn open_on_port(port: u16) -> Result<Self> {
        let send_socket = build_send_socket()?;
        let recv_socket = build_recv_socket(port)?;
        let dest = SocketAddr::from((Ipv4Addr::BROADCAST, port));

        match local_ip_address::local_ip() {
            Ok(ip) => log::debug!("[bcast] open port={} local_ip={}", port, ip),
            Err(err) => log::debug!("[bcast] open port={} local_ip=<unknown: {}>", port, err),
        }

        let (tx, updates) = unbounded();
        let running = Arc::new(AtomicBool::new(true));
        let metrics = RxMetrics::new();

        let running_clone = Arc::clone(&running);
        let metrics_clone = Arc::clone(&metrics);
        let handle = std::thread::Builder::new()
            .name("playsync-rx".to_owned())
            .spawn(move || {
                listener::run_loop(recv_socket, tx, running_clone, metrics_clone);
            })
            .map_err(|e| Error::SpawnFailed(e.to_string()))?;

        Ok(Self {
            send_socket,
            dest,
            updates,
            running,
            handle: Some(handle),
            metrics,
        })
    }

    /// Fire-and-forget broadcast of one frame.
    ///
    /// No acknowledgment, no retry, no delivery guarantee.
    ///
    /// # Errors
    ///
    /// Returns `Error::SendFailed` if the kernel rejects the send.
    pub fn send(&self, frame: &[u8]) -> Result<()> {
        let sent = self
            .send_socket
            .send_to(frame, self.dest)
            .map_err(|e| Error::SendFailed(format!("{}: {}", self.dest, e)))?;
        log::trace!("[bcast] sent len={} dest={}", sent, self.dest);
        Ok(())
    }

    /// Remove and return every update currently queued.
    ///
    /// Never blocks; returns an empty vector when nothing is pending.
    #[must_use]
    pub fn drain(&self) -> Vec<PeerUpdate> {
        let mut drained = Vec::new();
        while let Ok(update) = self.updates.try_recv() {
            drained.push(update);
        }
        drained
    }

    /// Broadcast destination address.
    #[must_use]
    pub fn dest(&self) -> SocketAddr {
        self.dest
    }

    /// Signal the rx thread to stop and wait for it.
    ///
    /// Also invoked on `Drop`; call explicitly when synchronous shutdown
    /// matters.
    pub fn shutdown(mut self) {
        self.stop_rx_thread();
    }

    fn stop_rx_thread(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for BroadcastTransport {
    fn drop(&mut self) {
        self.stop_rx_thread();
    }
}

/// Broadcast-capable send socket on an ephemeral port.
fn build_send_socket() -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| Error::BindFailed(format!("send socket: {}", e)))?;
    socket
        .set_broadcast(true)
        .map_err(|e| Error::BindFailed(format!("send socket SO_BROADCAST: {}", e)))?;
    let bind_addr: SocketAddr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
    socket
        .bind(&bind_addr.into())
        .map_err(|e| Error::BindFailed(format!("send socket {}: {}", bind_addr, e)))?;
    Ok(socket.into())
}

/// Receive socket bound to the fixed port, shareable between local
/// processes.
fn build_recv_socket(port: u16) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| Error::BindFailed(format!("recv socket: {}", e)))?;
    socket
        .set_broadcast(true)
        .map_err(|e| Error::BindFailed(format!("recv socket SO_BROADCAST: {}", e)))?;
    socket
        .set_reuse_address(true)
        .map_err(|e| Error::BindFailed(format!("recv socket SO_REUSEADDR: {}", e)))?;
    #[cfg(unix)]
    set_reuseport(&socket).map_err(|e| Error::BindFailed(format!("recv socket SO_REUSEPORT: {}", e)))?;

    let bind_addr: SocketAddr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    socket
        .bind(&bind_addr.into())
        .map_err(|e| Error::BindFailed(format!("recv socket {}: {}", bind_addr, e)))?;

    let socket: UdpSocket = socket.into();
    // Required by the mio-driven rx loop.
    socket
        .set_nonblocking(true)
        .map_err(|e| Error::BindFailed(format!("recv socket nonblocking: {}", e)))?;
    Ok(socket)
}

/// Set SO_REUSEPORT so several local participants can bind the same
/// port on one host. Only available on Unix systems.
#[cfg(unix)]
fn set_reuseport(socket: &Socket) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;
    let fd = socket.as_raw_fd();
    let optval: libc::c_int = 1;
    // SAFETY: setsockopt FFI with valid fd, standard socket option, and
    // correctly sized optval pointer
    let ret = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEPORT,
            &optval as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{encode_frame, Position};
    use std::time::Duration;

    #[test]
    #[ignore = "requires UDP socket, flaky in CI"]
    fn test_loopback_frame_delivery() {
        let transport =
            BroadcastTransport::open_on_port(46368).expect("transport open should succeed");

        let sender = UdpSocket::bind("0.0.0.0:0").expect("socket bind should succeed");
        let frame = encode_frame("h2_user", Position::new(1.0, 2.0, 3.0));
        sender
            .send_to(&frame, "127.0.0.1:46368")
            .expect("socket send should succeed");

        std::thread::sleep(Duration::from_millis(150));

        let updates = transport.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].name, "h2_user");
        assert_eq!(updates[0].position, Position::new(1.0, 2.0, 3.0));

        let (received, dropped, bytes) = transport.metrics.snapshot();
        assert_eq!(received, 1);
        assert_eq!(dropped, 0);
        assert_eq!(bytes, frame.len() as u64);

        transport.shutdown();
    }

    #[test]
    #[ignore = "requires UDP socket, flaky in CI"]
    fn test_garbage_datagram_does_not_stop_reception() {
        let transport =
            BroadcastTransport::open_on_port(46369).expect("transport open should succeed");

        let sender = UdpSocket::bind("0.0.0.0:0").expect("socket bind should succeed");
        let garbage = [0xABu8; 10];
        sender
            .send_to(&garbage, "127.0.0.1:46369")
            .expect("socket send should succeed");
        let frame = encode_frame("h1_user", Position::new(0.0, 0.0, 0.0));
        sender
            .send_to(&frame, "127.0.0.1:46369")
            .expect("socket send should succeed");

        std::thread::sleep(Duration::from_millis(150));

        let updates = transport.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].name, "h1_user");

        let (received, dropped, _) = transport.metrics.snapshot();
        assert_eq!(received, 2);
        assert_eq!(dropped, 1);

        transport.shutdown();
    }

    #[test]
    #[ignore = "requires UDP socket, flaky in CI"]
    fn test_drain_is_non_blocking_when_empty() {
        let transport =
            BroadcastTransport::open_on_port(46370).expect("transport open should succeed");
        assert!(transport.drain().is_empty());
        transport.shutdown();
    }
}
