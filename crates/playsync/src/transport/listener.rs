// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Background receive loop for the broadcast transport.
//!
//! Runs in a dedicated thread for the transport's lifetime:
//!
//! ```text
//! poll(timeout) -> recv_from drain -> decode_frame -> channel push
//! ```
//!
//! Malformed datagrams are dropped and counted, never surfaced. The
//! loop exits on the shutdown flag or on an unrecoverable socket error.

use super::{PeerUpdate, RxMetrics};
use crate::config::{MAX_DATAGRAM_SIZE, RX_POLL_TIMEOUT};
use crate::wire::decode_frame;
use crossbeam::channel::Sender;
use mio::{Events, Interest, Poll, Token};
use std::io;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const SOCKET_TOKEN: Token = Token(0);

/// Receive loop body. The socket is owned exclusively by this thread.
pub(super) fn run_loop(
    socket: UdpSocket,
    tx: Sender<PeerUpdate>,
    running: Arc<AtomicBool>,
    metrics: Arc<RxMetrics>,
) {
    let local_addr = socket
        .local_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "<unknown>".to_owned());
    log::debug!(
        "[bcast-rx] started addr={} thread={:?}",
        local_addr,
        std::thread::current().id()
    );

    let mut poll = match Poll::new() {
        Ok(poll) => poll,
        Err(err) => {
            log::error!("[bcast-rx] failed to create poll: {}", err);
            return;
        }
    };
    let mut events = Events::with_capacity(16);

    let mut mio_socket = mio::net::UdpSocket::from_std(socket);
    if let Err(err) = poll
        .registry()
        .register(&mut mio_socket, SOCKET_TOKEN, Interest::READABLE)
    {
        log::error!("[bcast-rx] failed to register socket: {}", err);
        return;
    }

    // Reused across iterations; sized so oversized datagrams keep their
    // true length for the frame length check.
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    while running.load(Ordering::Relaxed) {
        if let Err(err) = poll.poll(&mut events, Some(RX_POLL_TIMEOUT)) {
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            log::error!("[bcast-rx] poll failed: {}", err);
            return;
        }

        for event in events.iter() {
            if event.token() != SOCKET_TOKEN {
                continue;
            }

            // Drain all available datagrams for this wakeup.
            loop {
                let len = match mio_socket.recv_from(&mut buf) {
                    Ok((len, _src)) => len,
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        log::error!("[bcast-rx] recv_from failed: {}", err);
                        return;
                    }
                };

                metrics.datagrams_received.fetch_add(1, Ordering::Relaxed);
                metrics
                    .bytes_received
                    .fetch_add(len as u64, Ordering::Relaxed);

                match decode_frame(&buf[..len]) {
                    Ok((name, position)) => {
                        if tx
                            .send(PeerUpdate { name, position })
                            .is_err()
                        {
                            // Consumer gone; nothing left to feed.
                            log::debug!("[bcast-rx] update channel closed, stopping");
                            return;
                        }
                    }
                    Err(err) => {
                        metrics.datagrams_dropped.fetch_add(1, Ordering::Relaxed);
                        log::debug!("[bcast-rx] dropping datagram len={}: {}", len, err);
                    }
                }
            }
        }
    }

    log::debug!("[bcast-rx] stopped addr={}", local_addr);
}
