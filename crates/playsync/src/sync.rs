// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-rate synchronization loop.
//!
//! Each tick: resolve the local device if needed, broadcast its pose,
//! drain inbound updates through the self filter into the registry,
//! render every known peer, then sleep away whatever is left of the
//! tick budget. A slow tick shrinks the sleep to zero and the next tick
//! starts immediately; lost ticks are never compensated.
//!
//! Failure containment per tick:
//! - no local device yet: skip the broadcast step, retry next tick
//! - pose sample unavailable: no update this tick
//! - send failure: logged, next tick retries
//! - renderer panic: caught at the call boundary, loop continues

use crate::config::SyncConfig;
use crate::identity;
use crate::registry::{self, PeerRegistry};
use crate::runtime::{DeviceClass, LocalDevice, PoseRenderer, TrackingRuntime};
use crate::transport::BroadcastTransport;
use crate::wire::encode_frame;
use crate::Result;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Driver that ties pose sampling, the wire codec, the transport, the
/// registry, and rendering together at a fixed rate.
///
/// Single-threaded: sole writer of the registry and sole consumer of
/// the transport's inbound queue.
pub struct SyncLoop<R: TrackingRuntime, V: PoseRenderer> {
    identity: String,
    tick_interval: Duration,
    transport: BroadcastTransport,
    registry: PeerRegistry,
    runtime: R,
    renderer: V,
    local_devices: Vec<LocalDevice>,
}

impl<R: TrackingRuntime, V: PoseRenderer> SyncLoop<R, V> {
    /// Build a loop, opening the transport and resolving the local
    /// identity.
    ///
    /// # Errors
    ///
    /// Returns `Error::BindFailed` when the transport cannot bind and
    /// `Error::InvalidIdentity` when no identity can be resolved.
    pub fn new(config: SyncConfig, runtime: R, renderer: V) -> Result<Self> {
        let identity = match config.identity.clone() {
            Some(identity) => identity,
            None => identity::local_identity()?,
        };
        let transport = BroadcastTransport::open_on_port(config.port)?;

        log::info!(
            "[sync] session identity={} port={} rate={}Hz",
            identity,
            config.port,
            config.tick_rate_hz
        );

        Ok(Self {
            identity,
            tick_interval: config.tick_interval(),
            transport,
            registry: PeerRegistry::new(),
            runtime,
            renderer,
            local_devices: Vec::new(),
        })
    }

    /// Steady-state loop; returns once `shutdown` is set.
    ///
    /// Dropping the loop afterwards stops the transport's receive
    /// thread and closes both sockets.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        log::info!("[sync] loop started");
        while !shutdown.load(Ordering::Relaxed) {
            let started = Instant::now();
            self.tick();
            let remaining = remaining_sleep(started.elapsed(), self.tick_interval);
            if !remaining.is_zero() {
                std::thread::sleep(remaining);
            }
        }
        log::info!("[sync] loop stopped");
    }

    /// One full tick. Exposed so callers can drive the loop from their
    /// own scheduler.
    pub fn tick(&mut self) {
        self.resolve_local_device();
        self.broadcast_local();
        self.ingest_updates();
        self.render_peers();
    }

    /// Find a local device to broadcast, once. Headset preferred,
    /// generic tracker as fallback. Absence just skips broadcasting
    /// this tick.
    fn resolve_local_device(&mut self) {
        if !self.local_devices.is_empty() {
            return;
        }
        let handle = self
            .runtime
            .enumerate_device(DeviceClass::Hmd)
            .or_else(|| self.runtime.enumerate_device(DeviceClass::GenericTracker));
        match handle {
            Some(handle) => {
                log::info!("[sync] local device resolved slot={}", handle.0);
                self.local_devices.push(LocalDevice::new(handle));
            }
            None => log::debug!("[sync] no local device yet"),
        }
    }

    fn broadcast_local(&mut self) {
        for device in &self.local_devices {
            let Some(position) = self.runtime.sample_pose(device.handle()) else {
                continue;
            };
            let frame = encode_frame(&self.identity, position);
            if let Err(err) = self.transport.send(&frame) {
                log::debug!("[sync] broadcast failed: {}", err);
            }
        }
    }

    /// Drain inbound updates, discard our own broadcasts, apply the
    /// rest. Returns how many updates survived the filter.
    fn ingest_updates(&mut self) -> usize {
        let mut applied = 0;
        for update in self.transport.drain() {
            if registry::self_filter(&update.name, &self.identity) {
                log::trace!("[sync] discarding own broadcast");
                continue;
            }
            self.registry.apply(&update.name, update.position);
            applied += 1;
        }
        applied
    }

    fn render_peers(&mut self) {
        let local_headset = self
            .local_devices
            .first()
            .and_then(|device| self.runtime.sample_pose(device.handle()));

        for (name, device) in self.registry.all() {
            let result = catch_unwind(AssertUnwindSafe(|| {
                self.renderer.render(name, device.position(), local_headset);
            }));
            if result.is_err() {
                log::warn!("[sync] renderer panicked for peer {}", name);
            }
        }
    }

    /// Wire identity of this participant.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Read access to the peer table, e.g. for status displays.
    #[must_use]
    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Receive-path counters of the underlying transport.
    #[must_use]
    pub fn transport(&self) -> &BroadcastTransport {
        &self.transport
    }
}

/// Time left in the tick budget. Saturates at zero on overrun, so a
/// slow tick never pushes a compensating negative sleep into the next.
fn remaining_sleep(elapsed: Duration, interval: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}
