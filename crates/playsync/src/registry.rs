// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Last-known-position table for remote peers.
//!
//! The registry turns unreliable unordered datagrams into a stable
//! "latest position per peer" view. Entries are created on first receipt
//! and overwritten on every later one. There are no sequence numbers, so
//! a reordered older frame silently overwrites newer data, and entries
//! are never removed; both are accepted properties of the protocol.

use crate::wire::Position;
use std::collections::HashMap;

/// A remote tracked entity, known only through received frames.
///
/// Owns its peer name and the last position applied for it. Never
/// sampled from hardware; the position is overwritten on every update.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    name: String,
    position: Position,
}

impl Device {
    fn new(name: String, position: Position) -> Self {
        Self { name, position }
    }

    /// Peer name, immutable for the lifetime of the entry.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last-known position.
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }
}

/// True if `name` is the local participant's own broadcast.
///
/// Updates matching the local identity prefix are discarded before they
/// reach the registry, so a node never treats its own broadcast as a
/// peer.
#[must_use]
pub fn self_filter(name: &str, local_prefix: &str) -> bool {
    name.starts_with(local_prefix)
}

/// Map of peer name to last-known [`Device`].
///
/// Single-writer by design: the sync loop owns the registry and is the
/// only code applying updates, so a plain `HashMap` suffices. Memory
/// grows with the number of distinct peer names ever seen.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    entries: HashMap<String, Device>,
}

impl PeerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Get-or-create the entry for `name`, then overwrite its position.
    ///
    /// Last write wins; applying the same update twice is idempotent.
    /// Always succeeds.
    pub fn apply(&mut self, name: &str, position: Position) {
        if let Some(device) = self.entries.get_mut(name) {
            device.position = position;
        } else {
            log::debug!("[registry] new peer name={} position={}", name, position);
            self.entries
                .insert(name.to_owned(), Device::new(name.to_owned(), position));
        }
    }

    /// Snapshot iterator over `(name, device)` for rendering.
    ///
    /// Iteration order is unspecified.
    pub fn all(&self) -> impl Iterator<Item = (&str, &Device)> {
        self.entries
            .iter()
            .map(|(name, device)| (name.as_str(), device))
    }

    /// Look up a single peer.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Device> {
        self.entries.get(name)
    }

    /// Number of distinct peers ever seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_on_first_receipt() {
        let mut registry = PeerRegistry::new();
        assert!(registry.is_empty());

        registry.apply("h2_user", Position::new(1.0, 1.0, 1.0));
        assert_eq!(registry.len(), 1);
        let device = registry.get("h2_user").expect("entry should exist");
        assert_eq!(device.name(), "h2_user");
        assert_eq!(device.position(), Position::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_last_write_wins() {
        let mut registry = PeerRegistry::new();
        registry.apply("h2_user", Position::new(1.0, 1.0, 1.0));
        registry.apply("h2_user", Position::new(2.0, 2.0, 2.0));

        assert_eq!(registry.len(), 1);
        let device = registry.get("h2_user").expect("entry should exist");
        assert_eq!(device.position(), Position::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut registry = PeerRegistry::new();
        registry.apply("h1_user", Position::new(0.5, 0.5, 0.5));
        registry.apply("h1_user", Position::new(0.5, 0.5, 0.5));

        assert_eq!(registry.len(), 1);
        let device = registry.get("h1_user").expect("entry should exist");
        assert_eq!(device.position(), Position::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn test_distinct_peers_coexist() {
        let mut registry = PeerRegistry::new();
        registry.apply("h1_user", Position::new(1.0, 0.0, 0.0));
        registry.apply("h2_user", Position::new(2.0, 0.0, 0.0));

        assert_eq!(registry.len(), 2);
        let names: Vec<&str> = registry.all().map(|(name, _)| name).collect();
        assert!(names.contains(&"h1_user"));
        assert!(names.contains(&"h2_user"));
    }

    #[test]
    fn test_self_filter() {
        assert!(self_filter("h1_user", "h1_user"));
        assert!(self_filter("h1_user_extra", "h1_user"));
        assert!(!self_filter("h2_user", "h1_user"));
        assert!(!self_filter("", "h1_user"));
        // An empty prefix matches everything; callers always pass a
        // resolved identity.
        assert!(self_filter("anything", ""));
    }
}
