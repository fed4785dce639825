// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end scenarios across the codec, the self filter, and the
//! registry, exercised without sockets so they stay reliable in CI.

use playsync::{decode_frame, encode_frame, self_filter, PeerRegistry, Position};

#[test]
fn frame_round_trips_through_the_wire() {
    let frame = encode_frame("alice_bob", Position::new(1.0, 2.0, 3.0));
    assert_eq!(frame.len(), 224);

    let (name, position) = decode_frame(&frame).expect("decode should succeed");
    assert_eq!(name, "alice_bob");
    assert_eq!(position, Position::new(1.0, 2.0, 3.0));
}

#[test]
fn own_broadcast_is_discarded_and_peer_is_registered() {
    // H1 broadcasts its pose; both hosts receive the same frame.
    let frame = encode_frame("H1_user", Position::new(0.0, 0.0, 0.0));
    let (name, position) = decode_frame(&frame).expect("decode should succeed");

    // H1 drops its own update before the registry.
    let mut h1_registry = PeerRegistry::new();
    if !self_filter(&name, "H1_user") {
        h1_registry.apply(&name, position);
    }
    assert!(h1_registry.is_empty());

    // H2 registers the peer.
    let mut h2_registry = PeerRegistry::new();
    if !self_filter(&name, "H2_user") {
        h2_registry.apply(&name, position);
    }
    let device = h2_registry.get("H1_user").expect("peer should exist");
    assert_eq!(device.position(), Position::new(0.0, 0.0, 0.0));
}

#[test]
fn garbage_datagram_then_valid_frame() {
    let mut registry = PeerRegistry::new();

    // A short garbage datagram is rejected by the decoder and never
    // reaches the registry.
    let mut garbage = [0u8; 10];
    for byte in &mut garbage {
        *byte = fastrand::u8(..);
    }
    if let Ok((name, position)) = decode_frame(&garbage) {
        registry.apply(&name, position);
    }
    assert!(registry.is_empty());

    // The next valid frame is processed normally.
    let frame = encode_frame("H2_user", Position::new(4.0, 5.0, 6.0));
    let (name, position) = decode_frame(&frame).expect("decode should succeed");
    registry.apply(&name, position);
    assert_eq!(registry.len(), 1);
}

#[test]
fn consecutive_updates_keep_only_the_latest() {
    let mut registry = PeerRegistry::new();

    for position in [Position::new(1.0, 1.0, 1.0), Position::new(2.0, 2.0, 2.0)] {
        let frame = encode_frame("H2_user", position);
        let (name, decoded) = decode_frame(&frame).expect("decode should succeed");
        registry.apply(&name, decoded);
    }

    assert_eq!(registry.len(), 1);
    let device = registry.get("H2_user").expect("peer should exist");
    assert_eq!(device.position(), Position::new(2.0, 2.0, 2.0));
}

#[test]
fn random_wrong_length_datagrams_never_decode() {
    for _ in 0..200 {
        let len = loop {
            let candidate = fastrand::usize(..600);
            if candidate != 224 {
                break candidate;
            }
        };
        let mut buf = vec![0u8; len];
        for byte in &mut buf {
            *byte = fastrand::u8(..);
        }
        assert!(decode_frame(&buf).is_err());
    }
}

#[test]
fn random_full_length_datagrams_decode_or_fail_cleanly() {
    // 224-byte noise must either decode (valid UTF-8 name region) or
    // report an encoding error; it must never panic.
    for _ in 0..200 {
        let mut buf = [0u8; 224];
        for byte in &mut buf {
            *byte = fastrand::u8(..);
        }
        if let Err(err) = decode_frame(&buf) {
            assert!(matches!(err, playsync::WireError::Encoding { .. }));
        }
    }
}
