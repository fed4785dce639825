// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! playsync-peer-dump - Dump live shared-playspace peer frames
//!
//! Listens on the broadcast port and prints every decoded pose update,
//! with a per-peer summary on exit.

use clap::Parser;
use colored::*;
use playsync::config::BROADCAST_PORT;
use playsync::{BroadcastTransport, PeerRegistry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Dump live shared-playspace peer frames
#[derive(Parser, Debug)]
#[command(name = "playsync-peer-dump")]
#[command(version = "0.1.0")]
#[command(about = "Dump peer pose frames from the shared-playspace broadcast port")]
struct Args {
    /// UDP port to listen on
    #[arg(short, long, default_value_t = BROADCAST_PORT)]
    port: u16,

    /// Capture duration in seconds (0 = run until Ctrl+C)
    #[arg(long, default_value = "0")]
    timeout: u64,

    /// Quiet mode - summary only, no per-frame lines
    #[arg(long)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    // Setup Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    if !args.quiet {
        eprintln!(
            "{} Listening for peer frames (port={})",
            ">>>".green().bold(),
            args.port
        );
    }

    let transport = BroadcastTransport::open_on_port(args.port)?;
    let mut registry = PeerRegistry::new();
    let mut frames_seen: u64 = 0;

    let deadline = (args.timeout > 0).then(|| Instant::now() + Duration::from_secs(args.timeout));
    while running.load(Ordering::SeqCst) {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }

        for update in transport.drain() {
            frames_seen += 1;
            if !args.quiet {
                println!(
                    "{:>6}  {}  {}",
                    frames_seen,
                    update.name.green(),
                    update.position.to_string().dimmed()
                );
            }
            registry.apply(&update.name, update.position);
        }

        std::thread::sleep(Duration::from_millis(50));
    }

    let (received, dropped, bytes) = transport.metrics.snapshot();
    eprintln!();
    eprintln!(
        "{} {} frame(s) from {} peer(s), {} malformed datagram(s), {} byte(s)",
        ">>>".green().bold(),
        received.saturating_sub(dropped),
        registry.len(),
        dropped,
        bytes
    );
    for (name, device) in registry.all() {
        eprintln!("    {}  last {}", name.green(), device.position());
    }

    transport.shutdown();
    Ok(())
}
