//! Ethernet MAC link simulation
//!
//! Runs two stations over a full duplex point-to-point link, with one
//! station streaming frames and the other optionally issuing PAUSE
//! requests, then reports per-station statistics.
//
// https://github.com/rust-iot/rust-ethermac
// Copyright 2021 Ryan Kurte

use std::time::Duration;

use bytes::Bytes;
use log::{debug, info};
use structopt::StructOpt;

use ethermac::prelude::*;
use ethermac::sim::{LinkConfig, Simulation};

#[derive(Debug, StructOpt)]
struct Options {
    #[structopt(long, default_value="100000000")]
    /// Line rate in bits per second
    pub line_rate: u64,

    #[structopt(long, default_value="100")]
    /// Number of frames sent from station 0 to station 1
    pub frames: usize,

    #[structopt(long, default_value="512")]
    /// Frame payload length in bytes
    pub payload: usize,

    #[structopt(long, default_value="10us", parse(try_from_str = humantime::parse_duration))]
    /// Interval between frame submissions
    pub interval: Duration,

    #[structopt(long, default_value="10ms", parse(try_from_str = humantime::parse_duration))]
    /// Simulated run time
    pub duration: Duration,

    #[structopt(long, default_value="0s", parse(try_from_str = humantime::parse_duration))]
    /// Link propagation delay
    pub delay: Duration,

    #[structopt(long)]
    /// PAUSE units requested by station 1
    pub pause_units: Option<u16>,

    #[structopt(long, default_value="100us", parse(try_from_str = humantime::parse_duration))]
    /// Time at which station 1 issues its PAUSE request
    pub pause_at: Duration,

    #[structopt(long)]
    /// Corrupt every n'th frame on the link
    pub error_every: Option<u64>,

    #[structopt(long)]
    /// Leave the link unwired
    pub disconnected: bool,

    #[structopt(long)]
    /// Place stations in separate partitions
    pub partitioned: bool,

    #[structopt(long, default_value="64")]
    /// Transmit queue limit
    pub queue_limit: usize,

    #[structopt(long, default_value = "info")]
    /// Configure log level
    pub log_level: simplelog::LevelFilter,
}

/// Simulated picoseconds for a wall-clock style duration
fn ps(d: Duration) -> Ts {
    (d.as_nanos() * 1_000) as Ts
}

fn main() -> anyhow::Result<()> {
    // Load options
    let opts = Options::from_args();

    // Initialise logging
    let log_cfg = simplelog::ConfigBuilder::new()
        .set_time_level(simplelog::LevelFilter::Off)
        .build();
    let _ = simplelog::SimpleLogger::init(opts.log_level, log_cfg);

    info!("Starting link-sim");

    let mac_config = MacConfig {
        line_rate: opts.line_rate,
        queue: QueueMode::Internal { limit: opts.queue_limit },
        overflow: OverflowPolicy::Backpressure,
        ..Default::default()
    };

    let link = LinkConfig {
        delay: ps(opts.delay),
        error_every: opts.error_every,
        connected: !opts.disconnected,
        partitioned: opts.partitioned,
    };

    debug!("Initialising stations");

    let mut sim = match Simulation::<128>::point_to_point(mac_config.clone(), mac_config, &link) {
        Ok(s) => s,
        Err(e) => {
            return Err(anyhow::anyhow!("Error initialising simulation: {}", e));
        }
    };

    let dest = match sim.station(1) {
        Some(s) => s.address(),
        None => return Err(anyhow::anyhow!("Missing station 1")),
    };

    let payload = Bytes::from(vec![0xa5u8; opts.payload]);
    for i in 0..opts.frames {
        let at = ps(opts.interval) * i as Ts;
        sim.submit_at(at, 0, Frame::data(dest, 0x0800, payload.clone()));
    }

    if let Some(units) = opts.pause_units {
        sim.submit_at(ps(opts.pause_at), 1, Frame::pause(units));
    }

    debug!("Running simulation");

    let end = ps(opts.duration);
    let events = match sim.run_until(end) {
        Ok(n) => n,
        Err(e) => {
            return Err(anyhow::anyhow!("Simulation error at {} ps: {}", sim.now(), e));
        }
    };

    info!("Processed {} events in {:?} simulated", events, opts.duration);

    for i in 0..2 {
        let station = match sim.station(i) {
            Some(s) => s,
            None => continue,
        };
        let stats = station.stats();

        println!("Station {} ({})", i, station.address());
        println!("  sent:     {} frames, {} bytes, {} pause frames",
            stats.frames_sent, stats.bytes_sent, stats.pause_frames_sent);
        println!("  received: {} frames, {} bytes, {} pause frames ({} units)",
            stats.frames_received_ok, stats.bytes_received_ok,
            stats.pause_frames_received, stats.pause_units_received);
        println!("  dropped:  {} not connected, {} bit errors, {} from upper",
            stats.dropped_not_connected, stats.dropped_bit_error,
            stats.dropped_from_upper_not_connected);

        if let Some(s) = stats.summary(sim.now()) {
            println!("  rx utilization {:.2}%, idle {:.2}%", s.rx_utilization_percent, s.rx_idle_percent);
        }
    }

    Ok(())
}
