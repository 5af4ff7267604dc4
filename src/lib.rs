//! Full-duplex Ethernet MAC engine
//!
//! Provides the transmit state machine, inter-frame spacing and 802.3x PAUSE
//! flow control for a simulated Ethernet station. The engine is driven by
//! discrete events (frames from the upper layer, frames from the network and
//! engine-owned timers) and talks to its surroundings through the [`Wire`],
//! [`UpperLayer`], [`timer::Timer`] and [`stats::StatsSink`] traits.
//
// https://github.com/rust-iot/rust-ethermac
// Copyright 2021 Ryan Kurte

#![no_std]

#[cfg(any(test, feature="std"))]
extern crate std;

pub mod timer;

pub mod address;

pub mod frame;

pub mod config;

pub mod queue;

pub mod connectivity;

pub mod stats;

pub mod mac;

pub mod error;

pub mod prelude;

#[cfg(any(test, feature="mocks"))]
pub mod mock;

#[cfg(feature="std")]
pub mod sim;

use crate::frame::Frame;

/// Timestamps and durations are 64-bit in picoseconds of simulated time
pub type Ts = u64;

/// Picoseconds per second, for bit-time conversions
pub const PS_PER_SECOND: u128 = 1_000_000_000_000;

/// Network side of the MAC, accepts frames for transmission on the wire.
///
/// Frames handed to the wire carry their on-wire length (including preamble
/// and SFD) and the transmission duration computed by the MAC.
pub trait Wire {
    fn transmit(&mut self, frame: Frame);
}

/// Upper layer side of the MAC
pub trait UpperLayer {
    /// Deliver a received data frame
    fn deliver(&mut self, frame: Frame);

    /// Request the next frame for transmission (external queue mode only)
    fn request_frame(&mut self) {}
}
