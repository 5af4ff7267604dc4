//! MAC statistics
//!
//! The MAC reports everything it does to an injected [`StatsSink`] as
//! [`MacEvent`]s. [`MacStats`] is a counting sink covering the standard
//! Ethernet MAC counters.
//
// https://github.com/rust-iot/rust-ethermac
// Copyright 2021 Ryan Kurte

use crate::Ts;

/// Reasons a frame may be dropped without error
#[derive(Copy, Clone, Debug, PartialEq, strum::Display)]
pub enum DropReason {
    /// Interface not connected to a network
    NotConnected,
    /// MAC administratively disabled
    Disabled,
    /// Frame corrupted on the wire
    BitError,
    /// MAC shut down
    Down,
}

/// MAC observations, emitted synchronously to the sink
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MacEvent {
    /// Any frame received from the upper layer (after padding)
    ReceivedFromUpper { length: usize },
    /// Data frame accepted from the upper layer
    AcceptedFromUpper { length: usize },
    /// Frame from the upper layer dropped
    DroppedFromUpper { reason: DropReason },
    /// Frame transmission completed
    SentToLower { length: usize },
    /// Data frame transmission completed
    TxData { bytes: usize },
    /// PAUSE frame transmission completed
    TxPause { units: u16 },
    /// Frame from the network dropped
    DroppedFromNetwork { reason: DropReason },
    /// Link busy receiving a good frame for `duration`
    RxBusy { duration: Ts },
    /// Data frame received intact and addressed to us
    RxOk { bytes: usize },
    /// PAUSE frame received
    RxPause { units: u16 },
    /// Frame not addressed to this station
    FilteredNotForUs,
    /// Frame handed to the upper layer
    PassedToUpper { length: usize },
}

/// Write-only statistics interface
pub trait StatsSink {
    fn record(&mut self, now: Ts, event: MacEvent);
}

/// Sink that discards all events
impl StatsSink for () {
    fn record(&mut self, _now: Ts, _event: MacEvent) {}
}

/// Counting statistics sink
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MacStats {
    pub frames_received_from_upper: u64,
    pub frames_from_upper: u64,
    pub dropped_from_upper_not_connected: u64,
    pub dropped_from_upper_disabled: u64,
    pub dropped_from_upper_down: u64,

    pub frames_sent_to_lower: u64,
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub pause_frames_sent: u64,
    pub pause_units_sent: u64,

    pub frames_received_ok: u64,
    pub bytes_received_ok: u64,
    pub pause_frames_received: u64,
    pub pause_units_received: u64,
    pub frames_passed_to_upper: u64,
    pub frames_not_for_us: u64,

    pub dropped_not_connected: u64,
    pub dropped_disabled: u64,
    pub dropped_bit_error: u64,
    pub dropped_down: u64,

    /// Cumulative time spent receiving good frames
    pub total_successful_rx_time: Ts,
}

/// Receive channel usage over an interval
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSummary {
    pub rx_idle_percent: f64,
    pub rx_utilization_percent: f64,
}

impl MacStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summarise receive channel usage over `elapsed` time
    pub fn summary(&self, elapsed: Ts) -> Option<LinkSummary> {
        if elapsed == 0 {
            return None;
        }

        let busy = self.total_successful_rx_time.min(elapsed) as f64;
        let elapsed = elapsed as f64;

        Some(LinkSummary {
            rx_idle_percent: 100.0 * (elapsed - busy) / elapsed,
            rx_utilization_percent: 100.0 * busy / elapsed,
        })
    }
}

fn inc(v: &mut u64, n: u64) {
    *v = v.saturating_add(n);
}

impl StatsSink for MacStats {
    fn record(&mut self, _now: Ts, event: MacEvent) {
        use MacEvent::*;

        match event {
            ReceivedFromUpper { .. } => inc(&mut self.frames_received_from_upper, 1),
            AcceptedFromUpper { .. } => inc(&mut self.frames_from_upper, 1),
            DroppedFromUpper { reason } => match reason {
                DropReason::NotConnected => inc(&mut self.dropped_from_upper_not_connected, 1),
                DropReason::Disabled => inc(&mut self.dropped_from_upper_disabled, 1),
                DropReason::Down => inc(&mut self.dropped_from_upper_down, 1),
                // Upper layer frames never cross the wire before drop
                DropReason::BitError => (),
            },
            SentToLower { .. } => inc(&mut self.frames_sent_to_lower, 1),
            TxData { bytes } => {
                inc(&mut self.frames_sent, 1);
                inc(&mut self.bytes_sent, bytes as u64);
            },
            TxPause { units } => {
                inc(&mut self.pause_frames_sent, 1);
                inc(&mut self.pause_units_sent, units as u64);
            },
            DroppedFromNetwork { reason } => match reason {
                DropReason::NotConnected => inc(&mut self.dropped_not_connected, 1),
                DropReason::Disabled => inc(&mut self.dropped_disabled, 1),
                DropReason::BitError => inc(&mut self.dropped_bit_error, 1),
                DropReason::Down => inc(&mut self.dropped_down, 1),
            },
            RxBusy { duration } => {
                self.total_successful_rx_time = self.total_successful_rx_time.saturating_add(duration);
            },
            RxOk { bytes } => {
                inc(&mut self.frames_received_ok, 1);
                inc(&mut self.bytes_received_ok, bytes as u64);
            },
            RxPause { units } => {
                inc(&mut self.pause_frames_received, 1);
                inc(&mut self.pause_units_received, units as u64);
            },
            FilteredNotForUs => inc(&mut self.frames_not_for_us, 1),
            PassedToUpper { .. } => inc(&mut self.frames_passed_to_upper, 1),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn counters() {
        let mut s = MacStats::new();

        s.record(0, MacEvent::TxData{ bytes: 64 });
        s.record(0, MacEvent::TxData{ bytes: 100 });
        s.record(0, MacEvent::TxPause{ units: 7 });
        s.record(0, MacEvent::DroppedFromNetwork{ reason: DropReason::BitError });
        s.record(0, MacEvent::DroppedFromUpper{ reason: DropReason::Disabled });

        assert_eq!(s.frames_sent, 2);
        assert_eq!(s.bytes_sent, 164);
        assert_eq!(s.pause_frames_sent, 1);
        assert_eq!(s.pause_units_sent, 7);
        assert_eq!(s.dropped_bit_error, 1);
        assert_eq!(s.dropped_from_upper_disabled, 1);
        assert_eq!(s.dropped_not_connected, 0);
    }

    #[test]
    fn utilization_summary() {
        let mut s = MacStats::new();
        assert_eq!(s.summary(0), None);

        s.record(0, MacEvent::RxBusy{ duration: 250 });
        s.record(0, MacEvent::RxBusy{ duration: 250 });

        let sum = s.summary(2_000).unwrap();
        assert_eq!(sum.rx_utilization_percent, 25.0);
        assert_eq!(sum.rx_idle_percent, 75.0);
    }
}
