//! Full duplex Ethernet MAC
//!
//! Transmit state machine:
//!
//! ```text
//!            submit / staged frame
//!   Idle ─────────────────────────────▶ Transmitting
//!    ▲ ▲                                    │ EndTx
//!    │ │  EndIfg (nothing staged)           ▼
//!    │ └──────────────────────────────── WaitIfg ◀── (no pause pending)
//!    │    EndPause (nothing staged)         │
//!    └───────────────────────────────── Paused ◀──── (pause pending)
//! ```
//!
//! `EndIfg` and `EndPause` with a staged frame re-enter `Transmitting`.
//! PAUSE frames received while idle pause immediately, while paused restart
//! the pause timer, and otherwise are latched until the transmitter is free.
//
// https://github.com/rust-iot/rust-ethermac
// Copyright 2021 Ryan Kurte

use log::{trace, debug, info, warn, error};

use crate::{Ts, UpperLayer, Wire};
use crate::address::{AddressAllocator, MacAddress};
use crate::config::Config;
use crate::connectivity::LinkConnectivity;
use crate::error::MacError;
use crate::frame::{Frame, Traffic};
use crate::queue::TxQueue;
use crate::stats::{DropReason, MacEvent, StatsSink};
use crate::timer::{Timer, TimerEvent};

/// Transmitter states
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display)]
pub enum TxState {
    Idle,
    Transmitting,
    WaitIfg,
    Paused,
}

/// Full duplex Ethernet MAC.
/// Generic over a Wire (W), Upper layer (U), Stats sink (S), Timer (T)
/// and transmit queue storage (Q)
pub struct EtherMac<W, U, S, T, const Q: usize> {
    address: MacAddress,
    config: Config,

    wire: W,
    upper: U,
    stats: S,
    timer: T,

    state: TxState,
    connected: bool,
    disabled: bool,
    operational: bool,

    queue: TxQueue<Q>,

    /// Frame staged for, or under, transmission
    cur_tx: Option<Frame>,

    /// Pause units received while the transmitter was busy
    pause_units_requested: u16,

    last_tx_finish: Ts,
}

impl <W, U, S, T, const Q: usize> EtherMac<W, U, S, T, Q>
where
    W: Wire,
    U: UpperLayer,
    S: StatsSink,
    T: Timer,
{
    /// Create a new MAC.
    ///
    /// Link connectivity must be resolved prior to construction and is fixed
    /// for the lifetime of the MAC, the allocator is only consulted for
    /// `auto` addresses.
    pub fn new(
        config: Config,
        link: &impl LinkConnectivity,
        allocator: &mut impl AddressAllocator,
        wire: W,
        upper: U,
        stats: S,
        timer: T,
    ) -> Result<Self, MacError> {
        if let Err(e) = config.validate() {
            error!("Invalid MAC configuration: {}", e);
            return Err(e);
        }

        let queue = TxQueue::new(config.queue, config.overflow)?;
        let address = config.address.resolve(allocator);

        let mut s = Self {
            address,
            config,

            wire,
            upper,
            stats,
            timer,

            state: TxState::Idle,
            connected: link.is_connected(),
            disabled: false,
            operational: true,

            queue,
            cur_tx: None,
            pause_units_requested: 0,
            last_tx_finish: 0,
        };

        info!("Setup MAC with address {} at {} ps", s.address, s.timer.now());

        if !s.connected {
            warn!("MAC {} not connected to a network", s.address);
        } else if s.queue.is_external() {
            s.upper.request_frame();
        }

        s.begin_send_frames()?;

        Ok(s)
    }

    /// Fetch station address
    pub fn address(&self) -> MacAddress {
        self.address
    }

    /// Fetch transmitter state
    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_operational(&self) -> bool {
        self.operational
    }

    /// Pause units latched for application once the transmitter is free
    pub fn pending_pause(&self) -> u16 {
        self.pause_units_requested
    }

    /// Frame staged for, or under, transmission
    pub fn current_frame(&self) -> Option<&Frame> {
        self.cur_tx.as_ref()
    }

    /// Number of frames waiting in the internal queue
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Time the last transmission completed
    pub fn last_tx_finish(&self) -> Ts {
        self.last_tx_finish
    }

    /// Fetch the statistics sink
    pub fn stats(&self) -> &S {
        &self.stats
    }

    /// Administratively enable or disable the MAC
    pub fn set_disabled(&mut self, disabled: bool) {
        if self.disabled == disabled {
            return;
        }

        info!("MAC {} {}", self.address, if disabled { "disabled" } else { "enabled" });
        self.disabled = disabled;

        // Resume pulling from an external queue
        if !disabled && self.connected && self.operational
                && self.queue.is_external() && self.cur_tx.is_none() {
            self.upper.request_frame();
        }
    }

    /// Accept a frame from the upper layer for transmission
    pub fn submit(&mut self, mut frame: Frame) -> Result<(), MacError> {
        let now = self.timer.now();

        frame.pad(self.config.min_frame_bytes);

        debug!("Received frame from upper layer: {}", frame);
        self.stats.record(now, MacEvent::ReceivedFromUpper { length: frame.length() });

        if frame.dest == self.address {
            error!("Frame {} from upper layer has local MAC address as destination", frame);
            return Err(MacError::FrameToSelf(frame));
        }

        if frame.length() > self.config.max_frame_bytes {
            error!("Frame from upper layer ({} bytes) exceeds maximum frame size ({})",
                frame.length(), self.config.max_frame_bytes);
            return Err(MacError::FrameTooLong {
                length: frame.length(),
                max: self.config.max_frame_bytes,
            });
        }

        if let Some(reason) = self.link_down_reason() {
            warn!("Interface unavailable ({}), dropping frame {}", reason, frame);
            self.stats.record(now, MacEvent::DroppedFromUpper { reason });

            if self.operational && self.queue.is_external() {
                self.upper.request_frame();
            }
            return Ok(());
        }

        // Fill in source address if not set
        if frame.src.is_unspecified() {
            frame.src = self.address;
        }

        let accepted = (!frame.is_pause()).then(|| frame.length());

        if self.queue.is_external() {
            if self.cur_tx.is_some() {
                error!("Frame {} supplied while a frame is already pending", frame);
                return Err(MacError::TransmitPending(frame));
            }
            self.cur_tx = Some(frame);

        } else {
            debug!("Frame {} arrived from upper layer, enqueueing", frame);
            self.queue.push(frame)?;

            if self.cur_tx.is_none() {
                self.cur_tx = self.queue.pop();
            }
        }

        // Only count admitted data frames
        if let Some(length) = accepted {
            self.stats.record(now, MacEvent::AcceptedFromUpper { length });
        }

        if self.state == TxState::Idle {
            self.start_frame_transmission()?;
        }

        Ok(())
    }

    /// Handle an engine timer expiry
    pub fn handle_timer(&mut self, event: TimerEvent) -> Result<(), MacError> {
        trace!("Timer {} at {} ps in state {}", event, self.timer.now(), self.state);

        if !self.operational {
            error!("Timer {} fired while MAC is down", event);
            return Err(MacError::TimerWhileDown(event));
        }

        match event {
            TimerEvent::EndTx => self.on_transmission_end(),
            TimerEvent::EndIfg => self.on_inter_frame_gap_end(),
            TimerEvent::EndPause => self.on_pause_end(),
        }
    }

    /// Transmission of the current frame completed
    pub fn on_transmission_end(&mut self) -> Result<(), MacError> {
        self.expect_state(TxState::Transmitting, TimerEvent::EndTx)?;

        let now = self.timer.now();

        let frame = match self.cur_tx.take() {
            Some(f) => f,
            None => {
                error!("Frame under transmission cannot be found");
                return Err(MacError::MissingFrame);
            }
        };

        self.stats.record(now, MacEvent::SentToLower { length: frame.length() });

        match frame.pause_units() {
            Some(units) => self.stats.record(now, MacEvent::TxPause { units }),
            None => self.stats.record(now, MacEvent::TxData { bytes: frame.length() }),
        }

        debug!("Transmission of {} completed at {} ps", frame, now);

        self.last_tx_finish = now;
        self.next_frame_from_queue();

        if self.pause_units_requested > 0 {
            let units = core::mem::take(&mut self.pause_units_requested);
            debug!("Going to PAUSE mode for {} time units", units);
            self.schedule_end_pause(units);

        } else {
            trace!("Start IFG period");
            self.schedule_end_ifg();
        }

        Ok(())
    }

    /// Inter-frame gap elapsed
    pub fn on_inter_frame_gap_end(&mut self) -> Result<(), MacError> {
        self.expect_state(TxState::WaitIfg, TimerEvent::EndIfg)?;

        trace!("IFG elapsed");

        // Pause received during the gap
        if self.pause_units_requested > 0 {
            let units = core::mem::take(&mut self.pause_units_requested);
            debug!("Going to PAUSE mode for {} time units", units);
            self.schedule_end_pause(units);
            return Ok(());
        }

        self.begin_send_frames()
    }

    /// Pause period elapsed
    pub fn on_pause_end(&mut self) -> Result<(), MacError> {
        self.expect_state(TxState::Paused, TimerEvent::EndPause)?;

        debug!("Pause finished, resuming transmissions");

        self.begin_send_frames()
    }

    /// Handle traffic arriving from the network
    pub fn on_frame_from_network(&mut self, traffic: Traffic) -> Result<(), MacError> {
        let now = self.timer.now();

        if let Some(reason) = self.link_down_reason() {
            // Filler is not counted
            if let Traffic::Frame(frame) = traffic {
                debug!("Interface unavailable ({}), dropping frame {}", reason, frame);
                self.stats.record(now, MacEvent::DroppedFromNetwork { reason });
            }
            return Ok(());
        }

        let frame = match traffic {
            Traffic::Frame(f) => f,
            Traffic::Filler(filler) => {
                error!("Unexpected {} filler, there is no burst mode in full duplex operation", filler);
                return Err(MacError::UnexpectedFiller(filler));
            }
        };

        debug!("Received frame from network: {}", frame);

        if frame.bit_error {
            debug!("Dropping frame {} with bit errors", frame);
            self.stats.record(now, MacEvent::DroppedFromNetwork { reason: DropReason::BitError });
            return Ok(());
        }

        self.stats.record(now, MacEvent::RxBusy { duration: frame.duration });

        if !self.accepts(&frame) {
            debug!("Frame {} not addressed to {}, dropping", frame, self.address);
            self.stats.record(now, MacEvent::FilteredNotForUs);
            return Ok(());
        }

        match frame.pause_units() {
            Some(units) => {
                self.stats.record(now, MacEvent::RxPause { units });
                self.process_pause_command(units)
            },
            None => {
                self.process_received_data_frame(frame);
                Ok(())
            },
        }
    }

    /// Apply a received PAUSE request
    pub fn process_pause_command(&mut self, units: u16) -> Result<(), MacError> {
        if !self.operational {
            debug!("Ignoring PAUSE request for {} units while MAC is down", units);
            return Ok(());
        }

        match self.state {
            TxState::Idle => {
                debug!("PAUSE frame received, pausing for {} time units", units);
                if units > 0 {
                    self.schedule_end_pause(units);
                }
            },
            TxState::Paused => {
                debug!("PAUSE frame received, pausing for {} more time units from now", units);
                self.timer.cancel(TimerEvent::EndPause);

                if units > 0 {
                    self.schedule_end_pause(units);
                } else {
                    return self.begin_send_frames();
                }
            },
            TxState::Transmitting | TxState::WaitIfg => {
                debug!("PAUSE frame received, storing pause request for {} time units", units);
                self.pause_units_requested = units;
            },
        }

        Ok(())
    }

    /// Stop the MAC, cancelling timers and discarding pending frames
    pub fn shutdown(&mut self) {
        if !self.operational {
            return;
        }

        info!("Shutting down MAC {} at {} ps", self.address, self.timer.now());

        self.timer.cancel(TimerEvent::EndTx);
        self.timer.cancel(TimerEvent::EndIfg);
        self.timer.cancel(TimerEvent::EndPause);

        self.flush(DropReason::Down);

        self.pause_units_requested = 0;
        self.state = TxState::Idle;
        self.operational = false;
    }

    /// Restart a shut down MAC
    pub fn restart(&mut self) -> Result<(), MacError> {
        if self.operational {
            return Ok(());
        }

        info!("Restarting MAC {} at {} ps", self.address, self.timer.now());
        self.operational = true;

        if self.connected && !self.disabled && self.queue.is_external() {
            self.upper.request_frame();
        }

        self.begin_send_frames()
    }

    /// Start the staged frame if there is one, otherwise go idle
    fn begin_send_frames(&mut self) -> Result<(), MacError> {
        if self.cur_tx.is_none() {
            self.state = TxState::Idle;

            // Can't tell whether an external queue is empty
            if !self.queue.is_external() {
                trace!("No more frames to send, transmitter set to idle");
            }
            return Ok(());
        }

        if let Some(reason) = self.link_down_reason() {
            self.flush(reason);
            self.state = TxState::Idle;
            return Ok(());
        }

        trace!("Transmit next frame in output queue");
        self.start_frame_transmission()
    }

    /// Put a copy of the staged frame on the wire
    fn start_frame_transmission(&mut self) -> Result<(), MacError> {
        let now = self.timer.now();

        // The staged frame is kept for completion statistics
        let mut frame = match &self.cur_tx {
            Some(f) => f.clone(),
            None => {
                error!("Transmission started with no staged frame");
                return Err(MacError::NoFrameStaged);
            }
        };

        if frame.src.is_unspecified() {
            frame.src = self.address;
        }

        frame.add_framing(self.config.min_frame_bytes);

        let duration = self.config.tx_duration(frame.wire_length());
        frame.duration = duration;

        debug!("Starting transmission of {} at {} ps", frame, now);

        self.wire.transmit(frame);
        self.timer.schedule(now.saturating_add(duration), TimerEvent::EndTx);
        self.state = TxState::Transmitting;

        Ok(())
    }

    fn process_received_data_frame(&mut self, mut frame: Frame) {
        let now = self.timer.now();

        frame.strip_framing();

        self.stats.record(now, MacEvent::RxOk { bytes: frame.length() });
        self.stats.record(now, MacEvent::PassedToUpper { length: frame.length() });

        self.upper.deliver(frame);
    }

    fn next_frame_from_queue(&mut self) {
        if self.queue.is_external() {
            self.upper.request_frame();
        } else {
            self.cur_tx = self.queue.pop();
        }
    }

    fn schedule_end_ifg(&mut self) {
        let at = self.timer.now().saturating_add(self.config.ifg_duration());
        self.timer.schedule(at, TimerEvent::EndIfg);
        self.state = TxState::WaitIfg;
    }

    fn schedule_end_pause(&mut self, units: u16) {
        let at = self.timer.now().saturating_add(self.config.pause_duration(units));
        self.timer.schedule(at, TimerEvent::EndPause);
        self.state = TxState::Paused;
    }

    /// Drop the staged frame and everything queued behind it
    fn flush(&mut self, reason: DropReason) {
        let now = self.timer.now();

        let mut next = self.cur_tx.take();
        while let Some(frame) = next {
            warn!("Interface unavailable ({}), dropping frame {}", reason, frame);
            self.stats.record(now, MacEvent::DroppedFromUpper { reason });
            next = self.queue.pop();
        }
    }

    fn link_down_reason(&self) -> Option<DropReason> {
        if !self.operational {
            Some(DropReason::Down)
        } else if !self.connected {
            Some(DropReason::NotConnected)
        } else if self.disabled {
            Some(DropReason::Disabled)
        } else {
            None
        }
    }

    /// Address filter
    fn accepts(&self, frame: &Frame) -> bool {
        self.config.promiscuous
            || frame.dest == self.address
            || frame.dest.is_multicast()
    }

    fn expect_state(&self, expected: TxState, event: TimerEvent) -> Result<(), MacError> {
        if self.state != expected {
            error!("Timer {} fired in state {} (expected {})", event, self.state, expected);
            return Err(MacError::UnexpectedTimer { event, state: self.state });
        }
        Ok(())
    }
}
