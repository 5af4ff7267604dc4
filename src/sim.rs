//! Discrete-event driver for stations on point-to-point links
//!
//! A [`Scheduler`] holds every pending event in time order, each tagged with
//! the station it belongs to. Stations see it through a [`StationTimer`] and
//! a [`LinkEnd`], so the MAC itself never knows it is being simulated.
//! Events at the same time are delivered in the order they were scheduled.
//
// https://github.com/rust-iot/rust-ethermac
// Copyright 2021 Ryan Kurte

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::vec::Vec;

use log::{debug, info, warn};

use crate::{Ts, UpperLayer, Wire};
use crate::address::SequentialAllocator;
use crate::config::Config;
use crate::connectivity::{Connectivity, ConnectionResolution, Endpoint, LinkPath, PathEnd};
use crate::error::MacError;
use crate::frame::{Frame, Traffic};
use crate::mac::EtherMac;
use crate::stats::MacStats;
use crate::timer::{Timer, TimerEvent};

/// Simulation events
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Engine timer expiry
    Timer(TimerEvent),
    /// Traffic arriving from the link
    Deliver(Traffic),
    /// Frame handed down by the upper layer
    Submit(Frame),
}

#[derive(Debug, Default)]
struct Inner {
    now: Ts,
    seq: u64,
    events: BTreeMap<(Ts, u64), (usize, Event)>,
}

/// Shared, time ordered event list
#[derive(Clone, Debug, Default)]
pub struct Scheduler(Rc<RefCell<Inner>>);

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time
    pub fn now(&self) -> Ts {
        self.0.borrow().now
    }

    /// Schedule an event for a station
    pub fn schedule(&self, at: Ts, station: usize, event: Event) {
        let mut inner = self.0.borrow_mut();

        let seq = inner.seq;
        inner.seq += 1;

        inner.events.insert((at, seq), (station, event));
    }

    /// Remove pending timer events for a station
    pub fn cancel(&self, station: usize, event: TimerEvent) {
        self.0.borrow_mut().events.retain(|_, (s, e)| {
            !(*s == station && *e == Event::Timer(event))
        });
    }

    /// Time of the next pending event
    pub fn next_time(&self) -> Option<Ts> {
        self.0.borrow().events.keys().next().map(|(at, _)| *at)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().events.is_empty()
    }

    /// Take the next event, advancing time to it
    fn pop(&self) -> Option<(Ts, usize, Event)> {
        let mut inner = self.0.borrow_mut();

        let key = *inner.events.keys().next()?;
        let (station, event) = inner.events.remove(&key)?;
        inner.now = key.0;

        Some((key.0, station, event))
    }

    /// Advance time without processing events
    fn advance(&self, to: Ts) {
        let mut inner = self.0.borrow_mut();
        inner.now = inner.now.max(to);
    }
}

/// Per-station view of the scheduler
#[derive(Clone, Debug)]
pub struct StationTimer {
    sched: Scheduler,
    station: usize,
}

impl Timer for StationTimer {
    fn now(&self) -> Ts {
        self.sched.now()
    }

    fn schedule(&mut self, at: Ts, event: TimerEvent) {
        self.sched.schedule(at, self.station, Event::Timer(event));
    }

    fn cancel(&mut self, event: TimerEvent) {
        self.sched.cancel(self.station, event);
    }
}

/// Link parameters
#[derive(Clone, Debug, PartialEq)]
pub struct LinkConfig {
    /// Propagation delay
    pub delay: Ts,

    /// Corrupt every n'th frame sent in each direction
    pub error_every: Option<u64>,

    /// Whether the link is wired through
    pub connected: bool,

    /// Stations sit in different partitions and must resolve connectivity
    /// through the resolution exchange
    pub partitioned: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            delay: 0,
            error_every: None,
            connected: true,
            partitioned: false,
        }
    }
}

/// Transmit side of a point-to-point link
#[derive(Clone, Debug)]
pub struct LinkEnd {
    sched: Scheduler,
    peer: usize,
    delay: Ts,
    error_every: Option<u64>,
    sent: u64,
}

impl Wire for LinkEnd {
    fn transmit(&mut self, mut frame: Frame) {
        self.sent += 1;

        if let Some(n) = self.error_every {
            if n > 0 && self.sent % n == 0 {
                debug!("Corrupting frame {} in flight", frame);
                frame.bit_error = true;
            }
        }

        // Delivered once the last bit arrives
        let at = self.sched.now().saturating_add(frame.duration).saturating_add(self.delay);
        self.sched.schedule(at, self.peer, Event::Deliver(frame.into()));
    }
}

/// Upper layer stand-in, collects delivered frames
#[derive(Clone, Debug, Default)]
pub struct Inbox {
    frames: Rc<RefCell<Vec<Frame>>>,
    requests: Rc<RefCell<usize>>,
}

impl Inbox {
    pub fn frames(&self) -> Vec<Frame> {
        self.frames.borrow().clone()
    }

    /// Number of frames requested in external queue mode
    pub fn requests(&self) -> usize {
        *self.requests.borrow()
    }
}

impl UpperLayer for Inbox {
    fn deliver(&mut self, frame: Frame) {
        self.frames.borrow_mut().push(frame);
    }

    fn request_frame(&mut self) {
        *self.requests.borrow_mut() += 1;
    }
}

/// Simulated station
pub type Station<const Q: usize> = EtherMac<LinkEnd, Inbox, MacStats, StationTimer, Q>;

/// Discrete-event simulation of MAC stations
pub struct Simulation<const Q: usize> {
    sched: Scheduler,
    stations: Vec<Station<Q>>,
    inboxes: Vec<Inbox>,
}

impl <const Q: usize> Simulation<Q> {
    /// Connect two stations with a full duplex link
    pub fn point_to_point(a: Config, b: Config, link: &LinkConfig) -> Result<Self, MacError> {
        let sched = Scheduler::new();
        let mut allocator = SequentialAllocator::new();

        let paths = [path(0, link), path(1, link)];

        // Setup barrier, every station publishes then the far partition
        // observes which of its gates are wired up
        let mut resolution: ConnectionResolution<4> = ConnectionResolution::new();
        for p in paths.iter() {
            resolution.publish(p)?;
        }
        if link.connected {
            let pending: Vec<Endpoint> = resolution.pending().copied().collect();
            for ep in pending.iter() {
                resolution.observe(ep);
            }
        }
        let links: Vec<Connectivity> = paths.iter().map(|p| resolution.resolve(p)).collect();

        let mut stations = Vec::with_capacity(2);
        let mut inboxes = Vec::with_capacity(2);

        for (i, (cfg, conn)) in [a, b].iter().zip(links.iter()).enumerate() {
            let timer = StationTimer { sched: sched.clone(), station: i };
            let wire = LinkEnd {
                sched: sched.clone(),
                peer: 1 - i,
                delay: link.delay,
                error_every: link.error_every,
                sent: 0,
            };
            let inbox = Inbox::default();

            let mac = EtherMac::new(cfg.clone(), conn, &mut allocator, wire, inbox.clone(), MacStats::new(), timer)?;
            info!("Station {} at {}", i, mac.address());

            stations.push(mac);
            inboxes.push(inbox);
        }

        Ok(Self { sched, stations, inboxes })
    }

    pub fn now(&self) -> Ts {
        self.sched.now()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.sched
    }

    /// Hand a frame to a station's MAC at the given time
    pub fn submit_at(&mut self, at: Ts, station: usize, frame: Frame) {
        self.sched.schedule(at, station, Event::Submit(frame));
    }

    /// Process the next event, returning its time or `None` when idle
    pub fn step(&mut self) -> Result<Option<Ts>, MacError> {
        let (at, index, event) = match self.sched.pop() {
            Some(e) => e,
            None => return Ok(None),
        };

        let station = match self.stations.get_mut(index) {
            Some(s) => s,
            None => {
                warn!("Dropping event for unknown station {}", index);
                return Ok(Some(at));
            }
        };

        let r = match event {
            Event::Timer(e) => station.handle_timer(e),
            Event::Deliver(t) => station.on_frame_from_network(t),
            Event::Submit(f) => station.submit(f),
        };

        match r {
            Err(e) if !e.is_fatal() => warn!("Station {}: {}", index, e),
            Err(e) => return Err(e),
            Ok(_) => (),
        }

        Ok(Some(at))
    }

    /// Run all events up to and including `end`, returning the number processed
    pub fn run_until(&mut self, end: Ts) -> Result<usize, MacError> {
        let mut n = 0;

        while let Some(at) = self.sched.next_time() {
            if at > end {
                break;
            }
            self.step()?;
            n += 1;
        }

        self.sched.advance(end);

        Ok(n)
    }

    /// Run until no events remain
    pub fn run(&mut self) -> Result<usize, MacError> {
        let mut n = 0;
        while self.step()?.is_some() {
            n += 1;
        }
        Ok(n)
    }

    pub fn station(&self, index: usize) -> Option<&Station<Q>> {
        self.stations.get(index)
    }

    pub fn station_mut(&mut self, index: usize) -> Option<&mut Station<Q>> {
        self.stations.get_mut(index)
    }

    /// Frames delivered to a station's upper layer
    pub fn received(&self, index: usize) -> Vec<Frame> {
        self.inboxes.get(index).map(|i| i.frames()).unwrap_or_default()
    }

    /// Frames requested by a station in external queue mode
    pub fn requests(&self, index: usize) -> usize {
        self.inboxes.get(index).map(|i| i.requests()).unwrap_or(0)
    }
}

/// Link path of station `i` on a point-to-point link
fn path(i: usize, link: &LinkConfig) -> LinkPath {
    if !link.partitioned {
        let end = PathEnd::Local { connected: link.connected };
        return LinkPath { tx: end, rx: end };
    }

    let peer = (1 - i) as u32;
    LinkPath {
        tx: PathEnd::Remote(Endpoint { module: peer, gate: 0 }),
        rx: PathEnd::Remote(Endpoint { module: peer, gate: 1 }),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scheduler_ordering() {
        let s = Scheduler::new();

        s.schedule(20, 0, Event::Timer(TimerEvent::EndIfg));
        s.schedule(10, 1, Event::Timer(TimerEvent::EndTx));
        s.schedule(10, 0, Event::Timer(TimerEvent::EndPause));

        // Time order, then insertion order
        assert_eq!(s.pop(), Some((10, 1, Event::Timer(TimerEvent::EndTx))));
        assert_eq!(s.pop(), Some((10, 0, Event::Timer(TimerEvent::EndPause))));
        assert_eq!(s.now(), 10);
        assert_eq!(s.pop(), Some((20, 0, Event::Timer(TimerEvent::EndIfg))));
        assert_eq!(s.pop(), None);
    }

    #[test]
    fn scheduler_cancel() {
        let s = Scheduler::new();

        s.schedule(10, 0, Event::Timer(TimerEvent::EndPause));
        s.schedule(10, 1, Event::Timer(TimerEvent::EndPause));

        s.cancel(0, TimerEvent::EndPause);

        assert_eq!(s.len(), 1);
        assert_eq!(s.pop(), Some((10, 1, Event::Timer(TimerEvent::EndPause))));
    }

    #[test]
    fn partitioned_paths() {
        let link = LinkConfig{ partitioned: true, ..Default::default() };

        let p = path(0, &link);
        assert_eq!(p.tx, PathEnd::Remote(Endpoint{ module: 1, gate: 0 }));
    }
}
