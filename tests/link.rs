//! Two station scenarios over a simulated full duplex link

use bytes::Bytes;

use ethermac::prelude::*;
use ethermac::sim::{LinkConfig, Simulation};

type Sim = Simulation<64>;

// 100 Mbit/s
const BIT: Ts = 10_000;

fn setup(link: LinkConfig) -> Sim {
    let _ = simplelog::SimpleLogger::init(log::LevelFilter::Debug, simplelog::Config::default());

    Sim::point_to_point(MacConfig::default(), MacConfig::default(), &link).unwrap()
}

fn data(dest: MacAddress, len: usize) -> Frame {
    Frame::data(dest, 0x0800, Bytes::from(vec![0x5au8; len]))
}

fn address(sim: &Sim, i: usize) -> MacAddress {
    sim.station(i).unwrap().address()
}

#[test]
fn unique_addresses() {
    let sim = setup(LinkConfig::default());

    assert_eq!(address(&sim, 0), "0A-AA-00-00-00-01".parse::<MacAddress>().unwrap());
    assert_eq!(address(&sim, 1), "0A-AA-00-00-00-02".parse::<MacAddress>().unwrap());
}

#[test]
fn frames_cross_link() {
    let mut sim = setup(LinkConfig::default());
    let (a, b) = (address(&sim, 0), address(&sim, 1));

    sim.submit_at(0, 0, data(b, 100));
    sim.submit_at(0, 1, data(a, 46));
    sim.run().unwrap();

    let rx = sim.received(1);
    assert_eq!(rx.len(), 1);
    assert_eq!(rx[0].src, a);
    assert_eq!(rx[0].length(), 118);
    assert_eq!(rx[0].payload(), &[0x5au8; 100][..]);

    let rx = sim.received(0);
    assert_eq!(rx.len(), 1);
    assert_eq!(rx[0].src, b);

    let s = sim.station(0).unwrap().stats();
    assert_eq!(s.frames_sent, 1);
    assert_eq!(s.frames_received_ok, 1);

    assert_eq!(sim.station(0).unwrap().state(), TxState::Idle);
    assert_eq!(sim.station(1).unwrap().state(), TxState::Idle);
}

#[test]
fn propagation_delay() {
    let delay = 1_000_000;
    let mut sim = setup(LinkConfig{ delay, ..Default::default() });
    let b = address(&sim, 1);

    sim.submit_at(0, 0, data(b, 100));

    let arrival = 126 * 8 * BIT + delay;

    sim.run_until(arrival - 1).unwrap();
    assert!(sim.received(1).is_empty());

    sim.run_until(arrival).unwrap();
    assert_eq!(sim.received(1).len(), 1);
}

#[test]
fn pause_holds_off_peer() {
    let mut sim = setup(LinkConfig::default());
    let b = address(&sim, 1);

    // Station 1 asks station 0 to pause while station 0 is mid-frame
    sim.submit_at(0, 1, Frame::pause(100));
    for _ in 0..3 {
        sim.submit_at(0, 0, data(b, 100));
    }

    let end_tx = 126 * 8 * BIT;
    let end_pause = end_tx + 100 * 512 * BIT;

    sim.run_until(end_pause - 1).unwrap();
    assert_eq!(sim.received(1).len(), 1);
    assert_eq!(sim.station(0).unwrap().state(), TxState::Paused);

    sim.run().unwrap();
    assert_eq!(sim.received(1).len(), 3);

    // PAUSE frames are consumed by the MAC
    assert!(sim.received(0).is_empty());

    assert_eq!(sim.station(1).unwrap().stats().pause_frames_sent, 1);
    assert_eq!(sim.station(0).unwrap().stats().pause_frames_received, 1);
    assert_eq!(sim.station(0).unwrap().stats().pause_units_received, 100);
}

#[test]
fn disconnected_link() {
    let mut sim = setup(LinkConfig{ connected: false, ..Default::default() });
    let b = address(&sim, 1);

    sim.submit_at(0, 0, data(b, 100));
    sim.submit_at(10, 0, data(b, 100));
    sim.run().unwrap();

    assert!(sim.received(1).is_empty());

    let s = sim.station(0).unwrap().stats();
    assert_eq!(s.frames_sent, 0);
    assert_eq!(s.dropped_from_upper_not_connected, 2);
}

#[test]
fn partitioned_link_resolution() {
    let mut sim = setup(LinkConfig{ partitioned: true, ..Default::default() });
    let b = address(&sim, 1);

    assert!(sim.station(0).unwrap().is_connected());

    sim.submit_at(0, 0, data(b, 100));
    sim.run().unwrap();
    assert_eq!(sim.received(1).len(), 1);

    let sim = setup(LinkConfig{ partitioned: true, connected: false, ..Default::default() });
    assert!(!sim.station(0).unwrap().is_connected());
    assert!(!sim.station(1).unwrap().is_connected());
}

#[test]
fn bit_errors_dropped() {
    let mut sim = setup(LinkConfig{ error_every: Some(2), ..Default::default() });
    let b = address(&sim, 1);

    for _ in 0..4 {
        sim.submit_at(0, 0, data(b, 100));
    }
    sim.run().unwrap();

    assert_eq!(sim.received(1).len(), 2);
    assert_eq!(sim.station(1).unwrap().stats().dropped_bit_error, 2);
    assert_eq!(sim.station(0).unwrap().stats().frames_sent, 4);
}

#[test]
fn rx_utilization() {
    let mut sim = setup(LinkConfig::default());
    let b = address(&sim, 1);

    sim.submit_at(0, 0, data(b, 100));

    let elapsed = 10 * 126 * 8 * BIT;
    sim.run_until(elapsed).unwrap();
    assert_eq!(sim.now(), elapsed);

    let summary = sim.station(1).unwrap().stats().summary(elapsed).unwrap();
    assert_eq!(summary.rx_utilization_percent, 10.0);
    assert_eq!(summary.rx_idle_percent, 90.0);
}

#[test]
fn backpressure_is_not_fatal() {
    let cfg = MacConfig{
        queue: QueueMode::Internal{ limit: 1 },
        overflow: OverflowPolicy::Backpressure,
        ..Default::default()
    };
    let _ = simplelog::SimpleLogger::init(log::LevelFilter::Debug, simplelog::Config::default());
    let mut sim = Sim::point_to_point(cfg, MacConfig::default(), &LinkConfig::default()).unwrap();
    let b = address(&sim, 1);

    for _ in 0..5 {
        sim.submit_at(0, 0, data(b, 46));
    }
    sim.run().unwrap();

    // One in flight, one queued, the rest refused
    assert_eq!(sim.received(1).len(), 2);
}

#[test]
fn overflow_is_fatal_by_default() {
    let cfg = MacConfig{ queue: QueueMode::Internal{ limit: 1 }, ..Default::default() };
    let mut sim = Sim::point_to_point(cfg, MacConfig::default(), &LinkConfig::default()).unwrap();
    let b = address(&sim, 1);

    for _ in 0..3 {
        sim.submit_at(0, 0, data(b, 46));
    }

    assert_eq!(sim.run(), Err(MacError::QueueOverflow{ limit: 1 }));
}

#[test]
fn external_queue_pull() {
    let cfg = MacConfig{ queue: QueueMode::External, ..Default::default() };
    let mut sim = Sim::point_to_point(cfg, MacConfig::default(), &LinkConfig::default()).unwrap();
    let b = address(&sim, 1);

    assert_eq!(sim.requests(0), 1);

    sim.submit_at(0, 0, data(b, 46));
    sim.run().unwrap();

    assert_eq!(sim.received(1).len(), 1);
    assert_eq!(sim.requests(0), 2);
}
