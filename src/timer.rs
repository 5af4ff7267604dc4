//! MAC Timer API
//
// https://github.com/rust-iot/rust-ethermac
// Copyright 2021 Ryan Kurte

use crate::Ts;

/// Engine-owned timed events
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display)]
pub enum TimerEvent {
    /// End of the current frame transmission
    EndTx,
    /// End of the inter-frame gap
    EndIfg,
    /// End of a PAUSE period
    EndPause,
}

/// Timer trait provides access to simulated time and scheduling of
/// engine events.
///
/// Scheduled events are delivered back to the MAC via
/// [`EtherMac::handle_timer`](crate::mac::EtherMac::handle_timer), strictly
/// in time order and one at a time.
pub trait Timer {
    /// Returns the current simulated time
    fn now(&self) -> Ts;

    /// Schedule an event at the provided absolute time
    fn schedule(&mut self, at: Ts, event: TimerEvent);

    /// Cancel any pending instance of an event
    fn cancel(&mut self, event: TimerEvent);
}

#[cfg(any(test, feature="mocks"))]
pub mod mock {
    use std::sync::{Arc, Mutex};
    use std::vec::Vec;

    use super::TimerEvent;
    use crate::Ts;

    #[derive(Debug, Default)]
    struct Inner {
        now: Ts,
        pending: Vec<(Ts, TimerEvent)>,
    }

    /// Mock timer implementation to assist with testing
    #[derive(Clone, Debug, Default)]
    pub struct MockTimer (Arc<Mutex<Inner>>);

    impl MockTimer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set(&mut self, now: Ts) {
            self.0.lock().unwrap().now = now;
        }

        /// Fetch pending events ordered by expiry
        pub fn pending(&self) -> Vec<(Ts, TimerEvent)> {
            let mut p = self.0.lock().unwrap().pending.clone();
            p.sort_by_key(|(at, _)| *at);
            p
        }

        /// Pop the earliest pending event, advancing time to its expiry
        pub fn fire_next(&mut self) -> Option<(Ts, TimerEvent)> {
            let mut inner = self.0.lock().unwrap();

            let index = inner.pending.iter()
                .enumerate()
                .min_by_key(|(_, (at, _))| *at)
                .map(|(i, _)| i)?;

            let (at, event) = inner.pending.remove(index);
            inner.now = at;

            Some((at, event))
        }
    }

    impl super::Timer for MockTimer {
        fn now(&self) -> Ts {
            self.0.lock().unwrap().now
        }

        fn schedule(&mut self, at: Ts, event: TimerEvent) {
            self.0.lock().unwrap().pending.push((at, event));
        }

        fn cancel(&mut self, event: TimerEvent) {
            self.0.lock().unwrap().pending.retain(|(_, e)| *e != event);
        }
    }
}
