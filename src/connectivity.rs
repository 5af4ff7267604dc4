//! Link connectivity resolution
//!
//! Connectivity is resolved once at setup and is immutable afterwards. Where
//! both ends of a link are visible locally this is a direct check, where a
//! link crosses a partition boundary the far side is not visible and the
//! answer is obtained with a three step exchange:
//!
//! 1. the station [`publish`](ConnectionResolution::publish)es the remote
//!    endpoints its transmit and receive paths terminate at
//! 2. the partition owning those endpoints [`observe`](ConnectionResolution::observe)s
//!    each one that is wired to a live gate
//! 3. the station [`resolve`](ConnectionResolution::resolve)s its path against
//!    the observations
//!
//! The resolution table is discarded once the MAC is constructed.
//
// https://github.com/rust-iot/rust-ethermac
// Copyright 2021 Ryan Kurte

use heapless::LinearMap;
use log::debug;

use crate::error::MacError;

/// Capability query for link state
pub trait LinkConnectivity {
    /// Whether the station transmit / receive paths are wired to a live peer
    fn is_connected(&self) -> bool;
}

impl LinkConnectivity for bool {
    fn is_connected(&self) -> bool {
        *self
    }
}

/// Resolved (immutable) link connectivity
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Connectivity(bool);

impl LinkConnectivity for Connectivity {
    fn is_connected(&self) -> bool {
        self.0
    }
}

/// Identity of a gate in another partition
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub module: u32,
    pub gate: u32,
}

/// Where one direction of the station link terminates
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PathEnd {
    /// Far end is visible locally
    Local { connected: bool },
    /// Far end lives in another partition
    Remote(Endpoint),
}

/// Transmit and receive paths of a station
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LinkPath {
    pub tx: PathEnd,
    pub rx: PathEnd,
}

/// Setup-only table of remote endpoints and their observed state
#[derive(Clone, Debug)]
pub struct ConnectionResolution<const N: usize> {
    states: LinearMap<Endpoint, bool, N>,
}

impl <const N: usize> ConnectionResolution<N> {
    pub fn new() -> Self {
        Self { states: LinearMap::new() }
    }

    /// Publish the remote endpoints of a link path for observation
    pub fn publish(&mut self, path: &LinkPath) -> Result<(), MacError> {
        for end in [path.tx, path.rx].iter() {
            if let PathEnd::Remote(ep) = end {
                if self.states.contains_key(ep) {
                    continue;
                }
                self.states.insert(*ep, false).map_err(|_| MacError::ResolutionFull)?;
                debug!("Published remote endpoint {:?}", ep);
            }
        }
        Ok(())
    }

    /// Endpoints awaiting observation
    pub fn pending(&self) -> impl Iterator<Item=&Endpoint> {
        self.states.iter().filter(|(_, c)| !**c).map(|(e, _)| e)
    }

    /// Record that a published endpoint is wired to a live gate.
    /// Unpublished endpoints are ignored.
    pub fn observe(&mut self, ep: &Endpoint) {
        if let Some(c) = self.states.get_mut(ep) {
            *c = true;
        }
    }

    /// Resolve the connectivity of a path
    pub fn resolve(&self, path: &LinkPath) -> Connectivity {
        let connected = match (path.tx, path.rx) {
            (PathEnd::Local{ connected: tx }, PathEnd::Local{ connected: rx }) => tx && rx,
            (PathEnd::Remote(tx), PathEnd::Remote(rx)) => {
                self.states.get(&tx) == Some(&true) && self.states.get(&rx) == Some(&true)
            },
            // Mixed local / remote paths are not wired through
            _ => false,
        };

        Connectivity(connected)
    }
}

impl <const N: usize> Default for ConnectionResolution<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const TX: Endpoint = Endpoint{ module: 7, gate: 1 };
    const RX: Endpoint = Endpoint{ module: 7, gate: 2 };

    #[test]
    fn local_paths() {
        let r: ConnectionResolution<4> = ConnectionResolution::new();

        let up = LinkPath{ tx: PathEnd::Local{ connected: true }, rx: PathEnd::Local{ connected: true } };
        let half = LinkPath{ tx: PathEnd::Local{ connected: true }, rx: PathEnd::Local{ connected: false } };

        assert!(r.resolve(&up).is_connected());
        assert!(!r.resolve(&half).is_connected());
    }

    #[test]
    fn remote_paths() {
        let mut r: ConnectionResolution<4> = ConnectionResolution::new();
        let path = LinkPath{ tx: PathEnd::Remote(TX), rx: PathEnd::Remote(RX) };

        r.publish(&path).unwrap();
        assert_eq!(r.pending().count(), 2);
        assert!(!r.resolve(&path).is_connected());

        // Only one direction observed
        r.observe(&TX);
        assert!(!r.resolve(&path).is_connected());

        r.observe(&RX);
        assert_eq!(r.pending().count(), 0);
        assert!(r.resolve(&path).is_connected());
    }

    #[test]
    fn unpublished_observations_ignored() {
        let mut r: ConnectionResolution<4> = ConnectionResolution::new();
        let path = LinkPath{ tx: PathEnd::Remote(TX), rx: PathEnd::Remote(RX) };

        r.observe(&TX);
        r.observe(&RX);

        assert!(!r.resolve(&path).is_connected());
    }

    #[test]
    fn mixed_paths_disconnected() {
        let mut r: ConnectionResolution<4> = ConnectionResolution::new();
        let path = LinkPath{ tx: PathEnd::Remote(TX), rx: PathEnd::Local{ connected: true } };

        r.publish(&path).unwrap();
        r.observe(&TX);

        assert!(!r.resolve(&path).is_connected());
    }

    #[test]
    fn table_capacity() {
        let mut r: ConnectionResolution<1> = ConnectionResolution::new();
        let path = LinkPath{ tx: PathEnd::Remote(TX), rx: PathEnd::Remote(RX) };

        assert_eq!(r.publish(&path), Err(MacError::ResolutionFull));
    }
}
