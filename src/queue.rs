//! Transmit queue
//
// https://github.com/rust-iot/rust-ethermac
// Copyright 2021 Ryan Kurte

use heapless::spsc::Queue;
use log::{error, warn};

use crate::config::{OverflowPolicy, QueueMode};
use crate::error::MacError;
use crate::frame::Frame;

/// FIFO of frames awaiting transmission.
///
/// Storage is fixed at `N - 1` frames, the configured limit applies on top.
/// In external mode nothing is held here, frames are pulled from the upper
/// layer one at a time.
pub struct TxQueue<const N: usize> {
    mode: QueueMode,
    overflow: OverflowPolicy,
    frames: Queue<Frame, N>,
}

impl <const N: usize> TxQueue<N> {
    pub fn new(mode: QueueMode, overflow: OverflowPolicy) -> Result<Self, MacError> {
        let frames = Queue::new();

        if let QueueMode::Internal { limit } = mode {
            if limit > frames.capacity() {
                return Err(MacError::QueueLimit { limit, capacity: frames.capacity() });
            }
        }

        Ok(Self { mode, overflow, frames })
    }

    pub fn is_external(&self) -> bool {
        self.mode == QueueMode::External
    }

    /// Admit a frame to the queue
    pub fn push(&mut self, frame: Frame) -> Result<(), MacError> {
        let limit = match self.mode {
            QueueMode::Internal { limit } => limit,
            QueueMode::External => return Err(MacError::TransmitPending(frame)),
        };

        if self.frames.len() >= limit {
            return match self.overflow {
                OverflowPolicy::Fatal => {
                    error!("Transmit queue length exceeds {}", limit);
                    Err(MacError::QueueOverflow { limit })
                },
                OverflowPolicy::Backpressure => {
                    warn!("Transmit queue full, rejecting frame {}", frame);
                    Err(MacError::QueueFull(frame))
                },
            };
        }

        self.frames.enqueue(frame).map_err(MacError::QueueFull)
    }

    /// Take the frame at the head of the queue
    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.dequeue()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod test {
    use bytes::Bytes;

    use super::*;
    use crate::address::MacAddress;

    fn frame(n: u8) -> Frame {
        Frame::data(MacAddress::BROADCAST, 0x0800, Bytes::copy_from_slice(&[n; 46]))
    }

    #[test]
    fn fifo_order() {
        let mut q: TxQueue<8> = TxQueue::new(QueueMode::Internal{ limit: 4 }, OverflowPolicy::Fatal).unwrap();

        q.push(frame(1)).unwrap();
        q.push(frame(2)).unwrap();
        assert_eq!(q.len(), 2);

        assert_eq!(q.pop(), Some(frame(1)));
        assert_eq!(q.pop(), Some(frame(2)));
        assert_eq!(q.pop(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn limit_exceeds_capacity() {
        let r: Result<TxQueue<4>, _> = TxQueue::new(QueueMode::Internal{ limit: 4 }, OverflowPolicy::Fatal);
        assert_eq!(r.err(), Some(MacError::QueueLimit{ limit: 4, capacity: 3 }));
    }

    #[test]
    fn overflow_fatal() {
        let mut q: TxQueue<8> = TxQueue::new(QueueMode::Internal{ limit: 1 }, OverflowPolicy::Fatal).unwrap();

        q.push(frame(1)).unwrap();

        let e = q.push(frame(2)).unwrap_err();
        assert_eq!(e, MacError::QueueOverflow{ limit: 1 });
        assert!(e.is_fatal());
    }

    #[test]
    fn overflow_backpressure() {
        let mut q: TxQueue<8> = TxQueue::new(QueueMode::Internal{ limit: 1 }, OverflowPolicy::Backpressure).unwrap();

        q.push(frame(1)).unwrap();

        let e = q.push(frame(2)).unwrap_err();
        assert_eq!(e, MacError::QueueFull(frame(2)));
        assert!(!e.is_fatal());

        // Space frees on dequeue
        q.pop();
        q.push(frame(3)).unwrap();
    }

    #[test]
    fn external_holds_nothing() {
        let mut q: TxQueue<8> = TxQueue::new(QueueMode::External, OverflowPolicy::Fatal).unwrap();

        assert!(q.is_external());
        assert_eq!(q.push(frame(1)), Err(MacError::TransmitPending(frame(1))));
    }
}
