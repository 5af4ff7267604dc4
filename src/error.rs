
use core::fmt;

use crate::frame::{Filler, Frame};
use crate::mac::TxState;
use crate::timer::TimerEvent;

/// MAC errors
#[derive(Debug, Clone, PartialEq)]
pub enum MacError {
    /// Configuration requests half-duplex (shared medium) operation
    HalfDuplexUnsupported,

    /// Line rate must be non-zero
    InvalidLineRate,

    /// Minimum frame size exceeds maximum frame size
    InvalidFrameBounds { min: usize, max: usize },

    /// Configured queue limit exceeds the queue storage capacity
    QueueLimit { limit: usize, capacity: usize },

    /// Frame from the upper layer is addressed to this station
    FrameToSelf(Frame),

    /// Frame from the upper layer exceeds the maximum frame size
    FrameTooLong { length: usize, max: usize },

    /// Transmit queue overflow (fatal policy)
    QueueOverflow { limit: usize },

    /// Transmit queue full (backpressure policy), frame is returned
    QueueFull(Frame),

    /// External queue supplied a frame while one is outstanding
    TransmitPending(Frame),

    /// Timer fired in a state that did not schedule it
    UnexpectedTimer { event: TimerEvent, state: TxState },

    /// Timer fired while the MAC is shut down
    TimerWhileDown(TimerEvent),

    /// Transmission end with no frame under transmission
    MissingFrame,

    /// Transmission start with no staged frame
    NoFrameStaged,

    /// Filler traffic received, there is no burst mode in full duplex
    UnexpectedFiller(Filler),

    /// Connection resolution table is full
    ResolutionFull,
}

impl MacError {
    /// Fatal errors indicate misconfiguration or an engine defect and
    /// should halt the station
    pub fn is_fatal(&self) -> bool {
        !matches!(self, MacError::QueueFull(_))
    }
}

impl fmt::Display for MacError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use MacError::*;

        match self {
            HalfDuplexUnsupported => write!(f, "half duplex operation is not supported, duplex mode must be enabled"),
            InvalidLineRate => write!(f, "line rate must be non-zero"),
            InvalidFrameBounds { min, max } => write!(f, "minimum frame size ({}) exceeds maximum frame size ({})", min, max),
            QueueLimit { limit, capacity } => write!(f, "queue limit {} exceeds queue capacity {}", limit, capacity),
            FrameToSelf(frame) => write!(f, "logic error: frame {} from upper layer has local MAC address as destination", frame),
            FrameTooLong { length, max } => write!(f, "frame from upper layer ({} bytes) exceeds maximum frame size ({})", length, max),
            QueueOverflow { limit } => write!(f, "transmit queue length exceeds {}, upper layer is generating excessive traffic", limit),
            QueueFull(frame) => write!(f, "transmit queue full, frame {} rejected", frame),
            TransmitPending(frame) => write!(f, "frame {} supplied while a frame is already pending", frame),
            UnexpectedTimer { event, state } => write!(f, "timer {} fired in state {}", event, state),
            TimerWhileDown(event) => write!(f, "timer {} fired while MAC is down", event),
            MissingFrame => write!(f, "frame under transmission cannot be found"),
            NoFrameStaged => write!(f, "transmission started with no staged frame"),
            UnexpectedFiller(filler) => write!(f, "unexpected {} filler, there is no burst mode in full duplex operation", filler),
            ResolutionFull => write!(f, "connection resolution table full"),
        }
    }
}
