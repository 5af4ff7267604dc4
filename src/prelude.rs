//! Ethernet MAC crate prelude
//
// https://github.com/rust-iot/rust-ethermac
// Copyright 2021 Ryan Kurte

pub use crate::{Ts, UpperLayer, Wire};

pub use crate::mac::{EtherMac, TxState};

pub use crate::error::MacError;
pub use crate::timer::{Timer as MacTimer, TimerEvent};

pub use crate::address::{MacAddress, AddressAllocator, SequentialAllocator};
pub use crate::config::{Config as MacConfig, AddressConfig, QueueMode, OverflowPolicy};
pub use crate::connectivity::{LinkConnectivity, Connectivity};

pub use crate::frame::{Frame, FrameKind, Traffic, Filler};
pub use crate::stats::{MacEvent, MacStats, StatsSink, DropReason};
