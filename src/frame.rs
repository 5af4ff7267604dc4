//! Ethernet frame representation
//
// https://github.com/rust-iot/rust-ethermac
// Copyright 2021 Ryan Kurte

use core::fmt;

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;

use crate::Ts;
use crate::address::MacAddress;

/// Preamble length in bytes
pub const PREAMBLE_BYTES: usize = 7;

/// Start frame delimiter length in bytes
pub const SFD_BYTES: usize = 1;

/// Destination + source + ethertype
pub const ETHER_MAC_HEADER_BYTES: usize = 14;

/// Frame check sequence
pub const ETHER_FCS_BYTES: usize = 4;

/// Minimum (padded) Ethernet frame length, header to FCS inclusive
pub const MIN_ETHERNET_FRAME_BYTES: usize = 64;

/// Maximum untagged Ethernet frame length, header to FCS inclusive
pub const MAX_ETHERNET_FRAME_BYTES: usize = 1518;

/// MAC Control ethertype (802.3x)
pub const ETHERTYPE_MAC_CONTROL: u16 = 0x8808;

/// MAC Control PAUSE opcode
pub const PAUSE_OPCODE: u16 = 0x0001;

/// Opcode + pause time
const PAUSE_BODY_BYTES: usize = 4;

/// Frame kinds, fixed at construction
#[derive(Clone, Debug, PartialEq)]
pub enum FrameKind {
    /// Upper layer data
    Data {
        ethertype: u16,
        payload: Bytes,
    },
    /// 802.3x PAUSE request in pause quanta
    Pause {
        units: u16,
    },
}

/// Ethernet frame with owned (shared) payload storage and framing metadata.
///
/// `length` is the logical frame length (header through FCS), `wire_length`
/// additionally includes the preamble and SFD once the frame is on the wire.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub src: MacAddress,
    pub dest: MacAddress,
    pub kind: FrameKind,

    length: usize,
    wire_length: usize,

    /// Set by the channel when the frame was corrupted in flight
    pub bit_error: bool,

    /// Transmission duration, set by the sending MAC
    pub duration: Ts,
}

impl Frame {
    /// Create a data frame with an unspecified source address
    pub fn data(dest: MacAddress, ethertype: u16, payload: Bytes) -> Self {
        let length = ETHER_MAC_HEADER_BYTES + payload.len() + ETHER_FCS_BYTES;

        Self {
            src: MacAddress::UNSPECIFIED,
            dest,
            kind: FrameKind::Data { ethertype, payload },
            length,
            wire_length: length,
            bit_error: false,
            duration: 0,
        }
    }

    /// Create a PAUSE frame addressed to the MAC Control multicast group
    pub fn pause(units: u16) -> Self {
        Self {
            src: MacAddress::UNSPECIFIED,
            dest: MacAddress::PAUSE_MULTICAST,
            kind: FrameKind::Pause { units },
            length: MIN_ETHERNET_FRAME_BYTES,
            wire_length: MIN_ETHERNET_FRAME_BYTES,
            bit_error: false,
            duration: 0,
        }
    }

    /// Set the source address, builder style
    pub fn with_src(mut self, src: MacAddress) -> Self {
        self.src = src;
        self
    }

    /// Logical length in bytes
    pub fn length(&self) -> usize {
        self.length
    }

    /// On-wire length in bytes
    pub fn wire_length(&self) -> usize {
        self.wire_length
    }

    /// Set the logical length, resetting the wire length to match
    pub fn set_length(&mut self, length: usize) {
        self.length = length;
        self.wire_length = length;
    }

    /// Pad the logical length up to `min` bytes
    pub fn pad(&mut self, min: usize) {
        if self.length < min {
            self.set_length(min);
        }
    }

    /// Add preamble and SFD to the wire length, enforcing a minimum
    /// on-wire frame size before framing
    pub(crate) fn add_framing(&mut self, min: usize) {
        self.wire_length = self.wire_length.max(min) + PREAMBLE_BYTES + SFD_BYTES;
    }

    /// Strip physical layer overhead back to the logical length
    pub(crate) fn strip_framing(&mut self) {
        self.wire_length = self.length;
    }

    pub fn is_pause(&self) -> bool {
        matches!(self.kind, FrameKind::Pause { .. })
    }

    /// Requested pause units for PAUSE frames
    pub fn pause_units(&self) -> Option<u16> {
        match self.kind {
            FrameKind::Pause { units } => Some(units),
            _ => None,
        }
    }

    pub fn payload(&self) -> &[u8] {
        match &self.kind {
            FrameKind::Data { payload, .. } => payload.as_ref(),
            FrameKind::Pause { .. } => &[],
        }
    }

    /// Encode header and body (padded to the logical length, FCS not written)
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        let body = match &self.kind {
            FrameKind::Data { payload, .. } => payload.len(),
            FrameKind::Pause { .. } => PAUSE_BODY_BYTES,
        };

        let used = ETHER_MAC_HEADER_BYTES + body;
        let n = used.max(self.length.saturating_sub(ETHER_FCS_BYTES));

        if buf.len() < n {
            return Err(CodecError::BufferTooShort);
        }

        buf[0..6].copy_from_slice(&self.dest.0);
        buf[6..12].copy_from_slice(&self.src.0);

        match &self.kind {
            FrameKind::Data { ethertype, payload } => {
                BigEndian::write_u16(&mut buf[12..14], *ethertype);
                buf[14..used].copy_from_slice(payload);
            },
            FrameKind::Pause { units } => {
                BigEndian::write_u16(&mut buf[12..14], ETHERTYPE_MAC_CONTROL);
                BigEndian::write_u16(&mut buf[14..16], PAUSE_OPCODE);
                BigEndian::write_u16(&mut buf[16..18], *units);
            },
        }

        for b in &mut buf[used..n] {
            *b = 0;
        }

        Ok(n)
    }

    /// Decode a frame from header and body bytes (FCS not included)
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        if buf.len() < ETHER_MAC_HEADER_BYTES {
            return Err(CodecError::NotEnoughBytes);
        }

        let mut dest = [0u8; 6];
        dest.copy_from_slice(&buf[0..6]);
        let mut src = [0u8; 6];
        src.copy_from_slice(&buf[6..12]);

        let ethertype = BigEndian::read_u16(&buf[12..14]);
        let body = &buf[ETHER_MAC_HEADER_BYTES..];

        let kind = if ethertype == ETHERTYPE_MAC_CONTROL {
            if body.len() < PAUSE_BODY_BYTES {
                return Err(CodecError::NotEnoughBytes);
            }

            let opcode = BigEndian::read_u16(&body[0..2]);
            if opcode != PAUSE_OPCODE {
                return Err(CodecError::UnsupportedOpcode(opcode));
            }

            FrameKind::Pause { units: BigEndian::read_u16(&body[2..4]) }
        } else {
            FrameKind::Data { ethertype, payload: Bytes::copy_from_slice(body) }
        };

        let length = buf.len() + ETHER_FCS_BYTES;

        Ok(Self {
            src: MacAddress(src),
            dest: MacAddress(dest),
            kind,
            length,
            wire_length: length,
            bit_error: false,
            duration: 0,
        })
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FrameKind::Data { ethertype, .. } => write!(f, "data(0x{:04x})", ethertype)?,
            FrameKind::Pause { units } => write!(f, "pause({})", units)?,
        }
        write!(f, " {} -> {} ({} bytes, {} on wire)", self.src, self.dest, self.length, self.wire_length)
    }
}

/// Link-layer internal filler, never carries frame data
#[derive(Copy, Clone, Debug, PartialEq, strum::Display)]
pub enum Filler {
    /// Inter-frame gap filler (burst mode)
    Ifg,
    /// Collision jam signal
    Jam,
}

/// Anything that may arrive from the network
#[derive(Clone, Debug, PartialEq)]
pub enum Traffic {
    Frame(Frame),
    Filler(Filler),
}

impl From<Frame> for Traffic {
    fn from(f: Frame) -> Self {
        Traffic::Frame(f)
    }
}

/// Frame encode / decode errors
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum CodecError {
    /// Output buffer cannot hold the encoded frame
    BufferTooShort,
    /// Input ended before the frame was complete
    NotEnoughBytes,
    /// MAC Control frame with an opcode other than PAUSE
    UnsupportedOpcode(u16),
}
