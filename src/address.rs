//! MAC addressing and address allocation
//
// https://github.com/rust-iot/rust-ethermac
// Copyright 2021 Ryan Kurte

use core::fmt;
use core::str::FromStr;

/// 48-bit IEEE 802 MAC address
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub const BROADCAST: MacAddress = MacAddress([0xff; 6]);

    pub const UNSPECIFIED: MacAddress = MacAddress([0x00; 6]);

    /// Destination for 802.3x MAC Control PAUSE frames
    pub const PAUSE_MULTICAST: MacAddress = MacAddress([0x01, 0x80, 0xc2, 0x00, 0x00, 0x01]);

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Group bit (I/G) set, includes broadcast
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    pub fn is_unspecified(&self) -> bool {
        *self == Self::UNSPECIFIED
    }

    /// Build an address from the low 48 bits of an integer
    pub fn from_u64(v: u64) -> Self {
        let b = v.to_be_bytes();
        MacAddress([b[2], b[3], b[4], b[5], b[6], b[7]])
    }

    pub fn to_u64(&self) -> u64 {
        self.0.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(f, "{:02X}-{:02X}-{:02X}-{:02X}-{:02X}-{:02X}", b[0], b[1], b[2], b[3], b[4], b[5])
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Error parsing a MAC address literal
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AddressParseError {
    /// Wrong number of octets
    Length,
    /// Octet is not a two-digit hex value
    Octet,
}

impl fmt::Display for AddressParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressParseError::Length => write!(f, "MAC address must have 6 octets"),
            AddressParseError::Octet => write!(f, "invalid MAC address octet"),
        }
    }
}

impl FromStr for MacAddress {
    type Err = AddressParseError;

    /// Parse `0A-AA-00-00-00-01`, `0a:aa:00:00:00:01` or `0AAA00000001`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut addr = [0u8; 6];

        if !s.contains(|c| c == '-' || c == ':') {
            if s.len() != 12 || !s.is_char_boundary(12) {
                return Err(AddressParseError::Length);
            }
            for (i, o) in addr.iter_mut().enumerate() {
                let digits = s.get(i * 2..i * 2 + 2).ok_or(AddressParseError::Octet)?;
                *o = u8::from_str_radix(digits, 16).map_err(|_| AddressParseError::Octet)?;
            }
            return Ok(MacAddress(addr));
        }

        let mut n = 0;
        for part in s.split(|c| c == '-' || c == ':') {
            if n >= addr.len() {
                return Err(AddressParseError::Length);
            }
            if part.len() != 2 {
                return Err(AddressParseError::Octet);
            }
            addr[n] = u8::from_str_radix(part, 16).map_err(|_| AddressParseError::Octet)?;
            n += 1;
        }

        if n != addr.len() {
            return Err(AddressParseError::Length);
        }

        Ok(MacAddress(addr))
    }
}

/// Address allocation service, called once per station at setup to
/// resolve `auto` addresses.
pub trait AddressAllocator {
    fn allocate(&mut self) -> MacAddress;
}

/// Base for automatically assigned addresses (locally administered unicast)
pub const AUTO_ADDRESS_BASE: u64 = 0x0aaa_0000_0000;

/// Hands out sequential `0A-AA-xx-xx-xx-xx` addresses
#[derive(Clone, Debug, PartialEq)]
pub struct SequentialAllocator {
    last: u64,
}

impl SequentialAllocator {
    pub fn new() -> Self {
        Self { last: AUTO_ADDRESS_BASE }
    }

    /// Continue allocation after a known last-assigned address
    pub fn after(last: MacAddress) -> Self {
        Self { last: last.to_u64() }
    }
}

impl Default for SequentialAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressAllocator for SequentialAllocator {
    fn allocate(&mut self) -> MacAddress {
        self.last = (self.last + 1) & 0xffff_ffff_ffff;
        MacAddress::from_u64(self.last)
    }
}

#[cfg(test)]
mod test {
    use std::string::ToString;

    use super::*;

    #[test]
    fn parse_address_formats() {
        let expected = MacAddress([0x0a, 0xaa, 0x00, 0x00, 0x00, 0x01]);

        assert_eq!("0A-AA-00-00-00-01".parse::<MacAddress>(), Ok(expected));
        assert_eq!("0a:aa:00:00:00:01".parse::<MacAddress>(), Ok(expected));
        assert_eq!("0AAA00000001".parse::<MacAddress>(), Ok(expected));

        assert_eq!("0A-AA-00-00-00".parse::<MacAddress>(), Err(AddressParseError::Length));
        assert_eq!("0A-AA-00-00-00-01-02".parse::<MacAddress>(), Err(AddressParseError::Length));
        assert_eq!("0A-AA-00-00-00-zz".parse::<MacAddress>(), Err(AddressParseError::Octet));
    }

    #[test]
    fn display_round_trips() {
        let a = MacAddress([0x02, 0x11, 0x22, 0x33, 0x44, 0xff]);
        assert_eq!(a.to_string(), "02-11-22-33-44-FF");
        assert_eq!(a.to_string().parse::<MacAddress>(), Ok(a));
    }

    #[test]
    fn group_addresses() {
        assert!(MacAddress::BROADCAST.is_broadcast());
        assert!(MacAddress::BROADCAST.is_multicast());
        assert!(MacAddress::PAUSE_MULTICAST.is_multicast());
        assert!(!MacAddress::from_u64(AUTO_ADDRESS_BASE + 1).is_multicast());
        assert!(MacAddress::default().is_unspecified());
    }

    #[test]
    fn sequential_allocation_is_unique() {
        let mut alloc = SequentialAllocator::new();

        let a = alloc.allocate();
        let b = alloc.allocate();

        assert_eq!(a, MacAddress([0x0a, 0xaa, 0x00, 0x00, 0x00, 0x01]));
        assert_eq!(b, MacAddress([0x0a, 0xaa, 0x00, 0x00, 0x00, 0x02]));

        let mut resumed = SequentialAllocator::after(b);
        assert_eq!(resumed.allocate().to_u64(), AUTO_ADDRESS_BASE + 3);
    }
}
