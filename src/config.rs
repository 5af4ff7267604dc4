
use core::convert::TryFrom;
use core::str::FromStr;

use crate::{Ts, PS_PER_SECOND};
use crate::address::{AddressAllocator, AddressParseError, MacAddress};
use crate::error::MacError;
use crate::frame::{MAX_ETHERNET_FRAME_BYTES, MIN_ETHERNET_FRAME_BYTES};

/// 802.3 inter-frame gap in bit times
pub const INTERFRAME_GAP_BITS: u64 = 96;

/// 802.3x pause quantum in bit times
pub const PAUSE_UNIT_BITS: u64 = 512;

/// Station address configuration
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AddressConfig {
    /// Allocate an address at setup
    Auto,
    /// Use a fixed address
    Fixed(MacAddress),
}

impl AddressConfig {
    /// Resolve the station address, allocating if required
    pub fn resolve(&self, allocator: &mut impl AddressAllocator) -> MacAddress {
        match self {
            AddressConfig::Auto => allocator.allocate(),
            AddressConfig::Fixed(a) => *a,
        }
    }
}

impl FromStr for AddressConfig {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auto" => Ok(AddressConfig::Auto),
            other => other.parse().map(AddressConfig::Fixed),
        }
    }
}

/// Transmit queue management
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum QueueMode {
    /// Frames are held in a bounded internal queue
    Internal { limit: usize },
    /// The upper layer holds frames and supplies one at a time on request
    External,
}

/// Behaviour on internal queue overflow
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum OverflowPolicy {
    /// Overflow is a fatal configuration error
    Fatal,
    /// Overflow rejects the frame back to the caller
    Backpressure,
}

/// Configuration for the full duplex MAC
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Station address (or automatic allocation)
    pub address: AddressConfig,

    /// Full duplex operation, must be enabled
    pub duplex_mode: bool,

    /// Line rate in bits per second
    pub line_rate: u64,

    /// Minimum frame size in bytes, shorter frames are padded
    pub min_frame_bytes: usize,

    /// Maximum frame size in bytes, longer frames from the upper layer are rejected
    pub max_frame_bytes: usize,

    /// Inter-frame gap in bit times
    pub inter_frame_gap_bits: u64,

    /// Length of one PAUSE unit in bit times
    pub pause_unit_bits: u64,

    /// Transmit queue mode
    pub queue: QueueMode,

    /// Internal queue overflow behaviour
    pub overflow: OverflowPolicy,

    /// Accept frames regardless of destination address
    pub promiscuous: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: AddressConfig::Auto,
            duplex_mode: true,

            line_rate: 100_000_000,

            min_frame_bytes: MIN_ETHERNET_FRAME_BYTES,
            max_frame_bytes: MAX_ETHERNET_FRAME_BYTES,

            inter_frame_gap_bits: INTERFRAME_GAP_BITS,
            pause_unit_bits: PAUSE_UNIT_BITS,

            queue: QueueMode::Internal { limit: 32 },
            overflow: OverflowPolicy::Fatal,

            promiscuous: false,
        }
    }
}

impl Config {
    /// Check the configuration describes a usable full duplex MAC
    pub fn validate(&self) -> Result<(), MacError> {
        if !self.duplex_mode {
            return Err(MacError::HalfDuplexUnsupported);
        }

        if self.line_rate == 0 {
            return Err(MacError::InvalidLineRate);
        }

        if self.min_frame_bytes > self.max_frame_bytes {
            return Err(MacError::InvalidFrameBounds {
                min: self.min_frame_bytes,
                max: self.max_frame_bytes,
            });
        }

        Ok(())
    }

    /// Duration of `bits` bit times at the configured line rate
    pub fn bits_duration(&self, bits: u64) -> Ts {
        self.duration(bits as u128)
    }

    /// Duration of a transmission of `wire_bytes`
    pub fn tx_duration(&self, wire_bytes: usize) -> Ts {
        self.duration(wire_bytes as u128 * 8)
    }

    /// Duration of the inter-frame gap
    pub fn ifg_duration(&self) -> Ts {
        self.bits_duration(self.inter_frame_gap_bits)
    }

    /// Duration of a pause of `units` pause quanta
    pub fn pause_duration(&self, units: u16) -> Ts {
        self.duration(units as u128 * self.pause_unit_bits as u128)
    }

    /// Saturates at `Ts::MAX` where the duration is not representable
    fn duration(&self, bits: u128) -> Ts {
        let ps = bits.saturating_mul(PS_PER_SECOND) / self.line_rate.max(1) as u128;
        Ts::try_from(ps).unwrap_or(Ts::MAX)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::address::SequentialAllocator;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn half_duplex_rejected() {
        let cfg = Config { duplex_mode: false, ..Default::default() };
        assert_eq!(cfg.validate(), Err(MacError::HalfDuplexUnsupported));
    }

    #[test]
    fn invalid_bounds_rejected() {
        let cfg = Config { line_rate: 0, ..Default::default() };
        assert_eq!(cfg.validate(), Err(MacError::InvalidLineRate));

        let cfg = Config { min_frame_bytes: 2000, ..Default::default() };
        assert_eq!(cfg.validate(), Err(MacError::InvalidFrameBounds{ min: 2000, max: 1518 }));
    }

    #[test]
    fn durations() {
        let cfg = Config::default();

        // 10 ns per bit at 100 Mbit/s
        assert_eq!(cfg.bits_duration(1), 10_000);
        assert_eq!(cfg.ifg_duration(), 960_000);
        assert_eq!(cfg.tx_duration(72), 5_760_000);
        assert_eq!(cfg.pause_duration(3), 3 * 512 * 10_000);

        let gig = Config { line_rate: 1_000_000_000, ..Default::default() };
        assert_eq!(gig.ifg_duration(), 96_000);
    }

    #[test]
    fn durations_saturate() {
        let cfg = Config {
            line_rate: 1,
            pause_unit_bits: u64::MAX,
            inter_frame_gap_bits: u64::MAX,
            ..Default::default()
        };

        assert_eq!(cfg.pause_duration(u16::MAX), Ts::MAX);
        assert_eq!(cfg.ifg_duration(), Ts::MAX);

        // Just representable
        assert_eq!(cfg.bits_duration(18_446_744), 18_446_744_000_000_000_000);
        assert_eq!(cfg.bits_duration(18_446_745), Ts::MAX);
    }

    #[test]
    fn address_config() {
        let mut alloc = SequentialAllocator::new();

        let auto: AddressConfig = "auto".parse().unwrap();
        assert_eq!(auto, AddressConfig::Auto);
        assert_eq!(auto.resolve(&mut alloc), MacAddress::from_u64(0x0aaa_0000_0001));

        let fixed: AddressConfig = "02-00-00-00-00-07".parse().unwrap();
        assert_eq!(fixed.resolve(&mut alloc), MacAddress([2, 0, 0, 0, 0, 7]));

        assert!("nope".parse::<AddressConfig>().is_err());
    }
}
