//! Threshold feedback controller and UAC2 feedback packing.
//!
//! Both directions measure fill in whole nominal packets and pick one of
//! three fixed values:
//!
//! | Fill (packets)      | Capture (implicit)  | Playback (explicit) |
//! |---------------------|---------------------|---------------------|
//! | `>= high`           | nominal + step      | nominal - step      |
//! | between             | nominal             | nominal             |
//! | `<= low`            | nominal - step      | nominal + step      |
//!
//! Capture drains faster by sending more bytes; playback asks the host to
//! send fewer.

use platform::UsbSpeed;

use crate::FeedbackConfig;

/// Fill band relative to the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FillLevel {
    /// At or below the low threshold.
    Low,
    /// Strictly between the thresholds.
    Nominal,
    /// At or above the high threshold.
    High,
}

/// Which way a high fill moves the reported value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FeedbackSense {
    /// High fill raises the value (capture: send more bytes).
    Drain,
    /// High fill lowers the value (playback: ask the host for less).
    Throttle,
}

/// Maps a fill level in bytes to one of three feedback values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackController {
    config: FeedbackConfig,
    packet_bytes: u64,
    sense: FeedbackSense,
}

impl FeedbackController {
    /// Controller measuring fill in units of `packet_bytes`.
    pub const fn new(config: FeedbackConfig, packet_bytes: usize, sense: FeedbackSense) -> Self {
        Self {
            config,
            packet_bytes: packet_bytes as u64,
            sense,
        }
    }

    /// Value reported while the fill is between the thresholds.
    pub const fn nominal(&self) -> u32 {
        self.config.nominal
    }

    /// Whole packets in `fill_bytes` (0 for a zero packet size).
    pub fn fill_packets(&self, fill_bytes: u64) -> u64 {
        fill_bytes.checked_div(self.packet_bytes).unwrap_or(0)
    }

    /// Band `fill_bytes` falls into.
    pub fn classify(&self, fill_bytes: u64) -> FillLevel {
        let packets = self.fill_packets(fill_bytes);
        if packets >= self.config.high_packets {
            FillLevel::High
        } else if packets <= self.config.low_packets {
            FillLevel::Low
        } else {
            FillLevel::Nominal
        }
    }

    /// Feedback value for `fill_bytes`.
    pub fn decide(&self, fill_bytes: u64) -> u32 {
        self.decide_around(self.config.nominal, fill_bytes)
    }

    /// Feedback value for `fill_bytes` centred on `nominal` instead of the
    /// configured one. Thresholds and step are unchanged.
    pub fn decide_around(&self, nominal: u32, fill_bytes: u64) -> u32 {
        let step = self.config.step;
        let faster = nominal.saturating_add(step);
        let slower = nominal.saturating_sub(step);
        match (self.classify(fill_bytes), self.sense) {
            (FillLevel::Nominal, _) => nominal,
            (FillLevel::High, FeedbackSense::Drain) | (FillLevel::Low, FeedbackSense::Throttle) => {
                faster
            }
            (FillLevel::Low, FeedbackSense::Drain) | (FillLevel::High, FeedbackSense::Throttle) => {
                slower
            }
        }
    }
}

/// Explicit feedback as it travels on the feedback endpoint.
///
/// The internal value is frames per HS microframe in Q.13.
/// - High speed sends 16.16 frames per microframe in 4 bytes.
/// - Full speed sends 10.14 frames per 1 ms frame in 3 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeedbackPacket {
    bytes: [u8; 4],
    len: usize,
}

impl FeedbackPacket {
    /// Pack a Q.13 per-microframe value for `speed`.
    pub fn pack(value: u32, speed: UsbSpeed) -> Self {
        let (word, len) = match speed {
            // Q.13 -> Q.16: 25 significant bits shifted up by 3.
            UsbSpeed::High => ((value & 0x01FF_FFFF).wrapping_shl(3), 4),
            // ×8 microframes per frame and Q.13 -> Q.14: shift by 4, keep 24 bits.
            UsbSpeed::Full => (value.wrapping_shl(4) & 0x00FF_FFFF, 3),
        };
        Self {
            bytes: word.to_le_bytes(),
            len,
        }
    }

    /// Wire bytes (3 or 4).
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.get(..self.len).unwrap_or(&self.bytes)
    }

    /// Wire bytes read back as one little-endian word (unused bytes zero).
    pub const fn as_u32(&self) -> u32 {
        u32::from_le_bytes(self.bytes)
    }
}
