//! Channel layout and bridge calibration.
//!
//! Buffer geometry (instances, slots, slot bytes) is fixed by the const
//! generics of [`RxBridge`](crate::RxBridge) / [`TxBridge`](crate::TxBridge).
//! Everything that may need tuning per board lives in [`BridgeConfig`] and is
//! checked against that geometry once, at construction.

use platform::audio_config::{
    CHANNEL_COUNT, FEEDBACK_HIGH_PACKETS, FEEDBACK_LOW_PACKETS, FEEDBACK_NOMINAL, FEEDBACK_STEP,
    FRAME_BYTES, HS_ISO_PACKET_BYTES, INSTANCE_COUNT, SAMPLE_BYTES,
};

use crate::ConfigError;

/// How channels map onto controller instances.
///
/// Channel `c` lives on instance `c / channels_per_instance()`, at byte
/// offset `(c % channels_per_instance()) * sample_bytes` of that instance's
/// frame. The interleaved frame is instance 0's channels, then instance 1's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelLayout {
    /// Total logical channels.
    pub channels: usize,
    /// Controller instances sharing the bus.
    pub instances: usize,
    /// Bytes per sample.
    pub sample_bytes: usize,
}

impl ChannelLayout {
    /// Build a layout. Checked later by [`BridgeConfig::validate`].
    pub const fn new(channels: usize, instances: usize, sample_bytes: usize) -> Self {
        Self {
            channels,
            instances,
            sample_bytes,
        }
    }

    /// The board bus: 16 channels of 32-bit samples over two controllers.
    pub const fn tdm16() -> Self {
        Self::new(CHANNEL_COUNT, INSTANCE_COUNT, SAMPLE_BYTES)
    }

    /// Channels carried by one instance (0 for a zero-instance layout).
    pub const fn channels_per_instance(&self) -> usize {
        match self.channels.checked_div(self.instances) {
            Some(n) => n,
            None => 0,
        }
    }

    /// Bytes of one interleaved frame across all channels.
    pub const fn frame_bytes(&self) -> usize {
        self.channels.saturating_mul(self.sample_bytes)
    }

    /// Bytes of one frame carried by a single instance.
    pub const fn frame_bytes_per_instance(&self) -> usize {
        self.channels_per_instance().saturating_mul(self.sample_bytes)
    }
}

impl Default for ChannelLayout {
    fn default() -> Self {
        Self::tdm16()
    }
}

/// Per-sample transform applied while copying captured frames out of the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleFilter {
    /// Copy samples unchanged.
    #[default]
    Passthrough,
    /// AND every 32-bit little-endian sample with the mask.
    Mask(u32),
}

impl SampleFilter {
    /// Keep the top 24 bits of a 32-bit sample.
    pub const TOP_24_BITS: Self = Self::Mask(0xFFFF_FF00);

    /// Capture default for this build: masked when `filter-24bit` is on.
    pub const fn capture_default() -> Self {
        if cfg!(feature = "filter-24bit") {
            Self::TOP_24_BITS
        } else {
            Self::Passthrough
        }
    }
}

/// Threshold controller calibration.
///
/// `nominal` and `step` are in the unit the direction reports: bytes per
/// packet for implicit (capture) feedback, Q.13 frames per microframe for
/// explicit (playback) feedback.
///
/// The threshold pair is a calibration parameter tied to the ring depth;
/// keep it straddling the half-full baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeedbackConfig {
    /// Value reported while the fill sits between the thresholds.
    pub nominal: u32,
    /// Correction applied outside the thresholds.
    pub step: u32,
    /// Fill (whole packets) at or above which the correction kicks in.
    pub high_packets: u64,
    /// Fill (whole packets) at or below which the correction kicks in.
    pub low_packets: u64,
}

/// Everything a bridge needs beyond its buffer geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BridgeConfig {
    /// Channel-to-instance mapping.
    pub layout: ChannelLayout,
    /// Nominal isochronous packet; the unit fill levels are measured in.
    pub packet_bytes: usize,
    /// Threshold controller calibration.
    pub feedback: FeedbackConfig,
    /// Transform applied to captured samples (ignored by playback).
    pub sample_filter: SampleFilter,
}

impl BridgeConfig {
    /// Board capture defaults: HS packets, implicit feedback of ± one frame.
    #[allow(clippy::cast_possible_truncation)] // one frame is 64 B
    pub const fn tdm16_capture() -> Self {
        Self {
            layout: ChannelLayout::tdm16(),
            packet_bytes: HS_ISO_PACKET_BYTES,
            feedback: FeedbackConfig {
                nominal: HS_ISO_PACKET_BYTES as u32,
                step: FRAME_BYTES as u32,
                high_packets: FEEDBACK_HIGH_PACKETS,
                low_packets: FEEDBACK_LOW_PACKETS,
            },
            sample_filter: SampleFilter::capture_default(),
        }
    }

    /// Board playback defaults: HS packets, explicit Q.13 feedback ± 1 LSB.
    pub const fn tdm16_playback() -> Self {
        Self {
            layout: ChannelLayout::tdm16(),
            packet_bytes: HS_ISO_PACKET_BYTES,
            feedback: FeedbackConfig {
                nominal: FEEDBACK_NOMINAL,
                step: FEEDBACK_STEP,
                high_packets: FEEDBACK_HIGH_PACKETS,
                low_packets: FEEDBACK_LOW_PACKETS,
            },
            sample_filter: SampleFilter::Passthrough,
        }
    }

    /// Check this calibration against a buffer geometry.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found, checking the layout first,
    /// then slots, then packet size, then the feedback calibration.
    pub const fn validate(
        &self,
        instances: usize,
        slots: usize,
        slot_bytes: usize,
    ) -> Result<(), ConfigError> {
        let layout = &self.layout;
        if layout.channels == 0 {
            return Err(ConfigError::ZeroChannels);
        }
        if layout.instances == 0 {
            return Err(ConfigError::ZeroInstances);
        }
        if layout.sample_bytes == 0 {
            return Err(ConfigError::ZeroSampleBytes);
        }
        if !is_multiple(layout.channels, layout.instances) {
            return Err(ConfigError::ChannelsNotDivisible {
                channels: layout.channels,
                instances: layout.instances,
            });
        }
        if layout.instances != instances {
            return Err(ConfigError::InstanceMismatch {
                layout: layout.instances,
                buffer: instances,
            });
        }

        let instance_frame = layout.frame_bytes_per_instance();
        if slot_bytes == 0 || !is_multiple(slot_bytes, instance_frame) {
            return Err(ConfigError::SlotMisaligned {
                slot_bytes,
                frame_bytes: instance_frame,
            });
        }
        if slots < 2 || !is_multiple(slots, 2) {
            return Err(ConfigError::InvalidSlotCount(slots));
        }

        let frame = layout.frame_bytes();
        if self.packet_bytes == 0 || !is_multiple(self.packet_bytes, frame) {
            return Err(ConfigError::PacketMisaligned {
                packet_bytes: self.packet_bytes,
                frame_bytes: frame,
            });
        }
        let capacity = ring_capacity(instances, slots, slot_bytes);
        if self.packet_bytes > capacity {
            return Err(ConfigError::ExceedsCapacity {
                bytes: self.packet_bytes,
                capacity,
            });
        }

        let fb = &self.feedback;
        if fb.step >= fb.nominal {
            return Err(ConfigError::StepTooLarge {
                step: fb.step,
                nominal: fb.nominal,
            });
        }
        if fb.low_packets >= fb.high_packets {
            return Err(ConfigError::ThresholdOrder {
                low: fb.low_packets,
                high: fb.high_packets,
            });
        }
        #[allow(clippy::cast_possible_truncation)] // saturated to usize::MAX on overflow
        let high_bytes = (fb.high_packets as usize).saturating_mul(self.packet_bytes);
        if high_bytes > capacity {
            return Err(ConfigError::ExceedsCapacity {
                bytes: high_bytes,
                capacity,
            });
        }

        if let SampleFilter::Mask(_) = self.sample_filter {
            if layout.sample_bytes != 4 {
                return Err(ConfigError::FilterNeedsWordSamples(layout.sample_bytes));
            }
        }
        Ok(())
    }
}

/// Ring capacity across all instances, saturating.
pub const fn ring_capacity(instances: usize, slots: usize, slot_bytes: usize) -> usize {
    instances.saturating_mul(slots).saturating_mul(slot_bytes)
}

const fn is_multiple(value: usize, unit: usize) -> bool {
    matches!(value.checked_rem(unit), Some(0))
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    const SLOTS: usize = 4;
    const SLOT_BYTES: usize = 768;

    // ── Test A: board presets validate ─────────────────────────────────────────

    /// Both board presets are accepted by the board geometry.
    #[test]
    fn board_presets_validate() {
        assert_eq!(BridgeConfig::tdm16_capture().validate(2, SLOTS, SLOT_BYTES), Ok(()));
        assert_eq!(BridgeConfig::tdm16_playback().validate(2, SLOTS, SLOT_BYTES), Ok(()));
    }

    /// Frame sizes of the board layout.
    #[test]
    fn tdm16_frame_sizes() {
        let l = ChannelLayout::tdm16();
        assert_eq!(l.channels_per_instance(), 8);
        assert_eq!(l.frame_bytes(), 64);
        assert_eq!(l.frame_bytes_per_instance(), 32);
    }

    // ── Test B: layout rejections ──────────────────────────────────────────────

    /// 15 channels do not split over 2 instances.
    #[test]
    fn rejects_uneven_channel_split() {
        let mut cfg = BridgeConfig::tdm16_capture();
        cfg.layout = ChannelLayout::new(15, 2, 4);
        assert_eq!(
            cfg.validate(2, SLOTS, SLOT_BYTES),
            Err(ConfigError::ChannelsNotDivisible {
                channels: 15,
                instances: 2
            })
        );
    }

    /// Zero-sized layouts are rejected before any division happens.
    #[test]
    fn rejects_zero_layouts() {
        let mut cfg = BridgeConfig::tdm16_capture();
        cfg.layout = ChannelLayout::new(0, 2, 4);
        assert_eq!(cfg.validate(2, SLOTS, SLOT_BYTES), Err(ConfigError::ZeroChannels));
        cfg.layout = ChannelLayout::new(16, 0, 4);
        assert_eq!(cfg.validate(0, SLOTS, SLOT_BYTES), Err(ConfigError::ZeroInstances));
        cfg.layout = ChannelLayout::new(16, 2, 0);
        assert_eq!(cfg.validate(2, SLOTS, SLOT_BYTES), Err(ConfigError::ZeroSampleBytes));
    }

    /// Buffer geometry must agree with the layout.
    #[test]
    fn rejects_instance_mismatch() {
        assert_eq!(
            BridgeConfig::tdm16_capture().validate(4, SLOTS, SLOT_BYTES),
            Err(ConfigError::InstanceMismatch { layout: 2, buffer: 4 })
        );
    }

    // ── Test C: geometry rejections ────────────────────────────────────────────

    /// A slot must hold whole per-instance frames.
    #[test]
    fn rejects_misaligned_slot() {
        assert!(matches!(
            BridgeConfig::tdm16_capture().validate(2, SLOTS, 770),
            Err(ConfigError::SlotMisaligned { .. })
        ));
    }

    /// Odd and single-slot rings have no half-full slot boundary.
    #[test]
    fn rejects_odd_slot_count() {
        let cfg = BridgeConfig::tdm16_capture();
        assert_eq!(cfg.validate(2, 3, SLOT_BYTES), Err(ConfigError::InvalidSlotCount(3)));
        assert_eq!(cfg.validate(2, 1, SLOT_BYTES), Err(ConfigError::InvalidSlotCount(1)));
    }

    /// A packet must be whole frames.
    #[test]
    fn rejects_misaligned_packet() {
        let mut cfg = BridgeConfig::tdm16_capture();
        cfg.packet_bytes = 100;
        assert!(matches!(
            cfg.validate(2, SLOTS, SLOT_BYTES),
            Err(ConfigError::PacketMisaligned { .. })
        ));
    }

    /// A high threshold above the ring can never fire.
    #[test]
    fn rejects_threshold_above_capacity() {
        let mut cfg = BridgeConfig::tdm16_capture();
        cfg.feedback.high_packets = 17;
        assert_eq!(
            cfg.validate(2, SLOTS, SLOT_BYTES),
            Err(ConfigError::ExceedsCapacity {
                bytes: 17 * 384,
                capacity: 6144
            })
        );
    }

    // ── Test D: feedback rejections ────────────────────────────────────────────

    /// Thresholds must be ordered.
    #[test]
    fn rejects_inverted_thresholds() {
        let mut cfg = BridgeConfig::tdm16_playback();
        cfg.feedback.low_packets = 9;
        assert_eq!(
            cfg.validate(2, SLOTS, SLOT_BYTES),
            Err(ConfigError::ThresholdOrder { low: 9, high: 9 })
        );
    }

    /// The step must leave a positive value below nominal.
    #[test]
    fn rejects_step_at_nominal() {
        let mut cfg = BridgeConfig::tdm16_capture();
        cfg.feedback.step = cfg.feedback.nominal;
        assert!(matches!(
            cfg.validate(2, SLOTS, SLOT_BYTES),
            Err(ConfigError::StepTooLarge { .. })
        ));
    }

    /// Mask filters need 32-bit samples.
    #[test]
    fn rejects_mask_on_short_samples() {
        let mut cfg = BridgeConfig::tdm16_capture();
        cfg.layout = ChannelLayout::new(16, 2, 2);
        cfg.packet_bytes = 192;
        cfg.feedback.nominal = 192;
        cfg.feedback.step = 32;
        cfg.sample_filter = SampleFilter::TOP_24_BITS;
        assert_eq!(
            cfg.validate(2, SLOTS, 384),
            Err(ConfigError::FilterNeedsWordSamples(2))
        );
    }
}
