//! Configuration errors.
//!
//! Only construction can fail. Once a bridge exists, stream anomalies are
//! recovered in place and counted in [`BridgeStats`](crate::BridgeStats);
//! caller contract violations (misaligned sizes) panic.

use thiserror_no_std::Error;

/// Reasons a [`BridgeConfig`](crate::BridgeConfig) is rejected for a buffer geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The layout has no channels.
    #[error("channel count is zero")]
    ZeroChannels,

    /// The layout has no controller instances.
    #[error("instance count is zero")]
    ZeroInstances,

    /// Samples have zero width.
    #[error("sample width is zero")]
    ZeroSampleBytes,

    /// Channels cannot be split evenly across instances.
    #[error("{channels} channels cannot be split across {instances} instances")]
    ChannelsNotDivisible {
        /// Total channels.
        channels: usize,
        /// Controller instances.
        instances: usize,
    },

    /// The layout's instance count differs from the buffer geometry.
    #[error("layout has {layout} instances but the buffer has {buffer}")]
    InstanceMismatch {
        /// Instances in the channel layout.
        layout: usize,
        /// Instances in the buffer geometry.
        buffer: usize,
    },

    /// A slot does not hold a whole number of per-instance frames.
    #[error("slot of {slot_bytes} B is not a multiple of the {frame_bytes} B instance frame")]
    SlotMisaligned {
        /// Bytes per slot per instance.
        slot_bytes: usize,
        /// Bytes of one frame on one instance.
        frame_bytes: usize,
    },

    /// Slot count is odd or below two; the half-full mark must be a slot boundary.
    #[error("slot count {0} must be even and at least 2")]
    InvalidSlotCount(usize),

    /// The nominal packet is empty or not a whole number of frames.
    #[error("packet of {packet_bytes} B is not a non-zero multiple of the {frame_bytes} B frame")]
    PacketMisaligned {
        /// Nominal packet bytes.
        packet_bytes: usize,
        /// Bytes of one full frame.
        frame_bytes: usize,
    },

    /// Implicit feedback step is not a whole number of frames.
    #[error("feedback step of {step} B is not a multiple of the {frame_bytes} B frame")]
    StepMisaligned {
        /// Feedback step.
        step: u32,
        /// Bytes of one full frame.
        frame_bytes: usize,
    },

    /// The feedback step would drive the nominal value to zero or below.
    #[error("feedback step {step} is not below nominal {nominal}")]
    StepTooLarge {
        /// Feedback step.
        step: u32,
        /// Nominal feedback value.
        nominal: u32,
    },

    /// Low threshold must be strictly below high threshold.
    #[error("low threshold {low} is not below high threshold {high}")]
    ThresholdOrder {
        /// Low threshold in packets.
        low: u64,
        /// High threshold in packets.
        high: u64,
    },

    /// The packet or the high threshold does not fit in the ring.
    #[error("{bytes} B does not fit in the {capacity} B ring")]
    ExceedsCapacity {
        /// Offending size in bytes.
        bytes: usize,
        /// Ring capacity across all instances.
        capacity: usize,
    },

    /// Mask filters operate on 32-bit samples only.
    #[error("sample mask needs 4-byte samples, layout has {0}")]
    FilterNeedsWordSamples(usize),
}
