//! Board audio profile for the 16-channel TDM ⇄ USB bridge.
//!
//! # Bus Layout (16 ch / 32 bit)
//!
//! ```text
//!  CH   +--+ 4 B
//!  FRAME +-----------------------------------------------+ 16 ch / 64 B
//!  FRAME PER INSTANCE +-----------------------+ 8 ch / 32 B
//!
//!  CH0-CH7   (instance 0)  [slot 0][slot 1][slot 2][slot 3]   768 B each
//!  CH8-CH15  (instance 1)  [slot 0][slot 1][slot 2][slot 3]   768 B each
//! ```
//!
//! One I2S controller handles at most 8 channels, so the 16-channel TDM
//! bus is split across two controllers sharing SCK/WS. Each controller
//! owns a ping-pong ring of [`SLOT_COUNT`] DMA slots.
//!
//! # Packet Sizes
//!
//! | Speed | Interval | Frames/packet | Bytes/packet |
//! |-------|----------|---------------|--------------|
//! | High  | 125 µs   | 6             | 384          |
//! | Full  | 1 ms     | 48            | 3072         |
//!
//! One slot (all instances) holds 4 high-speed packets; the full ring
//! holds 16. The feedback thresholds (9 / 4 packets) sit either side of
//! the half-full baseline (8 packets).

/// Audio sample rate (Hz).
pub const SAMPLE_RATE_HZ: u32 = 48_000;

/// Total logical channels on the TDM bus.
pub const CHANNEL_COUNT: usize = 16;

/// Hardware I2S controller instances (max 8 channels each).
pub const INSTANCE_COUNT: usize = 2;

/// Bytes per channel sample (32-bit slots).
pub const SAMPLE_BYTES: usize = 4;

/// Channels handled by one controller instance.
pub const CHANNELS_PER_INSTANCE: usize = CHANNEL_COUNT / INSTANCE_COUNT;

/// One interleaved frame across all channels (64 B).
pub const FRAME_BYTES: usize = CHANNEL_COUNT * SAMPLE_BYTES;

/// One frame's share for a single instance (32 B).
pub const FRAME_BYTES_PER_INSTANCE: usize = CHANNELS_PER_INSTANCE * SAMPLE_BYTES;

/// High-speed isochronous packet: one 125 µs microframe of audio (384 B).
pub const HS_ISO_PACKET_BYTES: usize =
    (SAMPLE_RATE_HZ as usize / 1000) * FRAME_BYTES / 8;

/// Full-speed isochronous packet: one 1 ms frame of audio (3072 B).
pub const FS_ISO_PACKET_BYTES: usize = (SAMPLE_RATE_HZ as usize / 1000) * FRAME_BYTES;

/// DMA slots per instance ring.
pub const SLOT_COUNT: usize = 4;

/// Bytes per DMA slot per instance: four HS packets split across instances.
pub const SLOT_BYTES: usize = (HS_ISO_PACKET_BYTES * 4) / INSTANCE_COUNT;

/// Fill level (whole HS packets) at or above which the bridge drains faster.
///
/// Calibration parameter, tuned for a 16-packet ring. Other board
/// variants used different pairs; keep the pair straddling the
/// half-full baseline.
pub const FEEDBACK_HIGH_PACKETS: u64 = 9;

/// Fill level (whole HS packets) at or below which the bridge drains slower.
pub const FEEDBACK_LOW_PACKETS: u64 = 4;

/// Fractional bits of the internal explicit-feedback counter.
pub const FEEDBACK_FRACTION_BITS: u32 = 13;

/// Nominal explicit feedback: frames per HS packet in Q.13 (6 << 13).
#[allow(clippy::cast_possible_truncation)] // 6 frames fits in u32
pub const FEEDBACK_NOMINAL: u32 =
    ((HS_ISO_PACKET_BYTES / FRAME_BYTES) as u32) << FEEDBACK_FRACTION_BITS;

/// Explicit feedback correction per decision (one LSB of the Q.13 value).
pub const FEEDBACK_STEP: u32 = 1;

/// Largest buffer the IN endpoint may be handed: a FS packet plus one
/// frame of implicit-feedback headroom.
pub const MAX_IN_TRANSFER_BYTES: usize = FS_ISO_PACKET_BYTES + FRAME_BYTES;

/// Largest OUT payload the host may send in one transfer.
pub const MAX_OUT_TRANSFER_BYTES: usize = FS_ISO_PACKET_BYTES + FRAME_BYTES;

// ── Layout checks ────────────────────────────────────────────────────────────

const _: () = assert!(CHANNEL_COUNT % INSTANCE_COUNT == 0);
const _: () = assert!(CHANNELS_PER_INSTANCE <= 8, "one I2S controller carries at most 8 channels");
const _: () = assert!(SLOT_BYTES % FRAME_BYTES_PER_INSTANCE == 0);
const _: () = assert!(HS_ISO_PACKET_BYTES % FRAME_BYTES == 0);
const _: () = assert!(SLOT_COUNT % 2 == 0);
const _: () = assert!(FEEDBACK_LOW_PACKETS < FEEDBACK_HIGH_PACKETS);
