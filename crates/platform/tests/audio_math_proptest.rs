//! Property-based tests for the board profile.
//! Verifies invariants hold for ALL valid inputs, not just fixed examples.

#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::indexing_slicing)]

use platform::audio_config::{
    FRAME_BYTES, FRAME_BYTES_PER_INSTANCE, FS_ISO_PACKET_BYTES, HS_ISO_PACKET_BYTES,
    INSTANCE_COUNT, MAX_IN_TRANSFER_BYTES, SLOT_BYTES,
};
use platform::UsbSpeed;

proptest::proptest! {
    /// Any whole number of frames splits into equal per-instance runs.
    #[test]
    fn frames_split_evenly_across_instances(frames in 0usize..=64) {
        let bytes = frames * FRAME_BYTES;
        assert_eq!(bytes % INSTANCE_COUNT, 0);
        assert_eq!(bytes / INSTANCE_COUNT, frames * FRAME_BYTES_PER_INSTANCE);
    }

    /// Every implicit-feedback size (nominal ± frames) at either speed is
    /// frame-aligned and fits the IN buffer.
    #[test]
    fn implicit_sizes_fit_in_buffer(delta in -1i32..=1, full_speed in proptest::bool::ANY) {
        let speed = if full_speed { UsbSpeed::Full } else { UsbSpeed::High };
        let size = speed.iso_packet_bytes() as i64 + i64::from(delta) * FRAME_BYTES as i64;
        assert!(size > 0);
        assert_eq!(size as usize % FRAME_BYTES, 0);
        assert!(size as usize <= MAX_IN_TRANSFER_BYTES,
            "{} B does not fit the {} B IN buffer", size, MAX_IN_TRANSFER_BYTES);
    }

    /// Any offset inside a slot that is run-aligned leaves room for a whole run.
    #[test]
    fn run_aligned_offsets_never_straddle(run in 0usize..SLOT_BYTES / FRAME_BYTES_PER_INSTANCE) {
        let offset = run * FRAME_BYTES_PER_INSTANCE;
        assert!(offset + FRAME_BYTES_PER_INSTANCE <= SLOT_BYTES);
    }
}

/// A full-speed packet is exactly eight high-speed packets.
#[test]
fn full_speed_packet_is_eight_microframes() {
    assert_eq!(FS_ISO_PACKET_BYTES, HS_ISO_PACKET_BYTES * 8);
}
