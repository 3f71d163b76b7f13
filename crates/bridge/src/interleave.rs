//! Multi-instance frame fan-out / fan-in.
//!
//! One interleaved frame of `frame_bytes` is split into `INSTANCES` equal
//! runs of `frame_bytes_per_instance`. Run `i` belongs to instance `i`:
//!
//! ```text
//!  USB frame  [ ch0 ch1 .. ch7 | ch8 ch9 .. ch15 ]
//!               └─ instance 0 ─┘ └─ instance 1 ──┘
//! ```
//!
//! Both directions copy every instance's run before the caller advances its
//! cursor, so all instances stay on the same frame boundary.

use crate::ring::SlotRing;
use crate::SampleFilter;

impl SampleFilter {
    /// Apply the filter in place to a run of little-endian 32-bit samples.
    ///
    /// Trailing bytes that do not form a whole sample are left untouched.
    pub fn apply(&self, run: &mut [u8]) {
        let Self::Mask(mask) = *self else {
            return;
        };
        for sample in run.chunks_exact_mut(4) {
            let mut word = [0u8; 4];
            word.copy_from_slice(sample);
            let masked = u32::from_le_bytes(word) & mask;
            sample.copy_from_slice(&masked.to_le_bytes());
        }
    }
}

impl<const INSTANCES: usize, const SLOTS: usize, const SLOT_BYTES: usize>
    SlotRing<INSTANCES, SLOTS, SLOT_BYTES>
{
    /// Copy one interleaved `frame` into every instance ring at `offset`.
    ///
    /// Returns `false` (and copies nothing past the failing instance) if a
    /// run does not fit inside one slot.
    pub fn scatter_frame(&mut self, offset: usize, frame: &[u8]) -> bool {
        let Some(run) = frame.len().checked_div(INSTANCES).filter(|r| *r > 0) else {
            return false;
        };
        for (instance, src) in frame.chunks_exact(run).take(INSTANCES).enumerate() {
            let Some(dst) = self.chunk_mut(instance, offset, run) else {
                return false;
            };
            dst.copy_from_slice(src);
        }
        true
    }

    /// Fill one interleaved `frame` from every instance ring at `offset`.
    ///
    /// `filter` is applied to each run after the copy.
    pub fn gather_frame(&self, offset: usize, frame: &mut [u8], filter: SampleFilter) -> bool {
        let Some(run) = frame.len().checked_div(INSTANCES).filter(|r| *r > 0) else {
            return false;
        };
        for (instance, dst) in frame.chunks_exact_mut(run).take(INSTANCES).enumerate() {
            let Some(src) = self.chunk(instance, offset, run) else {
                return false;
            };
            dst.copy_from_slice(src);
            filter.apply(dst);
        }
        true
    }
}
