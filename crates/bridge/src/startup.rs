//! Startup/reset state and DMA slot rotation.
//!
//! ```text
//!            start()                  half-full              consumer aligned
//! Stopped ───────────▶ Priming ───────────────────▶ Armed ───────────────────▶ Running
//!    ▲                                                                            │
//!    └──────────────── stop() / frame-sync error (capture only) ──────────────────┘
//! ```
//!
//! Every edge is taken on one exact slot index. Capture arms when the index
//! reaches `SLOTS / 2` and runs when a pull lands while it is still there.
//! Playback opens its gate at `SLOTS / 2 + 1` and runs once the index wraps
//! back to 0.

/// Where a bridge direction is in its startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamState {
    /// Buffers zeroed, counters zero, DMA not armed.
    #[default]
    Stopped,
    /// DMA running, half-buffer alignment not yet reached.
    Priming,
    /// Alignment reached on the hardware side; waiting for the USB side.
    Armed,
    /// Normal adaptive operation.
    Running,
}

impl StreamState {
    /// `true` once the stream has left `Stopped`.
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Stopped)
    }
}

/// Index of the next DMA slot to complete, rotating through `SLOTS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotRotation<const SLOTS: usize> {
    next: usize,
}

impl<const SLOTS: usize> SlotRotation<SLOTS> {
    /// Capture arms at this index.
    pub const MIDPOINT: usize = SLOTS / 2;

    /// Playback opens its USB gate at this index.
    pub const GATE: usize = match (SLOTS / 2 + 1).checked_rem(SLOTS) {
        Some(i) => i,
        None => 0,
    };

    /// Rotation at slot 0.
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Slot the DMA engine completes next.
    pub const fn current(&self) -> usize {
        self.next
    }

    /// Move past the slot that just completed; returns the new index.
    pub fn advance(&mut self) -> usize {
        self.next = self.next.wrapping_add(1).checked_rem(SLOTS).unwrap_or(0);
        self.next
    }

    /// Back to slot 0.
    pub fn reset(&mut self) {
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Test A: edge indices ───────────────────────────────────────────────────

    /// Four slots: arm at 2, gate at 3.
    #[test]
    fn four_slot_edges() {
        assert_eq!(SlotRotation::<4>::MIDPOINT, 2);
        assert_eq!(SlotRotation::<4>::GATE, 3);
    }

    /// Two slots: arm at 1, gate wraps to 0.
    #[test]
    fn two_slot_edges() {
        assert_eq!(SlotRotation::<2>::MIDPOINT, 1);
        assert_eq!(SlotRotation::<2>::GATE, 0);
    }

    // ── Test B: rotation ───────────────────────────────────────────────────────

    /// The index wraps after SLOTS completions.
    #[test]
    fn rotation_wraps() {
        let mut r = SlotRotation::<4>::new();
        assert_eq!(r.advance(), 1);
        assert_eq!(r.advance(), 2);
        assert_eq!(r.advance(), 3);
        assert_eq!(r.advance(), 0);
        assert_eq!(r.current(), 0);
    }

    /// Only `Stopped` is inactive.
    #[test]
    fn active_states() {
        assert!(!StreamState::Stopped.is_active());
        assert!(StreamState::Priming.is_active());
        assert!(StreamState::Armed.is_active());
        assert!(StreamState::Running.is_active());
    }
}
