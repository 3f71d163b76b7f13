//! Slot ring storage shared with the DMA engine.
//!
//! ```text
//!             slot 0      slot 1      slot 2      slot 3
//! instance 0 [..........][..........][..........][..........]
//! instance 1 [..........][..........][..........][..........]
//!             ^ cursor (instance-local byte offset, wraps at SLOTS*SLOT_BYTES)
//! ```
//!
//! Cursors advance by one per-instance frame at a time. Because a slot holds
//! a whole number of per-instance frames, a frame never straddles two slots
//! and every access is a single bounds-checked subslice.

/// Instance-local byte offset into a slot ring, wrapping at `capacity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    offset: usize,
    capacity: usize,
}

impl Cursor {
    /// Cursor at offset 0 of a ring holding `capacity` bytes per instance.
    pub const fn new(capacity: usize) -> Self {
        Self {
            offset: 0,
            capacity,
        }
    }

    /// Current offset, always below capacity.
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Move forward by `bytes`, wrapping at capacity.
    pub fn advance(&mut self, bytes: usize) {
        let next = self.offset.wrapping_add(bytes);
        self.offset = next.checked_rem(self.capacity).unwrap_or(0);
    }

    /// Back to offset 0.
    pub fn reset(&mut self) {
        self.offset = 0;
    }
}

/// DMA slot storage for every instance of one direction.
///
/// The `repr(C)` layout keeps each instance's slots contiguous, so one
/// instance's ring can back a single circular DMA region.
#[repr(C)]
pub struct SlotRing<const INSTANCES: usize, const SLOTS: usize, const SLOT_BYTES: usize> {
    slots: [[[u8; SLOT_BYTES]; SLOTS]; INSTANCES],
}

impl<const INSTANCES: usize, const SLOTS: usize, const SLOT_BYTES: usize>
    SlotRing<INSTANCES, SLOTS, SLOT_BYTES>
{
    /// Bytes one instance's ring holds.
    pub const INSTANCE_CAPACITY: usize = SLOTS * SLOT_BYTES;

    /// Bytes all instances hold together.
    pub const CAPACITY: usize = INSTANCES * SLOTS * SLOT_BYTES;

    /// Bytes one slot transfer moves across all instances.
    pub const SLOT_BYTES_ALL: usize = INSTANCES * SLOT_BYTES;

    /// Zero-filled ring.
    pub const fn new() -> Self {
        Self {
            slots: [[[0u8; SLOT_BYTES]; SLOTS]; INSTANCES],
        }
    }

    /// Zero every byte of every slot.
    pub fn clear(&mut self) {
        for instance in &mut self.slots {
            for slot in instance.iter_mut() {
                slot.fill(0);
            }
        }
    }

    /// One whole slot, for handing to DMA.
    pub fn slot(&self, instance: usize, slot: usize) -> Option<&[u8; SLOT_BYTES]> {
        self.slots.get(instance)?.get(slot)
    }

    /// One whole slot, mutable, for DMA to fill.
    pub fn slot_mut(&mut self, instance: usize, slot: usize) -> Option<&mut [u8; SLOT_BYTES]> {
        self.slots.get_mut(instance)?.get_mut(slot)
    }

    /// `len` bytes of `instance` starting at `offset`, if they sit in one slot.
    pub fn chunk(&self, instance: usize, offset: usize, len: usize) -> Option<&[u8]> {
        let (slot, start) = Self::locate(offset)?;
        let end = start.checked_add(len)?;
        self.slots.get(instance)?.get(slot)?.get(start..end)
    }

    /// Mutable form of [`chunk`](Self::chunk).
    pub fn chunk_mut(&mut self, instance: usize, offset: usize, len: usize) -> Option<&mut [u8]> {
        let (slot, start) = Self::locate(offset)?;
        let end = start.checked_add(len)?;
        self.slots.get_mut(instance)?.get_mut(slot)?.get_mut(start..end)
    }

    fn locate(offset: usize) -> Option<(usize, usize)> {
        Some((
            offset.checked_div(SLOT_BYTES)?,
            offset.checked_rem(SLOT_BYTES)?,
        ))
    }
}

impl<const INSTANCES: usize, const SLOTS: usize, const SLOT_BYTES: usize> Default
    for SlotRing<INSTANCES, SLOTS, SLOT_BYTES>
{
    fn default() -> Self {
        Self::new()
    }
}
