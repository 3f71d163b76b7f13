//! Producer/consumer byte accounting.
//!
//! `written` is only moved by the producer side and `read` only by the
//! consumer side. Both are 64-bit so a stream can run for centuries at
//! 3 MB/s without wrapping. `written - read` never leaves `0..=capacity`:
//! every mutator clamps and reports what it could not apply.

/// Monotonic write/read byte counters for one bridge direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillCounter {
    written: u64,
    read: u64,
    capacity: u64,
}

impl FillCounter {
    /// Empty counter for a ring of `capacity` bytes (all instances).
    pub const fn new(capacity: u64) -> Self {
        Self {
            written: 0,
            read: 0,
            capacity,
        }
    }

    /// Zero both counters.
    pub fn reset(&mut self) {
        self.written = 0;
        self.read = 0;
    }

    /// Start over at a known fill: `written = baseline`, `read = 0`.
    pub fn rebase(&mut self, baseline: u64) {
        self.written = baseline.min(self.capacity);
        self.read = 0;
    }

    /// Bytes produced but not yet consumed.
    pub const fn fill(&self) -> u64 {
        self.written.saturating_sub(self.read)
    }

    /// Bytes the producer may still add.
    pub const fn free(&self) -> u64 {
        self.capacity.saturating_sub(self.fill())
    }

    /// Ring capacity in bytes.
    pub const fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Total bytes produced since the last reset.
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Total bytes consumed since the last reset.
    pub const fn read(&self) -> u64 {
        self.read
    }

    /// Record `bytes` produced, capped at capacity.
    ///
    /// Returns the number of bytes that did not fit (0 when none overran).
    pub fn produce(&mut self, bytes: u64) -> u64 {
        let accepted = bytes.min(self.free());
        self.written = self.written.saturating_add(accepted);
        bytes.saturating_sub(accepted)
    }

    /// Record up to `bytes` consumed, never passing the producer.
    ///
    /// Returns the number of bytes actually consumed.
    pub fn consume(&mut self, bytes: u64) -> u64 {
        let taken = bytes.min(self.fill());
        self.read = self.read.saturating_add(taken);
        taken
    }
}
