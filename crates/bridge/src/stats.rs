//! Per-direction diagnostics snapshot.

use crate::StreamState;

/// Point-in-time view of one bridge direction.
///
/// Anomaly counters (`overruns`, `underruns`, `restarts`, `early_warnings`) survive
/// `start`/`stop` so a host can see what happened across stream restarts;
/// [`clear_stats`](crate::RxBridge::clear_stats) zeroes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BridgeStats {
    /// Startup state.
    pub state: StreamState,
    /// `WriteCount - ReadCount` in bytes, all instances.
    pub fill_bytes: u64,
    /// Fill in whole nominal packets.
    pub fill_packets: u64,
    /// Capture: bytes the next pull returns. Playback: raw Q.13 feedback.
    pub next_transfer: u32,
    /// Times production was clamped at capacity.
    pub overruns: u32,
    /// Times consumption was clamped at the producer.
    pub underruns: u32,
    /// Frame-sync recoveries (capture only).
    pub restarts: u32,
    /// OUT pushes that left the fill above the early-warning mark (playback only).
    pub early_warnings: u32,
}

/// Anomaly counters kept by a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Anomalies {
    pub overruns: u32,
    pub underruns: u32,
    pub restarts: u32,
    pub early_warnings: u32,
}

impl Anomalies {
    pub const fn new() -> Self {
        Self {
            overruns: 0,
            underruns: 0,
            restarts: 0,
            early_warnings: 0,
        }
    }
}
