//! Rate-limited bridge statistics report.
//!
//! Call [`Diagnostics::report`] from a periodic tick (USB SOF, a timer);
//! every `interval` ticks it logs one line per direction at info level.

use bridge::BridgeStats;

/// Tick counter gating the periodic statistics log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostics {
    interval: u32,
    ticks: u32,
    reports: u32,
}

impl Diagnostics {
    /// One report per second on a 1 ms tick.
    pub const DEFAULT_INTERVAL: u32 = 1000;

    /// Report every `interval` ticks (0 and 1 both mean every tick).
    pub const fn new(interval: u32) -> Self {
        Self {
            interval,
            ticks: 0,
            reports: 0,
        }
    }

    /// Count one tick; log both directions when the interval has elapsed.
    ///
    /// Returns `true` if a report was logged.
    pub fn report(&mut self, capture: &BridgeStats, playback: &BridgeStats) -> bool {
        self.ticks = self.ticks.saturating_add(1);
        if self.ticks < self.interval {
            return false;
        }
        self.ticks = 0;
        self.reports = self.reports.wrapping_add(1);
        info!(
            "in: {:?}, fill {} pk, next {} B, overruns {}, underruns {}, restarts {}",
            capture.state,
            capture.fill_packets,
            capture.next_transfer,
            capture.overruns,
            capture.underruns,
            capture.restarts
        );
        info!(
            "out: {:?}, fill {} pk, feedback {:#x}, overruns {}, underruns {}, early warnings {}",
            playback.state,
            playback.fill_packets,
            playback.next_transfer,
            playback.overruns,
            playback.underruns,
            playback.early_warnings
        );
        true
    }

    /// Reports logged so far.
    pub fn reports(&self) -> u32 {
        self.reports
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}
