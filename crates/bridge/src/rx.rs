//! Capture bridge: I2S/DMA → USB isochronous IN.
//!
//! The DMA engine fills slots at the bit-clock rate and calls
//! [`RxBridge::on_dma_complete`] once every instance has finished a slot.
//! The USB class layer calls [`RxBridge::pull_frames`] once per IN
//! interval with the nominal packet size for the bus speed. The size each
//! pull returns is the implicit feedback: one step more than that request
//! when the ring is filling up, one step less when it is draining. Fill is
//! always measured in configured (high-speed) packets.
//!
//! # Startup
//!
//! ```text
//! completion #   1        2 (index = SLOTS/2)     …       first pull at index SLOTS/2
//! state        Priming  → Armed, fill = baseline          → Running, fill = baseline, cursor 0
//! ```
//!
//! Until `Running`, every pull returns silence of the requested length.

use platform::I2sCapture;
use platform::I2sPath;

use crate::feedback::{FeedbackController, FeedbackSense};
use crate::fill::FillCounter;
use crate::ring::{Cursor, SlotRing};
use crate::startup::{SlotRotation, StreamState};
use crate::stats::{Anomalies, BridgeStats};
use crate::{BridgeConfig, ChannelLayout, ConfigError, SampleFilter};

/// Capture-direction bridge over `INSTANCES` controllers, each with a ring
/// of `SLOTS` DMA slots of `SLOT_BYTES` bytes.
pub struct RxBridge<const INSTANCES: usize, const SLOTS: usize, const SLOT_BYTES: usize> {
    ring: SlotRing<INSTANCES, SLOTS, SLOT_BYTES>,
    layout: ChannelLayout,
    filter: SampleFilter,
    controller: FeedbackController,
    fill: FillCounter,
    state: StreamState,
    rotation: SlotRotation<SLOTS>,
    cursor: Cursor,
    request: u32,
    anomalies: Anomalies,
}

impl<const INSTANCES: usize, const SLOTS: usize, const SLOT_BYTES: usize>
    RxBridge<INSTANCES, SLOTS, SLOT_BYTES>
{
    /// Ring capacity in bytes, all instances.
    pub const CAPACITY: usize = SlotRing::<INSTANCES, SLOTS, SLOT_BYTES>::CAPACITY;

    /// Fill the stream starts from once aligned: half the ring.
    #[allow(clippy::cast_possible_truncation)] // ring sizes fit in u64
    pub const BASELINE_BYTES: u64 = ((SLOTS / 2) * SLOT_BYTES * INSTANCES) as u64;

    const SLOT_BYTES_ALL: u64 = SlotRing::<INSTANCES, SLOTS, SLOT_BYTES>::SLOT_BYTES_ALL as u64;

    /// Build a stopped bridge.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from [`BridgeConfig::validate`], plus
    /// [`ConfigError::PacketMisaligned`] / [`ConfigError::StepMisaligned`]
    /// when the implicit feedback sizes are not whole frames.
    pub const fn new(config: BridgeConfig) -> Result<Self, ConfigError> {
        if let Err(e) = config.validate(INSTANCES, SLOTS, SLOT_BYTES) {
            return Err(e);
        }
        let frame = config.layout.frame_bytes();
        let fb = config.feedback;
        if !matches!((fb.nominal as usize).checked_rem(frame), Some(0)) {
            return Err(ConfigError::PacketMisaligned {
                packet_bytes: fb.nominal as usize,
                frame_bytes: frame,
            });
        }
        if !matches!((fb.step as usize).checked_rem(frame), Some(0)) {
            return Err(ConfigError::StepMisaligned {
                step: fb.step,
                frame_bytes: frame,
            });
        }
        Ok(Self {
            ring: SlotRing::new(),
            layout: config.layout,
            filter: config.sample_filter,
            controller: FeedbackController::new(fb, config.packet_bytes, FeedbackSense::Drain),
            fill: FillCounter::new(Self::CAPACITY as u64),
            state: StreamState::Stopped,
            rotation: SlotRotation::new(),
            cursor: Cursor::new(SlotRing::<INSTANCES, SLOTS, SLOT_BYTES>::INSTANCE_CAPACITY),
            request: fb.nominal,
            anomalies: Anomalies::new(),
        })
    }

    // ── Lifecycle ──────────────────────────────────────────────────────────────

    /// Reset and arm capture DMA. Called on the IN interface's alt 0→1.
    pub fn start(&mut self, i2s: &mut impl I2sPath) {
        self.reset();
        self.state = StreamState::Priming;
        i2s.start();
        info!(
            "rx: start ({} instances x {} slots x {} B)",
            INSTANCES, SLOTS, SLOT_BYTES
        );
    }

    /// Stop capture DMA and reset. Safe to call repeatedly or before `start`.
    pub fn stop(&mut self, i2s: &mut impl I2sPath) {
        i2s.stop();
        let was = self.state;
        self.reset();
        info!("rx: stop (was {:?})", was);
    }

    /// Zero buffers, counters, cursor and slot index; back to `Stopped`.
    ///
    /// Anomaly counters are kept; see [`clear_stats`](Self::clear_stats).
    pub fn reset(&mut self) {
        self.ring.clear();
        self.fill.reset();
        self.rotation.reset();
        self.cursor.reset();
        self.state = StreamState::Stopped;
    }

    // ── Producer (DMA interrupt) ───────────────────────────────────────────────

    /// One slot finished on every instance.
    ///
    /// Checks frame sync first: any instance reporting an error restarts
    /// the whole capture path and nothing is accounted. Otherwise the
    /// completed slot is requeued on every instance and the slot is
    /// accounted as produced. Ignored while `Stopped`.
    pub fn on_dma_complete(&mut self, i2s: &mut impl I2sCapture) {
        if !self.state.is_active() {
            return;
        }
        if (0..INSTANCES).any(|instance| i2s.frame_sync_error(instance)) {
            self.restart(i2s);
            return;
        }

        let done = self.rotation.current();
        for instance in 0..INSTANCES {
            i2s.requeue(instance, done);
        }
        let next = self.rotation.advance();

        match self.state {
            StreamState::Priming if next == SlotRotation::<SLOTS>::MIDPOINT => {
                self.fill.rebase(Self::BASELINE_BYTES);
                self.state = StreamState::Armed;
                debug!("rx: armed at slot {}, fill {} B", next, Self::BASELINE_BYTES);
            }
            StreamState::Running => {
                let lost = self.fill.produce(Self::SLOT_BYTES_ALL);
                if lost > 0 {
                    self.anomalies.overruns = self.anomalies.overruns.wrapping_add(1);
                    warn!("rx: overrun, {} B not accounted", lost);
                }
            }
            // Armed: the fill is rebased when the consumer aligns.
            _ => {}
        }
    }

    fn restart(&mut self, i2s: &mut impl I2sCapture) {
        i2s.stop();
        for instance in 0..INSTANCES {
            if i2s.frame_sync_error(instance) {
                i2s.clear_frame_sync_error(instance);
            }
        }
        self.reset();
        self.state = StreamState::Priming;
        i2s.start();
        self.anomalies.restarts = self.anomalies.restarts.wrapping_add(1);
        warn!("rx: frame-sync error, restart #{}", self.anomalies.restarts);
    }

    // ── Consumer (USB IN interrupt) ────────────────────────────────────────────

    /// Fill `out` with the next IN packet and return its length.
    ///
    /// Before `Running`, writes `requested` bytes of silence and returns
    /// `requested`. Once running, returns the implicit feedback size:
    /// `requested`, or `requested` ± step depending on fill. If the ring holds less
    /// than that, the missing tail is silence and only the copied frames are
    /// consumed.
    ///
    /// # Panics
    ///
    /// If `requested` is not a multiple of the frame size, or `out` is
    /// shorter than the length returned.
    pub fn pull_frames(&mut self, out: &mut [u8], requested: usize) -> usize {
        let frame = self.layout.frame_bytes();
        assert!(
            matches!(requested.checked_rem(frame), Some(0)),
            "rx: pull of {} B is not a multiple of the {} B frame",
            requested,
            frame
        );
        self.request = u32::try_from(requested).unwrap_or(u32::MAX);

        if self.state != StreamState::Running && !self.try_align() {
            assert!(out.len() >= requested, "rx: IN buffer shorter than request");
            if let Some(silence) = out.get_mut(..requested) {
                silence.fill(0);
            }
            return requested;
        }

        let fill = self.fill.fill();
        let size = self.controller.decide_around(self.request, fill) as usize;
        trace!(
            "rx: fill {} packets -> {} B",
            self.controller.fill_packets(fill),
            size
        );
        assert!(out.len() >= size, "rx: IN buffer shorter than feedback size");

        let available = usize::try_from(fill).unwrap_or(usize::MAX);
        let frames = size.min(available).checked_div(frame).unwrap_or(0);
        let run = self.layout.frame_bytes_per_instance();
        let mut copied = 0usize;
        for dst in out.chunks_exact_mut(frame).take(frames) {
            if !self.ring.gather_frame(self.cursor.offset(), dst, self.filter) {
                break;
            }
            self.cursor.advance(run);
            copied = copied.saturating_add(frame);
        }
        if let Some(tail) = out.get_mut(copied..size) {
            tail.fill(0);
        }
        if copied < size {
            self.anomalies.underruns = self.anomalies.underruns.wrapping_add(1);
            warn!("rx: underrun, {} of {} B available", copied, size);
        }
        self.fill.consume(copied as u64);
        size
    }

    fn try_align(&mut self) -> bool {
        if self.state != StreamState::Armed
            || self.rotation.current() != SlotRotation::<SLOTS>::MIDPOINT
        {
            return false;
        }
        self.fill.rebase(Self::BASELINE_BYTES);
        self.cursor.reset();
        self.state = StreamState::Running;
        debug!("rx: running, fill {} B", Self::BASELINE_BYTES);
        true
    }

    // ── DMA memory ─────────────────────────────────────────────────────────────

    /// Slot the DMA engine completes next.
    pub fn filling_slot(&self) -> usize {
        self.rotation.current()
    }

    /// DMA destination for `slot` of `instance`.
    pub fn slot_mut(&mut self, instance: usize, slot: usize) -> Option<&mut [u8; SLOT_BYTES]> {
        self.ring.slot_mut(instance, slot)
    }

    /// Read-only view of `slot` of `instance`.
    pub fn slot(&self, instance: usize, slot: usize) -> Option<&[u8; SLOT_BYTES]> {
        self.ring.slot(instance, slot)
    }

    // ── Introspection ──────────────────────────────────────────────────────────

    /// Current startup state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// `WriteCount - ReadCount` in bytes.
    pub fn fill_bytes(&self) -> u64 {
        self.fill.fill()
    }

    /// Total bytes accounted as produced since the last reset.
    pub fn write_count(&self) -> u64 {
        self.fill.written()
    }

    /// Total bytes consumed since the last reset.
    pub fn read_count(&self) -> u64 {
        self.fill.read()
    }

    /// Consumer cursor, instance-local bytes.
    pub fn read_offset(&self) -> usize {
        self.cursor.offset()
    }

    /// Channel layout in use.
    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Size the next running pull would return, assuming the same request
    /// as the last one (the configured nominal before any pull).
    pub fn next_transfer_bytes(&self) -> usize {
        self.controller.decide_around(self.request, self.fill.fill()) as usize
    }

    /// Diagnostics snapshot.
    pub fn stats(&self) -> BridgeStats {
        let fill = self.fill.fill();
        BridgeStats {
            state: self.state,
            fill_bytes: fill,
            fill_packets: self.controller.fill_packets(fill),
            next_transfer: self.controller.decide_around(self.request, fill),
            overruns: self.anomalies.overruns,
            underruns: self.anomalies.underruns,
            restarts: self.anomalies.restarts,
            early_warnings: self.anomalies.early_warnings,
        }
    }

    /// Zero the anomaly counters.
    pub fn clear_stats(&mut self) {
        self.anomalies = Anomalies::new();
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation
)]
mod tests {
    use super::*;
    use platform::mocks::MockI2s;

    type Rx = RxBridge<2, 4, 768>;

    fn rx() -> Rx {
        Rx::new(BridgeConfig::tdm16_capture()).unwrap()
    }

    /// Start and run the two completions that arm the bridge.
    fn armed() -> (Rx, MockI2s) {
        let mut rx = rx();
        let mut i2s = MockI2s::new();
        rx.start(&mut i2s);
        rx.on_dma_complete(&mut i2s);
        rx.on_dma_complete(&mut i2s);
        (rx, i2s)
    }

    // ── Test A: lifecycle ──────────────────────────────────────────────────────

    /// `start` arms the hardware and enters Priming with zero counters.
    #[test]
    fn start_enters_priming() {
        let mut rx = rx();
        let mut i2s = MockI2s::new();
        rx.start(&mut i2s);
        assert_eq!(i2s.start_count(), 1);
        assert_eq!(rx.state(), StreamState::Priming);
        assert_eq!((rx.write_count(), rx.read_count()), (0, 0));
    }

    /// A completion while Stopped moves nothing.
    #[test]
    fn stray_completion_is_ignored() {
        let mut rx = rx();
        let mut i2s = MockI2s::new();
        rx.on_dma_complete(&mut i2s);
        assert!(i2s.requeues().is_empty());
        assert_eq!(rx.filling_slot(), 0);
        assert_eq!(rx.state(), StreamState::Stopped);
    }

    // ── Test B: priming ────────────────────────────────────────────────────────

    /// One completion is not enough; the second arms at the baseline.
    #[test]
    fn arms_on_midpoint_completion() {
        let mut rx = rx();
        let mut i2s = MockI2s::new();
        rx.start(&mut i2s);
        rx.on_dma_complete(&mut i2s);
        assert_eq!(rx.state(), StreamState::Priming);
        assert_eq!(rx.fill_bytes(), 0);
        rx.on_dma_complete(&mut i2s);
        assert_eq!(rx.state(), StreamState::Armed);
        assert_eq!(rx.fill_bytes(), Rx::BASELINE_BYTES);
        assert_eq!(Rx::BASELINE_BYTES, 3072);
    }

    /// Completions requeue the finished slot on every instance, in order.
    #[test]
    fn completion_requeues_every_instance() {
        let (_rx, i2s) = armed();
        assert_eq!(i2s.requeues(), &[(0, 0), (1, 0), (0, 1), (1, 1)]);
    }

    /// Pulls before alignment return silence of the requested size.
    #[test]
    fn priming_pull_is_silence() {
        let mut rx = rx();
        let mut i2s = MockI2s::new();
        rx.start(&mut i2s);
        rx.on_dma_complete(&mut i2s);
        let mut out = [0xAAu8; 448];
        assert_eq!(rx.pull_frames(&mut out, 384), 384);
        assert!(out[..384].iter().all(|&b| b == 0));
        assert_eq!(out[384], 0xAA);
        assert_eq!(rx.read_count(), 0);
    }

    /// Armed but index past the midpoint: wait for the next lap.
    #[test]
    fn late_pull_waits_for_next_lap() {
        let (mut rx, mut i2s) = armed();
        rx.on_dma_complete(&mut i2s);
        let mut out = [0u8; 448];
        rx.pull_frames(&mut out, 384);
        assert_eq!(rx.state(), StreamState::Armed);
        for _ in 0..3 {
            rx.on_dma_complete(&mut i2s);
        }
        assert_eq!(rx.filling_slot(), 2);
        rx.pull_frames(&mut out, 384);
        assert_eq!(rx.state(), StreamState::Running);
    }

    // ── Test C: data path ──────────────────────────────────────────────────────

    /// Pulled frames interleave instance 0 then instance 1 from slot 0 onward.
    #[test]
    fn pull_interleaves_instances() {
        let mut rx = rx();
        let mut i2s = MockI2s::new();
        rx.start(&mut i2s);
        for slot in 0..2 {
            for instance in 0..2 {
                let fill = (instance * 0x10 + slot + 1) as u8;
                rx.slot_mut(instance, slot).unwrap().fill(fill);
            }
            rx.on_dma_complete(&mut i2s);
        }
        let mut out = [0u8; 448];
        let n = rx.pull_frames(&mut out, 384);
        assert_eq!(n, 384);
        for frame in out[..n].chunks_exact(64) {
            assert!(frame[..32].iter().all(|&b| b == 0x01));
            assert!(frame[32..].iter().all(|&b| b == 0x11));
        }
        assert_eq!(rx.read_offset(), 6 * 32);
    }

    /// A full-speed request is centred on its own size, not the configured nominal.
    #[test]
    fn full_speed_request_sets_centre() {
        let (mut rx, mut i2s) = armed();
        let mut out = [0u8; 3136];
        assert_eq!(rx.pull_frames(&mut out, 3072), 3072);
        assert_eq!(rx.state(), StreamState::Running);
        assert_eq!(rx.fill_bytes(), 0);
        assert_eq!(rx.next_transfer_bytes(), 3008);
        rx.on_dma_complete(&mut i2s);
        rx.on_dma_complete(&mut i2s);
        assert_eq!(rx.pull_frames(&mut out, 3072), 3072);
        assert_eq!(rx.stats().overruns, 0);
        assert_eq!(rx.stats().underruns, 0);
    }

    // ── Test D: clamps ─────────────────────────────────────────────────────────

    /// Production past capacity is capped and counted.
    #[test]
    fn overrun_is_capped() {
        let (mut rx, mut i2s) = armed();
        let mut out = [0u8; 448];
        rx.pull_frames(&mut out, 384);
        for _ in 0..4 {
            rx.on_dma_complete(&mut i2s);
        }
        assert_eq!(rx.fill_bytes(), Rx::CAPACITY as u64);
        assert_eq!(rx.stats().overruns, 2);
    }

    /// A starved pull copies what exists, zero-fills the rest, keeps its size.
    #[test]
    fn starved_pull_zero_fills_tail() {
        let (mut rx, _i2s) = armed();
        let mut out = [0u8; 448];
        let mut sizes = Vec::new();
        for _ in 0..9 {
            out.fill(0xEE);
            sizes.push(rx.pull_frames(&mut out, 384));
        }
        assert_eq!(sizes, [384, 384, 384, 384, 320, 320, 320, 320, 320]);
        // The ninth pull found 256 B: four frames copied, one frame of silence.
        assert!(out[256..320].iter().all(|&b| b == 0));
        assert_eq!(rx.fill_bytes(), 0);
        assert_eq!(rx.stats().underruns, 1);
        assert_eq!(rx.read_count(), rx.write_count());
    }

    // ── Test E: frame-sync recovery ────────────────────────────────────────────

    /// A frame-sync error restarts the path and clears the latch.
    #[test]
    fn frame_sync_error_restarts() {
        let (mut rx, mut i2s) = armed();
        i2s.inject_frame_sync_error(1);
        rx.on_dma_complete(&mut i2s);
        assert_eq!(i2s.stop_count(), 1);
        assert_eq!(i2s.start_count(), 2);
        assert!(!i2s.frame_sync_error(1));
        assert_eq!(rx.state(), StreamState::Priming);
        assert_eq!(rx.filling_slot(), 0);
        assert_eq!(rx.fill_bytes(), 0);
        assert_eq!(rx.stats().restarts, 1);
    }

    // ── Test F: contract ───────────────────────────────────────────────────────

    /// A request that is not whole frames is a caller bug.
    #[test]
    #[should_panic(expected = "not a multiple")]
    fn misaligned_pull_panics() {
        let (mut rx, _i2s) = armed();
        let mut out = [0u8; 448];
        rx.pull_frames(&mut out, 100);
    }

    /// Misaligned implicit feedback step is rejected at construction.
    #[test]
    fn misaligned_step_rejected() {
        let mut cfg = BridgeConfig::tdm16_capture();
        cfg.feedback.step = 10;
        assert!(matches!(
            Rx::new(cfg),
            Err(ConfigError::StepMisaligned { step: 10, .. })
        ));
    }
}
