//! Playback bridge: USB isochronous OUT → I2S/DMA.
//!
//! The USB class layer calls [`TxBridge::push_frames`] with each OUT
//! payload; the DMA engine drains one slot per instance per
//! [`TxBridge::on_dma_complete`]. The host is paced by the explicit feedback
//! value, recomputed on every push and read back with
//! [`TxBridge::feedback_packet`].
//!
//! # Startup
//!
//! ```text
//! start()     DMA plays the zeroed ring, OUT payloads dropped        Priming
//! index hits SLOTS/2 + 1 on a push → gate opens, payloads land      Armed
//! index wraps to 0                 → data valid, ReadCount advances Running
//! ```

use platform::{I2sPath, UsbSpeed};

use crate::feedback::{FeedbackController, FeedbackPacket, FeedbackSense};
use crate::fill::FillCounter;
use crate::ring::{Cursor, SlotRing};
use crate::startup::{SlotRotation, StreamState};
use crate::stats::{Anomalies, BridgeStats};
use crate::{BridgeConfig, ChannelLayout, ConfigError};

/// Playback-direction bridge over `INSTANCES` controllers, each with a ring
/// of `SLOTS` DMA slots of `SLOT_BYTES` bytes.
pub struct TxBridge<const INSTANCES: usize, const SLOTS: usize, const SLOT_BYTES: usize> {
    ring: SlotRing<INSTANCES, SLOTS, SLOT_BYTES>,
    layout: ChannelLayout,
    controller: FeedbackController,
    fill: FillCounter,
    state: StreamState,
    rotation: SlotRotation<SLOTS>,
    cursor: Cursor,
    feedback: u32,
    anomalies: Anomalies,
}

impl<const INSTANCES: usize, const SLOTS: usize, const SLOT_BYTES: usize>
    TxBridge<INSTANCES, SLOTS, SLOT_BYTES>
{
    /// Ring capacity in bytes, all instances.
    pub const CAPACITY: usize = SlotRing::<INSTANCES, SLOTS, SLOT_BYTES>::CAPACITY;

    /// Fill above which a push logs an early overrun warning.
    #[allow(clippy::cast_possible_truncation)] // ring sizes fit in u64
    pub const EARLY_WARNING_BYTES: u64 = ((SLOTS + 1) * SLOT_BYTES) as u64;

    const SLOT_BYTES_ALL: u64 = SlotRing::<INSTANCES, SLOTS, SLOT_BYTES>::SLOT_BYTES_ALL as u64;

    /// Build a stopped bridge.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from [`BridgeConfig::validate`].
    pub const fn new(config: BridgeConfig) -> Result<Self, ConfigError> {
        if let Err(e) = config.validate(INSTANCES, SLOTS, SLOT_BYTES) {
            return Err(e);
        }
        Ok(Self {
            ring: SlotRing::new(),
            layout: config.layout,
            controller: FeedbackController::new(
                config.feedback,
                config.packet_bytes,
                FeedbackSense::Throttle,
            ),
            fill: FillCounter::new(Self::CAPACITY as u64),
            state: StreamState::Stopped,
            rotation: SlotRotation::new(),
            cursor: Cursor::new(SlotRing::<INSTANCES, SLOTS, SLOT_BYTES>::INSTANCE_CAPACITY),
            feedback: config.feedback.nominal,
            anomalies: Anomalies::new(),
        })
    }

    // ── Lifecycle ──────────────────────────────────────────────────────────────

    /// Reset and start playback DMA over the zeroed ring.
    /// Called on the OUT interface's alt 0→1.
    pub fn start(&mut self, i2s: &mut impl I2sPath) {
        self.reset();
        self.state = StreamState::Priming;
        i2s.start();
        info!(
            "tx: start ({} instances x {} slots x {} B)",
            INSTANCES, SLOTS, SLOT_BYTES
        );
    }

    /// Stop playback DMA and reset. Safe to call repeatedly or before `start`.
    pub fn stop(&mut self, i2s: &mut impl I2sPath) {
        i2s.stop();
        let was = self.state;
        self.reset();
        info!("tx: stop (was {:?})", was);
    }

    /// Zero buffers, counters, cursor and slot index; feedback back to
    /// nominal; state `Stopped`. Anomaly counters are kept.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.fill.reset();
        self.rotation.reset();
        self.cursor.reset();
        self.feedback = self.controller.nominal();
        self.state = StreamState::Stopped;
    }

    // ── Producer (USB OUT interrupt) ───────────────────────────────────────────

    /// Absorb one OUT payload of whole frames.
    ///
    /// Dropped while `Stopped`, and while `Priming` unless the DMA index is
    /// at the gate slot. Frames that do not fit in the free space are
    /// dropped and counted as an overrun.
    ///
    /// # Panics
    ///
    /// If `data.len()` is not a multiple of the frame size.
    pub fn push_frames(&mut self, data: &[u8]) {
        let frame = self.layout.frame_bytes();
        assert!(
            matches!(data.len().checked_rem(frame), Some(0)),
            "tx: push of {} B is not a multiple of the {} B frame",
            data.len(),
            frame
        );

        match self.state {
            StreamState::Stopped => return,
            StreamState::Priming => {
                if self.rotation.current() != SlotRotation::<SLOTS>::GATE {
                    return;
                }
                self.state = StreamState::Armed;
                debug!("tx: gate open at slot {}", SlotRotation::<SLOTS>::GATE);
            }
            StreamState::Armed | StreamState::Running => {}
        }

        let free = usize::try_from(self.fill.free()).unwrap_or(usize::MAX);
        let frames = data.len().min(free).checked_div(frame).unwrap_or(0);
        let run = self.layout.frame_bytes_per_instance();
        let mut accepted = 0usize;
        for src in data.chunks_exact(frame).take(frames) {
            if !self.ring.scatter_frame(self.cursor.offset(), src) {
                break;
            }
            self.cursor.advance(run);
            accepted = accepted.saturating_add(frame);
        }
        if accepted < data.len() {
            self.anomalies.overruns = self.anomalies.overruns.wrapping_add(1);
            warn!(
                "tx: overrun, dropped {} of {} B",
                data.len().saturating_sub(accepted),
                data.len()
            );
        }
        self.fill.produce(accepted as u64);

        let fill = self.fill.fill();
        self.feedback = self.controller.decide(fill);
        trace!(
            "tx: fill {} packets -> feedback {}",
            self.controller.fill_packets(fill),
            self.feedback
        );
        if fill > Self::EARLY_WARNING_BYTES {
            self.anomalies.early_warnings = self.anomalies.early_warnings.wrapping_add(1);
            warn!(
                "tx: fill {} B above early-warning mark {} B",
                fill,
                Self::EARLY_WARNING_BYTES
            );
        }
    }

    // ── Consumer (DMA interrupt) ───────────────────────────────────────────────

    /// One slot finished playing on every instance.
    ///
    /// Requeues that slot on every instance. Once data is valid, one slot
    /// across all instances is accounted as consumed, never passing what
    /// was written. Ignored while `Stopped`.
    pub fn on_dma_complete(&mut self, i2s: &mut impl I2sPath) {
        if !self.state.is_active() {
            return;
        }

        let done = self.rotation.current();
        for instance in 0..INSTANCES {
            i2s.requeue(instance, done);
        }
        let next = self.rotation.advance();

        match self.state {
            StreamState::Running => {
                let taken = self.fill.consume(Self::SLOT_BYTES_ALL);
                if taken < Self::SLOT_BYTES_ALL {
                    self.anomalies.underruns = self.anomalies.underruns.wrapping_add(1);
                    warn!(
                        "tx: underrun, {} of {} B written",
                        taken,
                        Self::SLOT_BYTES_ALL
                    );
                }
            }
            StreamState::Armed if next == 0 => {
                self.state = StreamState::Running;
                debug!("tx: running, fill {} B", self.fill.fill());
            }
            _ => {}
        }
    }

    // ── Feedback endpoint ──────────────────────────────────────────────────────

    /// Raw Q.13 feedback (frames per HS microframe).
    pub fn feedback(&self) -> u32 {
        self.feedback
    }

    /// Feedback packed for the feedback endpoint at `speed`.
    pub fn feedback_packet(&self, speed: UsbSpeed) -> FeedbackPacket {
        FeedbackPacket::pack(self.feedback, speed)
    }

    // ── DMA memory ─────────────────────────────────────────────────────────────

    /// Slot the DMA engine completes next.
    pub fn draining_slot(&self) -> usize {
        self.rotation.current()
    }

    /// DMA source for `slot` of `instance`.
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

    /// Total bytes accepted since the last reset.
    pub fn write_count(&self) -> u64 {
        self.fill.written()
    }

    /// Total bytes played out since data became valid.
    pub fn read_count(&self) -> u64 {
        self.fill.read()
    }

    /// Producer cursor, instance-local bytes.
    pub fn write_offset(&self) -> usize {
        self.cursor.offset()
    }

    /// Channel layout in use.
    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Diagnostics snapshot.
    pub fn stats(&self) -> BridgeStats {
        let fill = self.fill.fill();
        BridgeStats {
            state: self.state,
            fill_bytes: fill,
            fill_packets: self.controller.fill_packets(fill),
            next_transfer: self.feedback,
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
    use platform::audio_config::FEEDBACK_NOMINAL;
    use platform::mocks::MockI2s;

    type Tx = TxBridge<2, 4, 768>;

    fn tx() -> Tx {
        Tx::new(BridgeConfig::tdm16_playback()).unwrap()
    }

    /// Start and run DMA up to the gate slot.
    fn at_gate() -> (Tx, MockI2s) {
        let mut tx = tx();
        let mut i2s = MockI2s::new();
        tx.start(&mut i2s);
        for _ in 0..3 {
            tx.on_dma_complete(&mut i2s);
        }
        (tx, i2s)
    }

    // ── Test A: gating ─────────────────────────────────────────────────────────

    /// OUT data before the gate slot is dropped.
    #[test]
    fn push_before_gate_is_dropped() {
        let mut tx = tx();
        let mut i2s = MockI2s::new();
        tx.push_frames(&[1u8; 384]);
        tx.start(&mut i2s);
        tx.on_dma_complete(&mut i2s);
        tx.push_frames(&[1u8; 384]);
        assert_eq!(tx.state(), StreamState::Priming);
        assert_eq!(tx.write_count(), 0);
        assert_eq!(tx.slot(0, 0).unwrap(), &[0u8; 768]);
    }

    /// The gate opens when the index sits at SLOTS/2 + 1.
    #[test]
    fn gate_opens_at_midpoint_plus_one() {
        let (mut tx, _i2s) = at_gate();
        assert_eq!(tx.draining_slot(), 3);
        tx.push_frames(&[1u8; 384]);
        assert_eq!(tx.state(), StreamState::Armed);
        assert_eq!(tx.write_count(), 384);
    }

    /// Data becomes valid when the index wraps to 0; consumption starts after.
    #[test]
    fn valid_after_wrap() {
        let (mut tx, mut i2s) = at_gate();
        tx.push_frames(&[1u8; 1536]);
        tx.on_dma_complete(&mut i2s);
        assert_eq!(tx.state(), StreamState::Running);
        assert_eq!(tx.read_count(), 0);
        tx.on_dma_complete(&mut i2s);
        assert_eq!(tx.read_count(), 1536);
        assert_eq!(tx.fill_bytes(), 0);
    }

    // ── Test B: feedback ───────────────────────────────────────────────────────

    /// Low fill asks the host for more, high fill for less.
    #[test]
    fn feedback_follows_fill() {
        let (mut tx, _i2s) = at_gate();
        assert_eq!(tx.feedback(), FEEDBACK_NOMINAL);
        tx.push_frames(&[0u8; 384]);
        assert_eq!(tx.feedback(), FEEDBACK_NOMINAL + 1);
        tx.push_frames(&[0u8; 384 * 5]);
        assert_eq!(tx.feedback(), FEEDBACK_NOMINAL);
        tx.push_frames(&[0u8; 384 * 3]);
        assert_eq!(tx.feedback(), FEEDBACK_NOMINAL - 1);
    }

    /// Stop puts the feedback back at nominal.
    #[test]
    fn stop_restores_nominal_feedback() {
        let (mut tx, mut i2s) = at_gate();
        tx.push_frames(&[0u8; 384]);
        tx.stop(&mut i2s);
        assert_eq!(tx.feedback(), FEEDBACK_NOMINAL);
        assert_eq!(tx.feedback_packet(UsbSpeed::High).as_u32(), 0x0006_0000);
    }

    /// Reaching the early-warning mark is quiet; one frame past it counts.
    #[test]
    fn early_warning_past_mark() {
        let (mut tx, _i2s) = at_gate();
        assert_eq!(Tx::EARLY_WARNING_BYTES, 3840);
        tx.push_frames(&vec![0u8; 3840]);
        assert_eq!(tx.fill_bytes(), 3840);
        assert_eq!(tx.stats().early_warnings, 0);
        tx.push_frames(&[0u8; 64]);
        assert_eq!(tx.stats().early_warnings, 1);
        assert_eq!(tx.stats().overruns, 0);
    }

    // ── Test C: clamps ─────────────────────────────────────────────────────────

    /// Frames past the free space are dropped and counted.
    #[test]
    fn overrun_drops_excess_frames() {
        let (mut tx, _i2s) = at_gate();
        tx.push_frames(&vec![0u8; 6400]);
        assert_eq!(tx.write_count(), Tx::CAPACITY as u64);
        assert_eq!(tx.stats().overruns, 1);
        tx.push_frames(&[0u8; 64]);
        assert_eq!(tx.write_count(), Tx::CAPACITY as u64);
        assert_eq!(tx.stats().overruns, 2);
    }

    /// DMA never consumes past what USB wrote.
    #[test]
    fn underrun_is_capped() {
        let (mut tx, mut i2s) = at_gate();
        tx.push_frames(&[0u8; 640]);
        tx.on_dma_complete(&mut i2s);
        tx.on_dma_complete(&mut i2s);
        assert_eq!(tx.read_count(), 640);
        assert_eq!(tx.fill_bytes(), 0);
        assert_eq!(tx.stats().underruns, 1);
    }

    // ── Test D: lifecycle ──────────────────────────────────────────────────────

    /// Stop twice, or before start, leaves everything zeroed.
    #[test]
    fn stop_is_idempotent() {
        let mut tx = tx();
        let mut i2s = MockI2s::new();
        tx.stop(&mut i2s);
        tx.stop(&mut i2s);
        assert_eq!(tx.state(), StreamState::Stopped);
        assert_eq!((tx.write_count(), tx.read_count()), (0, 0));
        assert_eq!((tx.draining_slot(), tx.write_offset()), (0, 0));
        assert_eq!(i2s.stop_count(), 2);
    }

    /// Pushes while stopped are dropped.
    #[test]
    fn push_while_stopped_is_dropped() {
        let mut tx = tx();
        tx.push_frames(&[0u8; 64]);
        assert_eq!(tx.write_count(), 0);
    }

    // ── Test E: contract ───────────────────────────────────────────────────────

    /// A payload that is not whole frames is a caller bug.
    #[test]
    #[should_panic(expected = "not a multiple")]
    fn misaligned_push_panics() {
        let (mut tx, _i2s) = at_gate();
        tx.push_frames(&[0u8; 65]);
    }
}
