//! Recording doubles for the Hardware Init and USB Class layers
//!
//! Every call is logged so tests can assert on the exact sequence the
//! bridge issued. Storage is `heapless`; records past capacity are dropped.

#![cfg(any(test, feature = "std"))]

use thiserror_no_std::Error;

use crate::audio_config::MAX_IN_TRANSFER_BYTES;
use crate::{I2sCapture, I2sPath, UsbAudioClass};

/// Maximum instances a [`MockI2s`] can model.
pub const MOCK_MAX_INSTANCES: usize = 8;

const RECORD_CAPACITY: usize = 256;

/// Mock I2S path: counts start/stop, logs requeues, injects frame-sync errors.
#[derive(Debug, Default)]
pub struct MockI2s {
    starts: usize,
    stops: usize,
    requeues: heapless::Vec<(usize, usize), RECORD_CAPACITY>,
    frame_sync: [bool; MOCK_MAX_INSTANCES],
}

impl MockI2s {
    /// Create an idle mock with no recorded calls.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `start()` calls.
    pub fn start_count(&self) -> usize {
        self.starts
    }

    /// Number of `stop()` calls.
    pub fn stop_count(&self) -> usize {
        self.stops
    }

    /// Every `(instance, slot)` passed to `requeue()`, oldest first.
    pub fn requeues(&self) -> &[(usize, usize)] {
        &self.requeues
    }

    /// Forget recorded calls. Latched frame-sync errors are kept.
    pub fn clear_log(&mut self) {
        self.starts = 0;
        self.stops = 0;
        self.requeues.clear();
    }

    /// Latch a frame-sync error on `instance`, as the peripheral would.
    pub fn inject_frame_sync_error(&mut self, instance: usize) {
        if let Some(flag) = self.frame_sync.get_mut(instance) {
            *flag = true;
        }
    }
}

impl I2sPath for MockI2s {
    fn start(&mut self) {
        self.starts = self.starts.saturating_add(1);
    }

    fn stop(&mut self) {
        self.stops = self.stops.saturating_add(1);
    }

    fn requeue(&mut self, instance: usize, slot: usize) {
        let _ = self.requeues.push((instance, slot));
    }
}

impl I2sCapture for MockI2s {
    fn frame_sync_error(&self, instance: usize) -> bool {
        self.frame_sync.get(instance).copied().unwrap_or(false)
    }

    fn clear_frame_sync_error(&mut self, instance: usize) {
        if let Some(flag) = self.frame_sync.get_mut(instance) {
            *flag = false;
        }
    }
}

/// Error returned by [`MockUsbClass`] when failure injection is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("mock USB transfer refused")]
pub struct MockUsbError;

/// Mock USB class: logs send/recv calls and keeps the last IN payload.
#[derive(Debug, Default)]
pub struct MockUsbClass {
    sent_lengths: heapless::Vec<usize, RECORD_CAPACITY>,
    last_sent: heapless::Vec<u8, MAX_IN_TRANSFER_BYTES>,
    recv_armed: heapless::Vec<usize, RECORD_CAPACITY>,
    fail: bool,
}

impl MockUsbClass {
    /// Create a mock with no recorded transfers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Length of every `send()` call, oldest first.
    pub fn sent_lengths(&self) -> &[usize] {
        &self.sent_lengths
    }

    /// Payload of the most recent `send()`, truncated to the IN buffer size.
    pub fn last_sent(&self) -> &[u8] {
        &self.last_sent
    }

    /// `max_len` of every `recv()` call, oldest first.
    pub fn recv_armed(&self) -> &[usize] {
        &self.recv_armed
    }

    /// Make every subsequent call fail with [`MockUsbError`].
    pub fn set_failing(&mut self, fail: bool) {
        self.fail = fail;
    }
}

impl UsbAudioClass for MockUsbClass {
    type Error = MockUsbError;

    fn send(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        if self.fail {
            return Err(MockUsbError);
        }
        let _ = self.sent_lengths.push(data.len());
        self.last_sent.clear();
        let keep = data.len().min(MAX_IN_TRANSFER_BYTES);
        if let Some(head) = data.get(..keep) {
            let _ = self.last_sent.extend_from_slice(head);
        }
        Ok(())
    }

    fn recv(&mut self, max_len: usize) -> Result<(), Self::Error> {
        if self.fail {
            return Err(MockUsbError);
        }
        let _ = self.recv_armed.push(max_len);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    /// Injected frame-sync errors are per-instance and clearable.
    #[test]
    fn frame_sync_injection_is_per_instance() {
        let mut i2s = MockI2s::new();
        i2s.inject_frame_sync_error(1);
        assert!(!i2s.frame_sync_error(0));
        assert!(i2s.frame_sync_error(1));
        i2s.clear_frame_sync_error(1);
        assert!(!i2s.frame_sync_error(1));
    }

    /// Out-of-range instances read as healthy and ignore injection.
    #[test]
    fn out_of_range_instance_is_ignored() {
        let mut i2s = MockI2s::new();
        i2s.inject_frame_sync_error(MOCK_MAX_INSTANCES);
        assert!(!i2s.frame_sync_error(MOCK_MAX_INSTANCES));
    }

    /// Requeue calls are recorded in order.
    #[test]
    fn requeues_are_logged() {
        let mut i2s = MockI2s::new();
        i2s.start();
        i2s.requeue(0, 2);
        i2s.requeue(1, 2);
        assert_eq!(i2s.start_count(), 1);
        assert_eq!(i2s.requeues(), &[(0, 2), (1, 2)]);
        i2s.clear_log();
        assert!(i2s.requeues().is_empty());
    }

    /// A failing class records nothing.
    #[test]
    fn failing_usb_records_nothing() {
        let mut usb = MockUsbClass::new();
        usb.set_failing(true);
        assert_eq!(usb.send(&[1, 2, 3]), Err(MockUsbError));
        assert_eq!(usb.recv(64), Err(MockUsbError));
        assert!(usb.sent_lengths().is_empty());
        assert!(usb.recv_armed().is_empty());
    }

    /// The last IN payload is kept verbatim.
    #[test]
    fn send_keeps_last_payload() {
        let mut usb = MockUsbClass::new();
        usb.send(&[1, 2, 3]).unwrap();
        usb.send(&[9, 8]).unwrap();
        assert_eq!(usb.sent_lengths(), &[3, 2]);
        assert_eq!(usb.last_sent(), &[9, 8]);
    }

    proptest::proptest! {
        /// Requeues are recorded verbatim and in order.
        #[test]
        fn requeues_recorded_in_order(calls in proptest::collection::vec((0usize..2, 0usize..4), 0..64)) {
            let mut i2s = MockI2s::new();
            for &(instance, slot) in &calls {
                i2s.requeue(instance, slot);
            }
            assert_eq!(i2s.requeues(), &calls[..]);
        }

        /// The last IN payload is kept byte for byte at any length.
        #[test]
        fn last_payload_kept_at_any_length(payload in proptest::collection::vec(proptest::num::u8::ANY, 0..=MAX_IN_TRANSFER_BYTES)) {
            let mut usb = MockUsbClass::new();
            usb.send(&[0xFF; 384]).unwrap();
            usb.send(&payload).unwrap();
            assert_eq!(usb.last_sent(), &payload[..]);
            assert_eq!(usb.sent_lengths(), &[384, payload.len()]);
        }
    }
}
