//! Interrupt-safe wrappers.
//!
//! The DMA interrupt and the USB interrupt both reach into the same bridge.
//! Each entry point runs inside a critical section, so a 64-bit counter
//! update on a 32-bit core can never be observed half-written and `stop()`
//! from thread mode cannot interleave with a completion.
//!
//! ```rust,ignore
//! static RX: SharedRxBridge<2, 4, 768> = SharedRxBridge::new(RX_BRIDGE);
//!
//! #[interrupt]
//! fn DMA0() {
//!     RX.on_dma_complete(&mut capture);
//! }
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use platform::{I2sCapture, I2sPath, UsbSpeed};

use crate::feedback::FeedbackPacket;
use crate::{BridgeStats, RxBridge, TxBridge};

/// Capture bridge shared between the DMA and USB interrupts.
pub struct SharedRxBridge<const INSTANCES: usize, const SLOTS: usize, const SLOT_BYTES: usize> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<RxBridge<INSTANCES, SLOTS, SLOT_BYTES>>>,
}

impl<const INSTANCES: usize, const SLOTS: usize, const SLOT_BYTES: usize>
    SharedRxBridge<INSTANCES, SLOTS, SLOT_BYTES>
{
    /// Wrap a bridge. `const` so it can initialise a `static`.
    pub const fn new(bridge: RxBridge<INSTANCES, SLOTS, SLOT_BYTES>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(bridge)),
        }
    }

    /// Run `f` with exclusive access inside a critical section.
    pub fn with<R>(&self, f: impl FnOnce(&mut RxBridge<INSTANCES, SLOTS, SLOT_BYTES>) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// See [`RxBridge::start`].
    pub fn start(&self, i2s: &mut impl I2sPath) {
        self.with(|rx| rx.start(i2s));
    }

    /// See [`RxBridge::stop`].
    pub fn stop(&self, i2s: &mut impl I2sPath) {
        self.with(|rx| rx.stop(i2s));
    }

    /// See [`RxBridge::on_dma_complete`].
    pub fn on_dma_complete(&self, i2s: &mut impl I2sCapture) {
        self.with(|rx| rx.on_dma_complete(i2s));
    }

    /// See [`RxBridge::pull_frames`].
    pub fn pull_frames(&self, out: &mut [u8], requested: usize) -> usize {
        self.with(|rx| rx.pull_frames(out, requested))
    }

    /// See [`RxBridge::stats`].
    pub fn stats(&self) -> BridgeStats {
        self.with(|rx| rx.stats())
    }
}

/// Playback bridge shared between the DMA and USB interrupts.
pub struct SharedTxBridge<const INSTANCES: usize, const SLOTS: usize, const SLOT_BYTES: usize> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<TxBridge<INSTANCES, SLOTS, SLOT_BYTES>>>,
}

impl<const INSTANCES: usize, const SLOTS: usize, const SLOT_BYTES: usize>
    SharedTxBridge<INSTANCES, SLOTS, SLOT_BYTES>
{
    /// Wrap a bridge. `const` so it can initialise a `static`.
    pub const fn new(bridge: TxBridge<INSTANCES, SLOTS, SLOT_BYTES>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(bridge)),
        }
    }

    /// Run `f` with exclusive access inside a critical section.
    pub fn with<R>(&self, f: impl FnOnce(&mut TxBridge<INSTANCES, SLOTS, SLOT_BYTES>) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// See [`TxBridge::start`].
    pub fn start(&self, i2s: &mut impl I2sPath) {
        self.with(|tx| tx.start(i2s));
    }

    /// See [`TxBridge::stop`].
    pub fn stop(&self, i2s: &mut impl I2sPath) {
        self.with(|tx| tx.stop(i2s));
    }

    /// See [`TxBridge::on_dma_complete`].
    pub fn on_dma_complete(&self, i2s: &mut impl I2sPath) {
        self.with(|tx| tx.on_dma_complete(i2s));
    }

    /// See [`TxBridge::push_frames`].
    pub fn push_frames(&self, data: &[u8]) {
        self.with(|tx| tx.push_frames(data));
    }

    /// See [`TxBridge::feedback_packet`].
    pub fn feedback_packet(&self, speed: UsbSpeed) -> FeedbackPacket {
        self.with(|tx| tx.feedback_packet(speed))
    }

    /// See [`TxBridge::stats`].
    pub fn stats(&self) -> BridgeStats {
        self.with(|tx| tx.stats())
    }
}
