//! Hardware Init Layer seam: I2S controllers with slot-based DMA
//!
//! Each direction drives [`INSTANCE_COUNT`](crate::audio_config::INSTANCE_COUNT)
//! controllers in lock-step. Every controller owns a ring of DMA slots
//! whose memory lives inside the bridge; the hardware side only needs to
//! know *which* slot to hand back to the DMA engine.
//!
//! All methods are called from interrupt context and must not block.

/// One direction of the TDM bus: a set of I2S controllers with slot DMA.
pub trait I2sPath {
    /// Enable all controllers and queue every slot of every instance.
    fn start(&mut self);

    /// Abort all in-flight DMA and disable the controllers.
    fn stop(&mut self);

    /// Hand `slot` of `instance` back to the DMA engine.
    ///
    /// Called once per instance after each completion, in instance order.
    fn requeue(&mut self, instance: usize, slot: usize);
}

/// Capture direction: additionally reports frame-sync loss.
///
/// A slave receiver that loses word-select alignment keeps clocking data
/// into the wrong channel positions. The only recovery is a full restart.
pub trait I2sCapture: I2sPath {
    /// Whether `instance` has latched a frame-sync error since the last clear.
    fn frame_sync_error(&self, instance: usize) -> bool;

    /// Clear the latched frame-sync error on `instance`.
    fn clear_frame_sync_error(&mut self, instance: usize);
}
