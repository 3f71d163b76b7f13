//! Rate-adaptive ring-buffer bridge between a multi-instance TDM/I2S bus
//! and USB Audio 2.0 isochronous streams.
//!
//! Two clock domains meet here: the I2S bit clock paces DMA slot
//! completions, the USB host paces isochronous transfers, and the two drift.
//! Each direction keeps a fixed ring of DMA slots per controller instance,
//! counts bytes in and out, and feeds the fill level back to the host:
//!
//! - [`RxBridge`] (capture): implicit feedback, the IN packet size grows or
//!   shrinks by one frame.
//! - [`TxBridge`] (playback): explicit feedback, a Q.13 rate value packed
//!   for the feedback endpoint ([`FeedbackPacket`]).
//!
//! Both start from a known half-full alignment ([`StreamState`]) and never
//! let `WriteCount - ReadCount` leave `0..=capacity`.
//!
//! # Example
//!
//! ```rust
//! use bridge::{BridgeConfig, RxBridge};
//! use platform::mocks::MockI2s;
//!
//! let mut rx: RxBridge<2, 4, 768> = RxBridge::new(BridgeConfig::tdm16_capture()).unwrap();
//! let mut i2s = MockI2s::new();
//! rx.start(&mut i2s);
//! rx.on_dma_complete(&mut i2s);
//! rx.on_dma_complete(&mut i2s);
//!
//! let mut packet = [0u8; 448];
//! assert_eq!(rx.pull_frames(&mut packet, 384), 384);
//! assert_eq!(rx.fill_bytes(), 3072 - 384);
//! ```
//!
//! # Features
//!
//! - `defmt`: log through `defmt` and derive `defmt::Format`
//! - `tracing`: log through `tracing` (host builds)
//! - `filter-24bit`: capture preset keeps the top 24 bits of each sample
//! - `std`: enable `platform/std` (host mocks)

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

mod error;
pub mod feedback;
pub mod fill;
mod interleave;
mod layout;
pub mod ring;
mod rx;
mod shared;
pub mod startup;
mod stats;
mod tx;

pub use error::ConfigError;
pub use feedback::{FeedbackController, FeedbackPacket, FeedbackSense, FillLevel};
pub use layout::{ring_capacity, BridgeConfig, ChannelLayout, FeedbackConfig, SampleFilter};
pub use rx::RxBridge;
pub use shared::{SharedRxBridge, SharedTxBridge};
pub use startup::StreamState;
pub use stats::BridgeStats;
pub use tx::TxBridge;

/// Capture bridge with the board geometry (2 instances × 4 slots × 768 B).
pub type BoardRxBridge = RxBridge<
    { platform::audio_config::INSTANCE_COUNT },
    { platform::audio_config::SLOT_COUNT },
    { platform::audio_config::SLOT_BYTES },
>;

/// Playback bridge with the board geometry.
pub type BoardTxBridge = TxBridge<
    { platform::audio_config::INSTANCE_COUNT },
    { platform::audio_config::SLOT_COUNT },
    { platform::audio_config::SLOT_BYTES },
>;
