//! Audio function: interface bookkeeping, stream dispatch, diagnostics
//!
//! # Structure
//!
//! - `interfaces` - interface numbering and selected alternate settings
//! - `device` - [`AudioDevice`], the class driver's event sink
//! - `diagnostics` - rate-limited bridge statistics report
//!
//! # Dependency Injection
//!
//! The device owns its collaborators through the platform traits, so the
//! same code drives hardware and host mocks:
//!
//! ```rust,ignore
//! // Hardware:
//! let device = AudioDevice::new(&RX, &TX, sai_capture, sai_playback, usb_class);
//! // Tests:
//! let device = AudioDevice::new(&rx, &tx, MockI2s::new(), MockI2s::new(), MockUsbClass::new());
//! ```

pub mod device;
pub mod diagnostics;
pub mod interfaces;

pub use device::{
    AudioDevice, BoardSharedRx, BoardSharedTx, SharedAudioDevice, CANCELLED_TRANSFER,
};
pub use diagnostics::Diagnostics;
pub use interfaces::{AltChange, AltSettings, AudioInterface};
