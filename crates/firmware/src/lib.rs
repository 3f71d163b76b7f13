//! TDM ⇄ USB Audio 2.0 device firmware
//!
//! Device glue between the USB Audio 2.0 class driver and the two
//! rate-adaptive bridges: 16 channels of TDM capture go out on the
//! isochronous IN endpoint, host playback comes back on the OUT endpoint
//! and is fanned out over two TDM controller instances.
//!
//! # Architecture
//!
//! ```text
//! USB class driver events (bus reset, SET_CONFIGURATION, SET_INTERFACE,
//!                          IN complete, OUT received, feedback poll)
//!         ↓
//! AudioDevice (audio::device) - interface state, stream dispatch
//!         ↓
//! SharedRxBridge / SharedTxBridge (bridge crate)
//!         ↓
//! I2S DMA (platform::I2sPath / I2sCapture)
//! ```
//!
//! # Features
//!
//! - `defmt` - Log through defmt (hardware builds)
//! - `tracing` - Log through tracing (host builds)
//! - `filter-24bit` - Capture keeps the top 24 bits of each sample
//! - `std` - Enable standard library (host testing)

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
// Logging discipline
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![warn(clippy::dbg_macro)] // dbg! should not be left in committed code
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)] // common in Rust crates; not a real issue
#![allow(clippy::missing_errors_doc)] // most errors are self-explanatory
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod audio;
mod error;

pub use audio::{
    AltChange, AltSettings, AudioDevice, AudioInterface, Diagnostics, SharedAudioDevice,
};
pub use error::DeviceError;
