//! Collaborator seams for the TDM/I2S ⇄ USB Audio 2.0 bridge.
//!
//! The bridge core (`bridge` crate) never touches registers or USB
//! endpoints directly. It talks to two collaborators through the traits
//! defined here:
//!
//! ```text
//! USB Class Layer  (UsbAudioClass: send / recv, SET_INTERFACE events)
//!         ↕
//! Device glue      (firmware crate)
//!         ↕
//! Bridge core      (RxBridge / TxBridge)
//!         ↕
//! Hardware Init Layer (I2sPath / I2sCapture: start / stop / requeue)
//! ```
//!
//! # Modules
//!
//! - [`audio_config`] - board audio profile (channel layout, slot sizes,
//!   packet sizes, feedback calibration)
//! - [`i2s`] - Hardware Init Layer traits
//! - [`usb`] - USB Class Layer trait, bus speed, interface numbering
//! - `mocks` - recording host doubles (`std` feature or tests)
//!
//! # Features
//!
//! - `std`: expose `mocks` for host tests in other crates
//! - `defmt`: derive `defmt::Format` on public types

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::doc_markdown)] // register and endpoint names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors - callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod audio_config;
pub mod i2s;
pub mod usb;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

pub use i2s::{I2sCapture, I2sPath};
pub use usb::{UsbAudioClass, UsbSpeed};
