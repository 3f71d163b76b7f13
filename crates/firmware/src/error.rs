//! USB request errors.

use thiserror_no_std::Error;

/// A standard request that is invalid for the current device state.
///
/// The class driver answers these with a STALL on the control endpoint.
/// Streaming problems never show up here; the bridges absorb them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    /// The host has not selected a configuration yet.
    #[error("device is not configured")]
    NotConfigured,

    /// No such interface in the audio function.
    #[error("interface {0} does not exist")]
    UnknownInterface(u8),

    /// The interface has no such alternate setting.
    #[error("interface {interface} has no alternate setting {alt}")]
    AltOutOfRange {
        /// Interface number from the request.
        interface: u8,
        /// Requested alternate setting.
        alt: u8,
    },
}
