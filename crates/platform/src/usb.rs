//! USB Class Layer seam: isochronous streaming endpoints and bus speed
//!
//! The class driver (descriptors, control requests, endpoint hardware) is
//! outside this workspace. The device glue receives its events and issues
//! transfers through [`UsbAudioClass`].

use crate::audio_config::{FS_ISO_PACKET_BYTES, HS_ISO_PACKET_BYTES};

/// Audio Control interface number.
pub const CONTROL_INTERFACE: u8 = 0;

/// Streaming interface carrying TDM capture to the host (IN endpoint).
pub const STREAM_IN_INTERFACE: u8 = 1;

/// Streaming interface carrying host playback to TDM (OUT endpoint).
pub const STREAM_OUT_INTERFACE: u8 = 2;

/// Alternate settings per streaming interface (0 = idle, 1 = streaming).
pub const STREAM_ALT_COUNT: u8 = 2;

/// Alternate settings on the control interface.
pub const CONTROL_ALT_COUNT: u8 = 1;

/// The only configuration value this device reports.
pub const CONFIGURATION_VALUE: u8 = 1;

/// Negotiated USB bus speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbSpeed {
    /// 12 Mbit/s, 1 ms frames.
    Full,
    /// 480 Mbit/s, 125 µs microframes.
    #[default]
    High,
}

impl UsbSpeed {
    /// Nominal isochronous payload for one service interval at this speed.
    pub const fn iso_packet_bytes(self) -> usize {
        match self {
            Self::Full => FS_ISO_PACKET_BYTES,
            Self::High => HS_ISO_PACKET_BYTES,
        }
    }

    /// Bytes on the wire for the explicit feedback value (UAC2 §5.12.4.2).
    pub const fn feedback_bytes(self) -> usize {
        match self {
            Self::Full => 3,
            Self::High => 4,
        }
    }
}

/// Streaming endpoints of the USB Audio 2.0 class driver.
///
/// Both calls only *schedule* a transfer; completion comes back to the
/// device glue as an event.
pub trait UsbAudioClass {
    /// Error type
    type Error: core::fmt::Debug;

    /// Queue `data` on the isochronous IN endpoint.
    fn send(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Arm the isochronous OUT endpoint for up to `max_len` bytes.
    fn recv(&mut self, max_len: usize) -> Result<(), Self::Error>;
}
