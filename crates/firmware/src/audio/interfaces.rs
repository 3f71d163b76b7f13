//! Interface numbering and alternate-setting state.
//!
//! The audio function has three interfaces: Audio Control (one alternate
//! setting) and two streaming interfaces with alternate setting 0 (zero
//! bandwidth) and 1 (streaming).

use platform::usb::{
    CONTROL_ALT_COUNT, CONTROL_INTERFACE, STREAM_ALT_COUNT, STREAM_IN_INTERFACE,
    STREAM_OUT_INTERFACE,
};

use crate::DeviceError;

/// Alternate setting that carries audio on a streaming interface.
pub const STREAMING_ALT: u8 = 1;

/// Interfaces of the audio function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AudioInterface {
    /// Audio Control.
    Control,
    /// Streaming IN: TDM capture to the host.
    Capture,
    /// Streaming OUT: host playback to TDM.
    Playback,
}

impl AudioInterface {
    /// Interface for a `wIndex` from a standard request.
    pub const fn from_number(number: u8) -> Result<Self, DeviceError> {
        match number {
            CONTROL_INTERFACE => Ok(Self::Control),
            STREAM_IN_INTERFACE => Ok(Self::Capture),
            STREAM_OUT_INTERFACE => Ok(Self::Playback),
            other => Err(DeviceError::UnknownInterface(other)),
        }
    }

    /// Interface number in the configuration descriptor.
    pub const fn number(self) -> u8 {
        match self {
            Self::Control => CONTROL_INTERFACE,
            Self::Capture => STREAM_IN_INTERFACE,
            Self::Playback => STREAM_OUT_INTERFACE,
        }
    }

    /// Number of alternate settings the interface declares.
    pub const fn alt_count(self) -> u8 {
        match self {
            Self::Control => CONTROL_ALT_COUNT,
            Self::Capture | Self::Playback => STREAM_ALT_COUNT,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Control => 0,
            Self::Capture => 1,
            Self::Playback => 2,
        }
    }
}

/// What a SET_INTERFACE did to the stream behind the interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AltChange {
    /// Alternate setting went 0 → 1: start the stream.
    Opened,
    /// Alternate setting went 1 → 0: stop the stream.
    Closed,
    /// Same setting re-selected, or the control interface.
    Unchanged,
}

/// Alternate setting currently selected on each interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AltSettings {
    alts: [u8; 3],
}

impl AltSettings {
    /// Every interface on alternate setting 0.
    pub const fn new() -> Self {
        Self { alts: [0; 3] }
    }

    /// Selected alternate setting of `interface`.
    pub fn get(&self, interface: AudioInterface) -> u8 {
        self.alts.get(interface.index()).copied().unwrap_or(0)
    }

    /// `true` while `interface` is on its streaming alternate setting.
    pub fn is_streaming(&self, interface: AudioInterface) -> bool {
        interface != AudioInterface::Control && self.get(interface) == STREAMING_ALT
    }

    /// Select `alt` on `interface` and report the transition.
    pub fn select(&mut self, interface: AudioInterface, alt: u8) -> Result<AltChange, DeviceError> {
        if alt >= interface.alt_count() {
            return Err(DeviceError::AltOutOfRange {
                interface: interface.number(),
                alt,
            });
        }
        let previous = self.get(interface);
        if let Some(stored) = self.alts.get_mut(interface.index()) {
            *stored = alt;
        }
        Ok(match (interface, previous, alt) {
            (AudioInterface::Control, _, _) => AltChange::Unchanged,
            (_, 0, STREAMING_ALT) => AltChange::Opened,
            (_, STREAMING_ALT, 0) => AltChange::Closed,
            _ => AltChange::Unchanged,
        })
    }

    /// Back to alternate setting 0 everywhere (bus reset, deconfigure).
    pub fn reset(&mut self) {
        self.alts = [0; 3];
    }
}
