//! USB Audio 2.0 device state and stream dispatch.
//!
//! [`AudioDevice`] is the event sink of the class driver. It tracks the
//! configuration and the alternate setting of each interface, starts and
//! stops the bridges exactly on the 0 ↔ 1 streaming transitions, and
//! keeps the isochronous endpoints fed:
//!
//! - IN: every completed transfer pulls the next packet from the capture
//!   bridge and sends it with the size the bridge chose (implicit feedback).
//! - OUT: every received transfer is pushed into the playback bridge and the
//!   endpoint is re-armed; the feedback endpoint reads [`AudioDevice::feedback`].
//!
//! DMA completion interrupts are forwarded through
//! [`on_capture_dma`](AudioDevice::on_capture_dma) and
//! [`on_playback_dma`](AudioDevice::on_playback_dma).
//!
//! # Locking
//!
//! The device owns the I2S handles: SET_INTERFACE starts and stops DMA from
//! the USB interrupt, and the DMA interrupts requeue slots and check frame
//! sync through the same handles. The USB and DMA interrupts therefore all
//! reach the device through one [`SharedAudioDevice`] (a blocking
//! critical-section mutex, see [`AudioDevice::into_shared`]). The
//! [`BoardSharedRx`]/[`BoardSharedTx`] locks stay short and let thread-mode
//! code read statistics without taking the device.

use core::cell::RefCell;

use bridge::{FeedbackPacket, SharedRxBridge, SharedTxBridge};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use platform::audio_config::{
    FRAME_BYTES, INSTANCE_COUNT, MAX_IN_TRANSFER_BYTES, SLOT_BYTES, SLOT_COUNT,
};
use platform::usb::CONFIGURATION_VALUE;
use platform::{I2sCapture, I2sPath, UsbAudioClass, UsbSpeed};

use super::interfaces::{AltChange, AltSettings, AudioInterface};
use super::Diagnostics;
use crate::DeviceError;

/// Capture bridge with the board geometry, shareable between interrupts.
pub type BoardSharedRx = SharedRxBridge<INSTANCE_COUNT, SLOT_COUNT, SLOT_BYTES>;

/// Playback bridge with the board geometry, shareable between interrupts.
pub type BoardSharedTx = SharedTxBridge<INSTANCE_COUNT, SLOT_COUNT, SLOT_BYTES>;

/// Transfer length the class driver reports for a cancelled transfer.
pub const CANCELLED_TRANSFER: u32 = u32::MAX;

/// [`AudioDevice`] behind the lock every USB and DMA interrupt handler takes.
pub type SharedAudioDevice<'a, C, P, U> =
    Mutex<CriticalSectionRawMutex, RefCell<AudioDevice<'a, C, P, U>>>;

/// Audio function of the device: interface state plus both stream paths.
///
/// `C` drives the capture DMA, `P` the playback DMA and `U` the streaming
/// endpoints. Every `on_*` handler takes `&mut self`, so on hardware the
/// device lives in a [`SharedAudioDevice`] and each interrupt calls it
/// inside `lock`.
pub struct AudioDevice<'a, C, P, U> {
    rx: &'a BoardSharedRx,
    tx: &'a BoardSharedTx,
    capture: C,
    playback: P,
    usb: U,
    attached: bool,
    speed: UsbSpeed,
    alts: AltSettings,
    in_packet: [u8; MAX_IN_TRANSFER_BYTES],
    diagnostics: Diagnostics,
    transfer_errors: u32,
}

impl<'a, C, P, U> AudioDevice<'a, C, P, U>
where
    C: I2sCapture,
    P: I2sPath,
    U: UsbAudioClass,
{
    /// Detached device at high speed with every interface on setting 0.
    pub fn new(rx: &'a BoardSharedRx, tx: &'a BoardSharedTx, capture: C, playback: P, usb: U) -> Self {
        Self {
            rx,
            tx,
            capture,
            playback,
            usb,
            attached: false,
            speed: UsbSpeed::default(),
            alts: AltSettings::new(),
            in_packet: [0; MAX_IN_TRANSFER_BYTES],
            diagnostics: Diagnostics::default(),
            transfer_errors: 0,
        }
    }

    /// Move the device behind the interrupt-shared lock.
    pub fn into_shared(self) -> SharedAudioDevice<'a, C, P, U> {
        Mutex::new(RefCell::new(self))
    }

    /// Log statistics every `ticks` calls to [`on_tick`](Self::on_tick).
    pub fn with_report_interval(mut self, ticks: u32) -> Self {
        self.diagnostics = Diagnostics::new(ticks);
        self
    }

    // ── Standard requests ──────────────────────────────────────────────────────

    /// USB bus reset: close both streams, detach, adopt the negotiated speed.
    pub fn on_bus_reset(&mut self, speed: UsbSpeed) {
        self.close_streams();
        self.attached = false;
        self.speed = speed;
        info!("usb: bus reset, {:?} speed", speed);
    }

    /// SET_CONFIGURATION. 0 deconfigures, the device's one configuration
    /// attaches, anything else is ignored.
    pub fn on_set_configuration(&mut self, value: u8) {
        match value {
            0 => {
                self.close_streams();
                self.attached = false;
                info!("usb: deconfigured");
            }
            CONFIGURATION_VALUE => {
                self.attached = true;
                info!("usb: configured");
            }
            other => warn!("usb: ignoring configuration {}", other),
        }
    }

    /// SET_INTERFACE. Starts or stops the bridge behind a streaming
    /// interface on a 0 ↔ 1 transition; re-selecting the current setting
    /// leaves the stream alone.
    pub fn on_set_interface(&mut self, interface: u8, alt: u8) -> Result<(), DeviceError> {
        if !self.attached {
            return Err(DeviceError::NotConfigured);
        }
        let iface = AudioInterface::from_number(interface)?;
        let change = self.alts.select(iface, alt)?;
        debug!("usb: interface {} alt {} ({:?})", interface, alt, change);
        match (iface, change) {
            (AudioInterface::Capture, AltChange::Opened) => {
                self.rx.start(&mut self.capture);
                self.send_next_in();
            }
            (AudioInterface::Capture, AltChange::Closed) => self.rx.stop(&mut self.capture),
            (AudioInterface::Playback, AltChange::Opened) => {
                self.tx.start(&mut self.playback);
                self.arm_out();
            }
            (AudioInterface::Playback, AltChange::Closed) => self.tx.stop(&mut self.playback),
            _ => {}
        }
        Ok(())
    }

    /// GET_INTERFACE: the selected alternate setting.
    pub fn get_interface(&self, interface: u8) -> Result<u8, DeviceError> {
        AudioInterface::from_number(interface).map(|iface| self.alts.get(iface))
    }

    // ── Endpoint events ────────────────────────────────────────────────────────

    /// Isochronous IN transfer finished: queue the next capture packet.
    pub fn on_in_complete(&mut self, len: u32) {
        if len == CANCELLED_TRANSFER {
            return;
        }
        if self.attached && self.alts.is_streaming(AudioInterface::Capture) {
            self.send_next_in();
        }
    }

    /// Isochronous OUT transfer received `len` bytes into `buffer`: hand
    /// whole frames to the playback bridge and re-arm the endpoint.
    pub fn on_out_received(&mut self, buffer: &[u8], len: u32) {
        if len == CANCELLED_TRANSFER {
            return;
        }
        if !(self.attached && self.alts.is_streaming(AudioInterface::Playback)) {
            return;
        }
        let received = usize::try_from(len).unwrap_or(usize::MAX).min(buffer.len());
        let partial = received.checked_rem(FRAME_BYTES).unwrap_or(0);
        if partial != 0 {
            warn!("usb: dropping {} B partial frame", partial);
        }
        if let Some(frames) = buffer.get(..received.saturating_sub(partial)) {
            self.tx.push_frames(frames);
        }
        self.arm_out();
    }

    /// Value for the explicit feedback endpoint.
    pub fn feedback(&self, speed: UsbSpeed) -> FeedbackPacket {
        self.tx.feedback_packet(speed)
    }

    // ── Interrupts and housekeeping ────────────────────────────────────────────

    /// Capture DMA completed a slot.
    pub fn on_capture_dma(&mut self) {
        self.rx.on_dma_complete(&mut self.capture);
    }

    /// Playback DMA completed a slot.
    pub fn on_playback_dma(&mut self) {
        self.tx.on_dma_complete(&mut self.playback);
    }

    /// Periodic tick; logs bridge statistics when the report is due.
    pub fn on_tick(&mut self) -> bool {
        let capture = self.rx.stats();
        let playback = self.tx.stats();
        self.diagnostics.report(&capture, &playback)
    }

    // ── Accessors ──────────────────────────────────────────────────────────────

    /// `true` once the host selected the configuration.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Speed from the last bus reset.
    pub fn speed(&self) -> UsbSpeed {
        self.speed
    }

    /// Selected alternate settings.
    pub fn alt_settings(&self) -> AltSettings {
        self.alts
    }

    /// Transfers the class driver refused to queue.
    pub fn transfer_errors(&self) -> u32 {
        self.transfer_errors
    }

    /// Capture DMA handle.
    pub fn capture(&self) -> &C {
        &self.capture
    }

    /// Playback DMA handle.
    pub fn playback(&self) -> &P {
        &self.playback
    }

    /// Streaming endpoints.
    pub fn usb(&self) -> &U {
        &self.usb
    }

    /// Streaming endpoints, mutably.
    pub fn usb_mut(&mut self) -> &mut U {
        &mut self.usb
    }

    // ── Internals ──────────────────────────────────────────────────────────────

    fn close_streams(&mut self) {
        if self.rx.stats().state.is_active() {
            self.rx.stop(&mut self.capture);
        }
        if self.tx.stats().state.is_active() {
            self.tx.stop(&mut self.playback);
        }
        self.alts.reset();
    }

    fn send_next_in(&mut self) {
        let len = self
            .rx
            .pull_frames(&mut self.in_packet, self.speed.iso_packet_bytes());
        let payload = self.in_packet.get(..len).unwrap_or(&self.in_packet);
        if self.usb.send(payload).is_err() {
            self.transfer_errors = self.transfer_errors.wrapping_add(1);
            warn!("usb: IN transfer of {} B not queued", len);
        }
    }

    fn arm_out(&mut self) {
        let max_len = self.speed.iso_packet_bytes().saturating_add(FRAME_BYTES);
        if self.usb.recv(max_len).is_err() {
            self.transfer_errors = self.transfer_errors.wrapping_add(1);
            warn!("usb: OUT transfer not armed");
        }
    }
}
