//! Audio device integration tests - USB requests and endpoint events driving
//! both bridges through host mocks.
// Integration test file: unwrap/indexing are intentional test mechanisms.
#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
//!
//! Run with: cargo test -p firmware --test integration_audio

use bridge::{BoardRxBridge, BoardTxBridge, BridgeConfig, StreamState};
use firmware::audio::{BoardSharedRx, BoardSharedTx, CANCELLED_TRANSFER};
use firmware::{AudioDevice, DeviceError};
use platform::mocks::{MockI2s, MockUsbClass};
use platform::UsbSpeed;

type Device<'a> = AudioDevice<'a, MockI2s, MockI2s, MockUsbClass>;

fn bridges() -> (BoardSharedRx, BoardSharedTx) {
    (
        BoardSharedRx::new(BoardRxBridge::new(BridgeConfig::tdm16_capture()).unwrap()),
        BoardSharedTx::new(BoardTxBridge::new(BridgeConfig::tdm16_playback()).unwrap()),
    )
}

fn configured<'a>(rx: &'a BoardSharedRx, tx: &'a BoardSharedTx) -> Device<'a> {
    let mut dev = AudioDevice::new(rx, tx, MockI2s::new(), MockI2s::new(), MockUsbClass::new());
    dev.on_bus_reset(UsbSpeed::High);
    dev.on_set_configuration(1);
    dev
}

// ── Test 1: configuration gate ───────────────────────────────────────────────

/// SET_INTERFACE before SET_CONFIGURATION is rejected and starts nothing.
#[test]
fn set_interface_requires_configuration() {
    let (rx, tx) = bridges();
    let mut dev = AudioDevice::new(&rx, &tx, MockI2s::new(), MockI2s::new(), MockUsbClass::new());
    assert_eq!(dev.on_set_interface(1, 1), Err(DeviceError::NotConfigured));
    assert_eq!(dev.capture().start_count(), 0);
    assert!(dev.usb().sent_lengths().is_empty());
}

/// Unknown configuration values are ignored.
#[test]
fn unknown_configuration_is_ignored() {
    let (rx, tx) = bridges();
    let mut dev = AudioDevice::new(&rx, &tx, MockI2s::new(), MockI2s::new(), MockUsbClass::new());
    dev.on_set_configuration(5);
    assert!(!dev.is_attached());
    dev.on_set_configuration(1);
    assert!(dev.is_attached());
}

/// Bad interface numbers and alternate settings are rejected.
#[test]
fn invalid_requests_are_rejected() {
    let (rx, tx) = bridges();
    let mut dev = configured(&rx, &tx);
    assert_eq!(dev.on_set_interface(3, 0), Err(DeviceError::UnknownInterface(3)));
    assert_eq!(
        dev.on_set_interface(2, 2),
        Err(DeviceError::AltOutOfRange { interface: 2, alt: 2 })
    );
    assert_eq!(dev.get_interface(7), Err(DeviceError::UnknownInterface(7)));
    assert_eq!(dev.get_interface(2), Ok(0));
}

// ── Test 2: capture stream ───────────────────────────────────────────────────

/// Opening the IN interface starts capture and queues a silent first packet.
#[test]
fn opening_capture_sends_first_packet() {
    let (rx, tx) = bridges();
    let mut dev = configured(&rx, &tx);
    dev.on_set_interface(1, 1).unwrap();
    assert_eq!(dev.capture().start_count(), 1);
    assert_eq!(dev.usb().sent_lengths(), &[384]);
    assert!(dev.usb().last_sent().iter().all(|&b| b == 0));
    assert_eq!(dev.get_interface(1), Ok(1));
    assert_eq!(rx.stats().state, StreamState::Priming);
}

/// Captured samples reach the host once the stream aligns.
#[test]
fn capture_data_reaches_in_endpoint() {
    let (rx, tx) = bridges();
    let mut dev = configured(&rx, &tx);
    dev.on_set_interface(1, 1).unwrap();
    rx.with(|r| {
        for slot in 0..2 {
            for instance in 0..2 {
                for s in r.slot_mut(instance, slot).unwrap().chunks_exact_mut(4) {
                    s.copy_from_slice(&[0x00, 0x11, 0x22, 0x33]);
                }
            }
        }
    });
    dev.on_capture_dma();
    dev.on_capture_dma();
    dev.on_in_complete(384);
    assert_eq!(dev.usb().sent_lengths(), &[384, 384]);
    assert!(dev
        .usb()
        .last_sent()
        .chunks_exact(4)
        .all(|s| s == [0x00, 0x11, 0x22, 0x33]));
    assert_eq!(rx.stats().state, StreamState::Running);
}

/// A cancelled IN transfer does not pull or send.
#[test]
fn cancelled_in_transfer_is_ignored() {
    let (rx, tx) = bridges();
    let mut dev = configured(&rx, &tx);
    dev.on_set_interface(1, 1).unwrap();
    dev.on_in_complete(CANCELLED_TRANSFER);
    assert_eq!(dev.usb().sent_lengths().len(), 1);
}

/// Re-selecting the streaming setting does not restart; 1 → 0 stops.
#[test]
fn capture_start_stop_on_transitions_only() {
    let (rx, tx) = bridges();
    let mut dev = configured(&rx, &tx);
    dev.on_set_interface(1, 1).unwrap();
    dev.on_set_interface(1, 1).unwrap();
    assert_eq!(dev.capture().start_count(), 1);
    dev.on_set_interface(1, 0).unwrap();
    assert_eq!(dev.capture().stop_count(), 1);
    dev.on_set_interface(1, 0).unwrap();
    assert_eq!(dev.capture().stop_count(), 1);
    dev.on_in_complete(384);
    assert_eq!(dev.usb().sent_lengths().len(), 1);
    assert_eq!(rx.stats().state, StreamState::Stopped);
}

// ── Test 3: playback stream ──────────────────────────────────────────────────

/// Opening the OUT interface starts playback and arms the endpoint.
#[test]
fn opening_playback_arms_out_endpoint() {
    let (rx, tx) = bridges();
    let mut dev = configured(&rx, &tx);
    dev.on_set_interface(2, 1).unwrap();
    assert_eq!(dev.playback().start_count(), 1);
    assert_eq!(dev.usb().recv_armed(), &[448]);
}

/// Data before the gate is dropped but the endpoint keeps being re-armed.
#[test]
fn out_data_before_gate_is_dropped() {
    let (rx, tx) = bridges();
    let mut dev = configured(&rx, &tx);
    dev.on_set_interface(2, 1).unwrap();
    dev.on_out_received(&[0x42; 384], 384);
    assert_eq!(tx.with(|t| t.write_count()), 0);
    assert_eq!(dev.usb().recv_armed().len(), 2);
}

/// Past the gate, whole frames are accepted and a trailing partial frame is cut.
#[test]
fn out_data_after_gate_is_accepted() {
    let (rx, tx) = bridges();
    let mut dev = configured(&rx, &tx);
    dev.on_set_interface(2, 1).unwrap();
    for _ in 0..3 {
        dev.on_playback_dma();
    }
    dev.on_out_received(&[0x42; 448], 100);
    assert_eq!(tx.with(|t| t.write_count()), 64);
    dev.on_out_received(&[0x42; 448], 384);
    assert_eq!(tx.with(|t| t.write_count()), 448);
    assert_eq!(tx.stats().state, StreamState::Armed);
}

/// A cancelled OUT transfer is not pushed and does not re-arm.
#[test]
fn cancelled_out_transfer_is_ignored() {
    let (rx, tx) = bridges();
    let mut dev = configured(&rx, &tx);
    dev.on_set_interface(2, 1).unwrap();
    for _ in 0..3 {
        dev.on_playback_dma();
    }
    dev.on_out_received(&[0x42; 448], CANCELLED_TRANSFER);
    assert_eq!(tx.with(|t| t.write_count()), 0);
    assert_eq!(dev.usb().recv_armed().len(), 1);
}

/// The feedback endpoint reports nominal until data arrives.
#[test]
fn feedback_starts_nominal() {
    let (rx, tx) = bridges();
    let mut dev = configured(&rx, &tx);
    dev.on_set_interface(2, 1).unwrap();
    assert_eq!(dev.feedback(UsbSpeed::High).as_bytes(), &[0x00, 0x00, 0x06, 0x00]);
    assert_eq!(dev.feedback(UsbSpeed::Full).as_bytes(), &[0x00, 0x00, 0x0C]);
}

// ── Test 4: resets ───────────────────────────────────────────────────────────

/// Bus reset stops both streams and returns every interface to setting 0.
#[test]
fn bus_reset_closes_streams() {
    let (rx, tx) = bridges();
    let mut dev = configured(&rx, &tx);
    dev.on_set_interface(1, 1).unwrap();
    dev.on_set_interface(2, 1).unwrap();
    dev.on_bus_reset(UsbSpeed::Full);
    assert_eq!(dev.capture().stop_count(), 1);
    assert_eq!(dev.playback().stop_count(), 1);
    assert!(!dev.is_attached());
    assert_eq!(dev.get_interface(1), Ok(0));
    assert_eq!(dev.get_interface(2), Ok(0));
    assert_eq!(rx.stats().state, StreamState::Stopped);
    assert_eq!(tx.stats().state, StreamState::Stopped);
}

/// Deconfiguring stops streams; idle bridges are not stopped again.
#[test]
fn deconfigure_closes_streams() {
    let (rx, tx) = bridges();
    let mut dev = configured(&rx, &tx);
    dev.on_set_interface(1, 1).unwrap();
    dev.on_set_configuration(0);
    assert_eq!(dev.capture().stop_count(), 1);
    assert_eq!(dev.playback().stop_count(), 0);
    assert_eq!(dev.on_set_interface(1, 1), Err(DeviceError::NotConfigured));
}

/// Full speed uses the 1 ms packet sizes.
#[test]
fn full_speed_packet_sizes() {
    let (rx, tx) = bridges();
    let mut dev = AudioDevice::new(&rx, &tx, MockI2s::new(), MockI2s::new(), MockUsbClass::new());
    dev.on_bus_reset(UsbSpeed::Full);
    dev.on_set_configuration(1);
    dev.on_set_interface(1, 1).unwrap();
    dev.on_set_interface(2, 1).unwrap();
    assert_eq!(dev.speed(), UsbSpeed::Full);
    assert_eq!(dev.usb().sent_lengths(), &[3072]);
    assert_eq!(dev.usb().recv_armed(), &[3136]);
}

/// Once running at full speed, every IN packet stays within one frame of 3072 B.
#[test]
fn full_speed_capture_runs_at_full_rate() {
    let (rx, tx) = bridges();
    let mut dev = AudioDevice::new(&rx, &tx, MockI2s::new(), MockI2s::new(), MockUsbClass::new());
    dev.on_bus_reset(UsbSpeed::Full);
    dev.on_set_configuration(1);
    dev.on_set_interface(1, 1).unwrap();
    // Two 0.5 ms slots per 1 ms frame.
    for _ in 0..6 {
        dev.on_capture_dma();
        dev.on_capture_dma();
        dev.on_in_complete(3072);
    }
    let sent = dev.usb().sent_lengths();
    assert_eq!(sent.len(), 7);
    assert!(sent[1..].iter().all(|&n| (3008..=3136).contains(&n)), "{sent:?}");
    let stats = rx.stats();
    assert_eq!(stats.state, StreamState::Running);
    // Drained by the last pull: the next one asks one frame less.
    assert_eq!(stats.next_transfer, 3008);
    assert_eq!((stats.overruns, stats.underruns), (0, 0));
}

// ── Test 5: class driver failures and diagnostics ────────────────────────────

/// Refused transfers are counted, never fatal.
#[test]
fn refused_transfers_are_counted() {
    let (rx, tx) = bridges();
    let mut dev = configured(&rx, &tx);
    dev.usb_mut().set_failing(true);
    dev.on_set_interface(1, 1).unwrap();
    dev.on_set_interface(2, 1).unwrap();
    assert_eq!(dev.transfer_errors(), 2);
    assert_eq!(rx.stats().state, StreamState::Priming);
}

/// Statistics are reported once per interval.
#[test]
fn diagnostics_are_rate_limited() {
    let (rx, tx) = bridges();
    let mut dev = configured(&rx, &tx).with_report_interval(2);
    assert!(!dev.on_tick());
    assert!(dev.on_tick());
    assert!(!dev.on_tick());
}

// ── Test 6: interrupt sharing ────────────────────────────────────────────────

/// USB and DMA handlers each take the shared device lock in turn.
#[test]
fn shared_device_serves_usb_and_dma_handlers() {
    let (rx, tx) = bridges();
    let shared = configured(&rx, &tx).into_shared();
    // USB interrupt
    shared.lock(|d| d.borrow_mut().on_set_interface(1, 1)).unwrap();
    // DMA interrupt
    for _ in 0..2 {
        shared.lock(|d| d.borrow_mut().on_capture_dma());
    }
    // USB interrupt
    shared.lock(|d| d.borrow_mut().on_in_complete(384));
    shared.lock(|d| {
        let dev = d.borrow();
        assert_eq!(dev.usb().sent_lengths(), &[384, 384]);
        assert_eq!(dev.capture().requeues().len(), 4);
    });
    assert_eq!(rx.stats().state, StreamState::Running);
}
