//! Caller contract violations are fatal, never silent corruption.

#![allow(clippy::unwrap_used)]

use bridge::{BridgeConfig, RxBridge, TxBridge};
use platform::mocks::MockI2s;

type Rx = RxBridge<2, 4, 768>;
type Tx = TxBridge<2, 4, 768>;

fn running_rx() -> Rx {
    let mut rx = Rx::new(BridgeConfig::tdm16_capture()).unwrap();
    let mut i2s = MockI2s::new();
    rx.start(&mut i2s);
    rx.on_dma_complete(&mut i2s);
    rx.on_dma_complete(&mut i2s);
    rx
}

/// A pull of half a frame panics even before the stream runs.
#[test]
#[should_panic(expected = "not a multiple")]
fn pull_half_frame_panics() {
    let mut rx = Rx::new(BridgeConfig::tdm16_capture()).unwrap();
    let mut out = [0u8; 64];
    rx.pull_frames(&mut out, 32);
}

/// A pull one byte over a packet panics.
#[test]
#[should_panic(expected = "not a multiple")]
fn pull_off_by_one_panics() {
    let mut rx = running_rx();
    let mut out = [0u8; 448];
    rx.pull_frames(&mut out, 385);
}

/// An IN buffer that cannot hold the feedback size panics.
#[test]
#[should_panic(expected = "shorter than feedback size")]
fn pull_into_short_buffer_panics() {
    let mut rx = running_rx();
    let mut out = [0u8; 320];
    rx.pull_frames(&mut out, 384);
}

/// A payload one byte short of a frame panics, even while stopped.
#[test]
#[should_panic(expected = "not a multiple")]
fn push_short_frame_panics() {
    let mut tx = Tx::new(BridgeConfig::tdm16_playback()).unwrap();
    tx.push_frames(&[0u8; 63]);
}
