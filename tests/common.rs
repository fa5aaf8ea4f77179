#![allow(unused)]
use std::sync::Once;

use skydd::{ControlPacket, MediaPacket, SrtpEngine, SrtpPolicy};

pub const MASTER_KEY: [u8; 16] = [
    0xE1, 0xF9, 0x7A, 0x0D, 0x3E, 0x01, 0x8B, 0xE0, //
    0xD6, 0x4F, 0xA3, 0x2C, 0x06, 0xDE, 0x41, 0x39,
];

pub const MASTER_SALT: [u8; 14] = [
    0x0E, 0xC6, 0x75, 0xAD, 0x49, 0x8A, 0xFE, //
    0xEB, 0xB6, 0x96, 0x0B, 0x3A, 0xAB, 0xE6,
];

pub fn init_log() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    static START: Once = Once::new();

    START.call_once(|| {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(env_filter)
            .init();
    });
}

/// Two engines sharing one master secret, as two endpoints of a session
/// would after keying.
pub fn connect_pair() -> (SrtpEngine, SrtpEngine) {
    let policy = SrtpPolicy::aes_cm_128_hmac_sha1_80();

    let l = SrtpEngine::new(&MASTER_KEY, &MASTER_SALT, policy.clone(), policy.clone()).unwrap();
    let r = SrtpEngine::new(&MASTER_KEY, &MASTER_SALT, policy.clone(), policy).unwrap();

    (l, r)
}

/// A minimal 12 byte RTP header. The crypto layer treats header bytes as
/// opaque, but tests keep them honest anyway.
pub fn rtp_header(ssrc: u32, seq_no: u16) -> Vec<u8> {
    let mut h = vec![0_u8; 12];
    h[0] = 0x80;
    h[1] = 96;
    h[2..4].copy_from_slice(&seq_no.to_be_bytes());
    h[4..8].copy_from_slice(&1000_u32.to_be_bytes());
    h[8..12].copy_from_slice(&ssrc.to_be_bytes());
    h
}

pub fn media_packet(ssrc: u32, seq_no: u16, payload: &[u8]) -> MediaPacket {
    MediaPacket {
        ssrc: ssrc.into(),
        seq_no,
        header: rtp_header(ssrc, seq_no),
        payload: payload.to_vec(),
    }
}

pub fn control_packet(ssrc: u32, payload: &[u8]) -> ControlPacket {
    let mut header = vec![0x81, 0xC8, 0x00, 0x06];
    header.extend_from_slice(&ssrc.to_be_bytes());

    ControlPacket {
        ssrc: ssrc.into(),
        header,
        payload: payload.to_vec(),
    }
}
