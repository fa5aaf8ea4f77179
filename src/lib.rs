//! Sans I/O SRTP/SRTCP protection in Rust.
//!
//! `skydd` implements the packet protection half of SRTP (RFC 3711): given a
//! master key and salt agreed by some outer keying mechanism (DTLS-SRTP,
//! ZRTP, MIKEY — all outside this crate), it derives per-source session keys
//! and encrypts/authenticates RTP and RTCP payloads, with replay protection
//! and rollover-counter tracking on the receive side.
//!
//! The crate is Sans I/O in the same sense as the author's other network
//! code: no sockets, no internal threads, no async runtime. Parsing of
//! RTP/RTCP headers also stays outside — callers hand over packets that are
//! already split into header and payload bytes, and get the payload swapped
//! for its protected (or recovered) form.
//!
//! # Usage
//!
//! ```
//! use skydd::{MediaPacket, SrtpEngine, SrtpPolicy};
//!
//! let master_key = [0x2B; 16];
//! let master_salt = [0x09; 14];
//! let policy = SrtpPolicy::aes_cm_128_hmac_sha1_80();
//!
//! // One engine per endpoint. Both sides derive identical session keys
//! // from the shared master secret.
//! let tx = SrtpEngine::new(&master_key, &master_salt, policy.clone(), policy.clone()).unwrap();
//! let rx = SrtpEngine::new(&master_key, &master_salt, policy.clone(), policy).unwrap();
//!
//! let mut packet = MediaPacket {
//!     ssrc: 42.into(),
//!     seq_no: 1,
//!     header: vec![0x80, 0x60, 0x00, 0x01],
//!     payload: b"not yet encrypted".to_vec(),
//! };
//!
//! tx.rtp_transformer().protect(&mut packet).unwrap();
//! rx.rtp_transformer().unprotect(&mut packet).unwrap();
//! assert_eq!(packet.payload, b"not yet encrypted");
//! ```
//!
//! # Per-source contexts
//!
//! Each distinct SSRC gets its own crypto context, derived lazily on first
//! packet from the engine's master secret. Contexts for different sources
//! are independent and can be driven from different threads; operations on
//! the *same* source are serialized internally, since the rollover counter,
//! replay window and highest-seen sequence number commit together.
//!
//! # Closing
//!
//! [`SrtpEngine::close`] wipes the master secret and every derived session
//! key (overwriting the buffers with zeros before release) and waits out
//! in-flight operations. Transforms attempted afterwards fail with
//! [`SrtpError::ContextClosed`]. Dropping the engine without closing still
//! zeroes the buffers on drop.

#![forbid(unsafe_code)]

#[macro_use]
extern crate tracing;

use std::sync::Arc;

use thiserror::Error;

mod packet;
pub use packet::{ControlPacket, MediaPacket, Ssrc};

mod policy;
pub use policy::{SrtpAuth, SrtpCipher, SrtpPolicy};

mod kdf;
mod replay;
mod suite;

mod context;
mod control;

mod store;
use store::ContextStore;

/// Errors for the whole protection engine.
///
/// [`ReplayDetected`][Self::ReplayDetected] and
/// [`AuthenticationFailed`][Self::AuthenticationFailed] are per-packet: the
/// offending packet is dropped and the context carries on unchanged. The
/// other variants indicate caller bugs or misconfiguration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SrtpError {
    /// Key or salt lengths that don't line up with the selected transforms.
    #[error("invalid policy: {0}")]
    InvalidPolicy(&'static str),

    /// The packet index was already accepted, or fell behind the replay window.
    #[error("replay detected for packet index {0}")]
    ReplayDetected(u64),

    /// The authentication tag did not match.
    ///
    /// A sustained rate of these indicates an attack or a key desync;
    /// contexts count them (and log at trace level) for that reason.
    #[error("authentication tag mismatch")]
    AuthenticationFailed,

    /// Operation attempted after the engine or context was closed.
    #[error("context is closed")]
    ContextClosed,

    /// Packet too short to carry the trailer the policy requires.
    #[error("bad packet: {0}")]
    BadPacket(&'static str),
}

/// Factory for SRTP/SRTCP transformers sharing one master secret.
///
/// Mirrors the classic transform-engine shape: the engine owns a template
/// (master secret + policies) from which per-source crypto contexts are
/// derived on demand, and hands out one transformer for media and one for
/// control, both backed by the same context store.
#[derive(Debug, Clone)]
pub struct SrtpEngine {
    store: Arc<ContextStore>,
}

impl SrtpEngine {
    /// Create an engine from the negotiated master key/salt and the
    /// policies for the media and control channels.
    ///
    /// Fails with [`SrtpError::InvalidPolicy`] if either policy is
    /// internally inconsistent or the master key/salt lengths are wrong
    /// for the key derivation function.
    pub fn new(
        master_key: &[u8],
        master_salt: &[u8],
        srtp_policy: SrtpPolicy,
        srtcp_policy: SrtpPolicy,
    ) -> Result<Self, SrtpError> {
        let store = ContextStore::new(master_key, master_salt, srtp_policy, srtcp_policy)?;

        Ok(SrtpEngine {
            store: Arc::new(store),
        })
    }

    /// Transformer for the media (RTP) channel.
    pub fn rtp_transformer(&self) -> SrtpTransformer {
        SrtpTransformer {
            store: self.store.clone(),
        }
    }

    /// Transformer for the control (RTCP) channel.
    pub fn rtcp_transformer(&self) -> SrtcpTransformer {
        SrtcpTransformer {
            store: self.store.clone(),
        }
    }

    /// Close the engine.
    ///
    /// Wipes the master secret and all derived key material. Waits for
    /// in-flight per-source operations to finish so no transform races the
    /// zeroing. Idempotent; the second call is a no-op.
    pub fn close(&self) {
        self.store.close();
    }
}

/// Per-packet transform for the media channel.
///
/// Cheap to clone; clones share the engine's context store.
#[derive(Debug, Clone)]
pub struct SrtpTransformer {
    store: Arc<ContextStore>,
}

impl SrtpTransformer {
    /// Encrypt and tag an outbound packet.
    ///
    /// Replaces the payload with ciphertext followed by the authentication
    /// tag. The header bytes are covered by the tag but left untouched.
    pub fn protect(&self, packet: &mut MediaPacket) -> Result<(), SrtpError> {
        let ctx = self.store.resolve_rtp(packet.ssrc)?;
        let mut ctx = ctx.lock();
        packet.payload = ctx.protect(&packet.header, packet.seq_no, &packet.payload)?;
        Ok(())
    }

    /// Verify and decrypt an inbound packet.
    ///
    /// Replaces the payload with the recovered plaintext. Replayed,
    /// out-of-window and tampered packets are rejected without touching
    /// the packet or the context state.
    pub fn unprotect(&self, packet: &mut MediaPacket) -> Result<(), SrtpError> {
        let ctx = self.store.resolve_rtp(packet.ssrc)?;
        let mut ctx = ctx.lock();
        packet.payload = ctx.unprotect(&packet.header, packet.seq_no, &packet.payload)?;
        Ok(())
    }
}

/// Per-packet transform for the control channel.
#[derive(Debug, Clone)]
pub struct SrtcpTransformer {
    store: Arc<ContextStore>,
}

impl SrtcpTransformer {
    /// Encrypt and tag an outbound control packet.
    ///
    /// The context assigns the packet its SRTCP index; the payload is
    /// replaced by ciphertext, the E-flag/index word and the tag.
    pub fn protect(&self, packet: &mut ControlPacket) -> Result<(), SrtpError> {
        let ctx = self.store.resolve_rtcp(packet.ssrc)?;
        let mut ctx = ctx.lock();
        packet.payload = ctx.protect(&packet.header, &packet.payload)?;
        Ok(())
    }

    /// Verify and decrypt an inbound control packet.
    ///
    /// The SRTCP index is taken from the packet's own trailer, validated
    /// against the replay window and committed only once the tag verifies.
    pub fn unprotect(&self, packet: &mut ControlPacket) -> Result<(), SrtpError> {
        let ctx = self.store.resolve_rtcp(packet.ssrc)?;
        let mut ctx = ctx.lock();
        packet.payload = ctx.unprotect(&packet.header, &packet.payload)?;
        Ok(())
    }
}
