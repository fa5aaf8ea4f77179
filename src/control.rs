use std::fmt;
use std::sync::Arc;

use zeroize::Zeroize;
use zeroize::Zeroizing;

use crate::kdf::{KeyUse, MasterSecret};
use crate::policy::{SrtpCipher, SrtpPolicy};
use crate::replay::{ReplayCheck, ReplayWindow};
use crate::suite::{packet_iv, AuthSuite, CipherSuite};
use crate::{SrtpError, Ssrc};

// The SRTCP trailer is the E-flag/index word plus the tag. Unlike RTP there
// is no counter to guess: the 31 bit index travels in every packet.
const E_FLAG: u32 = 0x8000_0000;
const INDEX_LEN: usize = 4;

/// Crypto context for one source's control channel.
pub(crate) struct SrtcpContext {
    ssrc: Ssrc,
    policy: Arc<SrtpPolicy>,
    master: MasterSecret,
    salt: Zeroizing<Vec<u8>>,
    cipher: CipherSuite,
    auth: AuthSuite,
    /// Counter for outgoing SRTCP packets.
    index: u32,
    replay: ReplayWindow,
    packets: u64,
    auth_failures: u64,
    closed: bool,
}

impl SrtcpContext {
    pub fn new(
        ssrc: Ssrc,
        master: MasterSecret,
        policy: Arc<SrtpPolicy>,
        index: u64,
    ) -> Result<Self, SrtpError> {
        let keys = master.session_keys(&policy, KeyUse::Rtcp, index)?;
        let cipher = CipherSuite::new(&policy, &keys.cipher)?;
        let auth = AuthSuite::new(&policy, &keys.auth)?;

        debug!("Derived SRTCP context for {}", ssrc);

        Ok(SrtcpContext {
            ssrc,
            policy,
            master,
            salt: keys.salt,
            cipher,
            auth,
            index: 0,
            replay: ReplayWindow::default(),
            packets: 0,
            auth_failures: 0,
            closed: false,
        })
    }

    /// Encrypt and tag an outbound control payload.
    ///
    /// Appends the E-flag/index word and the tag after the ciphertext.
    pub fn protect(&mut self, header: &[u8], payload: &[u8]) -> Result<Vec<u8>, SrtpError> {
        if self.closed {
            return Err(SrtpError::ContextClosed);
        }

        // https://tools.ietf.org/html/rfc3711#page-15
        // The SRTCP index MUST be set to zero before the first SRTCP
        // packet is sent, and MUST be incremented by one,
        // modulo 2^31, after each SRTCP packet is sent.
        self.index = (self.index + 1) % 2_u32.pow(31);
        let index = self.index;

        if *self.ssrc == 0 {
            warn!("SSRC 0 does not make a good SRTCP IV");
        }

        let encrypted = self.policy.cipher != SrtpCipher::Null;
        let e_and_index = if encrypted { E_FLAG | index } else { index };

        let iv = packet_iv(&self.salt, *self.ssrc, u64::from(index));

        let mut out = vec![0_u8; payload.len() + INDEX_LEN + self.auth.tag_len()];
        self.cipher.apply(&iv, payload, &mut out[..payload.len()]);
        out[payload.len()..payload.len() + INDEX_LEN].copy_from_slice(&e_and_index.to_be_bytes());

        // The tag covers everything before it: header, ciphertext and the
        // E-flag/index word.
        let body_len = payload.len() + INDEX_LEN;
        let tag = self.auth.tag(&[header, &out[..body_len]]);
        out[body_len..].copy_from_slice(&tag);

        self.packets += 1;

        Ok(out)
    }

    /// Verify and decrypt an inbound control payload.
    ///
    /// The explicit index from the trailer gates the replay window; it is
    /// committed only after the tag verifies. A clear E-flag means the
    /// payload was never encrypted and is returned as-is.
    pub fn unprotect(&mut self, header: &[u8], protected: &[u8]) -> Result<Vec<u8>, SrtpError> {
        if self.closed {
            return Err(SrtpError::ContextClosed);
        }

        let tag_len = self.auth.tag_len();
        if protected.len() < tag_len + INDEX_LEN {
            return Err(SrtpError::BadPacket("payload shorter than the srtcp trailer"));
        }

        let body_len = protected.len() - tag_len;
        let (body, tag) = protected.split_at(body_len);

        let idx_start = body_len - INDEX_LEN;
        let e_and_index = u32::from_be_bytes([
            body[idx_start],
            body[idx_start + 1],
            body[idx_start + 2],
            body[idx_start + 3],
        ]);

        let encrypted = e_and_index & E_FLAG > 0;
        let index = u64::from(e_and_index & !E_FLAG);

        match self.replay.check(index) {
            ReplayCheck::Accept => {}
            ReplayCheck::TooOld | ReplayCheck::AlreadySeen => {
                trace!("Replay rejected srtcp index {} for {}", index, self.ssrc);
                return Err(SrtpError::ReplayDetected(index));
            }
        }

        if !self.auth.verify(&[header, body], tag) {
            self.auth_failures += 1;
            trace!("Auth tag mismatch for srtcp {}", self.ssrc);
            return Err(SrtpError::AuthenticationFailed);
        }

        // Tag checked out, the index is trustworthy now.
        self.replay.commit(index);

        let input = &body[..idx_start];

        if !encrypted {
            self.packets += 1;
            return Ok(input.to_vec());
        }

        let iv = packet_iv(&self.salt, *self.ssrc, index);
        let mut out = vec![0_u8; input.len()];
        self.cipher.apply(&iv, input, &mut out);

        self.packets += 1;

        Ok(out)
    }

    /// Wipe all key material and refuse further operations.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }

        self.master.wipe();
        self.salt.zeroize();
        self.cipher.wipe();
        self.auth.wipe();
        self.closed = true;
    }

    /// Packets processed by this context.
    #[allow(dead_code)]
    pub fn packets(&self) -> u64 {
        self.packets
    }

    /// Tag mismatches seen by this context.
    #[allow(dead_code)]
    pub fn auth_failures(&self) -> u64 {
        self.auth_failures
    }

    #[cfg(test)]
    fn is_wiped(&self) -> bool {
        self.master.is_wiped()
            && self.salt.iter().all(|b| *b == 0)
            && self.cipher.is_wiped()
            && self.auth.is_wiped()
    }
}

impl fmt::Debug for SrtcpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SrtcpContext")
            .field("ssrc", &self.ssrc)
            .field("policy", &self.policy)
            .field("index", &self.index)
            .field("packets", &self.packets)
            .field("auth_failures", &self.auth_failures)
            .field("closed", &self.closed)
            .finish()
    }
}
