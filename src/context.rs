use std::fmt;
use std::sync::Arc;

use zeroize::Zeroize;
use zeroize::Zeroizing;

use crate::kdf::{KeyUse, MasterSecret};
use crate::policy::SrtpPolicy;
use crate::replay::{ReplayCheck, ReplayWindow};
use crate::suite::{packet_iv, AuthSuite, CipherSuite};
use crate::{SrtpError, Ssrc};

/// Crypto context for one media source.
///
/// A state machine over the source's unbounded stream of (sequence number,
/// payload) pairs. The 16 bit sequence number is extended to the 48 bit
/// packet index `i = 2^16 * ROC + SEQ` by guessing which rollover the
/// packet belongs to; on receive, the guess is committed only after the
/// authentication tag verifies.
pub(crate) struct SrtpContext {
    ssrc: Ssrc,
    policy: Arc<SrtpPolicy>,
    master: MasterSecret,
    salt: Zeroizing<Vec<u8>>,
    cipher: CipherSuite,
    auth: AuthSuite,
    /// Rollover counter. Only ever advances, by commit after authentication.
    roc: u32,
    /// Highest sequence number committed, `None` until the first packet.
    highest_seq: Option<u16>,
    replay: ReplayWindow,
    packets: u64,
    auth_failures: u64,
    closed: bool,
}

impl SrtpContext {
    pub fn new(
        ssrc: Ssrc,
        master: MasterSecret,
        policy: Arc<SrtpPolicy>,
        index: u64,
    ) -> Result<Self, SrtpError> {
        let keys = master.session_keys(&policy, KeyUse::Rtp, index)?;
        let cipher = CipherSuite::new(&policy, &keys.cipher)?;
        let auth = AuthSuite::new(&policy, &keys.auth)?;

        debug!("Derived SRTP context for {}", ssrc);

        Ok(SrtpContext {
            ssrc,
            policy,
            master,
            salt: keys.salt,
            cipher,
            auth,
            roc: 0,
            highest_seq: None,
            replay: ReplayWindow::default(),
            packets: 0,
            auth_failures: 0,
            closed: false,
        })
    }

    /// Encrypt and tag an outbound payload.
    pub fn protect(&mut self, header: &[u8], seq: u16, payload: &[u8]) -> Result<Vec<u8>, SrtpError> {
        if self.closed {
            return Err(SrtpError::ContextClosed);
        }

        let (guessed_roc, index) = self.guess(seq);
        // The sender trusts its own counter.
        self.commit_index(guessed_roc, seq, index);

        let iv = packet_iv(&self.salt, *self.ssrc, index);
        let mut out = vec![0_u8; payload.len() + self.auth.tag_len()];
        self.cipher.apply(&iv, payload, &mut out[..payload.len()]);

        // The tag covers header, ciphertext and the rollover counter, in
        // that order.
        let tag = self
            .auth
            .tag(&[header, &out[..payload.len()], &guessed_roc.to_be_bytes()]);
        out[payload.len()..].copy_from_slice(&tag);

        self.packets += 1;

        Ok(out)
    }

    /// Verify and decrypt an inbound payload.
    ///
    /// Two-phase: everything up to and including tag verification leaves
    /// the context untouched. The rollover guess, highest sequence number
    /// and replay window commit only once the tag has checked out, and
    /// decryption happens after that.
    pub fn unprotect(
        &mut self,
        header: &[u8],
        seq: u16,
        protected: &[u8],
    ) -> Result<Vec<u8>, SrtpError> {
        if self.closed {
            return Err(SrtpError::ContextClosed);
        }

        let tag_len = self.auth.tag_len();
        if protected.len() < tag_len {
            return Err(SrtpError::BadPacket("payload shorter than the auth tag"));
        }

        let (guessed_roc, index) = self.guess(seq);

        match self.replay.check(index) {
            ReplayCheck::Accept => {}
            ReplayCheck::TooOld | ReplayCheck::AlreadySeen => {
                trace!("Replay rejected index {} for {}", index, self.ssrc);
                return Err(SrtpError::ReplayDetected(index));
            }
        }

        let (cipher_text, tag) = protected.split_at(protected.len() - tag_len);

        if !self
            .auth
            .verify(&[header, cipher_text, &guessed_roc.to_be_bytes()], tag)
        {
            self.auth_failures += 1;
            trace!("Auth tag mismatch for {} seq {}", self.ssrc, seq);
            return Err(SrtpError::AuthenticationFailed);
        }

        self.replay.commit(index);
        self.commit_index(guessed_roc, seq, index);

        let iv = packet_iv(&self.salt, *self.ssrc, index);
        let mut out = vec![0_u8; cipher_text.len()];
        self.cipher.apply(&iv, cipher_text, &mut out);

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

    /// Guess which rollover `seq` belongs to.
    ///
    /// Pure. Returns the candidate ROC and the 48 bit packet index
    /// `i = 2^16 * ROC + SEQ` (RFC 3711 appendix A): a large negative jump
    /// from the highest committed sequence number means the counter rolled
    /// over, a large positive one means the packet is a straggler from
    /// before the last rollover.
    fn guess(&self, seq: u16) -> (u32, u64) {
        let Some(highest) = self.highest_seq else {
            // Nothing committed yet, no wrap to account for.
            return (self.roc, u64::from(seq));
        };

        let highest = u32::from(highest);
        let seq32 = u32::from(seq);

        let guessed_roc = if highest < 32_768 {
            if seq32 > 32_768 + highest {
                // Straggler from before the rollover. Saturate: below ROC 0
                // there is nothing to be late from.
                self.roc.saturating_sub(1)
            } else {
                self.roc
            }
        } else if highest > seq32 + 32_768 {
            self.roc.wrapping_add(1)
        } else {
            self.roc
        };

        (guessed_roc, u64::from(guessed_roc) << 16 | u64::from(seq))
    }

    /// Commit a verified guess. Stragglers never move the state backwards.
    fn commit_index(&mut self, guessed_roc: u32, seq: u16, index: u64) {
        let advanced = match self.committed_index() {
            Some(committed) => index > committed,
            None => true,
        };

        if advanced {
            self.roc = guessed_roc;
            self.highest_seq = Some(seq);
        }
    }

    fn committed_index(&self) -> Option<u64> {
        let highest = self.highest_seq?;
        Some(u64::from(self.roc) << 16 | u64::from(highest))
    }

    /// Packets processed by this context.
    #[allow(dead_code)]
    pub fn packets(&self) -> u64 {
        self.packets
    }

    /// Tag mismatches seen by this context. A climbing rate here means an
    /// attack or a key desync.
    #[allow(dead_code)]
    pub fn auth_failures(&self) -> u64 {
        self.auth_failures
    }

    #[cfg(test)]
    fn force_state(&mut self, roc: u32, highest_seq: u16) {
        self.roc = roc;
        self.highest_seq = Some(highest_seq);
    }

    #[cfg(test)]
    fn is_wiped(&self) -> bool {
        self.master.is_wiped()
            && self.salt.iter().all(|b| *b == 0)
            && self.cipher.is_wiped()
            && self.auth.is_wiped()
    }
}

impl fmt::Debug for SrtpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SrtpContext")
            .field("ssrc", &self.ssrc)
            .field("policy", &self.policy)
            .field("roc", &self.roc)
            .field("highest_seq", &self.highest_seq)
            .field("packets", &self.packets)
            .field("auth_failures", &self.auth_failures)
            .field("closed", &self.closed)
            .finish()
    }
}
