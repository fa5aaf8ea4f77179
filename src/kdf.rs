use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use zeroize::{Zeroize, Zeroizing};

use crate::policy::SrtpPolicy;
use crate::SrtpError;

pub(crate) const MASTER_KEY_LEN: usize = 16;
pub(crate) const MASTER_SALT_LEN: usize = 14;

// Key derivation labels, RFC 3711 section 4.3.2.
const LABEL_RTP_CIPHER: u8 = 0;
const LABEL_RTP_AUTH: u8 = 1;
const LABEL_RTP_SALT: u8 = 2;
const LABEL_RTCP_CIPHER: u8 = 3;
const LABEL_RTCP_AUTH: u8 = 4;
const LABEL_RTCP_SALT: u8 = 5;

/// Which channel a set of session keys is derived for.
#[derive(Debug, Clone, Copy)]
pub(crate) enum KeyUse {
    Rtp,
    Rtcp,
}

impl KeyUse {
    /// (cipher, auth, salt) labels.
    fn labels(&self) -> (u8, u8, u8) {
        match self {
            KeyUse::Rtp => (LABEL_RTP_CIPHER, LABEL_RTP_AUTH, LABEL_RTP_SALT),
            KeyUse::Rtcp => (LABEL_RTCP_CIPHER, LABEL_RTCP_AUTH, LABEL_RTCP_SALT),
        }
    }
}

/// The master key and salt agreed by the outer keying mechanism.
///
/// Every context owns its own copy and wipes it on close. The buffers are
/// also zeroed on drop, so dropping a context without closing it does not
/// leave key bytes behind either.
#[derive(Clone)]
pub(crate) struct MasterSecret {
    key: Zeroizing<Vec<u8>>,
    salt: Zeroizing<Vec<u8>>,
}

impl MasterSecret {
    pub fn new(key: &[u8], salt: &[u8]) -> Result<Self, SrtpError> {
        if key.len() != MASTER_KEY_LEN {
            return Err(SrtpError::InvalidPolicy("master key must be 16 bytes"));
        }
        if salt.len() != MASTER_SALT_LEN {
            return Err(SrtpError::InvalidPolicy("master salt must be 14 bytes"));
        }

        Ok(MasterSecret {
            key: Zeroizing::new(key.to_vec()),
            salt: Zeroizing::new(salt.to_vec()),
        })
    }

    /// The AES-CM pseudo-random function of RFC 3711 section 4.3.3.
    ///
    /// Fills `out` with key material for `label`. The input block is the
    /// master salt XOR (label at byte 7, `r = index DIV rate` over bytes
    /// 8..14) with a 16 bit block counter spliced into bytes 14..16, run
    /// through AES-128-ECB under the master key, one block at a time.
    pub fn derive(&self, label: u8, index: u64, rate: u64, out: &mut [u8]) -> Result<(), SrtpError> {
        let mut input = [0_u8; 16];
        input[0..MASTER_SALT_LEN].copy_from_slice(&self.salt);
        input[7] ^= label;

        if rate != 0 {
            let r = (index / rate).to_be_bytes();
            // r is 48 bit, the low six bytes of the u64.
            for i in 0..6 {
                input[8 + i] ^= r[2 + i];
            }
        }

        let aes = Aes128::new(GenericArray::from_slice(&self.key));

        for (block_no, chunk) in out.chunks_mut(16).enumerate() {
            // The block counter is 16 bit. Needing more blocks than that
            // means the policy asked for key material this PRF cannot
            // produce in one derivation.
            let counter = u16::try_from(block_no)
                .map_err(|_| SrtpError::InvalidPolicy("key material exceeds one PRF derivation"))?;
            input[14..].copy_from_slice(&counter.to_be_bytes());

            let mut block = GenericArray::clone_from_slice(&input);
            aes.encrypt_block(&mut block);
            chunk.copy_from_slice(&block[..chunk.len()]);
        }

        Ok(())
    }

    /// Derive the full set of session keys a context needs.
    pub fn session_keys(
        &self,
        policy: &SrtpPolicy,
        key_use: KeyUse,
        index: u64,
    ) -> Result<SessionKeys, SrtpError> {
        let (cipher_label, auth_label, salt_label) = key_use.labels();
        let rate = policy.key_derivation_rate;

        let mut cipher = Zeroizing::new(vec![0_u8; policy.cipher_key_len]);
        self.derive(cipher_label, index, rate, &mut cipher)?;

        let mut auth = Zeroizing::new(vec![0_u8; policy.auth_key_len]);
        self.derive(auth_label, index, rate, &mut auth)?;

        let mut salt = Zeroizing::new(vec![0_u8; policy.salt_len]);
        self.derive(salt_label, index, rate, &mut salt)?;

        Ok(SessionKeys { cipher, auth, salt })
    }

    /// Overwrite the key and salt with zeros.
    pub fn wipe(&mut self) {
        self.key.zeroize();
        self.salt.zeroize();
    }

    #[cfg(test)]
    pub fn is_wiped(&self) -> bool {
        self.key.iter().all(|b| *b == 0) && self.salt.iter().all(|b| *b == 0)
    }
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("MasterSecret").finish()
    }
}

/// Session keys for one context, lengths per the policy.
pub(crate) struct SessionKeys {
    pub cipher: Zeroizing<Vec<u8>>,
    pub auth: Zeroizing<Vec<u8>>,
    pub salt: Zeroizing<Vec<u8>>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn derive_key() {
        // https://tools.ietf.org/html/rfc3711#appendix-B.3
        //
        // Key Derivation Test Vectors.

        let master = [
            0xE1, 0xF9, 0x7A, 0x0D, 0x3E, 0x01, 0x8B, 0xE0, //
            0xD6, 0x4F, 0xA3, 0x2C, 0x06, 0xDE, 0x41, 0x39,
        ];

        let salt = [
            0x0E, 0xC6, 0x75, 0xAD, 0x49, 0x8A, 0xFE, //
            0xEB, 0xB6, 0x96, 0x0B, 0x3A, 0xAB, 0xE6,
        ];

        let ms = MasterSecret::new(&master, &salt).unwrap();

        // aes crypto key
        let mut out = [0_u8; 16];
        ms.derive(0, 0, 0, &mut out[..]).unwrap();

        assert_eq!(
            out,
            [
                0xC6, 0x1E, 0x7A, 0x93, 0x74, 0x4F, 0x39, 0xEE, //
                0x10, 0x73, 0x4A, 0xFE, 0x3F, 0xF7, 0xA0, 0x87
            ]
        );

        // hmac
        let mut out = [0_u8; 20];
        ms.derive(1, 0, 0, &mut out[..]).unwrap();

        assert_eq!(
            out,
            [
                0xCE, 0xBE, 0x32, 0x1F, 0x6F, 0xF7, 0x71, 0x6B, //
                0x6F, 0xD4, 0xAB, 0x49, 0xAF, 0x25, 0x6A, 0x15, //
                0x6D, 0x38, 0xBA, 0xA4
            ]
        );

        // salt
        let mut out = [0_u8; 14];
        ms.derive(2, 0, 0, &mut out[..]).unwrap();

        assert_eq!(
            out,
            [
                0x30, 0xCB, 0xBC, 0x08, 0x86, 0x3D, 0x8C, //
                0x85, 0xD4, 0x9D, 0xB3, 0x4A, 0x9A, 0xE1
            ]
        );
    }

    #[test]
    fn derive_is_deterministic() {
        let ms = MasterSecret::new(&[7; 16], &[3; 14]).unwrap();

        let mut a = [0_u8; 20];
        let mut b = [0_u8; 20];
        ms.derive(1, 0, 0, &mut a).unwrap();
        ms.derive(1, 0, 0, &mut b).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn derivation_rate_changes_keys() {
        let ms = MasterSecret::new(&[7; 16], &[3; 14]).unwrap();

        let mut early = [0_u8; 16];
        let mut late = [0_u8; 16];
        ms.derive(0, 10, 1024, &mut early).unwrap();
        ms.derive(0, 5000, 1024, &mut late).unwrap();

        assert_ne!(early, late);

        // Same derivation window, same keys.
        let mut other = [0_u8; 16];
        ms.derive(0, 900, 1024, &mut other).unwrap();
        assert_eq!(early, other);
    }

    #[test]
    fn oversized_output_is_rejected() {
        let ms = MasterSecret::new(&[7; 16], &[3; 14]).unwrap();

        let mut out = vec![0_u8; 16 * 65_536];
        assert!(ms.derive(0, 0, 0, &mut out).is_ok());

        let mut out = vec![0_u8; 16 * 65_536 + 1];
        assert!(matches!(
            ms.derive(0, 0, 0, &mut out),
            Err(SrtpError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn wipe_zeroes_buffers() {
        let mut ms = MasterSecret::new(&[7; 16], &[3; 14]).unwrap();
        assert!(!ms.is_wiped());

        ms.wipe();
        assert!(ms.is_wiped());
    }
}
