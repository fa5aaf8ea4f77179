use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use zeroize::{Zeroize, Zeroizing};

use crate::policy::{SrtpAuth, SrtpCipher, SrtpPolicy};
use crate::SrtpError;

pub(crate) const AES_CM_KEY_LEN: usize = 16;
pub(crate) const HMAC_SHA1_KEY_LEN: usize = 20;
pub(crate) const HMAC_SHA1_TAG_LEN: usize = 10;
pub(crate) const MAX_SALT_LEN: usize = 14;

type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;
type HmacSha1 = Hmac<Sha1>;

pub(crate) type PacketIv = [u8; 16];

/// Per-packet IV for AES-CM, RFC 3711 section 4.1.1.
///
/// The session salt is XORed over (SSRC at bytes 4..8, 48 bit packet index
/// at bytes 6..14). The low two bytes stay zero; counter mode counts the
/// blocks of the packet there.
pub(crate) fn packet_iv(salt: &[u8], ssrc: u32, index: u64) -> PacketIv {
    let mut iv = [0; 16];

    iv[4..8].copy_from_slice(&ssrc.to_be_bytes());

    let index_be = index.to_be_bytes();
    for i in 0..8 {
        iv[i + 6] ^= index_be[i];
    }
    for (i, s) in salt.iter().enumerate() {
        iv[i] ^= s;
    }

    iv
}

/// Encryption transform under one derived session key.
///
/// Stateless apart from the key: counter mode keys a fresh stream per
/// packet from the IV, and is its own inverse, so encrypt and decrypt are
/// the same operation.
pub(crate) enum CipherSuite {
    AesCm128 { key: Zeroizing<[u8; AES_CM_KEY_LEN]> },
    Null,
}

impl CipherSuite {
    pub fn new(policy: &SrtpPolicy, key: &[u8]) -> Result<Self, SrtpError> {
        match policy.cipher {
            SrtpCipher::AesCm128 => {
                let key: [u8; AES_CM_KEY_LEN] = key
                    .try_into()
                    .map_err(|_| SrtpError::InvalidPolicy("AES-128-CM needs a 16 byte key"))?;
                Ok(CipherSuite::AesCm128 {
                    key: Zeroizing::new(key),
                })
            }
            SrtpCipher::Null => Ok(CipherSuite::Null),
        }
    }

    /// Apply the keystream. `output` must hold at least `input.len()` bytes.
    pub fn apply(&self, iv: &PacketIv, input: &[u8], output: &mut [u8]) {
        output[..input.len()].copy_from_slice(input);

        match self {
            CipherSuite::AesCm128 { key } => {
                let key: &[u8; AES_CM_KEY_LEN] = key;
                let mut cipher = Aes128Ctr::new(key.into(), iv.into());
                cipher.apply_keystream(&mut output[..input.len()]);
            }
            CipherSuite::Null => {}
        }
    }

    pub fn wipe(&mut self) {
        if let CipherSuite::AesCm128 { key } = self {
            key.zeroize();
        }
    }

    #[cfg(test)]
    pub fn is_wiped(&self) -> bool {
        match self {
            CipherSuite::AesCm128 { key } => key.iter().all(|b| *b == 0),
            CipherSuite::Null => true,
        }
    }
}

/// Authentication transform under one derived session key.
pub(crate) enum AuthSuite {
    HmacSha1 {
        key: Zeroizing<Vec<u8>>,
        tag_len: usize,
    },
    Null,
}

impl AuthSuite {
    pub fn new(policy: &SrtpPolicy, key: &[u8]) -> Result<Self, SrtpError> {
        match policy.auth {
            SrtpAuth::HmacSha1 => {
                if key.len() != HMAC_SHA1_KEY_LEN {
                    return Err(SrtpError::InvalidPolicy("HMAC-SHA1 needs a 20 byte key"));
                }
                Ok(AuthSuite::HmacSha1 {
                    key: Zeroizing::new(key.to_vec()),
                    tag_len: policy.auth_tag_len,
                })
            }
            SrtpAuth::Null => Ok(AuthSuite::Null),
        }
    }

    /// Bytes of tag this suite appends to each packet.
    pub fn tag_len(&self) -> usize {
        match self {
            AuthSuite::HmacSha1 { tag_len, .. } => *tag_len,
            AuthSuite::Null => 0,
        }
    }

    /// Truncated tag over the concatenation of `parts`.
    pub fn tag(&self, parts: &[&[u8]]) -> Vec<u8> {
        match self {
            AuthSuite::HmacSha1 { key, tag_len } => {
                let mut mac =
                    HmacSha1::new_from_slice(key).expect("hmac to normalize size to 20");
                for part in parts {
                    mac.update(part);
                }
                let tag = mac.finalize().into_bytes();
                tag[..*tag_len].to_vec()
            }
            AuthSuite::Null => Vec::new(),
        }
    }

    /// Constant-time comparison of a received tag.
    pub fn verify(&self, parts: &[&[u8]], cmp: &[u8]) -> bool {
        match self {
            AuthSuite::HmacSha1 { key, tag_len } => {
                if cmp.len() != *tag_len {
                    return false;
                }
                let mut mac =
                    HmacSha1::new_from_slice(key).expect("hmac to normalize size to 20");
                for part in parts {
                    mac.update(part);
                }
                mac.verify_truncated_left(cmp).is_ok()
            }
            AuthSuite::Null => true,
        }
    }

    pub fn wipe(&mut self) {
        if let AuthSuite::HmacSha1 { key, .. } = self {
            key.zeroize();
        }
    }

    #[cfg(test)]
    pub fn is_wiped(&self) -> bool {
        match self {
            AuthSuite::HmacSha1 { key, .. } => key.iter().all(|b| *b == 0),
            AuthSuite::Null => true,
        }
    }
}

impl std::fmt::Debug for CipherSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CipherSuite::AesCm128 { .. } => f.debug_struct("AesCm128").finish(),
            CipherSuite::Null => f.debug_struct("Null").finish(),
        }
    }
}

impl std::fmt::Debug for AuthSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthSuite::HmacSha1 { tag_len, .. } => f
                .debug_struct("HmacSha1")
                .field("tag_len", tag_len)
                .finish(),
            AuthSuite::Null => f.debug_struct("Null").finish(),
        }
    }
}
