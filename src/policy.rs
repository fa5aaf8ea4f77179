use crate::suite::{AES_CM_KEY_LEN, HMAC_SHA1_KEY_LEN, HMAC_SHA1_TAG_LEN, MAX_SALT_LEN};
use crate::SrtpError;

/// Encryption transform selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrtpCipher {
    /// AES-128 in counter mode, the RFC 3711 default.
    AesCm128,
    /// No encryption. Packets are authenticated only.
    Null,
}

/// Authentication transform selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrtpAuth {
    /// HMAC-SHA1 with a truncated tag, the RFC 3711 default.
    HmacSha1,
    /// No authentication. Strongly discouraged outside debugging.
    Null,
}

/// Protection policy for one channel (media or control).
///
/// Immutable once handed to the engine and shared by reference across every
/// context derived from the same master secret. Lengths are in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrtpPolicy {
    /// Encryption transform.
    pub cipher: SrtpCipher,
    /// Session encryption key length.
    pub cipher_key_len: usize,
    /// Authentication transform.
    pub auth: SrtpAuth,
    /// Session authentication key length.
    pub auth_key_len: usize,
    /// Length of the truncated authentication tag appended to each packet.
    pub auth_tag_len: usize,
    /// Session salt length for per-packet IVs.
    pub salt_len: usize,
    /// Key derivation rate. 0 (the default) derives session keys once per
    /// context; a non-zero power of two re-keys every so many packets.
    pub key_derivation_rate: u64,
}

impl SrtpPolicy {
    /// The RFC 3711 default profile: AES-128-CM with an 80 bit HMAC-SHA1 tag.
    pub fn aes_cm_128_hmac_sha1_80() -> Self {
        SrtpPolicy {
            cipher: SrtpCipher::AesCm128,
            cipher_key_len: AES_CM_KEY_LEN,
            auth: SrtpAuth::HmacSha1,
            auth_key_len: HMAC_SHA1_KEY_LEN,
            auth_tag_len: HMAC_SHA1_TAG_LEN,
            salt_len: MAX_SALT_LEN,
            key_derivation_rate: 0,
        }
    }

    /// The short-tag variant: AES-128-CM with a 32 bit HMAC-SHA1 tag.
    pub fn aes_cm_128_hmac_sha1_32() -> Self {
        SrtpPolicy {
            auth_tag_len: 4,
            ..Self::aes_cm_128_hmac_sha1_80()
        }
    }

    /// Authentication without encryption.
    pub fn null_cipher_hmac_sha1_80() -> Self {
        SrtpPolicy {
            cipher: SrtpCipher::Null,
            cipher_key_len: 0,
            salt_len: 0,
            ..Self::aes_cm_128_hmac_sha1_80()
        }
    }

    /// No protection at all. Packets pass through unchanged.
    pub fn null() -> Self {
        SrtpPolicy {
            cipher: SrtpCipher::Null,
            cipher_key_len: 0,
            auth: SrtpAuth::Null,
            auth_key_len: 0,
            auth_tag_len: 0,
            salt_len: 0,
            key_derivation_rate: 0,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), SrtpError> {
        match self.cipher {
            SrtpCipher::AesCm128 => {
                if self.cipher_key_len != AES_CM_KEY_LEN {
                    return Err(SrtpError::InvalidPolicy("AES-128-CM needs a 16 byte key"));
                }
                if self.salt_len > MAX_SALT_LEN {
                    return Err(SrtpError::InvalidPolicy("session salt is at most 14 bytes"));
                }
            }
            SrtpCipher::Null => {
                if self.cipher_key_len != 0 || self.salt_len != 0 {
                    return Err(SrtpError::InvalidPolicy(
                        "null cipher takes no key or salt material",
                    ));
                }
            }
        }

        match self.auth {
            SrtpAuth::HmacSha1 => {
                if self.auth_key_len != HMAC_SHA1_KEY_LEN {
                    return Err(SrtpError::InvalidPolicy("HMAC-SHA1 needs a 20 byte key"));
                }
                if self.auth_tag_len == 0 || self.auth_tag_len > 20 {
                    return Err(SrtpError::InvalidPolicy(
                        "HMAC-SHA1 tag is between 1 and 20 bytes",
                    ));
                }
            }
            SrtpAuth::Null => {
                if self.auth_key_len != 0 || self.auth_tag_len != 0 {
                    return Err(SrtpError::InvalidPolicy(
                        "null auth takes no key and produces no tag",
                    ));
                }
            }
        }

        if self.key_derivation_rate != 0 && !self.key_derivation_rate.is_power_of_two() {
            return Err(SrtpError::InvalidPolicy(
                "key derivation rate must be 0 or a power of two",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_profile_is_valid() {
        assert!(SrtpPolicy::aes_cm_128_hmac_sha1_80().validate().is_ok());
        assert!(SrtpPolicy::aes_cm_128_hmac_sha1_32().validate().is_ok());
        assert!(SrtpPolicy::null_cipher_hmac_sha1_80().validate().is_ok());
        assert!(SrtpPolicy::null().validate().is_ok());
    }

    #[test]
    fn bad_lengths_are_rejected() {
        let mut p = SrtpPolicy::aes_cm_128_hmac_sha1_80();
        p.cipher_key_len = 24;
        assert!(matches!(p.validate(), Err(SrtpError::InvalidPolicy(_))));

        let mut p = SrtpPolicy::aes_cm_128_hmac_sha1_80();
        p.auth_tag_len = 32;
        assert!(matches!(p.validate(), Err(SrtpError::InvalidPolicy(_))));

        let mut p = SrtpPolicy::null();
        p.auth_tag_len = 10;
        assert!(matches!(p.validate(), Err(SrtpError::InvalidPolicy(_))));
    }

    #[test]
    fn kdr_must_be_power_of_two() {
        let mut p = SrtpPolicy::aes_cm_128_hmac_sha1_80();
        p.key_derivation_rate = 48;
        assert!(matches!(p.validate(), Err(SrtpError::InvalidPolicy(_))));

        p.key_derivation_rate = 64;
        assert!(p.validate().is_ok());
    }
}
