use std::fmt;
use std::ops::Deref;

/// Synchronization source identifier for one media stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ssrc(u32);

impl Deref for Ssrc {
    type Target = u32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<u32> for Ssrc {
    fn from(v: u32) -> Self {
        Ssrc(v)
    }
}

impl From<Ssrc> for u32 {
    fn from(v: Ssrc) -> Self {
        v.0
    }
}

impl fmt::Display for Ssrc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A parsed RTP packet at the protection boundary.
///
/// Wire parsing happens before this crate: the caller provides the fields
/// the crypto layer needs together with the raw header bytes (which are
/// authenticated but never encrypted). `payload` is plaintext going out and
/// ciphertext + tag coming in.
#[derive(Debug, Clone)]
pub struct MediaPacket {
    /// Source the packet belongs to.
    pub ssrc: Ssrc,
    /// The 16 bit RTP sequence number from the header.
    pub seq_no: u16,
    /// Raw header bytes, up to where the payload starts.
    pub header: Vec<u8>,
    /// Payload bytes. Replaced in place by the transformers.
    pub payload: Vec<u8>,
}

/// A parsed RTCP compound packet at the protection boundary.
///
/// The first 8 bytes (header + sender SSRC) stay in the clear; everything
/// after them is the payload. The SRTCP index travels inside the protected
/// payload trailer, so there is no index field here.
#[derive(Debug, Clone)]
pub struct ControlPacket {
    /// Source the packet belongs to.
    pub ssrc: Ssrc,
    /// The unencrypted first 8 bytes of the compound packet.
    pub header: Vec<u8>,
    /// Payload bytes. Replaced in place by the transformers.
    pub payload: Vec<u8>,
}
