use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::SrtpContext;
use crate::control::SrtcpContext;
use crate::kdf::MasterSecret;
use crate::policy::SrtpPolicy;
use crate::{SrtpError, Ssrc};

/// Per-source context store shared by an engine's transformers.
///
/// Holds the session template (master secret + policies) and derives a
/// crypto context per SSRC the first time that source shows up. Creation
/// happens under the map lock, so two concurrent resolutions of the same
/// unseen SSRC cannot both insert: at most one context per source, ever.
///
/// Each context sits behind its own lock. Different sources transform in
/// parallel; operations on one source are serialized, since the rollover
/// counter, replay window and highest-sequence commits belong together.
#[derive(Debug)]
pub(crate) struct ContextStore {
    inner: Mutex<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    closed: bool,
    master: MasterSecret,
    srtp_policy: Arc<SrtpPolicy>,
    srtcp_policy: Arc<SrtpPolicy>,
    rtp: HashMap<Ssrc, Arc<Mutex<SrtpContext>>>,
    rtcp: HashMap<Ssrc, Arc<Mutex<SrtcpContext>>>,
}

impl ContextStore {
    pub fn new(
        master_key: &[u8],
        master_salt: &[u8],
        srtp_policy: SrtpPolicy,
        srtcp_policy: SrtpPolicy,
    ) -> Result<Self, SrtpError> {
        srtp_policy.validate()?;
        srtcp_policy.validate()?;

        let master = MasterSecret::new(master_key, master_salt)?;

        Ok(ContextStore {
            inner: Mutex::new(StoreInner {
                closed: false,
                master,
                srtp_policy: Arc::new(srtp_policy),
                srtcp_policy: Arc::new(srtcp_policy),
                rtp: HashMap::new(),
                rtcp: HashMap::new(),
            }),
        })
    }

    pub fn resolve_rtp(&self, ssrc: Ssrc) -> Result<Arc<Mutex<SrtpContext>>, SrtpError> {
        let mut inner = self.inner.lock();

        if inner.closed {
            return Err(SrtpError::ContextClosed);
        }

        if let Some(ctx) = inner.rtp.get(&ssrc) {
            return Ok(ctx.clone());
        }

        let ctx = SrtpContext::new(
            ssrc,
            inner.master.clone(),
            inner.srtp_policy.clone(),
            0,
        )?;
        let ctx = Arc::new(Mutex::new(ctx));
        inner.rtp.insert(ssrc, ctx.clone());

        Ok(ctx)
    }

    pub fn resolve_rtcp(&self, ssrc: Ssrc) -> Result<Arc<Mutex<SrtcpContext>>, SrtpError> {
        let mut inner = self.inner.lock();

        if inner.closed {
            return Err(SrtpError::ContextClosed);
        }

        if let Some(ctx) = inner.rtcp.get(&ssrc) {
            return Ok(ctx.clone());
        }

        let ctx = SrtcpContext::new(
            ssrc,
            inner.master.clone(),
            inner.srtcp_policy.clone(),
            0,
        )?;
        let ctx = Arc::new(Mutex::new(ctx));
        inner.rtcp.insert(ssrc, ctx.clone());

        Ok(ctx)
    }

    /// Close every context, wiping all key material.
    ///
    /// The template is wiped and the store marked closed under the map
    /// lock; each context is then closed under its own lock, which waits
    /// out any transform still in flight for that source.
    pub fn close(&self) {
        let (rtp, rtcp) = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return;
            }
            inner.closed = true;
            inner.master.wipe();
            (
                std::mem::take(&mut inner.rtp),
                std::mem::take(&mut inner.rtcp),
            )
        };

        for ctx in rtp.values() {
            ctx.lock().close();
        }
        for ctx in rtcp.values() {
            ctx.lock().close();
        }
    }
}
