//! `X-PagerDuty-Signature` verification.
//!
//! The header carries one or more comma separated `v1=<hex>` candidates, one
//! per active secret while a secret is being rotated. A request is authentic
//! if any candidate is the HMAC-SHA256 of the raw body.

use hmac::{
    Hmac,
    Mac,
};
use sha2::Sha256;
use std::fmt;

pub const SIGNATURE_HEADER: &str = "x-pagerduty-signature";

const SCHEME_PREFIX: &str = "v1=";

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct SignatureVerifier {
    mac: HmacSha256,
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier").finish_non_exhaustive()
    }
}

impl SignatureVerifier {
    /// `None` for an empty secret: there is nothing to verify against.
    pub fn new(secret: impl AsRef<[u8]>) -> Option<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return None;
        }
        HmacSha256::new_from_slice(secret).ok().map(|mac| Self { mac })
    }

    /// The header value PagerDuty would send for `body`.
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(body);
        format!("{SCHEME_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
    }

    /// Constant time check of every candidate in `header` against `body`.
    pub fn verify(&self, body: &[u8], header: &str) -> bool {
        header
            .split(',')
            .filter_map(|candidate| candidate.trim().strip_prefix(SCHEME_PREFIX))
            .filter_map(|signature| hex::decode(signature).ok())
            .any(|signature| {
                let mut mac = self.mac.clone();
                mac.update(body);
                mac.verify_slice(&signature).is_ok()
            })
    }
}
