//! Login cookie generation.
//!
//! Each cookie is `base64("v=2;k=" + HMAC-SHA256(key, nonce))` where `key` is
//! 128 fresh bytes from the OS and `nonce` is the decimal rendering of a
//! per-generator counter.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::TryRngCore;
use sha2::Sha256;

use crate::error::ClientError;

type HmacSha256 = Hmac<Sha256>;

const KEY_LEN: usize = 128;
const NONCE_RANGE: u64 = 10_000_000_000_000_000;
const COOKIE_VERSION: &str = "v=2;k=";

/// Monotonic nonce source, seeded once.
#[derive(Debug)]
pub struct NonceCounter {
    next: AtomicU64,
}

impl NonceCounter {
    /// Seed from the OS random source, in `[0, 10^16)`.
    pub fn from_os_rng() -> Result<Self, ClientError> {
        let seed = OsRng
            .try_next_u64()
            .map_err(|e| ClientError::Entropy(e.to_string()))?;
        Ok(Self::with_seed(seed % NONCE_RANGE))
    }

    pub fn with_seed(seed: u64) -> Self {
        NonceCounter {
            next: AtomicU64::new(seed),
        }
    }

    /// Current value; the counter advances by one.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// A base64 login cookie value.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthCookie(String);

impl AuthCookie {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for AuthCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthCookie(..)")
    }
}

/// Produces a distinct [`AuthCookie`] per call.
#[derive(Debug)]
pub struct AuthCookieGenerator {
    nonce: NonceCounter,
}

impl AuthCookieGenerator {
    pub fn new() -> Result<Self, ClientError> {
        Ok(Self::with_counter(NonceCounter::from_os_rng()?))
    }

    pub fn with_counter(nonce: NonceCounter) -> Self {
        AuthCookieGenerator { nonce }
    }

    pub fn generate(&self) -> Result<AuthCookie, ClientError> {
        let mut key = [0u8; KEY_LEN];
        OsRng
            .try_fill_bytes(&mut key)
            .map_err(|e| ClientError::Entropy(e.to_string()))?;
        Ok(cookie_from_parts(&key, self.nonce.next()))
    }
}

fn cookie_from_parts(key: &[u8], nonce: u64) -> AuthCookie {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(nonce.to_string().as_bytes());
    let digest = mac.finalize().into_bytes();

    let mut raw = Vec::with_capacity(COOKIE_VERSION.len() + digest.len());
    raw.extend_from_slice(COOKIE_VERSION.as_bytes());
    raw.extend_from_slice(&digest);
    AuthCookie(BASE64.encode(raw))
}
