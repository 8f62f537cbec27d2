//! Reminder secrets and the trust boundaries that scope them

use std::collections::HashMap;
use std::fmt;

use hmac::{Hmac, Mac};
use parking_lot::Mutex;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::MAC_LEN;
use crate::error::{DatasetError, DatasetResult};

type HmacSha256 = Hmac<Sha256>;

/// Length of generated secrets, in bytes
pub const GENERATED_KEY_LEN: usize = 32;

/// Secret used to sign and verify reminder tokens.
///
/// `Debug` shows only the fingerprint.
#[derive(Clone, PartialEq, Eq)]
pub struct ReminderKey {
    secret: Vec<u8>,
}

impl ReminderKey {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Fresh random key from the thread RNG
    pub fn generate() -> Self {
        let mut secret = vec![0u8; GENERATED_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut secret);
        Self { secret }
    }

    /// Parse a hex-encoded secret
    pub fn from_hex(text: &str) -> Result<Self, hex::FromHexError> {
        Ok(Self::new(hex::decode(text.trim())?))
    }

    /// First 8 bytes of the SHA-256 of the secret, hex-encoded.
    ///
    /// Safe to log; identifies which key was used without revealing it.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.secret);
        hex::encode(&digest[..8])
    }

    fn keyed(&self) -> DatasetResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| DatasetError::Internal(format!("HMAC rejected key: {}", e)))
    }

    /// MAC over `body`
    pub(crate) fn mac(&self, body: &[u8]) -> DatasetResult<[u8; MAC_LEN]> {
        let mut mac = self.keyed()?;
        mac.update(body);
        Ok(mac.finalize().into_bytes().into())
    }

    /// Constant-time check of `claimed` against the MAC over `body`.
    pub(crate) fn verify(&self, body: &[u8], claimed: &[u8]) -> DatasetResult<bool> {
        let mut mac = self.keyed()?;
        mac.update(body);
        Ok(mac.verify_slice(claimed).is_ok())
    }
}

impl fmt::Debug for ReminderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReminderKey")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Supplies the secret for a trust boundary (a session, a tenant, ...).
///
/// A provider must return the same key for a boundary for as long as tokens
/// issued under it may come back.
pub trait KeyProvider: Send + Sync {
    fn key_for(&self, boundary: &str) -> ReminderKey;
}

/// One key for every boundary
impl KeyProvider for ReminderKey {
    fn key_for(&self, _boundary: &str) -> ReminderKey {
        self.clone()
    }
}

/// Per-session random keys, created on first use.
#[derive(Debug, Default)]
pub struct SessionKeys {
    keys: Mutex<HashMap<String, ReminderKey>>,
}

impl SessionKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the key for `session`. Tokens issued under it no longer
    /// validate. Returns whether a key existed.
    pub fn end_session(&self, session: &str) -> bool {
        let removed = self.keys.lock().remove(session).is_some();
        if removed {
            debug!(session, "reminder key discarded");
        }
        removed
    }

    /// Number of sessions holding a key
    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }
}

impl KeyProvider for SessionKeys {
    fn key_for(&self, boundary: &str) -> ReminderKey {
        self.keys
            .lock()
            .entry(boundary.to_string())
            .or_insert_with(|| {
                let key = ReminderKey::generate();
                debug!(session = boundary, fingerprint = %key.fingerprint(), "reminder key created");
                key
            })
            .clone()
    }
}
