//! Symmetric key material for sealing session cookies.
//!
//! Keys are 32 bytes, configured as 64 hex characters. A [`KeySet`] holds one
//! active key, used for both sealing and opening, plus any number of retired
//! keys that are still accepted when opening so that rotating the active key
//! does not log everyone out.

use aes_gcm::{Aes256Gcm, Key, KeyInit};
use sha2::{Digest, Sha256};

use crate::error::Error;

/// Length of a session key in bytes.
pub const KEY_LEN: usize = 32;

/// Length of the key identifier prefixed to every sealed cookie.
pub const KEY_ID_LEN: usize = 4;

/// A 32-byte AES-256-GCM key with its derived identifier.
#[derive(Clone)]
pub struct SessionKey {
    bytes: [u8; KEY_LEN],
    id: [u8; KEY_ID_LEN],
}

impl SessionKey {
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut id = [0u8; KEY_ID_LEN];
        id.copy_from_slice(&digest[..KEY_ID_LEN]);
        Self { bytes, id }
    }

    /// Parses a 64-character hex string into a key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the string is not hex or does not decode
    /// to exactly 32 bytes.
    pub fn from_hex(hex_key: &str) -> Result<Self, Error> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|e| Error::Config(format!("invalid key hex: {e}")))?;
        if bytes.len() != KEY_LEN {
            return Err(Error::Config(format!(
                "key must be 64 hex chars ({KEY_LEN} bytes), got {} bytes",
                bytes.len()
            )));
        }
        let mut arr = [0u8; KEY_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self::from_bytes(arr))
    }

    /// First four bytes of the SHA-256 digest of the key.
    #[must_use]
    pub fn id(&self) -> [u8; KEY_ID_LEN] {
        self.id
    }

    pub(crate) fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.bytes))
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey")
            .field("id", &hex::encode(self.id))
            .finish_non_exhaustive()
    }
}

/// Active key plus decode-only retired keys.
#[derive(Debug, Clone)]
pub struct KeySet {
    active: SessionKey,
    retired: Vec<SessionKey>,
}

impl KeySet {
    #[must_use]
    pub fn new(active: SessionKey) -> Self {
        Self {
            active,
            retired: Vec::new(),
        }
    }

    /// Accept cookies sealed with `key` without sealing new ones with it.
    #[must_use]
    pub fn with_retired(mut self, key: SessionKey) -> Self {
        self.retired.push(key);
        self
    }

    #[must_use]
    pub fn active(&self) -> &SessionKey {
        &self.active
    }

    /// Looks up a key (active first, then retired) by its identifier.
    #[must_use]
    pub fn find(&self, id: &[u8]) -> Option<&SessionKey> {
        std::iter::once(&self.active)
            .chain(self.retired.iter())
            .find(|key| key.id[..] == *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX_KEY: &str = "faba0c08be7474a785b272c4f4154c998c0943b51e662637be11b1a0ecda43b3";

    #[test]
    fn parses_valid_hex_key() {
        let key = SessionKey::from_hex(HEX_KEY).unwrap();
        assert_eq!(key.bytes.len(), KEY_LEN);
    }

    #[test]
    fn rejects_short_key() {
        let err = SessionKey::from_hex("faba0c08").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("got 4 bytes"));
    }

    #[test]
    fn rejects_non_hex_key() {
        let err = SessionKey::from_hex(&"zz".repeat(32)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn key_id_is_stable_and_distinct() {
        let a = SessionKey::from_bytes([1u8; KEY_LEN]);
        let a_again = SessionKey::from_bytes([1u8; KEY_LEN]);
        let b = SessionKey::from_bytes([2u8; KEY_LEN]);
        assert_eq!(a.id(), a_again.id());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn find_covers_active_and_retired() {
        let active = SessionKey::from_bytes([1u8; KEY_LEN]);
        let retired = SessionKey::from_bytes([2u8; KEY_LEN]);
        let unknown = SessionKey::from_bytes([3u8; KEY_LEN]);
        let keys = KeySet::new(active.clone()).with_retired(retired.clone());

        assert_eq!(keys.find(&active.id()).unwrap().id(), active.id());
        assert_eq!(keys.find(&retired.id()).unwrap().id(), retired.id());
        assert!(keys.find(&unknown.id()).is_none());
    }

    #[test]
    fn debug_does_not_print_key_bytes() {
        let key = SessionKey::from_hex(HEX_KEY).unwrap();
        let rendered = format!("{key:?}");
        assert!(!rendered.contains(HEX_KEY));
    }
}
