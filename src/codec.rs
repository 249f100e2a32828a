//! Sealing [`Session`] records into cookie values.
//!
//! A sealed value is `base64url(key_id || nonce || AES-256-GCM(payload))`,
//! where the payload is the JSON-encoded session plus the unix time it was
//! sealed at. The cookie name is bound as associated data, so a value only
//! opens under the name it was written for.
//!
//! Opening never fails on attacker-controlled input: bad encoding, unknown
//! key ids, failed authentication and expired timestamps all read as "no
//! session". The only error is an authenticated payload that is not a
//! session record, which can only come from a holder of the key.

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::Nonce;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::Error;
use crate::keys::{KEY_ID_LEN, KeySet};
use crate::session::Session;

/// Cookie name used when none is configured.
pub const DEFAULT_COOKIE_NAME: &str = "googlegoauth";

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Serialize)]
struct SealedRef<'a> {
    issued_at: i64,
    session: &'a Session,
}

#[derive(Deserialize)]
struct Sealed {
    issued_at: i64,
    session: Session,
}

/// Encodes, decodes and deletes the session cookie.
#[derive(Debug, Clone)]
pub struct SessionCodec {
    name: String,
    path: String,
    domain: Option<String>,
    max_age: Option<Duration>,
    secure: bool,
    keys: KeySet,
}

impl SessionCodec {
    /// Codec with the default cookie name, path `/`, no domain, no max-age
    /// (browser-session cookie) and secure cookies.
    #[must_use]
    pub fn new(keys: KeySet) -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.into(),
            path: "/".into(),
            domain: None,
            max_age: None,
            secure: true,
            keys,
        }
    }

    /// Empty names fall back to [`DEFAULT_COOKIE_NAME`].
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = if name.is_empty() {
            DEFAULT_COOKIE_NAME.into()
        } else {
            name
        };
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        let domain = domain.into();
        self.domain = (!domain.is_empty()).then_some(domain);
        self
    }

    /// Lifetime of the cookie, also enforced against the sealed timestamp.
    ///
    /// A zero or negative lifetime would expire every cookie as it is
    /// issued, so it is ignored and the cookie stays a browser-session cookie.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        if max_age.is_positive() {
            self.max_age = Some(max_age);
        } else {
            tracing::warn!(
                seconds = max_age.whole_seconds(),
                "Ignoring non-positive cookie max-age"
            );
            self.max_age = None;
        }
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_keys(mut self, keys: KeySet) -> Self {
        self.keys = keys;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    #[must_use]
    pub fn keys(&self) -> &KeySet {
        &self.keys
    }

    /// Reads the session cookie from `jar`.
    ///
    /// A missing cookie and any unreadable or expired cookie both yield
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Session`] if the cookie authenticates but its payload
    /// is not a session record.
    pub fn decode(&self, jar: &CookieJar) -> Result<Option<Session>, Error> {
        match jar.get(&self.name) {
            Some(cookie) => self.open(cookie.value(), OffsetDateTime::now_utc()),
            None => Ok(None),
        }
    }

    /// Seals `session` into a fresh cookie with the configured scope and
    /// max-age.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Session`] if the record cannot be serialized or
    /// encrypted.
    pub fn encode(&self, session: &Session) -> Result<Cookie<'static>, Error> {
        let value = self.seal(session, OffsetDateTime::now_utc())?;
        let mut cookie = self.cookie(value);
        if let Some(max_age) = self.max_age {
            cookie.set_max_age(max_age);
        }
        Ok(cookie)
    }

    /// Cookie that makes the browser discard the session (`Max-Age=-1`).
    #[must_use]
    pub fn delete(&self) -> Cookie<'static> {
        let mut cookie = self.cookie(String::new());
        cookie.set_max_age(Duration::seconds(-1));
        cookie
    }

    fn cookie(&self, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::build((self.name.clone(), value))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path(self.path.clone())
            .build();
        if let Some(domain) = &self.domain {
            cookie.set_domain(domain.clone());
        }
        cookie
    }

    pub(crate) fn seal(&self, session: &Session, now: OffsetDateTime) -> Result<String, Error> {
        let plaintext = serde_json::to_vec(&SealedRef {
            issued_at: now.unix_timestamp(),
            session,
        })
        .map_err(|e| Error::Session(format!("serialize: {e}")))?;

        let key = self.keys.active();
        let nonce_bytes: [u8; NONCE_LEN] = rand::rng().random();
        let ciphertext = key
            .cipher()
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: &plaintext,
                    aad: self.name.as_bytes(),
                },
            )
            .map_err(|e| Error::Session(format!("encrypt: {e}")))?;

        let mut sealed = Vec::with_capacity(KEY_ID_LEN + NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&key.id());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    pub(crate) fn open(&self, value: &str, now: OffsetDateTime) -> Result<Option<Session>, Error> {
        let Ok(sealed) = URL_SAFE_NO_PAD.decode(value) else {
            tracing::debug!(cookie = %self.name, "Session cookie is not base64");
            return Ok(None);
        };
        if sealed.len() < KEY_ID_LEN + NONCE_LEN + TAG_LEN {
            tracing::debug!(cookie = %self.name, "Session cookie too short");
            return Ok(None);
        }

        let (key_id, rest) = sealed.split_at(KEY_ID_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        let Some(key) = self.keys.find(key_id) else {
            tracing::debug!(cookie = %self.name, "Session cookie sealed with unknown key");
            return Ok(None);
        };

        let Ok(plaintext) = key.cipher().decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: self.name.as_bytes(),
            },
        ) else {
            tracing::debug!(cookie = %self.name, "Session cookie failed authentication");
            return Ok(None);
        };

        let sealed: Sealed = serde_json::from_slice(&plaintext)
            .map_err(|e| Error::Session(format!("deserialize: {e}")))?;

        if let Some(max_age) = self.max_age {
            let age = now.unix_timestamp() - sealed.issued_at;
            if age > max_age.whole_seconds() {
                tracing::debug!(cookie = %self.name, age, "Session cookie expired");
                return Ok(None);
            }
        }

        Ok(Some(sealed.session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::SessionKey;
    use crate::session::Token;

    fn codec() -> SessionCodec {
        SessionCodec::new(KeySet::new(SessionKey::from_bytes([7u8; 32])))
    }

    fn jar_with(name: &str, value: String) -> CookieJar {
        CookieJar::new().add(Cookie::new(name.to_string(), value))
    }

    #[test]
    fn token_session_survives_encode_decode() {
        let codec = codec();
        let mut token = Token::bearer("ya29.token");
        token.refresh_token = Some("1//refresh".into());
        token.expiry = OffsetDateTime::from_unix_timestamp(1_900_000_000).ok();
        let session = Session::authenticated(token);

        let cookie = codec.encode(&session).unwrap();
        let decoded = codec
            .decode(&jar_with(codec.name(), cookie.value().to_string()))
            .unwrap();

        assert_eq!(decoded, Some(session));
    }

    #[test]
    fn missing_cookie_is_absent() {
        assert_eq!(codec().decode(&CookieJar::new()).unwrap(), None);
    }

    #[test]
    fn every_flipped_bit_is_rejected() {
        let codec = codec();
        let session = Session::authenticated(Token::bearer("tok"));
        let value = codec.seal(&session, OffsetDateTime::now_utc()).unwrap();
        let raw = URL_SAFE_NO_PAD.decode(&value).unwrap();

        for byte in 0..raw.len() {
            for bit in 0..8 {
                let mut tampered = raw.clone();
                tampered[byte] ^= 1 << bit;
                let opened = codec
                    .open(&URL_SAFE_NO_PAD.encode(&tampered), OffsetDateTime::now_utc())
                    .unwrap();
                assert_eq!(opened, None, "flip at byte {byte} bit {bit} was accepted");
            }
        }
    }

    #[test]
    fn garbage_values_are_absent() {
        let codec = codec();
        let now = OffsetDateTime::now_utc();
        assert_eq!(codec.open("not base64 !!", now).unwrap(), None);
        assert_eq!(codec.open("", now).unwrap(), None);
        assert_eq!(codec.open("AAAA", now).unwrap(), None);
    }

    #[test]
    fn value_is_bound_to_cookie_name() {
        let codec = codec();
        let value = codec
            .seal(&Session::pending("https://a/", "s"), OffsetDateTime::now_utc())
            .unwrap();
        let renamed = codec.clone().with_name("other");
        assert_eq!(renamed.open(&value, OffsetDateTime::now_utc()).unwrap(), None);
    }

    #[test]
    fn retired_key_still_opens() {
        let old = SessionKey::from_bytes([1u8; 32]);
        let new = SessionKey::from_bytes([2u8; 32]);
        let before = SessionCodec::new(KeySet::new(old.clone()));
        let after = SessionCodec::new(KeySet::new(new).with_retired(old));

        let session = Session::pending("https://example.com/", "abc");
        let value = before.seal(&session, OffsetDateTime::now_utc()).unwrap();

        assert_eq!(
            after.open(&value, OffsetDateTime::now_utc()).unwrap(),
            Some(session)
        );
    }

    #[test]
    fn unknown_key_is_absent() {
        let sealed_by = SessionCodec::new(KeySet::new(SessionKey::from_bytes([1u8; 32])));
        let opened_by = SessionCodec::new(KeySet::new(SessionKey::from_bytes([2u8; 32])));
        let value = sealed_by
            .seal(&Session::authenticated(Token::bearer("tok")), OffsetDateTime::now_utc())
            .unwrap();
        assert_eq!(opened_by.open(&value, OffsetDateTime::now_utc()).unwrap(), None);
    }

    #[test]
    fn expired_cookie_is_absent() {
        let codec = codec().with_max_age(Duration::hours(1));
        let issued = OffsetDateTime::now_utc() - Duration::hours(2);
        let value = codec
            .seal(&Session::authenticated(Token::bearer("tok")), issued)
            .unwrap();

        assert_eq!(codec.open(&value, OffsetDateTime::now_utc()).unwrap(), None);
        assert!(
            codec
                .open(&value, issued + Duration::minutes(30))
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn authenticated_non_session_payload_is_an_error() {
        let codec = codec();
        let key = codec.keys().active();
        let nonce = [0u8; NONCE_LEN];
        let ciphertext = key
            .cipher()
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: b"[1, 2, 3]",
                    aad: codec.name().as_bytes(),
                },
            )
            .unwrap();
        let mut raw = key.id().to_vec();
        raw.extend_from_slice(&nonce);
        raw.extend_from_slice(&ciphertext);

        let result = codec.open(&URL_SAFE_NO_PAD.encode(raw), OffsetDateTime::now_utc());
        assert!(matches!(result, Err(Error::Session(_))));
    }

    #[test]
    fn encoded_cookie_carries_scope() {
        let codec = codec()
            .with_name("gate")
            .with_path("/app")
            .with_domain("example.com")
            .with_max_age(Duration::days(1));
        let cookie = codec.encode(&Session::default()).unwrap();

        assert_eq!(cookie.name(), "gate");
        assert_eq!(cookie.path(), Some("/app"));
        assert_eq!(cookie.domain(), Some("example.com"));
        assert_eq!(cookie.max_age(), Some(Duration::days(1)));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn non_positive_max_age_is_ignored() {
        let codec = codec().with_max_age(Duration::seconds(-60));
        assert!(codec.max_age().is_none());
        let codec = codec.with_max_age(Duration::ZERO);
        assert!(codec.max_age().is_none());

        let session = Session::authenticated(Token::bearer("tok"));
        let cookie = codec.encode(&session).unwrap();
        assert!(cookie.max_age().is_none());
        assert_eq!(
            codec.open(cookie.value(), OffsetDateTime::now_utc()).unwrap(),
            Some(session)
        );
    }

    #[test]
    fn delete_cookie_has_negative_max_age() {
        let cookie = codec().with_path("/app").delete();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.path(), Some("/app"));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(-1)));
        assert!(cookie.to_string().contains("Max-Age=-1"));
    }

    #[test]
    fn empty_name_falls_back_to_default() {
        assert_eq!(codec().with_name("").name(), DEFAULT_COOKIE_NAME);
    }
}
