use std::time::Duration as StdDuration;

use url::Url;

use crate::codec::SessionCodec;
use crate::error::Error;
use crate::keys::{KeySet, SessionKey};
use crate::oauth::OAuthConfig;

/// Timeout applied to each outbound provider call.
pub const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Gate configuration, built once at startup and never mutated.
///
/// Required fields (client credentials, session key) are constructor
/// parameters. Everything else has a default and a `with_*` override.
///
/// Use [`from_env()`](GateConfig::from_env) for convention-based setup,
/// or [`new()`](GateConfig::new) with `with_*` methods for full control.
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub(super) oauth: OAuthConfig,
    pub(super) codec: SessionCodec,
    pub(super) require_domain: Option<String>,
    pub(super) request_timeout: StdDuration,
}

impl GateConfig {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        key: SessionKey,
    ) -> Self {
        Self {
            oauth: OAuthConfig::new(client_id, client_secret),
            codec: SessionCodec::new(KeySet::new(key)),
            require_domain: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `CLIENT_ID`: OAuth2 client ID
    /// - `CLIENT_SECRET`: OAuth2 client secret
    /// - `KEY`: 64-character hex session key
    ///
    /// # Optional env vars
    /// - `RETIRED_KEYS`: Comma-separated hex keys still accepted for decoding
    /// - `REQUIRE_DOMAIN`: Only admit accounts whose email is in this domain
    /// - `COOKIE_NAME`, `COOKIE_PATH`, `COOKIE_DOMAIN`: Session cookie scope
    /// - `COOKIE_MAX_AGE_SECS`: Session cookie lifetime in seconds
    /// - `OAUTH_SCOPES`: Comma-separated OAuth2 scopes
    /// - `OAUTH_AUTH_URL`, `OAUTH_TOKEN_URL`, `OAUTH_PROFILE_URL`: Endpoint overrides
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or any
    /// value is malformed.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let required = |name: &str| {
            var(name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| Error::Config(format!("{name} is required")))
        };
        let client_id = required("CLIENT_ID")?;
        let client_secret = required("CLIENT_SECRET")?;
        let key = required("KEY")?;
        let key = SessionKey::from_hex(&key).map_err(|e| Error::Config(format!("KEY: {e}")))?;

        let mut config = Self::new(client_id, client_secret, key);

        if let Some(retired) = var("RETIRED_KEYS") {
            for hex_key in retired.split(',').map(str::trim).filter(|k| !k.is_empty()) {
                let key = SessionKey::from_hex(hex_key)
                    .map_err(|e| Error::Config(format!("RETIRED_KEYS: {e}")))?;
                config = config.with_retired_key(key);
            }
        }
        if let Some(domain) = var("REQUIRE_DOMAIN") {
            config = config.with_require_domain(domain);
        }
        if let Some(name) = var("COOKIE_NAME") {
            config = config.with_cookie_name(name);
        }
        if let Some(path) = var("COOKIE_PATH") {
            config = config.with_cookie_path(path);
        }
        if let Some(domain) = var("COOKIE_DOMAIN") {
            config = config.with_cookie_domain(domain);
        }
        if let Some(secs) = var("COOKIE_MAX_AGE_SECS") {
            let secs: i64 = secs
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("COOKIE_MAX_AGE_SECS: {e}")))?;
            if secs <= 0 {
                return Err(Error::Config(format!(
                    "COOKIE_MAX_AGE_SECS must be positive, got {secs}"
                )));
            }
            config = config.with_cookie_max_age(time::Duration::seconds(secs));
        }
        if let Some(scopes) = var("OAUTH_SCOPES") {
            config = config.with_scopes(
                scopes
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }
        if let Some(url) = var("OAUTH_AUTH_URL") {
            config = config.with_auth_url(parse_url("OAUTH_AUTH_URL", &url)?);
        }
        if let Some(url) = var("OAUTH_TOKEN_URL") {
            config = config.with_token_url(parse_url("OAUTH_TOKEN_URL", &url)?);
        }
        if let Some(url) = var("OAUTH_PROFILE_URL") {
            config = config.with_profile_url(parse_url("OAUTH_PROFILE_URL", &url)?);
        }

        Ok(config)
    }

    /// Only admit users whose email is in `domain`. Empty means unrestricted.
    #[must_use]
    pub fn with_require_domain(mut self, domain: impl Into<String>) -> Self {
        let domain = domain.into();
        self.require_domain = (!domain.is_empty()).then_some(domain);
        self
    }

    #[must_use]
    pub fn with_retired_key(mut self, key: SessionKey) -> Self {
        let keys = self.codec.keys().clone().with_retired(key);
        self.codec = self.codec.with_keys(keys);
        self
    }

    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.codec = self.codec.with_name(name);
        self
    }

    #[must_use]
    pub fn with_cookie_path(mut self, path: impl Into<String>) -> Self {
        self.codec = self.codec.with_path(path);
        self
    }

    #[must_use]
    pub fn with_cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.codec = self.codec.with_domain(domain);
        self
    }

    /// Session cookie lifetime. Non-positive values are ignored.
    #[must_use]
    pub fn with_cookie_max_age(mut self, max_age: time::Duration) -> Self {
        self.codec = self.codec.with_max_age(max_age);
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.codec = self.codec.with_secure(secure);
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.oauth = self.oauth.with_scopes(scopes);
        self
    }

    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.oauth = self.oauth.with_auth_url(url);
        self
    }

    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.oauth = self.oauth.with_token_url(url);
        self
    }

    #[must_use]
    pub fn with_profile_url(mut self, url: Url) -> Self {
        self.oauth = self.oauth.with_profile_url(url);
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: StdDuration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Codec for the session cookie this gate reads and writes.
    #[must_use]
    pub fn codec(&self) -> &SessionCodec {
        &self.codec
    }

    #[must_use]
    pub fn oauth(&self) -> &OAuthConfig {
        &self.oauth
    }

    #[must_use]
    pub fn require_domain(&self) -> Option<&str> {
        self.require_domain.as_deref()
    }
}

fn parse_url(var: &str, value: &str) -> Result<Url, Error> {
    value
        .parse()
        .map_err(|e| Error::Config(format!("{var}: {e}")))
}
