//! The client-held authentication record.
//!
//! A [`Session`] is never stored server-side. It travels inside the sealed
//! session cookie and is rebuilt whole on every transition: either it carries
//! a provider [`Token`] (an active login) or the `next_url` + `state` pair of
//! an outstanding redirect flow.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Delegated access credential issued by the identity provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub expiry: Option<OffsetDateTime>,
}

fn default_token_type() -> String {
    "Bearer".into()
}

impl Token {
    /// Create a bearer token with no refresh token or expiry.
    #[must_use]
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            refresh_token: None,
            expiry: None,
        }
    }

    /// Returns true once the provider-reported expiry has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expiry
            .is_some_and(|expiry| expiry <= OffsetDateTime::now_utc())
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Authentication state carried across the redirect sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<Token>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<String>,
}

impl Session {
    /// A completed login holding only the provider token.
    #[must_use]
    pub fn authenticated(token: Token) -> Self {
        Self {
            token: Some(token),
            next_url: None,
            state: None,
        }
    }

    /// An outstanding redirect flow: where to resume, and the nonce the
    /// callback must echo back.
    #[must_use]
    pub fn pending(next_url: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            token: None,
            next_url: Some(next_url.into()),
            state: Some(state.into()),
        }
    }

    /// The token, if it is present and non-empty.
    #[must_use]
    pub fn token(&self) -> Option<&Token> {
        self.token
            .as_ref()
            .filter(|token| !token.access_token.is_empty())
    }

    /// URL to resume after login. Ignored once a token is present.
    #[must_use]
    pub fn next_url(&self) -> Option<&str> {
        self.next_url.as_deref()
    }

    /// CSRF nonce of the outstanding flow. Ignored once a token is present.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.is_authenticated() && self.next_url.is_some() && self.state.is_some()
    }
}
