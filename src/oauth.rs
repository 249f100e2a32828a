use reqwest::{IntoUrl, Method, RequestBuilder};
use serde::Deserialize;
use time::OffsetDateTime;
use url::Url;

use crate::error::Error;
use crate::session::Token;

/// Scopes requested when none are configured.
pub const DEFAULT_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_PROFILE_URL: &str = "https://www.googleapis.com/oauth2/v1/userinfo";

/// `OAuth2` client registration and provider endpoints.
///
/// Defaults target Google. The redirect URI is not part of the config: it is
/// derived per request from the `Host` the browser used.
///
/// ```rust,ignore
/// use oauth_gate::OAuthConfig;
///
/// let config = OAuthConfig::new("client-id", "client-secret")
///     .with_scopes(vec!["openid".into(), "email".into()]);
/// ```
#[derive(Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) profile_url: Url,
    pub(crate) scopes: Vec<String>,
}

impl OAuthConfig {
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: GOOGLE_AUTH_URL.parse().expect("valid default URL"),
            token_url: GOOGLE_TOKEN_URL.parse().expect("valid default URL"),
            profile_url: GOOGLE_PROFILE_URL.parse().expect("valid default URL"),
            scopes: default_scopes(),
        }
    }

    /// Override the authorization endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Override the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Override the profile (userinfo) endpoint.
    #[must_use]
    pub fn with_profile_url(mut self, url: Url) -> Self {
        self.profile_url = url;
        self
    }

    /// Override the requested scopes. An empty list restores [`DEFAULT_SCOPES`].
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = if scopes.is_empty() {
            default_scopes()
        } else {
            scopes
        };
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    #[must_use]
    pub fn profile_url(&self) -> &Url {
        &self.profile_url
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("auth_url", &self.auth_url.as_str())
            .field("token_url", &self.token_url.as_str())
            .field("profile_url", &self.profile_url.as_str())
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect()
}

/// Raw token endpoint response.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_token(self, now: OffsetDateTime) -> Token {
        Token {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".into()),
            refresh_token: self.refresh_token,
            expiry: self
                .expires_in
                .filter(|secs| *secs > 0)
                .and_then(|secs| OffsetDateTime::from_unix_timestamp(now.unix_timestamp() + secs).ok()),
        }
    }
}

/// `OAuth2` authorization-code client for the configured provider.
#[derive(Clone)]
pub struct AuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl AuthClient {
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for timeouts, connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the provider authorization URL for one login attempt.
    #[must_use]
    pub fn authorization_url(&self, redirect_uri: &Url, state: &str) -> Url {
        let scope = self.config.scopes.join(" ");

        let mut url = self.config.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", redirect_uri.as_str())
            .append_pair("scope", &scope)
            .append_pair("state", state);
        url
    }

    /// Exchange an authorization code for a token. Single attempt, no retry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure or an undecodable body, or
    /// [`Error::OAuth`] if the token endpoint answers with an error status or
    /// omits the access token.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &Url) -> Result<Token, Error> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(self.config.token_url.clone())
            .form(&params)
            .send()
            .await?;

        let response = ensure_success(response, "token exchange").await?;
        let token_response = response.json::<TokenResponse>().await?;
        if token_response.access_token.is_empty() {
            return Err(Error::OAuth {
                operation: "token exchange",
                status: None,
                detail: "response missing access_token".into(),
            });
        }
        Ok(token_response.into_token(OffsetDateTime::now_utc()))
    }

    /// Bearer-authenticated client sharing this client's connection pool.
    #[must_use]
    pub fn client(&self, token: Token) -> AuthenticatedClient {
        AuthenticatedClient {
            http: self.http.clone(),
            token,
        }
    }
}

/// HTTP client that attaches the user's access token to every request.
///
/// Handed to the protected handler for authenticated requests.
#[derive(Clone)]
pub struct AuthenticatedClient {
    http: reqwest::Client,
    token: Token,
}

impl AuthenticatedClient {
    #[must_use]
    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn get(&self, url: impl IntoUrl) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: impl IntoUrl) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    pub fn request(&self, method: Method, url: impl IntoUrl) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token.access_token)
    }
}

impl std::fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// Checks HTTP response status; returns the response on success or an error with details.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, Error> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(Error::OAuth {
        operation,
        status: Some(status),
        detail: body,
    })
}
