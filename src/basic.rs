//! Static request authenticators.
//!
//! Lighter-weight alternatives to the OAuth gate for services that only need
//! a fixed credential check: [`AnyOrNoAuth`] admits everything and
//! [`BasicAuth`] checks HTTP Basic credentials against a principal table.
//! [`require_auth`] turns either into an axum middleware.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use subtle::ConstantTimeEq;

/// Decides whether a request may proceed.
pub trait Authenticator: Send + Sync + 'static {
    fn authenticate(&self, request: &Request) -> bool;
}

/// Admits every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyOrNoAuth;

impl Authenticator for AnyOrNoAuth {
    fn authenticate(&self, _request: &Request) -> bool {
        true
    }
}

/// HTTP Basic authentication against an in-memory principal table.
#[derive(Clone, Default)]
pub struct BasicAuth {
    principals: HashMap<String, String>,
}

impl BasicAuth {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a user and password.
    pub fn add_principal(&mut self, user: impl Into<String>, password: impl Into<String>) {
        self.principals.insert(user.into(), password.into());
    }

    #[must_use]
    pub fn with_principal(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.add_principal(user, password);
        self
    }

    fn credentials(request: &Request) -> Option<(String, String)> {
        let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
        let (scheme, encoded) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, password) = decoded.split_once(':')?;
        Some((user.to_string(), password.to_string()))
    }
}

impl Authenticator for BasicAuth {
    fn authenticate(&self, request: &Request) -> bool {
        let Some((user, password)) = Self::credentials(request) else {
            return false;
        };
        self.principals
            .get(&user)
            .is_some_and(|expected| bool::from(expected.as_bytes().ct_eq(password.as_bytes())))
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("principals", &self.principals.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Middleware that rejects requests the authenticator refuses with
/// `401 Unauthorized` and a Basic challenge.
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/", get(|| async { "Hello" }))
///     .layer(axum::middleware::from_fn_with_state(Arc::new(auth), require_auth::<BasicAuth>));
/// ```
pub async fn require_auth<A: Authenticator>(
    State(authenticator): State<Arc<A>>,
    request: Request,
    next: Next,
) -> Response {
    if authenticator.authenticate(&request) {
        return next.run(request).await;
    }
    tracing::debug!(path = %request.uri().path(), "Request failed authentication");
    (
        StatusCode::UNAUTHORIZED,
        [(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static("Basic realm=\"Restricted\""),
        )],
        "unauthorized",
    )
        .into_response()
}

/// Guard every route of `router` with `authenticator`.
pub fn wrap_auth<A: Authenticator>(router: Router, authenticator: A) -> Router {
    router.layer(middleware::from_fn_with_state(
        Arc::new(authenticator),
        require_auth::<A>,
    ))
}
