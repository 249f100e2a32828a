//! The per-request authorization state machine.
//!
//! Nothing about a login is stored server-side, so the phase of a request
//! is recomputed from its session cookie and path every time:
//!
//! | Phase             | Cookie holds        | Path            | Outcome                                  |
//! |-------------------|---------------------|-----------------|------------------------------------------|
//! | `Authenticated`   | token               | any             | refresh cookie, call protected handler   |
//! | `CallbackArrived` | anything else       | callback        | verify state, exchange code, 307 back    |
//! | `FlowPending`     | `next_url` + state  | other           | start a new flow (307 to provider)       |
//! | `Anonymous`       | nothing / unreadable| other           | start a new flow (307 to provider)       |
//!
//! Every request ends in exactly one of: the protected handler's response,
//! a 307 redirect, or a 401/500 that also deletes the session cookie.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, Request, State};
use axum::http::{Uri, header::HOST};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use url::Url;

use super::config::GateConfig;
use super::error::GateError;
use super::state::GateState;
use super::traits::ProtectedHandler;
use crate::csrf;
use crate::domain::domain_allowed;
use crate::error::Error;
use crate::oauth::AuthClient;
use crate::session::Session;

/// Path the provider redirects back to. Must be registered with the provider
/// as `https://<host>/oauth2callback`.
pub const CALLBACK_PATH: &str = "/oauth2callback";

/// Where a request stands in the login sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Anonymous,
    FlowPending,
    CallbackArrived,
    Authenticated,
}

/// Classifies a request from its decoded session and path.
///
/// A token wins over the callback path: a logged-in user who revisits the
/// callback URL is simply forwarded.
#[must_use]
pub fn classify(session: Option<&Session>, path: &str) -> Phase {
    match session {
        Some(session) if session.is_authenticated() => Phase::Authenticated,
        _ if path == CALLBACK_PATH => Phase::CallbackArrived,
        Some(session) if session.is_pending() => Phase::FlowPending,
        _ => Phase::Anonymous,
    }
}

/// Build the gate router: every method and path goes through the gate, and
/// only authenticated requests reach `handler`.
///
/// # Errors
///
/// Returns [`Error::Http`] if the outbound HTTP client cannot be built.
pub fn gate_routes<H: ProtectedHandler>(config: GateConfig, handler: H) -> Result<Router, Error> {
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;

    let state = GateState {
        client: AuthClient::new(config.oauth).with_http_client(http),
        codec: config.codec,
        require_domain: config.require_domain,
        handler,
    };

    Ok(Router::new().fallback(gate::<H>).with_state(Arc::new(state)))
}

async fn gate<H: ProtectedHandler>(
    State(state): State<Arc<GateState<H>>>,
    request: Request,
) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    let session = match state.codec.decode(&jar) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "Session cookie could not be decoded");
            return deny(&state, GateError::Internal);
        }
    };

    let phase = classify(session.as_ref(), request.uri().path());
    tracing::debug!(?phase, path = %request.uri().path(), "Gate classified request");

    match (phase, session) {
        (Phase::Authenticated, Some(session)) => forward(&state, session, request).await,
        (Phase::CallbackArrived, session) => {
            let params = Query::<CallbackParams>::try_from_uri(request.uri())
                .map(|Query(params)| params)
                .unwrap_or_default();
            let host = request_host(&request).map(str::to_owned);
            complete_login(&state, session, params, host).await
        }
        _ => start_login(&state, &request),
    }
}

// ── Authenticated ──────────────────────────────────────────────────

async fn forward<H: ProtectedHandler>(
    state: &GateState<H>,
    session: Session,
    request: Request,
) -> Response {
    let Some(token) = session.token().cloned() else {
        return start_login(state, &request);
    };

    // Re-sealing the same record renews its expiry.
    let refreshed = match state.codec.encode(&session) {
        Ok(cookie) => cookie,
        Err(e) => {
            tracing::error!(error = %e, "Session refresh failed");
            return deny(state, GateError::Internal);
        }
    };

    if token.is_expired() {
        tracing::debug!(path = %request.uri().path(), "Forwarding with expired provider token");
    }

    let client = state.client.client(token);
    let response = state.handler.handle(request, client).await;
    (CookieJar::new().add(refreshed), response).into_response()
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
}

async fn complete_login<H: ProtectedHandler>(
    state: &GateState<H>,
    session: Option<Session>,
    params: CallbackParams,
    host: Option<String>,
) -> Response {
    let expected = session.as_ref().and_then(Session::state);
    if !states_match(params.state.as_deref(), expected) {
        tracing::warn!(pending = expected.is_some(), "OAuth state mismatch");
        return deny(state, GateError::Forbidden);
    }

    let Some(code) = params.code.as_deref().filter(|code| !code.is_empty()) else {
        tracing::warn!("OAuth callback without code");
        return deny(state, GateError::Forbidden);
    };

    let Some(host) = host else {
        tracing::error!("Callback request has no host");
        return deny(state, GateError::Internal);
    };
    let redirect_uri = match callback_url(&host) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(error = %e, host = %host, "Cannot build redirect URI");
            return deny(state, GateError::Internal);
        }
    };

    let token = match state.client.exchange_code(code, &redirect_uri).await {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "Token exchange failed");
            return deny(state, GateError::Forbidden);
        }
    };

    if let Some(domain) = state.require_domain.as_deref() {
        let client = state.client.client(token.clone());
        if !domain_allowed(&client, state.client.config().profile_url(), domain).await {
            return deny(state, GateError::Forbidden);
        }
    }

    let next_url = session
        .as_ref()
        .and_then(Session::next_url)
        .unwrap_or("/")
        .to_string();

    let cookie = match state.codec.encode(&Session::authenticated(token)) {
        Ok(cookie) => cookie,
        Err(e) => {
            tracing::error!(error = %e, "Session encode failed");
            return deny(state, GateError::Internal);
        }
    };

    tracing::info!(next_url = %next_url, "OAuth2 login successful");
    (CookieJar::new().add(cookie), Redirect::temporary(&next_url)).into_response()
}

/// Byte-for-byte, constant-time comparison. No stored state never matches.
fn states_match(received: Option<&str>, expected: Option<&str>) -> bool {
    match (received, expected) {
        (Some(received), Some(expected)) if !expected.is_empty() => {
            received.as_bytes().ct_eq(expected.as_bytes()).into()
        }
        _ => false,
    }
}

// ── New flow ───────────────────────────────────────────────────────

fn start_login<H: ProtectedHandler>(state: &GateState<H>, request: &Request) -> Response {
    let Some(host) = request_host(request) else {
        tracing::error!("Request has no host");
        return deny(state, GateError::Internal);
    };

    let (next_url, redirect_uri) = match (resume_url(host, request.uri()), callback_url(host)) {
        (Ok(next_url), Ok(redirect_uri)) => (next_url, redirect_uri),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, host, "Cannot build login URLs");
            return deny(state, GateError::Internal);
        }
    };

    let csrf_state = csrf::generate_state();
    let cookie = match state
        .codec
        .encode(&Session::pending(next_url.as_str(), csrf_state.as_str()))
    {
        Ok(cookie) => cookie,
        Err(e) => {
            tracing::error!(error = %e, "Session encode failed");
            return deny(state, GateError::Internal);
        }
    };

    let auth_url = state.client.authorization_url(&redirect_uri, &csrf_state);
    tracing::debug!(next_url = %next_url, "Redirecting to identity provider");

    (CookieJar::new().add(cookie), Redirect::temporary(auth_url.as_str())).into_response()
}

// ── Helpers ────────────────────────────────────────────────────────

fn deny<H>(state: &GateState<H>, error: GateError) -> Response {
    (CookieJar::new().add(state.codec.delete()), error).into_response()
}

fn request_host(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))
        .filter(|host| !host.is_empty())
}

/// Canonical HTTPS URL of the requested resource.
fn resume_url(host: &str, uri: &Uri) -> Result<Url, url::ParseError> {
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    Url::parse(&format!("https://{host}{path_and_query}"))
}

fn callback_url(host: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!("https://{host}{CALLBACK_PATH}"))
}
