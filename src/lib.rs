#![doc = include_str!("../README.md")]

pub mod basic;
pub mod codec;
pub mod csrf;
pub mod domain;
pub mod error;
pub mod keys;
pub mod middleware;
pub mod oauth;
pub mod session;

// Re-exports for convenient access
pub use basic::{AnyOrNoAuth, Authenticator, BasicAuth, require_auth, wrap_auth};
pub use codec::SessionCodec;
pub use csrf::generate_state;
pub use domain::{Profile, domain_allowed, email_in_domain};
pub use error::Error;
pub use keys::{KeySet, SessionKey};
pub use middleware::{GateConfig, GateError, Plain, ProtectedHandler, WithClient, gate_routes};
pub use oauth::{AuthClient, AuthenticatedClient, OAuthConfig, TokenResponse};
pub use session::{Session, Token};
