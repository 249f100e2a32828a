//! OAuth2 login gate for Axum.
//!
//! Wraps a protected application so that every request is either already
//! authenticated, redirected to the identity provider, or completing the
//! provider's callback. Login state lives entirely in one sealed cookie.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use oauth_gate::middleware::{GateConfig, Plain, gate_routes};
//!
//! // 1. Configure from environment (CLIENT_ID, CLIENT_SECRET, KEY, ...)
//! let config = GateConfig::from_env()?;
//!
//! // 2. Wrap the application router
//! let app = axum::Router::new().route("/", get(index));
//! let gated = gate_routes(config, Plain(app))?;
//!
//! // 3. Serve
//! axum::serve(listener, gated).await?;
//! ```

mod config;
mod error;
mod gate;
mod state;
mod traits;

pub use config::{DEFAULT_REQUEST_TIMEOUT, GateConfig};
pub use error::GateError;
pub use gate::{CALLBACK_PATH, Phase, classify, gate_routes};
pub use traits::{Plain, ProtectedHandler, WithClient};
