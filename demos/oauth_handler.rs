//! Serves "Hello" behind a Google login.
//!
//! ```sh
//! CLIENT_ID=... CLIENT_SECRET=... KEY=$(openssl rand -hex 32) \
//!   REQUIRE_DOMAIN=example.com PORT=8080 cargo run --example oauth_handler
//! ```

use axum::Router;
use axum::routing::get;
use oauth_gate::{GateConfig, Plain, gate_routes};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GateConfig::from_env()?;
    let app = Router::new().route("/", get(|| async { "Hello" }));
    let gate = gate_routes(config, Plain(app))?;

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".into());
    let listener = TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, gate.into_make_service()).await?;
    Ok(())
}
