//! Serves "Hello" behind HTTP Basic authentication (user `foo`, password `bar`).

use axum::Router;
use axum::routing::get;
use oauth_gate::{BasicAuth, wrap_auth};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let auth = BasicAuth::new().with_principal("foo", "bar");
    let app = wrap_auth(Router::new().route("/", get(|| async { "Hello" })), auth);

    let listener = TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
