use std::convert::Infallible;
use std::future::Future;

use axum::extract::Request;
use axum::response::Response;
use tower::{Service, ServiceExt};

use crate::oauth::AuthenticatedClient;

/// The protected application behind the gate.
///
/// Called exactly once per authenticated request, with the user's
/// bearer-authenticated client passed alongside the request.
///
/// Two adapters cover the usual shapes: [`Plain`] wraps any axum service
/// (typically a [`Router`](axum::Router)) that has no use for the client,
/// and [`WithClient`] wraps an async function that receives it.
///
/// # Example
///
/// ```rust,ignore
/// let gate = gate_routes(config, WithClient(|_req, client: AuthenticatedClient| async move {
///     let profile = client.get("https://www.googleapis.com/oauth2/v1/userinfo").send().await;
///     // ...
/// }))?;
/// ```
pub trait ProtectedHandler: Send + Sync + 'static {
    fn handle(
        &self,
        request: Request,
        client: AuthenticatedClient,
    ) -> impl Future<Output = Response> + Send;
}

/// Adapter for a downstream service that ignores the authenticated client.
#[derive(Debug, Clone)]
pub struct Plain<S>(pub S);

impl<S> ProtectedHandler for Plain<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Future: Send,
{
    fn handle(
        &self,
        request: Request,
        _client: AuthenticatedClient,
    ) -> impl Future<Output = Response> + Send {
        let service = self.0.clone();
        async move {
            match service.oneshot(request).await {
                Ok(response) => response,
                Err(never) => match never {},
            }
        }
    }
}

/// Adapter for an async function that wants the authenticated client.
#[derive(Debug, Clone)]
pub struct WithClient<F>(pub F);

impl<F, Fut> ProtectedHandler for WithClient<F>
where
    F: Fn(Request, AuthenticatedClient) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send,
{
    fn handle(
        &self,
        request: Request,
        client: AuthenticatedClient,
    ) -> impl Future<Output = Response> + Send {
        (self.0)(request, client)
    }
}
