use crate::codec::SessionCodec;
use crate::oauth::AuthClient;

/// Shared, read-only state behind every gated request.
pub(super) struct GateState<H> {
    pub(super) client: AuthClient,
    pub(super) codec: SessionCodec,
    pub(super) require_domain: Option<String>,
    pub(super) handler: H,
}
