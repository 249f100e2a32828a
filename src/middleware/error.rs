use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Outcomes that stop a request at the gate.
///
/// Bodies are deliberately generic: provider messages and decode details
/// are logged, never sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// State mismatch, failed code exchange or failed domain check.
    #[error("access forbidden")]
    Forbidden,

    /// Unreadable session or a request the gate cannot redirect.
    #[error("internal error")]
    Internal,
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Forbidden => StatusCode::UNAUTHORIZED,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_is_401() {
        let response = GateError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn internal_is_500() {
        let response = GateError::Internal.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
