#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Startup configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),
    /// A provider endpoint answered with an error status or an incomplete body.
    #[error("OAuth2 {operation} failed (status {status:?}): {detail}")]
    OAuth {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },
    /// Transport failure or undecodable response from a provider endpoint.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// A session record could not be sealed, or an authenticated cookie
    /// payload did not hold a session record.
    #[error("Session error: {0}")]
    Session(String),
}
