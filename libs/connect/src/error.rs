use connect_auth::AuthError;
use connect_http::HttpError;
use thiserror::Error;

/// Errors returned by [`VacasaConnect`](crate::VacasaConnect).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConnectError {
    /// Invalid construction input, such as a non-https endpoint or a config
    /// file that does not parse. Raised before any network call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transport failure or an error status from the Connect API.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The credential provider could not produce a token.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A page body is not a `{data: [...], links: {...}}` envelope.
    #[error("invalid page envelope: {0}")]
    InvalidEnvelope(String),

    /// `links.next` could not be turned into an absolute URL.
    #[error("invalid next link '{link}': {reason}")]
    InvalidNextLink { link: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConnectError {
    pub(crate) fn insecure_endpoint(endpoint: &str) -> Self {
        Self::Configuration(format!(
            "invalid endpoint '{endpoint}': `endpoint` scheme must be https"
        ))
    }

    /// HTTP status of the failed response, if the error carries one.
    #[must_use]
    pub fn status(&self) -> Option<http::StatusCode> {
        match self {
            Self::Http(e) => e.status(),
            _ => None,
        }
    }
}
