use thiserror::Error;

/// Errors raised while obtaining or validating credentials.
///
/// None of the variants carry secret material: HTTP failures are rendered by
/// [`format_http_error`](crate::http_error::format_http_error), which keeps
/// only the status.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The auth response lacks `access_token` or `refresh_token`.
    #[error("{0} not found")]
    MissingToken(&'static str),

    /// The auth or token endpoint answered with something unusable.
    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    /// Transport or status failure talking to the auth server.
    #[error("{0}")]
    Http(String),

    /// The JWT failed signature or claim validation.
    #[error("JWT validation failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// The discovery document is missing a field or lists no usable algorithm.
    #[error("OIDC discovery failed: {0}")]
    Discovery(String),

    /// No key in the JWKS can verify the token.
    #[error("JWKS error: {0}")]
    Jwks(String),

    /// The provider was built with invalid settings.
    #[error("credential config error: {0}")]
    Configuration(String),
}

impl AuthError {
    pub(crate) fn http(e: &connect_http::HttpError, context: &str) -> Self {
        Self::Http(crate::http_error::format_http_error(e, context))
    }

    /// Map a failure while reading a response body: a body that does not
    /// parse is an invalid response, anything else stays an HTTP failure.
    pub(crate) fn body(e: &connect_http::HttpError, context: &str) -> Self {
        match e {
            connect_http::HttpError::Json(_) => {
                Self::InvalidResponse(crate::http_error::format_http_error(e, context))
            }
            _ => Self::http(e, context),
        }
    }
}
