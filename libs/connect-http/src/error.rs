use thiserror::Error;

/// Why a request URL was rejected before sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidUriKind {
    ParseError,
    /// No host, e.g. a bare path such as `/v1/units`
    MissingAuthority,
    MissingScheme,
}

/// Failures of the Connect transport.
///
/// A response with a non-2xx status only becomes an error once the caller
/// checks it (see [`HttpResponse::checked`](crate::HttpResponse::checked)).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    #[error("cannot build request: {0}")]
    RequestBuild(#[from] http::Error),

    #[error("bad header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    #[error("bad header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// One attempt ran past `request_timeout`
    #[error("attempt timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Connection-level failure, retried for every method
    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("tls setup failed: {0}")]
    Tls(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("response body of {actual} bytes exceeds the {limit} byte limit")]
    BodyTooLarge { limit: usize, actual: usize },

    /// Final non-2xx response, after any retries
    #[error("HTTP {status}: {body_preview}")]
    HttpStatus {
        status: http::StatusCode,
        body_preview: String,
        content_type: Option<String>,
    },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("urlencoding: {0}")]
    FormEncode(#[from] serde_urlencoded::ser::Error),

    /// `max_concurrent_requests` reached
    #[error("too many requests in flight")]
    Overloaded,

    /// The buffer worker behind the client is gone
    #[error("http client is shut down")]
    ServiceClosed,

    /// `reason` is for logs; match on `kind`.
    #[error("invalid url '{url}': {reason}")]
    InvalidUri {
        url: String,
        kind: InvalidUriKind,
        reason: String,
    },

    #[error("scheme '{scheme}' rejected: {reason}")]
    InvalidScheme { scheme: String, reason: String },
}

impl HttpError {
    /// HTTP status of a [`HttpError::HttpStatus`] error
    #[must_use]
    pub fn status(&self) -> Option<http::StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<hyper::Error> for HttpError {
    fn from(err: hyper::Error) -> Self {
        HttpError::Transport(Box::new(err))
    }
}

impl From<hyper_util::client::legacy::Error> for HttpError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        HttpError::Transport(Box::new(err))
    }
}
