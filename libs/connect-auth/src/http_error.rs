use connect_http::HttpError;

/// Message for an [`AuthError::Http`](crate::AuthError::Http), prefixed
/// with the call that failed (`"signature auth"`, `"OIDC token"`, ...).
///
/// A status error keeps only its status line: the transport already logged
/// the body, and a token endpoint may echo the submitted credentials in it.
#[must_use]
pub fn format_http_error(e: &HttpError, prefix: &str) -> String {
    match e {
        HttpError::HttpStatus { status, .. } => format!("{prefix} HTTP {status}"),
        other => format!("{prefix} {other}"),
    }
}
