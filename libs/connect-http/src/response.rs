use crate::error::HttpError;
use crate::security::{ERROR_BODY_PREVIEW_LIMIT, body_preview};
use bytes::Bytes;
use http::{HeaderMap, Response, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;

/// Response body after the decompression layer
pub type ResponseBody =
    http_body_util::combinators::BoxBody<Bytes, Box<dyn std::error::Error + Send + Sync>>;

/// A response whose status has not been checked yet.
///
/// [`checked`](Self::checked), [`checked_bytes`](Self::checked_bytes) and
/// [`json`](Self::json) turn a non-2xx status into
/// [`HttpError::HttpStatus`]. Before doing so they log the error body:
/// `info` for 4xx and `error` for 5xx.
#[derive(Debug)]
pub struct HttpResponse {
    pub(crate) inner: Response<ResponseBody>,
    pub(crate) max_body_size: usize,
}

impl HttpResponse {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Pass a 2xx response through untouched; drain and log anything else.
    ///
    /// # Errors
    /// [`HttpError::HttpStatus`] for a non-2xx status.
    pub async fn checked(self) -> Result<Self, HttpError> {
        if self.inner.status().is_success() {
            Ok(self)
        } else {
            Err(status_error(self.inner, self.max_body_size).await)
        }
    }

    /// # Errors
    /// [`HttpError::HttpStatus`] for a non-2xx status, or
    /// [`HttpError::BodyTooLarge`].
    pub async fn checked_bytes(self) -> Result<Bytes, HttpError> {
        read_checked(self.inner, self.max_body_size).await
    }

    /// # Errors
    /// As [`checked_bytes`](Self::checked_bytes), plus [`HttpError::Json`]
    /// when the body does not decode into `T`.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, HttpError> {
        let bytes = read_checked(self.inner, self.max_body_size).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(http::header::CONTENT_TYPE)?
        .to_str()
        .ok()
        .map(str::to_owned)
}

async fn status_error(response: Response<ResponseBody>, max_body_size: usize) -> HttpError {
    let status = response.status();
    let content_type = content_type(response.headers());

    let limit = max_body_size.min(ERROR_BODY_PREVIEW_LIMIT);
    let preview = match read_limited(response, limit).await {
        Ok(bytes) => body_preview(&bytes, limit),
        Err(HttpError::BodyTooLarge { .. }) => "<error body over preview limit>".to_owned(),
        Err(e) => return e,
    };

    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), body = %preview, "Connect server error");
    } else {
        tracing::info!(status = status.as_u16(), body = %preview, "Connect rejected the request");
    }

    HttpError::HttpStatus {
        status,
        body_preview: preview,
        content_type,
    }
}

async fn read_checked(
    response: Response<ResponseBody>,
    max_body_size: usize,
) -> Result<Bytes, HttpError> {
    if response.status().is_success() {
        read_limited(response, max_body_size).await
    } else {
        Err(status_error(response, max_body_size).await)
    }
}

/// Collect the body, giving up as soon as it grows past `limit` bytes.
async fn read_limited(
    response: Response<ResponseBody>,
    limit: usize,
) -> Result<Bytes, HttpError> {
    let mut body = std::pin::pin!(response.into_body());
    let mut buf = Vec::new();

    while let Some(frame) = body.frame().await {
        let Ok(data) = frame.map_err(HttpError::Transport)?.into_data() else {
            continue;
        };
        let actual = buf.len() + data.len();
        if actual > limit {
            return Err(HttpError::BodyTooLarge { limit, actual });
        }
        buf.extend_from_slice(&data);
    }

    Ok(Bytes::from(buf))
}
