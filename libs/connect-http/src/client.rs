use crate::builder::HttpClientBuilder;
use crate::config::TransportSecurity;
use crate::error::HttpError;
use crate::request::RequestBuilder;
use crate::response::{HttpResponse, ResponseBody};
use bytes::Bytes;
use http::{Method, Request, Response};
use http_body_util::Full;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::task::Poll;
use tower::Service;
use tower::buffer::Buffer;

/// Boxed future returned by the service stack
pub type ServiceFuture =
    Pin<Box<dyn Future<Output = Result<Response<ResponseBody>, HttpError>> + Send>>;

/// Bounded queue in front of the service stack; cloning it is cheap
pub type BufferedService = Buffer<Request<Full<Bytes>>, ServiceFuture>;

/// HTTP client used for Connect API and token calls.
///
/// Clones share one connection pool and one request queue.
///
/// ```ignore
/// let client = HttpClient::builder().build()?;
/// let page: serde_json::Value = client
///     .get("https://connect.vacasa.com/v1/units")
///     .query(&[("page[number]", "2")])?
///     .header("authorization", "Bearer ...")
///     .send()
///     .await?
///     .json()
///     .await?;
/// ```
#[derive(Clone)]
pub struct HttpClient {
    pub(crate) service: BufferedService,
    pub(crate) max_body_size: usize,
    pub(crate) transport_security: TransportSecurity,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("max_body_size", &self.max_body_size)
            .field("transport_security", &self.transport_security)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    #[must_use]
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// `url` must be absolute; anything else fails at `send()`.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        RequestBuilder::new(
            self.service.clone(),
            self.max_body_size,
            method,
            url.to_owned(),
            self.transport_security,
        )
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Send `method url` with `headers`, the urlencoded `params` and an
    /// optional JSON `body`.
    ///
    /// The response comes back whatever its status; retries have already
    /// been spent on it when it is a retryable failure.
    ///
    /// # Errors
    /// Bad headers or URL, unencodable params or body, and transport
    /// failures or timeouts left after retries.
    pub async fn execute<Q, B>(
        &self,
        method: Method,
        url: &str,
        headers: Vec<(String, String)>,
        params: &Q,
        body: Option<&B>,
    ) -> Result<HttpResponse, HttpError>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let request = self.request(method, url).headers(headers).query(params)?;
        match body {
            Some(body) => request.json(body)?.send().await,
            None => request.send().await,
        }
    }
}

pub(crate) fn map_buffer_error(err: tower::BoxError) -> HttpError {
    err.downcast::<HttpError>().map_or_else(
        |err| {
            tracing::error!(error = %err, "http client worker is gone");
            HttpError::ServiceClosed
        },
        |e| *e,
    )
}

/// Take a queue slot without waiting; a full queue is `Overloaded`.
pub(crate) async fn try_acquire_buffer_slot(
    service: &mut BufferedService,
) -> Result<(), HttpError> {
    let ready = std::future::poll_fn(|cx| Poll::Ready(service.poll_ready(cx))).await;
    match ready {
        Poll::Ready(Ok(())) => Ok(()),
        Poll::Ready(Err(e)) => Err(map_buffer_error(e)),
        Poll::Pending => Err(HttpError::Overloaded),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::{ExponentialBackoff, RetryConfig};
    use httpmock::prelude::*;
    use serde_json::json;

    fn test_client() -> HttpClient {
        HttpClientBuilder::new()
            .allow_insecure_http()
            .retry(None)
            .build()
            .unwrap()
    }

    fn retrying_client(max_attempts: usize) -> HttpClient {
        HttpClientBuilder::new()
            .allow_insecure_http()
            .retry(Some(RetryConfig {
                max_attempts,
                backoff: ExponentialBackoff::fast(),
                ..RetryConfig::default()
            }))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_json() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(GET).path("/v1/units/42");
            then.status(200).json_body(json!({"data": {"id": 42}}));
        });

        let client = test_client();
        let url = format!("{}/v1/units/42", server.base_url());
        let body: serde_json::Value = client.get(&url).send().await.unwrap().json().await.unwrap();

        assert_eq!(body["data"]["id"], 42);
    }

    #[tokio::test]
    async fn test_default_headers_sent() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET)
                .path("/ping")
                .header("accept", "application/json")
                .header_exists("user-agent");
            then.status(204);
        });

        let client = test_client();
        let resp = client
            .get(&format!("{}/ping", server.base_url()))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), http::StatusCode::NO_CONTENT);
        m.assert();
    }

    #[tokio::test]
    async fn test_execute_sends_headers_query_and_body() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/reservations")
                .query_param("include", "unit")
                .header("authorization", "Bearer abc")
                .header("content-type", "application/json")
                .json_body(json!({"data": {"attributes": {"adults": 2}}}));
            then.status(201).json_body(json!({"data": {"id": "r1"}}));
        });

        let client = test_client();
        let url = format!("{}/v1/reservations", server.base_url());
        let resp = client
            .execute(
                http::Method::POST,
                &url,
                vec![("authorization".to_owned(), "Bearer abc".to_owned())],
                &[("include", "unit")],
                Some(&json!({"data": {"attributes": {"adults": 2}}})),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), http::StatusCode::CREATED);
        m.assert();
    }

    #[tokio::test]
    async fn test_https_required_by_default() {
        let client = HttpClientBuilder::new().retry(None).build().unwrap();
        let err = client
            .get("http://connect.vacasa.com/v1/units")
            .send()
            .await
            .unwrap_err();

        assert!(matches!(err, HttpError::InvalidScheme { .. }));
    }

    #[tokio::test]
    async fn test_relative_url_rejected() {
        let client = test_client();
        let err = client.get("/v1/units?page=2").send().await.unwrap_err();

        assert!(matches!(
            err,
            HttpError::InvalidUri {
                kind: crate::error::InvalidUriKind::MissingAuthority,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_status_error() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/v1/units");
            then.status(503).body("still down");
        });

        let client = retrying_client(5);
        let url = format!("{}/v1/units", server.base_url());
        let err = client
            .get(&url)
            .send()
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap_err();

        match err {
            HttpError::HttpStatus {
                status,
                body_preview,
                ..
            } => {
                assert_eq!(status, http::StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body_preview, "still down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        m.assert_calls(5);
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/v1/units/0");
            then.status(404).json_body(json!({"errors": [{"status": "404"}]}));
        });

        let client = retrying_client(5);
        let url = format!("{}/v1/units/0", server.base_url());
        let err = client.get(&url).send().await.unwrap().checked_bytes().await;

        assert_eq!(
            err.unwrap_err().status(),
            Some(http::StatusCode::NOT_FOUND)
        );
        m.assert_calls(1);
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[tokio::test]
    async fn test_gzip_json_decompressed() {
        let server = MockServer::start();
        let payload = serde_json::to_vec(&json!({"data": [{"id": 1}, {"id": 2}]})).unwrap();
        let compressed = gzip(&payload);
        let _m = server.mock(|when, then| {
            when.method(GET).path("/v1/cities");
            then.status(200)
                .header("content-type", "application/json")
                .header("content-encoding", "gzip")
                .body(compressed);
        });

        let client = test_client();
        let body: serde_json::Value = client
            .get(&format!("{}/v1/cities", server.base_url()))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["data"][1]["id"], 2);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let client = retrying_client(2);
        // Port 9 (discard) is closed on test hosts
        let err = client
            .get("http://127.0.0.1:9/v1/units")
            .send()
            .await
            .unwrap_err();

        assert!(matches!(err, HttpError::Transport(_)));
    }
}
