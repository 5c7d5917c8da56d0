use crate::client::{BufferedService, HttpClient};
use crate::config::{HttpClientConfig, RetryConfig, TransportSecurity};
use crate::error::HttpError;
use crate::layers::{DefaultHeadersLayer, RetryLayer};
use crate::response::ResponseBody;
use crate::tls::build_https_connector;
use bytes::Bytes;
use http::Response;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::time::Duration;
use tower::buffer::Buffer;
use tower::limit::ConcurrencyLimitLayer;
use tower::load_shed::LoadShedLayer;
use tower::timeout::TimeoutLayer;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::decompression::DecompressionLayer;

/// Assembles the tower stack behind an [`HttpClient`].
#[derive(Debug, Clone, Default)]
pub struct HttpClientBuilder {
    config: HttpClientConfig,
}

impl HttpClientBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: HttpClientConfig) -> Self {
        Self { config }
    }

    /// Per-attempt timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: Option<RetryConfig>) -> Self {
        self.config.retry = retry;
        self
    }

    /// Accept `http://` URLs so tests can point the client at a mock server.
    #[must_use]
    #[cfg(any(debug_assertions, feature = "allow-insecure-http"))]
    pub fn allow_insecure_http(mut self) -> Self {
        tracing::warn!(
            target: "connect_http::security",
            "plain http enabled; requests will not be encrypted"
        );
        self.config.transport = TransportSecurity::AllowInsecureHttp;
        self
    }

    /// Build the client.
    ///
    /// Needs a running Tokio runtime, the request queue spawns its worker
    /// here.
    ///
    /// # Errors
    /// [`HttpError::Tls`] if the connector cannot be set up, or
    /// [`HttpError::InvalidHeaderValue`] for an unusable user agent.
    pub fn build(self) -> Result<HttpClient, HttpError> {
        let HttpClientConfig {
            request_timeout,
            max_body_size,
            user_agent,
            retry,
            max_concurrent_requests,
            transport,
            tls_roots,
            buffer_capacity,
            pool_idle_timeout,
            pool_max_idle_per_host,
        } = self.config;

        let connector = build_https_connector(tls_roots, transport)?;
        let mut pool = Client::builder(TokioExecutor::new());
        pool.pool_timer(TokioTimer::new())
            .pool_max_idle_per_host(pool_max_idle_per_host)
            .pool_idle_timeout(pool_idle_timeout);
        let hyper_client = pool.build::<_, Full<Bytes>>(connector);

        // innermost first: decompression, default headers, per-attempt timeout
        let mut stack = ServiceBuilder::new()
            .layer(TimeoutLayer::new(request_timeout))
            .layer(DefaultHeadersLayer::try_new(&user_agent)?)
            .layer(DecompressionLayer::new())
            .service(hyper_client)
            .map_response(box_body)
            .map_err(move |e: tower::BoxError| unbox_error(e, request_timeout))
            .boxed_clone();

        if let Some(retry) = retry {
            stack = ServiceBuilder::new()
                .layer(RetryLayer::new(retry))
                .service(stack)
                .boxed_clone();
        }

        if let Some(limit) = max_concurrent_requests {
            stack = ServiceBuilder::new()
                .layer(LoadShedLayer::new())
                .layer(ConcurrencyLimitLayer::new(limit))
                .service(stack)
                .map_err(move |e: tower::BoxError| unbox_error(e, request_timeout))
                .boxed_clone();
        }

        let service: BufferedService = Buffer::new(stack, buffer_capacity.max(1));
        Ok(HttpClient {
            service,
            max_body_size,
            transport_security: transport,
        })
    }
}

/// Recover an [`HttpError`] from whatever a tower layer boxed up.
fn unbox_error(err: tower::BoxError, timeout: Duration) -> HttpError {
    if err.is::<tower::timeout::error::Elapsed>() {
        return HttpError::Timeout(timeout);
    }
    if err.is::<tower::load_shed::error::Overloaded>() {
        return HttpError::Overloaded;
    }
    err.downcast::<HttpError>()
        .map_or_else(HttpError::Transport, |e| *e)
}

fn box_body<B>(response: Response<B>) -> Response<ResponseBody>
where
    B: hyper::body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<tower::BoxError>,
{
    response.map(|body| body.map_err(Into::into).boxed())
}
