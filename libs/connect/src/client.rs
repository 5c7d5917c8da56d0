use crate::error::ConnectError;
use crate::headers::HeaderDefaults;
use crate::pager::{LinkPager, Page};
use crate::params::Params;
use connect_auth::CredentialProvider;
use connect_http::{HttpClient, HttpClientBuilder, HttpClientConfig, HttpResponse};
use futures_core::Stream;
use http::Method;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://connect.vacasa.com";

/// Authenticated client for the Vacasa Connect API.
///
/// Every call asks the [`CredentialProvider`] for a token, so a provider
/// refresh is picked up without rebuilding the client. Resource methods live
/// in [`crate::resources`].
///
/// ```ignore
/// let credentials = SignatureCredentials::new(DEFAULT_ENDPOINT, key, secret)?;
/// let connect = VacasaConnect::builder(Arc::new(credentials)).build()?;
/// let unit = connect.get_unit_by_id(42, &Params::new()).await?;
/// ```
#[derive(Clone)]
pub struct VacasaConnect {
    pub(crate) http: HttpClient,
    credentials: Arc<dyn CredentialProvider>,
    endpoint: String,
    base: Url,
    defaults: HeaderDefaults,
}

impl std::fmt::Debug for VacasaConnect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VacasaConnect")
            .field("endpoint", &self.endpoint)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

/// Builder for [`VacasaConnect`].
#[must_use]
pub struct VacasaConnectBuilder {
    credentials: Arc<dyn CredentialProvider>,
    endpoint: String,
    defaults: HeaderDefaults,
    http_config: HttpClientConfig,
}

impl VacasaConnectBuilder {
    fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            credentials,
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            defaults: HeaderDefaults::default(),
            http_config: HttpClientConfig::default(),
        }
    }

    /// Base URL of the API, without the `/v1` prefix. Must be `https`.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Default `Accept-Language`, e.g. `es-ES`.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.defaults.language = language.into();
        self
    }

    /// Default `X-Accept-Currency`, e.g. `EUR`.
    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.defaults.currency = currency.into();
        self
    }

    /// `X-Accept-Timezone`, e.g. `America/Los_Angeles`.
    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.defaults.timezone = timezone.into();
        self
    }

    /// Transport settings: timeout, retry policy, TLS roots.
    pub fn http_config(mut self, config: HttpClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Accept a plain `http://` endpoint (mock servers only).
    ///
    /// Only available in debug builds or with the `allow-insecure-http` feature.
    #[cfg(any(debug_assertions, feature = "allow-insecure-http"))]
    pub fn allow_insecure_http(mut self) -> Self {
        self.http_config.transport = connect_http::TransportSecurity::AllowInsecureHttp;
        self
    }

    /// Validate the endpoint and build the client.
    ///
    /// Must be called inside a Tokio runtime. No request is sent.
    ///
    /// # Errors
    /// Returns [`ConnectError::Configuration`] when the endpoint does not parse
    /// or is not `https`, and [`ConnectError::Http`] when the transport cannot
    /// be built.
    pub fn build(self) -> Result<VacasaConnect, ConnectError> {
        let endpoint = self.endpoint.trim_end_matches('/').to_owned();
        let base = Url::parse(&endpoint).map_err(|e| {
            ConnectError::Configuration(format!("invalid endpoint '{endpoint}': {e}"))
        })?;

        let insecure_allowed =
            self.http_config.transport == connect_http::TransportSecurity::AllowInsecureHttp;
        match base.scheme() {
            "https" => {}
            "http" if insecure_allowed => {
                tracing::warn!(%endpoint, "using a plain http endpoint");
            }
            _ => return Err(ConnectError::insecure_endpoint(&endpoint)),
        }

        let http = HttpClientBuilder::with_config(self.http_config).build()?;
        tracing::debug!(%endpoint, "Vacasa Connect client ready");

        Ok(VacasaConnect {
            http,
            credentials: self.credentials,
            endpoint,
            base,
            defaults: self.defaults,
        })
    }
}

impl VacasaConnect {
    pub fn builder(credentials: Arc<dyn CredentialProvider>) -> VacasaConnectBuilder {
        VacasaConnectBuilder::new(credentials)
    }

    /// The configured endpoint, trailing slashes removed.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn defaults(&self) -> &HeaderDefaults {
        &self.defaults
    }

    /// `{endpoint}/v1/{path}`
    pub(crate) fn v1_url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.endpoint, path.trim_start_matches('/'))
    }

    /// Headers for one authenticated call, fetching or refreshing the token
    /// as needed.
    ///
    /// # Errors
    /// Returns [`ConnectError::Auth`] when no valid token can be obtained.
    pub async fn build_headers(
        &self,
        language: Option<&str>,
        currency: Option<&str>,
    ) -> Result<Vec<(String, String)>, ConnectError> {
        let token = self.credentials.get_valid_token().await?;
        Ok(self.defaults.compose(&token, language, currency))
    }

    /// Send an authenticated request and return the successful response.
    ///
    /// Transient failures are retried by the transport. A response that is
    /// still an error afterwards has its body logged and is returned as
    /// [`ConnectError::Http`].
    ///
    /// # Errors
    /// Returns [`ConnectError::Auth`] or [`ConnectError::Http`].
    pub async fn authenticated_request<B>(
        &self,
        method: Method,
        url: &str,
        params: &Params,
        json: Option<&B>,
    ) -> Result<HttpResponse, ConnectError>
    where
        B: Serialize + ?Sized,
    {
        self.send(method, url, params, json, None, None).await
    }

    pub(crate) async fn send<B>(
        &self,
        method: Method,
        url: &str,
        params: &Params,
        json: Option<&B>,
        language: Option<&str>,
        currency: Option<&str>,
    ) -> Result<HttpResponse, ConnectError>
    where
        B: Serialize + ?Sized,
    {
        let headers = self.build_headers(language, currency).await?;
        let response = self
            .http
            .execute(method, url, headers, params, json)
            .await?
            .checked()
            .await?;
        Ok(response)
    }

    /// GET `{endpoint}/v1/{path}` and return the parsed body.
    ///
    /// # Errors
    /// Returns [`ConnectError::Auth`] or [`ConnectError::Http`], the latter
    /// also when the body is not JSON.
    pub async fn get(&self, path: &str, params: &Params) -> Result<Value, ConnectError> {
        let url = self.v1_url(path);
        let response = self
            .authenticated_request(Method::GET, &url, params, None::<&()>)
            .await?;
        Ok(response.json().await?)
    }

    /// Lazily iterate the items of a paginated collection starting at `url`.
    ///
    /// Pages are fetched one at a time as the stream is polled. `params` go
    /// with the first request and are re-applied to following pages when the
    /// next link does not already carry them. Headers are rebuilt for every
    /// page.
    pub fn paginate<'a>(
        &'a self,
        url: &str,
        params: Params,
        language: Option<&str>,
        currency: Option<&str>,
    ) -> impl Stream<Item = Result<Value, ConnectError>> + Send + use<'a> {
        let language = language.map(str::to_owned);
        let currency = currency.map(str::to_owned);

        LinkPager::new(self.base.clone(), url.to_owned(), move |next: String| {
            let params = params.clone();
            let language = language.clone();
            let currency = currency.clone();
            async move {
                self.fetch_page(&next, &params, language.as_deref(), currency.as_deref())
                    .await
            }
        })
    }

    async fn fetch_page(
        &self,
        url: &str,
        params: &Params,
        language: Option<&str>,
        currency: Option<&str>,
    ) -> Result<Page, ConnectError> {
        let missing = missing_params(url, params);
        tracing::debug!(url, extra_params = missing.len(), "fetching page");

        let body: Value = self
            .send(Method::GET, url, &missing, None::<&()>, language, currency)
            .await?
            .json()
            .await?;
        Page::from_envelope(body)
    }
}

/// The subset of `params` whose keys are not already in the query of `url`.
fn missing_params(url: &str, params: &Params) -> Params {
    let present: HashSet<String> = match Url::parse(url) {
        Ok(parsed) => parsed.query_pairs().map(|(k, _)| k.into_owned()).collect(),
        Err(_) => HashSet::new(),
    };
    params
        .iter()
        .filter(|(key, _)| !present.contains(key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
