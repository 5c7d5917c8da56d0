use crate::client::{BufferedService, map_buffer_error, try_acquire_buffer_slot};
use crate::config::TransportSecurity;
use crate::error::{HttpError, InvalidUriKind};
use crate::response::{HttpResponse, ResponseBody};
use bytes::Bytes;
use http::{HeaderName, HeaderValue, Request, Response};
use http_body_util::Full;
use serde::Serialize;
use tower::Service;

/// One outgoing request, assembled step by step.
///
/// Obtained from [`HttpClient::get`](crate::HttpClient::get) and friends. A
/// bad header is remembered and reported by [`send`](RequestBuilder::send);
/// `query` and `json` fail on the spot.
#[must_use = "nothing is sent until .send() is awaited"]
pub struct RequestBuilder {
    service: BufferedService,
    max_body_size: usize,
    method: http::Method,
    url: String,
    headers: Vec<(HeaderName, HeaderValue)>,
    json: Option<Bytes>,
    deferred: Option<HttpError>,
    security: TransportSecurity,
}

impl RequestBuilder {
    pub(crate) fn new(
        service: BufferedService,
        max_body_size: usize,
        method: http::Method,
        url: String,
        security: TransportSecurity,
    ) -> Self {
        Self {
            service,
            max_body_size,
            method,
            url,
            headers: Vec::new(),
            json: None,
            deferred: None,
            security,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.deferred.is_some() {
            return self;
        }
        let parsed = HeaderName::try_from(name)
            .map_err(HttpError::from)
            .and_then(|name| Ok((name, HeaderValue::try_from(value)?)));
        match parsed {
            Ok(header) => self.headers.push(header),
            Err(e) => self.deferred = Some(e),
        }
        self
    }

    pub fn headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        headers
            .into_iter()
            .fold(self, |req, (name, value)| req.header(name.as_ref(), value.as_ref()))
    }

    /// Encode `params` with `serde_urlencoded` and append them to the URL,
    /// after whatever query the URL already has.
    ///
    /// # Errors
    /// A deferred header error, or [`HttpError::FormEncode`].
    pub fn query<T: Serialize + ?Sized>(mut self, params: &T) -> Result<Self, HttpError> {
        if let Some(e) = self.deferred.take() {
            return Err(e);
        }

        let encoded = serde_urlencoded::to_string(params)?;
        if encoded.is_empty() {
            return Ok(self);
        }

        let (path, fragment) = match self.url.split_once('#') {
            Some((path, fragment)) => (path, Some(fragment)),
            None => (self.url.as_str(), None),
        };
        let joiner = match path.rfind('?') {
            None => "?",
            Some(_) if path.ends_with('?') || path.ends_with('&') => "",
            Some(_) => "&",
        };
        let mut url = format!("{path}{joiner}{encoded}");
        if let Some(fragment) = fragment {
            url.push('#');
            url.push_str(fragment);
        }
        self.url = url;
        Ok(self)
    }

    /// Serialize `body` as the JSON payload.
    ///
    /// # Errors
    /// A deferred header error, or [`HttpError::Json`].
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, HttpError> {
        if let Some(e) = self.deferred.take() {
            return Err(e);
        }
        self.json = Some(Bytes::from(serde_json::to_vec(body)?));
        Ok(self)
    }

    /// Target URL with the query appended so far.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn parse_url(&self) -> Result<http::Uri, HttpError> {
        let invalid = |kind, reason: String| HttpError::InvalidUri {
            url: self.url.clone(),
            kind,
            reason,
        };

        let uri: http::Uri = self
            .url
            .parse()
            .map_err(|e: http::uri::InvalidUri| invalid(InvalidUriKind::ParseError, e.to_string()))?;
        if uri.authority().is_none() {
            return Err(invalid(InvalidUriKind::MissingAuthority, "no host".to_owned()));
        }

        match (uri.scheme_str(), self.security) {
            (Some("https"), _) | (Some("http"), TransportSecurity::AllowInsecureHttp) => Ok(uri),
            (Some("http"), TransportSecurity::TlsOnly) => Err(HttpError::InvalidScheme {
                scheme: "http".to_owned(),
                reason: "client only talks https".to_owned(),
            }),
            (Some(other), _) => Err(HttpError::InvalidScheme {
                scheme: other.to_owned(),
                reason: "expected http or https".to_owned(),
            }),
            (None, _) => Err(invalid(InvalidUriKind::MissingScheme, "no scheme".to_owned())),
        }
    }

    /// Run the request through the middleware stack.
    ///
    /// Any status comes back as `Ok`; call
    /// [`HttpResponse::checked`] to treat non-2xx as an error.
    ///
    /// # Errors
    /// Header or URL problems found before sending, a rejected scheme,
    /// transport failures and timeouts left after retries, or
    /// [`HttpError::Overloaded`].
    pub async fn send(mut self) -> Result<HttpResponse, HttpError> {
        if let Some(e) = self.deferred.take() {
            return Err(e);
        }

        let uri = self.parse_url()?;
        let mut request = Request::builder().method(self.method).uri(uri);

        let content_type_set = self
            .headers
            .iter()
            .any(|(name, _)| name == http::header::CONTENT_TYPE);
        if self.json.is_some() && !content_type_set {
            request = request.header(http::header::CONTENT_TYPE, "application/json");
        }
        for (name, value) in self.headers {
            request = request.header(name, value);
        }
        let request = request.body(Full::new(self.json.unwrap_or_default()))?;

        try_acquire_buffer_slot(&mut self.service).await?;
        let inner: Response<ResponseBody> =
            self.service.call(request).await.map_err(map_buffer_error)?;

        Ok(HttpResponse {
            inner,
            max_body_size: self.max_body_size,
        })
    }
}
