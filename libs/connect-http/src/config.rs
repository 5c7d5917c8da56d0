use std::collections::HashSet;
use std::time::Duration;

/// `User-Agent` sent unless the builder overrides it
pub const DEFAULT_USER_AGENT: &str = concat!("vacasa-connect-rs/", env!("CARGO_PKG_VERSION"));

/// Header that lets a POST or PATCH opt into server-error retries
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Bytes of a retryable response body kept for the retry log line
pub const DEFAULT_RETRY_LOG_BODY_LIMIT: usize = 1024;

/// Outcome of one attempt, as seen by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum RetryTrigger {
    /// DNS failure, refused or reset connection
    TransportError,
    Timeout,
    Status(u16),
    /// Body too large, client shut down and similar
    NonRetryable,
}

impl RetryTrigger {
    pub const INTERNAL_SERVER_ERROR: Self = Self::Status(500);
    pub const BAD_GATEWAY: Self = Self::Status(502);
    pub const SERVICE_UNAVAILABLE: Self = Self::Status(503);
    pub const GATEWAY_TIMEOUT: Self = Self::Status(504);

    /// Statuses in the default retry set
    pub const SERVER_ERRORS: [Self; 4] = [
        Self::INTERNAL_SERVER_ERROR,
        Self::BAD_GATEWAY,
        Self::SERVICE_UNAVAILABLE,
        Self::GATEWAY_TIMEOUT,
    ];
}

/// Methods RFC 9110 defines as idempotent. POST and PATCH are not.
#[must_use]
pub fn is_idempotent_method(method: &http::Method) -> bool {
    use http::Method;
    [
        Method::GET,
        Method::HEAD,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
        Method::TRACE,
    ]
    .contains(method)
}

/// Uniform random delay added on top of each backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterRange {
    pub min: Duration,
    pub max: Duration,
}

impl JitterRange {
    /// Deterministic backoff
    #[must_use]
    pub const fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }
}

impl Default for JitterRange {
    fn default() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::from_millis(250),
        }
    }
}

/// Delay before retry `i` (1-based):
/// `min(initial * multiplier^(i-1), max) + uniform(jitter.min, jitter.max)`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// 250ms by default
    pub initial: Duration,
    /// Cap on the exponential part, 30s by default
    pub max: Duration,
    pub multiplier: f64,
    pub jitter: JitterRange,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(250),
            max: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: JitterRange::default(),
        }
    }
}

impl ExponentialBackoff {
    /// Millisecond delays and no jitter, for tests
    #[must_use]
    pub fn fast() -> Self {
        Self {
            initial: Duration::from_millis(1),
            max: Duration::from_millis(20),
            multiplier: 2.0,
            jitter: JitterRange::none(),
        }
    }
}

/// When and how often a request is repeated.
///
/// Triggers in `always_retry` repeat any request. Triggers in
/// `idempotent_retry` repeat only idempotent methods, or requests that carry
/// `idempotency_key_header`. No 4xx status is in either set by default.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts in total, the first one included. `0` behaves like `1`.
    pub max_attempts: usize,

    pub backoff: ExponentialBackoff,

    /// Default: transport errors
    pub always_retry: HashSet<RetryTrigger>,

    /// Default: timeouts and 500, 502, 503, 504
    pub idempotent_retry: HashSet<RetryTrigger>,

    /// How much of a retryable body to read before retrying. Draining it
    /// returns the connection to the pool.
    pub retry_log_body_limit: usize,

    pub idempotency_key_header: Option<http::header::HeaderName>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let mut idempotent_retry = HashSet::from(RetryTrigger::SERVER_ERRORS);
        idempotent_retry.insert(RetryTrigger::Timeout);

        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: ExponentialBackoff::default(),
            always_retry: HashSet::from([RetryTrigger::TransportError]),
            idempotent_retry,
            retry_log_body_limit: DEFAULT_RETRY_LOG_BODY_LIMIT,
            idempotency_key_header: Some(http::header::HeaderName::from_static("idempotency-key")),
        }
    }
}

impl RetryConfig {
    /// A single attempt
    #[must_use]
    pub fn disabled() -> Self {
        Self::with_max_attempts(1)
    }

    #[must_use]
    pub fn with_max_attempts(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Retries still allowed once attempt `attempt` (0-based) has run.
    #[must_use]
    pub fn retries_remaining(&self, attempt: usize) -> usize {
        self.max_attempts.saturating_sub(attempt + 1)
    }

    #[must_use]
    pub fn should_retry(
        &self,
        trigger: RetryTrigger,
        method: &http::Method,
        has_idempotency_key: bool,
    ) -> bool {
        self.always_retry.contains(&trigger)
            || (self.idempotent_retry.contains(&trigger)
                && (has_idempotency_key || is_idempotent_method(method)))
    }
}

/// Trust anchors for TLS
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TlsRootConfig {
    /// Bundled Mozilla roots
    #[default]
    WebPki,
    /// The platform's certificate store
    Native,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportSecurity {
    #[default]
    TlsOnly,
    /// Plain `http://` too; mock servers only
    AllowInsecureHttp,
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Applies to each attempt separately
    pub request_timeout: Duration,

    /// Limit on a decompressed response body
    pub max_body_size: usize,

    pub user_agent: String,

    /// `None` sends every request once
    pub retry: Option<RetryConfig>,

    /// In-flight cap; excess requests fail fast with `Overloaded`
    pub max_concurrent_requests: Option<usize>,

    pub transport: TransportSecurity,

    pub tls_roots: TlsRootConfig,

    /// Queue length in front of the service stack
    pub buffer_capacity: usize,

    pub pool_idle_timeout: Option<Duration>,

    pub pool_max_idle_per_host: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_body_size: 16 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            retry: Some(RetryConfig::default()),
            max_concurrent_requests: Some(64),
            transport: TransportSecurity::TlsOnly,
            tls_roots: TlsRootConfig::WebPki,
            buffer_capacity: 512,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 8,
        }
    }
}

impl HttpClientConfig {
    /// Settings for the identity provider and `/auth` calls.
    ///
    /// Asking for a token again is harmless, so server errors and timeouts
    /// are retried for POST as well.
    #[must_use]
    pub fn token_endpoint() -> Self {
        let mut always_retry = HashSet::from(RetryTrigger::SERVER_ERRORS);
        always_retry.extend([RetryTrigger::TransportError, RetryTrigger::Timeout]);

        Self {
            max_body_size: 256 * 1024,
            retry: Some(RetryConfig {
                always_retry,
                idempotent_retry: HashSet::new(),
                idempotency_key_header: None,
                ..RetryConfig::default()
            }),
            max_concurrent_requests: Some(8),
            buffer_capacity: 64,
            pool_max_idle_per_host: 2,
            ..Self::default()
        }
    }

    /// Plain HTTP, one attempt, short timeout
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            retry: None,
            max_concurrent_requests: None,
            transport: TransportSecurity::AllowInsecureHttp,
            buffer_capacity: 64,
            ..Self::default()
        }
    }
}
