#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Retrying HTTP transport for the Vacasa Connect client
//!
//! A hyper-based client with:
//! - TLS via rustls (HTTPS only by default)
//! - Connection pooling
//! - A per-attempt timeout
//! - Retries with exponential backoff and jitter
//! - Default `User-Agent` and `Accept: application/json` headers
//! - Optional concurrency limiting
//! - Transparent response decompression (gzip, brotli, deflate)
//!
//! # Retries
//!
//! A request is attempted at most [`RetryConfig::max_attempts`] times.
//! Transport errors are retried for every method. Timeouts and the 500, 502,
//! 503 and 504 statuses are retried for idempotent methods, or for any method
//! carrying an `Idempotency-Key` header. Once retries run out the last
//! response is handed back as-is; the checked readers on [`HttpResponse`]
//! log its body and turn it into [`HttpError::HttpStatus`].
//!
//! # Example
//!
//! ```ignore
//! use connect_http::HttpClient;
//! use std::time::Duration;
//!
//! let client = HttpClient::builder()
//!     .timeout(Duration::from_secs(10))
//!     .build()?;
//!
//! let units: serde_json::Value = client
//!     .get("https://connect.vacasa.com/v1/units")
//!     .send()
//!     .await?
//!     .json()
//!     .await?;
//! ```

mod builder;
mod client;
mod config;
mod error;
mod layers;
mod request;
mod response;
pub mod security;
mod tls;

pub use builder::HttpClientBuilder;
pub use client::HttpClient;
pub use config::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_USER_AGENT, ExponentialBackoff, HttpClientConfig,
    IDEMPOTENCY_KEY_HEADER, JitterRange, RetryConfig, RetryTrigger, TlsRootConfig,
    TransportSecurity, is_idempotent_method,
};
pub use error::{HttpError, InvalidUriKind};
pub use layers::{
    DefaultHeadersLayer, DefaultHeadersService, RETRY_ATTEMPT_HEADER, RetryLayer, RetryService,
    calculate_backoff,
};
pub use request::RequestBuilder;
pub use response::{HttpResponse, ResponseBody};
