//! Tower layers of the transport stack
//!
//! - [`DefaultHeadersLayer`] - fills in `User-Agent` and `Accept`
//! - [`RetryLayer`] - retry with exponential backoff and jitter

mod default_headers;
mod retry;

pub use default_headers::{DefaultHeadersLayer, DefaultHeadersService};
pub use retry::{RETRY_ATTEMPT_HEADER, RetryLayer, RetryService, calculate_backoff};
