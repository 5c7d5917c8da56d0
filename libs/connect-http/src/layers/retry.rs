use crate::config::{ExponentialBackoff, RetryConfig, RetryTrigger};
use crate::error::HttpError;
use crate::response::ResponseBody;
use crate::security::body_preview;
use bytes::Bytes;
use http::{HeaderValue, Request, Response};
use http_body_util::{BodyExt, Full};
use rand::Rng;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::{Layer, Service, ServiceExt};

/// Header carrying the retry number (1-indexed) on retried requests.
pub const RETRY_ATTEMPT_HEADER: &str = "X-Retry-Attempt";

/// Tower layer that implements retry with exponential backoff and jitter
#[derive(Clone, Debug)]
pub struct RetryLayer {
    config: RetryConfig,
}

impl RetryLayer {
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = RetryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RetryService {
            inner,
            config: self.config.clone(),
        }
    }
}

/// Service that retries transport failures and retryable statuses.
///
/// At most `max_attempts` requests are sent. When the budget is spent on a
/// retryable status, the last response is returned as `Ok` so the caller's
/// status check surfaces it (and logs its body). Transport errors are
/// returned as `Err` once the budget is spent.
#[derive(Clone, Debug)]
pub struct RetryService<S> {
    inner: S,
    config: RetryConfig,
}

impl<S> Service<Request<Full<Bytes>>> for RetryService<S>
where
    S: Service<Request<Full<Bytes>>, Response = Response<ResponseBody>, Error = HttpError>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    type Response = S::Response;
    type Error = HttpError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
        // Consume the instance that was poll_ready'd, keep a fresh clone
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let config = self.config.clone();

        let (parts, body) = req.into_parts();
        let has_idempotency_key = config
            .idempotency_key_header
            .as_ref()
            .is_some_and(|name| parts.headers.contains_key(name));

        Box::pin(async move {
            let method = parts.method.clone();
            let host = parts
                .uri
                .authority()
                .map_or_else(|| "unknown".to_owned(), ToString::to_string);
            let path = parts.uri.path().to_owned();

            let mut attempt = 0usize;
            loop {
                let mut req = Request::from_parts(parts.clone(), body.clone());
                if attempt > 0
                    && let Ok(value) = HeaderValue::try_from(attempt.to_string())
                {
                    req.headers_mut().insert(RETRY_ATTEMPT_HEADER, value);
                }

                let remaining = config.retries_remaining(attempt);
                let mut svc = inner.clone();
                svc.ready().await?;

                match svc.call(req).await {
                    Ok(resp) => {
                        let status = resp.status().as_u16();
                        let trigger = RetryTrigger::Status(status);

                        if remaining == 0
                            || !config.should_retry(trigger, &method, has_idempotency_key)
                        {
                            return Ok(resp);
                        }

                        let body = match read_retry_preview(resp, config.retry_log_body_limit)
                            .await
                        {
                            Ok(preview) => preview,
                            Err(e) => {
                                tracing::debug!(error = %e, "failed to read retryable response body");
                                String::new()
                            }
                        };
                        let backoff = calculate_backoff(&config.backoff, attempt);

                        tracing::debug!(
                            retry = attempt + 1,
                            retries_remaining = remaining - 1,
                            max_attempts = config.max_attempts,
                            status,
                            body = %body,
                            method = %method,
                            host = %host,
                            path = %path,
                            backoff_ms = backoff.as_millis(),
                            "retryable HTTP status, backing off"
                        );
                        tokio::time::sleep(backoff).await;
                    }
                    Err(err) => {
                        let trigger = get_retry_trigger(&err);
                        if remaining == 0
                            || !config.should_retry(trigger, &method, has_idempotency_key)
                        {
                            return Err(err);
                        }

                        let backoff = calculate_backoff(&config.backoff, attempt);
                        tracing::debug!(
                            retry = attempt + 1,
                            retries_remaining = remaining - 1,
                            max_attempts = config.max_attempts,
                            error = %err,
                            trigger = ?trigger,
                            method = %method,
                            host = %host,
                            path = %path,
                            backoff_ms = backoff.as_millis(),
                            "retryable transport error, backing off"
                        );
                        tokio::time::sleep(backoff).await;
                    }
                }
                attempt += 1;
            }
        })
    }
}

/// Read up to `limit` bytes of a response that is about to be retried.
///
/// Reading the body lets HTTP/1.1 connections return to the pool; the text
/// read goes into the retry log entry.
async fn read_retry_preview(
    response: Response<ResponseBody>,
    limit: usize,
) -> Result<String, HttpError> {
    let (_parts, body) = response.into_parts();
    let mut body = std::pin::pin!(body);
    let mut collected = Vec::new();

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(HttpError::Transport)?;
        if let Some(chunk) = frame.data_ref() {
            collected.extend_from_slice(chunk);
            if collected.len() >= limit {
                break;
            }
        }
    }

    Ok(body_preview(&collected, limit))
}

fn get_retry_trigger(err: &HttpError) -> RetryTrigger {
    match err {
        HttpError::Transport(_) => RetryTrigger::TransportError,
        HttpError::Timeout(_) => RetryTrigger::Timeout,
        _ => RetryTrigger::NonRetryable,
    }
}

/// Delay to wait after the 0-based `attempt` failed.
///
/// `min(initial * multiplier^attempt, max)` plus a uniform jitter drawn from
/// `backoff.jitter`. Non-finite or negative inputs are sanitized instead of
/// panicking.
#[must_use]
pub fn calculate_backoff(backoff: &ExponentialBackoff, attempt: usize) -> Duration {
    const MAX_BACKOFF_SECS: f64 = 86_400.0;

    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);

    let multiplier = if backoff.multiplier.is_finite() && backoff.multiplier >= 0.0 {
        backoff.multiplier
    } else {
        1.0
    };
    let initial_secs = backoff.initial.as_secs_f64();
    let max_secs = backoff.max.as_secs_f64().min(MAX_BACKOFF_SECS);

    let base = initial_secs * multiplier.powi(exponent);
    let clamped = if base.is_finite() {
        base.clamp(0.0, max_secs)
    } else {
        max_secs
    };

    Duration::from_secs_f64(clamped) + sample_jitter(backoff)
}

fn sample_jitter(backoff: &ExponentialBackoff) -> Duration {
    let lo = backoff.jitter.min.as_secs_f64();
    let hi = backoff.jitter.max.as_secs_f64();
    if hi <= lo {
        return backoff.jitter.min;
    }
    Duration::from_secs_f64(rand::rng().random_range(lo..=hi))
}
