//! Link-following pagination as a `Stream`.
//!
//! Connect list endpoints return JSON:API pages:
//!
//! ```json
//! {"data": [...], "included": [...], "links": {"next": "https://.../v1/units?page[number]=2"}}
//! ```
//!
//! [`LinkPager`] fetches one page at a time, yields its `data` items in
//! server order and follows `links.next` until it is absent or null. A next
//! link without a host is rebuilt against the configured endpoint.
//!
//! ```rust,ignore
//! use futures_util::TryStreamExt;
//!
//! let units: Vec<serde_json::Value> = client
//!     .get_units(Params::new(), UnitsOptions::default())
//!     .try_collect()
//!     .await?;
//! ```

use crate::error::ConnectError;
use futures_core::Stream;
use pin_project_lite::pin_project;
use serde_json::Value;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use url::Url;

/// One decoded page envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub included: Vec<Value>,
    /// Raw `links.next`; `None` when absent, null or empty.
    pub next: Option<String>,
}

impl Page {
    /// Split a page body into its items and next link.
    ///
    /// # Errors
    /// Returns [`ConnectError::InvalidEnvelope`] when `data` is missing or is
    /// not an array, or when `links.next` is neither a string nor null.
    pub fn from_envelope(body: Value) -> Result<Self, ConnectError> {
        let Value::Object(mut envelope) = body else {
            return Err(ConnectError::InvalidEnvelope(
                "page body is not a JSON object".to_owned(),
            ));
        };

        let items = match envelope.remove("data") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(ConnectError::InvalidEnvelope(
                    "`data` is not an array".to_owned(),
                ));
            }
            None => {
                return Err(ConnectError::InvalidEnvelope(
                    "missing `data` field".to_owned(),
                ));
            }
        };

        let included = match envelope.remove("included") {
            Some(Value::Array(included)) => included,
            _ => Vec::new(),
        };

        let next = match envelope.get("links").and_then(|links| links.get("next")) {
            None | Some(Value::Null) => None,
            Some(Value::String(link)) if link.is_empty() => None,
            Some(Value::String(link)) => Some(link.clone()),
            Some(other) => {
                return Err(ConnectError::InvalidEnvelope(format!(
                    "`links.next` must be a string or null, got {other}"
                )));
            }
        };

        Ok(Self {
            items,
            included,
            next,
        })
    }
}

/// Turn a `links.next` value into an absolute URL.
///
/// Relative links are joined onto `endpoint`; absolute links missing a host
/// borrow the endpoint's host and port.
///
/// # Errors
/// Returns [`ConnectError::InvalidNextLink`] when the link cannot be parsed or
/// repaired.
pub fn resolve_next_link(endpoint: &Url, link: &str) -> Result<String, ConnectError> {
    let invalid = |reason: String| ConnectError::InvalidNextLink {
        link: link.to_owned(),
        reason,
    };

    match Url::parse(link) {
        Ok(url) if url.host().is_some() => Ok(url.into()),
        Ok(mut url) => {
            tracing::warn!(link, "next link has no host; using the endpoint host");
            url.set_host(endpoint.host_str())
                .map_err(|e| invalid(e.to_string()))?;
            url.set_port(endpoint.port())
                .map_err(|()| invalid("cannot set port".to_owned()))?;
            Ok(url.into())
        }
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            tracing::debug!(link, "next link is relative; joining onto the endpoint");
            endpoint
                .join(link)
                .map(Into::into)
                .map_err(|e| invalid(e.to_string()))
        }
        Err(e) => Err(invalid(e.to_string())),
    }
}

pin_project! {
    /// A pager that follows `links.next` and yields the items of each page.
    ///
    /// Forward-only: once it returns `None` it stays exhausted. Ask the
    /// client for a new stream to start over.
    ///
    /// Errors end the stream. A fetch error is yielded at once; a bad next
    /// link is yielded after the items of the page that carried it.
    pub struct LinkPager<F, Fut>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<Page, ConnectError>>,
    {
        endpoint: Url,
        next_url: Option<String>,
        buffer: VecDeque<Value>,
        done: bool,
        pending_error: Option<ConnectError>,
        fetcher: F,
        #[pin]
        current_fetch: Option<Fut>,
    }
}

impl<F, Fut> LinkPager<F, Fut>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Page, ConnectError>>,
{
    /// Start at `start_url`; `endpoint` is used to repair host-less links.
    pub fn new(endpoint: Url, start_url: String, fetcher: F) -> Self {
        Self {
            endpoint,
            next_url: Some(start_url),
            buffer: VecDeque::new(),
            done: false,
            pending_error: None,
            fetcher,
            current_fetch: None,
        }
    }
}

impl<F, Fut> Stream for LinkPager<F, Fut>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Page, ConnectError>>,
{
    type Item = Result<Value, ConnectError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(item) = this.buffer.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }

            if let Some(e) = this.pending_error.take() {
                *this.done = true;
                return Poll::Ready(Some(Err(e)));
            }

            if *this.done {
                return Poll::Ready(None);
            }

            if let Some(fut) = this.current_fetch.as_mut().as_pin_mut() {
                match fut.poll(cx) {
                    Poll::Ready(Ok(page)) => {
                        this.current_fetch.set(None);

                        match page.next {
                            Some(link) => match resolve_next_link(this.endpoint, &link) {
                                Ok(url) => *this.next_url = Some(url),
                                Err(e) => *this.pending_error = Some(e),
                            },
                            None => *this.done = true,
                        }

                        this.buffer.extend(page.items);
                        continue;
                    }
                    Poll::Ready(Err(e)) => {
                        this.current_fetch.set(None);
                        *this.done = true;
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Pending => return Poll::Pending,
                }
            }

            let Some(url) = this.next_url.take() else {
                *this.done = true;
                continue;
            };
            let fut = (this.fetcher)(url);
            this.current_fetch.set(Some(fut));
        }
    }
}
