#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Client for the Vacasa Connect API.
//!
//! [`VacasaConnect`] sends authenticated requests through a retrying HTTP
//! transport. Tokens come from a [`CredentialProvider`]: either
//! [`SignatureCredentials`] (API key and secret) or [`OidcCredentials`]
//! (client credentials against the identity provider).
//!
//! List endpoints return a lazy [`Stream`](futures_core::Stream) that follows
//! the `links.next` of each page:
//!
//! ```rust,ignore
//! use futures_util::TryStreamExt;
//! use vacasa_connect::{ConnectConfig, Params, UnitsOptions, VacasaConnect};
//!
//! let config = ConnectConfig::load(Some("connect.yaml".as_ref()))?;
//! let connect = VacasaConnect::from_config(&config)?;
//!
//! let units: Vec<serde_json::Value> = connect
//!     .get_units(Params::new(), UnitsOptions { include_photos: true, ..Default::default() })
//!     .try_collect()
//!     .await?;
//! ```

mod client;
pub mod config;
mod error;
pub mod headers;
pub mod pager;
pub mod params;
pub mod resources;

pub use client::{DEFAULT_ENDPOINT, VacasaConnect, VacasaConnectBuilder};
pub use config::{AuthConfig, ConnectConfig};
pub use error::ConnectError;
pub use headers::HeaderDefaults;
pub use pager::{LinkPager, Page};
pub use params::{Params, add_include_param, add_meta_param};
pub use resources::{
    AmenitiesOptions, Collection, Guest, NewReservation, PaymentCard, QuoteRequest, TripProtection,
    UnitsOptions,
};

pub use connect_auth::{
    AuthError, CredentialProvider, OidcConfig, OidcCredentials, SecretString, SignatureCredentials,
};
pub use connect_http::{HttpClientConfig, HttpError, HttpResponse, RetryConfig};
