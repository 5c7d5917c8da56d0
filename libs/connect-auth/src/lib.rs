#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Credential providers for the Vacasa Connect API.
//!
//! Two ways to obtain the bearer token sent with every request:
//!
//! - [`SignatureCredentials`]: API key and secret exchanged at `/auth` using
//!   an HMAC-SHA256 signature, then kept alive through `/auth/refresh`.
//! - [`OidcCredentials`]: OAuth2 client credentials against the Vacasa
//!   identity provider, with the returned JWT verified against its JWKS.
//!
//! Both implement [`CredentialProvider`] and cache the token until it
//! expires. Concurrent callers share one refresh.

pub mod error;
pub mod http_error;
pub mod oidc;
mod provider;
pub mod signature;
mod token;

pub use error::AuthError;
pub use oidc::{OidcConfig, OidcCredentials};
pub use provider::CredentialProvider;
pub use signature::{SignatureCredentials, generate_signature};
pub use token::{ExpiringToken, parse_expires_at};

pub use connect_utils::SecretString;
