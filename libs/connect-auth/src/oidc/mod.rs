//! OAuth2 client credentials against an OpenID Connect identity provider.
//!
//! Each refresh runs discovery, the token request and a JWKS fetch in
//! sequence, then verifies the JWT before caching it until its `exp`.

mod config;
mod credentials;
pub mod discovery;
pub mod jwks;

pub use config::{DEFAULT_IDP_URL, OidcConfig};
pub use credentials::OidcCredentials;
