use async_trait::async_trait;
use connect_http::{HttpClient, HttpClientBuilder, HttpClientConfig};
use connect_utils::SecretString;
use jsonwebtoken::{Validation, decode, decode_header};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use super::config::OidcConfig;
use super::discovery::{DiscoveryDocument, fetch_discovery};
use super::jwks::fetch_jwks;
use crate::error::AuthError;
use crate::provider::CredentialProvider;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
struct JwtClaims {
    exp: i64,
}

struct CachedJwt {
    token: SecretString,
    exp: i64,
}

impl CachedJwt {
    fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now.unix_timestamp() >= self.exp
    }
}

/// Client credentials provider backed by an OpenID Connect identity provider.
///
/// The JWT is verified against the provider's JWKS before it is cached, and
/// reused until its `exp` claim has passed.
pub struct OidcCredentials {
    client: HttpClient,
    config: OidcConfig,
    cached: Mutex<Option<CachedJwt>>,
}

impl std::fmt::Debug for OidcCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcCredentials")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OidcCredentials {
    /// # Errors
    /// Returns [`AuthError::Http`] if the HTTP client cannot be built.
    pub fn new(config: OidcConfig) -> Result<Self, AuthError> {
        let client = HttpClientBuilder::with_config(HttpClientConfig::token_endpoint())
            .build()
            .map_err(|e| AuthError::http(&e, "OIDC"))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: HttpClient, config: OidcConfig) -> Self {
        Self {
            client,
            config,
            cached: Mutex::new(None),
        }
    }

    async fn request_token(&self, discovery: &DiscoveryDocument) -> Result<SecretString, AuthError> {
        let payload = json!({
            "grant_type": "client_credentials",
            "client_id": self.config.client_id,
            "client_secret": self.config.client_secret.expose(),
            "audience": self.config.audience,
            "scope": self.config.scopes.join(" "),
        });

        let response: TokenResponse = self
            .client
            .post(&discovery.token_endpoint)
            .json(&payload)
            .map_err(|e| AuthError::http(&e, "OIDC token"))?
            .send()
            .await
            .map_err(|e| AuthError::http(&e, "OIDC token"))?
            .json()
            .await
            .map_err(|e| AuthError::body(&e, "OIDC token"))?;

        response.access_token.ok_or(AuthError::MissingToken("access_token"))
    }

    /// Discovery, token request, JWKS fetch and verification, in that order.
    async fn fetch_verified_token(&self) -> Result<CachedJwt, AuthError> {
        let discovery = fetch_discovery(&self.client, &self.config.discovery_url()).await?;
        let token = self.request_token(&discovery).await?;
        let jwks = fetch_jwks(&self.client, &discovery.jwks_uri).await?;

        let algorithms = discovery.rsa_algorithms()?;
        let header = decode_header(token.expose())?;
        let key = jwks.decoding_key(header.kid.as_deref())?;

        let mut validation = Validation::new(header.alg);
        validation.algorithms = algorithms;
        validation.set_audience(&[&self.config.audience]);
        validation.set_required_spec_claims(&["exp", "aud"]);
        validation.leeway = 0;

        let claims = decode::<JwtClaims>(token.expose(), &key, &validation)
            .inspect_err(|e| tracing::warn!(error = %e, "identity provider token rejected"))?
            .claims;

        tracing::debug!(exp = claims.exp, "obtained identity provider token");
        Ok(CachedJwt {
            token,
            exp: claims.exp,
        })
    }
}

#[async_trait]
impl CredentialProvider for OidcCredentials {
    async fn get_valid_token(&self) -> Result<SecretString, AuthError> {
        let mut cached = self.cached.lock().await;

        if let Some(jwt) = cached.as_ref()
            && !jwt.is_expired_at(OffsetDateTime::now_utc())
        {
            return Ok(jwt.token.clone());
        }

        let jwt = self.fetch_verified_token().await?;
        let token = jwt.token.clone();
        *cached = Some(jwt);
        Ok(token)
    }
}
