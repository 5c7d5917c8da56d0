//! Key and secret exchange against the Connect `/auth` endpoints.

use async_trait::async_trait;
use connect_http::{HttpClient, HttpClientBuilder, HttpClientConfig};
use connect_utils::SecretString;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::error::AuthError;
use crate::provider::CredentialProvider;
use crate::token::ExpiringToken;

type HmacSha256 = Hmac<Sha256>;

/// Sign an `/auth` request.
///
/// `hex(HMAC-SHA256(key = api_secret, message = api_key + timestamp + api_secret))`,
/// with `timestamp` in decimal Unix seconds.
///
/// # Errors
/// Returns [`AuthError::Configuration`] if the secret cannot key the MAC.
pub fn generate_signature(
    api_key: &str,
    api_secret: &SecretString,
    timestamp: i64,
) -> Result<String, AuthError> {
    let mut mac = HmacSha256::new_from_slice(api_secret.expose().as_bytes())
        .map_err(|e| AuthError::Configuration(format!("invalid HMAC key: {e}")))?;
    mac.update(api_key.as_bytes());
    mac.update(timestamp.to_string().as_bytes());
    mac.update(api_secret.expose().as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Default, Deserialize)]
struct AuthEnvelope {
    #[serde(default)]
    data: AuthData,
}

#[derive(Debug, Default, Deserialize)]
struct AuthData {
    #[serde(default)]
    attributes: TokenAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct TokenAttributes {
    access_token: Option<ExpiringToken>,
    refresh_token: Option<ExpiringToken>,
}

#[derive(Debug, Clone)]
struct TokenPair {
    access: ExpiringToken,
    refresh: ExpiringToken,
}

impl TokenPair {
    fn from_attributes(attributes: TokenAttributes) -> Result<Self, AuthError> {
        let access = attributes
            .access_token
            .ok_or(AuthError::MissingToken("access_token"))?;
        let refresh = attributes
            .refresh_token
            .ok_or(AuthError::MissingToken("refresh_token"))?;
        Ok(Self { access, refresh })
    }

    fn needs_refresh(&self, now: OffsetDateTime) -> bool {
        self.access.is_expired_at(now) || self.refresh.is_expired_at(now)
    }
}

/// Credentials obtained by signing the API key with the API secret.
///
/// The first call posts a signed request to `{endpoint}/auth`. The returned
/// access and refresh tokens are cached; once either has expired the pair is
/// replaced through `{endpoint}/auth/refresh`.
pub struct SignatureCredentials {
    client: HttpClient,
    endpoint: String,
    api_key: String,
    api_secret: SecretString,
    tokens: Mutex<Option<TokenPair>>,
}

impl std::fmt::Debug for SignatureCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureCredentials")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl SignatureCredentials {
    /// Build a provider with its own token-endpoint client.
    ///
    /// # Errors
    /// Returns [`AuthError::Http`] if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: SecretString,
    ) -> Result<Self, AuthError> {
        let client = HttpClientBuilder::with_config(HttpClientConfig::token_endpoint())
            .build()
            .map_err(|e| AuthError::http(&e, "signature auth"))?;
        Ok(Self::with_client(client, endpoint, api_key, api_secret))
    }

    /// Build a provider on top of an existing client.
    pub fn with_client(
        client: HttpClient,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: SecretString,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
            api_secret,
            tokens: Mutex::new(None),
        }
    }

    /// Signature for `timestamp` with this provider's key pair.
    ///
    /// # Errors
    /// See [`generate_signature`].
    pub fn generate_signature(&self, timestamp: i64) -> Result<String, AuthError> {
        generate_signature(&self.api_key, &self.api_secret, timestamp)
    }

    async fn request_new_tokens(&self) -> Result<TokenPair, AuthError> {
        let timestamp = OffsetDateTime::now_utc().unix_timestamp();
        let payload = json!({
            "data": {
                "api_key": self.api_key,
                "timestamp": timestamp,
                "signature": self.generate_signature(timestamp)?,
            }
        });

        let pair = self.post_tokens("auth", &payload, "signature auth").await?;
        tracing::debug!(
            access_expires_at = %pair.access.expires_at,
            refresh_expires_at = %pair.refresh.expires_at,
            "obtained new Connect API tokens"
        );
        Ok(pair)
    }

    async fn refresh_tokens(&self, refresh_token: &SecretString) -> Result<TokenPair, AuthError> {
        let payload = json!({
            "data": {
                "refresh_token": refresh_token.expose(),
            }
        });

        let pair = self
            .post_tokens("auth/refresh", &payload, "token refresh")
            .await?;
        tracing::debug!(
            access_expires_at = %pair.access.expires_at,
            refresh_expires_at = %pair.refresh.expires_at,
            "refreshed Connect API tokens"
        );
        Ok(pair)
    }

    async fn post_tokens(
        &self,
        path: &str,
        payload: &serde_json::Value,
        context: &str,
    ) -> Result<TokenPair, AuthError> {
        let url = format!("{}/{path}", self.endpoint);
        let envelope: AuthEnvelope = self
            .client
            .post(&url)
            .json(payload)
            .map_err(|e| AuthError::http(&e, context))?
            .send()
            .await
            .map_err(|e| AuthError::http(&e, context))?
            .json()
            .await
            .map_err(|e| AuthError::body(&e, context))?;

        TokenPair::from_attributes(envelope.data.attributes).inspect_err(|e| {
            tracing::warn!(error = %e, endpoint = %url, "auth response rejected");
        })
    }
}

#[async_trait]
impl CredentialProvider for SignatureCredentials {
    async fn get_valid_token(&self) -> Result<SecretString, AuthError> {
        let mut tokens = self.tokens.lock().await;

        let refresh_with = match tokens.as_ref() {
            None => None,
            Some(pair) if pair.needs_refresh(OffsetDateTime::now_utc()) => {
                Some(pair.refresh.token.clone())
            }
            Some(pair) => return Ok(pair.access.token.clone()),
        };

        let pair = match refresh_with {
            None => self.request_new_tokens().await?,
            Some(refresh_token) => self.refresh_tokens(&refresh_token).await?,
        };
        let access = pair.access.token.clone();
        *tokens = Some(pair);
        Ok(access)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_known_digest() {
        let signature =
            generate_signature("fake_key", &SecretString::new("fake_secret"), 1_483_228_800)
                .unwrap();
        assert_eq!(
            signature,
            "87446b676b79b6e493a6b852ec3c32faf579086bd12728178197ef278ec7abfc"
        );
    }

    #[test]
    fn signature_depends_on_timestamp() {
        let secret = SecretString::new("fake_secret");
        let a = generate_signature("fake_key", &secret, 1_483_228_800).unwrap();
        let b = generate_signature("fake_key", &secret, 1_483_228_801).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn missing_tokens_reported_by_name() {
        let attributes: TokenAttributes = serde_json::from_value(json!({
            "refresh_token": {"token": "r", "expires_at": "2030-01-01 00:00:00"}
        }))
        .unwrap();
        assert!(matches!(
            TokenPair::from_attributes(attributes),
            Err(AuthError::MissingToken("access_token"))
        ));

        let attributes: TokenAttributes = serde_json::from_value(json!({
            "access_token": {"token": "a", "expires_at": "2030-01-01 00:00:00"}
        }))
        .unwrap();
        assert!(matches!(
            TokenPair::from_attributes(attributes),
            Err(AuthError::MissingToken("refresh_token"))
        ));
    }

    #[test]
    fn empty_envelope_has_no_tokens() {
        let envelope: AuthEnvelope = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            TokenPair::from_attributes(envelope.data.attributes),
            Err(AuthError::MissingToken("access_token"))
        ));
    }

    #[test]
    fn either_expiry_triggers_refresh() {
        let pair: TokenPair = TokenPair::from_attributes(
            serde_json::from_value(json!({
                "access_token": {"token": "a", "expires_at": "2020-01-01T00:00:00Z"},
                "refresh_token": {"token": "r", "expires_at": "2020-06-01T00:00:00Z"}
            }))
            .unwrap(),
        )
        .unwrap();
        let before = time::macros::datetime!(2019-12-31 00:00:00 UTC);
        let between = time::macros::datetime!(2020-03-01 00:00:00 UTC);
        assert!(!pair.needs_refresh(before));
        assert!(pair.needs_refresh(between));
    }
}
