use std::str::FromStr;

use connect_http::HttpClient;
use jsonwebtoken::Algorithm;
use serde::Deserialize;

use crate::error::AuthError;

/// The parts of the OpenID Connect discovery document used here.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryDocument {
    pub token_endpoint: String,
    pub jwks_uri: String,
    #[serde(default)]
    pub id_token_signing_alg_values_supported: Vec<String>,
}

impl DiscoveryDocument {
    /// RSA signing algorithms advertised by the provider.
    ///
    /// Names `jsonwebtoken` does not know, and non-RSA algorithms, are
    /// skipped since only RSA keys are read from the JWKS.
    ///
    /// # Errors
    /// Returns [`AuthError::Discovery`] if nothing usable remains.
    pub fn rsa_algorithms(&self) -> Result<Vec<Algorithm>, AuthError> {
        let algorithms: Vec<Algorithm> = self
            .id_token_signing_alg_values_supported
            .iter()
            .filter_map(|name| Algorithm::from_str(name).ok())
            .filter(|alg| {
                matches!(
                    alg,
                    Algorithm::RS256
                        | Algorithm::RS384
                        | Algorithm::RS512
                        | Algorithm::PS256
                        | Algorithm::PS384
                        | Algorithm::PS512
                )
            })
            .collect();

        if algorithms.is_empty() {
            return Err(AuthError::Discovery(format!(
                "no supported signing algorithm in {:?}",
                self.id_token_signing_alg_values_supported
            )));
        }
        Ok(algorithms)
    }
}

/// Fetch the discovery document.
///
/// # Errors
/// [`AuthError::Http`] on transport or status failure,
/// [`AuthError::InvalidResponse`] if the body is not a discovery document.
pub async fn fetch_discovery(
    client: &HttpClient,
    discovery_url: &str,
) -> Result<DiscoveryDocument, AuthError> {
    client
        .get(discovery_url)
        .send()
        .await
        .map_err(|e| AuthError::http(&e, "OIDC discovery"))?
        .json()
        .await
        .map_err(|e| AuthError::body(&e, "OIDC discovery"))
}
