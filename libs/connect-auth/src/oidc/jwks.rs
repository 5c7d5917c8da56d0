use connect_http::HttpClient;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;

use crate::error::AuthError;

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kty: String,
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

/// A JSON Web Key Set.
#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    keys: Vec<Jwk>,
}

impl JwkSet {
    /// Pick the RSA key for a token header's `kid`.
    ///
    /// Without a `kid` the set must hold exactly one RSA key.
    ///
    /// # Errors
    /// Returns [`AuthError::Jwks`] when no single key matches or the matching
    /// key has malformed components.
    pub fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, AuthError> {
        let mut rsa = self.keys.iter().filter(|k| k.kty == "RSA");

        let jwk = match kid {
            Some(kid) => rsa
                .find(|k| k.kid.as_deref() == Some(kid))
                .ok_or_else(|| AuthError::Jwks(format!("no RSA key with kid '{kid}'")))?,
            None => {
                let candidates: Vec<&Jwk> = rsa.collect();
                match candidates.as_slice() {
                    [only] => *only,
                    [] => return Err(AuthError::Jwks("no RSA keys in JWKS".to_owned())),
                    _ => {
                        return Err(AuthError::Jwks(
                            "token has no kid and JWKS holds several RSA keys".to_owned(),
                        ));
                    }
                }
            }
        };

        let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
            return Err(AuthError::Jwks("RSA key without n/e components".to_owned()));
        };
        DecodingKey::from_rsa_components(n, e)
            .map_err(|err| AuthError::Jwks(format!("invalid RSA key: {err}")))
    }
}

/// Fetch the key set at `jwks_uri`.
///
/// # Errors
/// [`AuthError::Http`] on transport or status failure,
/// [`AuthError::InvalidResponse`] if the body is not a key set.
pub async fn fetch_jwks(client: &HttpClient, jwks_uri: &str) -> Result<JwkSet, AuthError> {
    client
        .get(jwks_uri)
        .send()
        .await
        .map_err(|e| AuthError::http(&e, "JWKS"))?
        .json()
        .await
        .map_err(|e| AuthError::body(&e, "JWKS"))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    const N: &str = include_str!("../../tests/fixtures/test_jwks_n.txt");
    const E: &str = "AQAB";

    fn set(keys: serde_json::Value) -> JwkSet {
        serde_json::from_value(json!({ "keys": keys })).unwrap()
    }

    #[test]
    fn selects_by_kid() {
        let jwks = set(json!([
            {"kty": "RSA", "kid": "a", "n": N, "e": E},
            {"kty": "RSA", "kid": "b", "n": N, "e": E},
        ]));
        assert!(jwks.decoding_key(Some("b")).is_ok());
        assert!(matches!(
            jwks.decoding_key(Some("c")),
            Err(AuthError::Jwks(msg)) if msg.contains("'c'")
        ));
    }

    #[test]
    fn single_key_used_without_kid() {
        let jwks = set(json!([
            {"kty": "EC", "kid": "ec", "crv": "P-256", "x": "x", "y": "y"},
            {"kty": "RSA", "n": N, "e": E},
        ]));
        assert!(jwks.decoding_key(None).is_ok());
    }

    #[test]
    fn ambiguous_without_kid() {
        let jwks = set(json!([
            {"kty": "RSA", "kid": "a", "n": N, "e": E},
            {"kty": "RSA", "kid": "b", "n": N, "e": E},
        ]));
        assert!(matches!(jwks.decoding_key(None), Err(AuthError::Jwks(_))));
    }

    #[test]
    fn missing_components_rejected() {
        let jwks = set(json!([{"kty": "RSA", "kid": "a"}]));
        assert!(matches!(
            jwks.decoding_key(Some("a")),
            Err(AuthError::Jwks(msg)) if msg.contains("n/e")
        ));
    }
}
