use connect_utils::SecretString;
use serde::Deserialize;

/// Identity provider used when none is configured.
pub const DEFAULT_IDP_URL: &str = "https://id.vacasa.com";

/// Settings for [`OidcCredentials`](super::OidcCredentials).
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OidcConfig {
    pub client_id: String,
    pub client_secret: SecretString,

    /// Base URL of the identity provider.
    #[serde(default = "default_idp_url")]
    pub idp_url: String,

    /// Overrides `{idp_url}/.well-known/openid-configuration`.
    #[serde(default)]
    pub discovery_url: Option<String>,

    /// Expected `aud` claim, also sent with the token request.
    pub audience: String,

    /// Requested scopes, sent space-separated.
    #[serde(default)]
    pub scopes: Vec<String>,
}

fn default_idp_url() -> String {
    DEFAULT_IDP_URL.to_owned()
}

impl OidcConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: SecretString,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            idp_url: default_idp_url(),
            discovery_url: None,
            audience: audience.into(),
            scopes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_idp_url(mut self, idp_url: impl Into<String>) -> Self {
        self.idp_url = idp_url.into();
        self
    }

    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Where the discovery document is fetched from.
    #[must_use]
    pub fn discovery_url(&self) -> String {
        match &self.discovery_url {
            Some(url) => url.clone(),
            None => format!(
                "{}/.well-known/openid-configuration",
                self.idp_url.trim_end_matches('/')
            ),
        }
    }
}
