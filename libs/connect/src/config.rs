//! Client configuration.
//!
//! Loaded from an optional YAML file, then overridden by environment
//! variables prefixed with `VACASA_CONNECT_`; `__` separates nested keys:
//!
//! ```yaml
//! endpoint: https://connect.vacasa.com
//! language: es-ES
//! timeout: 10s
//! auth:
//!   signature:
//!     api_key: my-key
//!     api_secret: my-secret
//! ```
//!
//! `VACASA_CONNECT_AUTH__SIGNATURE__API_SECRET=...` replaces the secret above.

use crate::client::{DEFAULT_ENDPOINT, VacasaConnect};
use crate::error::ConnectError;
use crate::headers::{DEFAULT_CURRENCY, DEFAULT_LANGUAGE, DEFAULT_TIMEZONE};
use connect_auth::{CredentialProvider, OidcConfig, OidcCredentials, SignatureCredentials};
use connect_http::{HttpClientConfig, RetryConfig};
use connect_utils::SecretString;
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const ENV_PREFIX: &str = "VACASA_CONNECT_";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How the client authenticates.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthConfig {
    /// API key and secret exchanged at `{endpoint}/auth`.
    Signature {
        api_key: String,
        api_secret: SecretString,
    },
    /// Client credentials against the identity provider.
    Oidc(OidcConfig),
}

/// Everything needed to build a [`VacasaConnect`].
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Per-attempt request timeout, e.g. `30s`.
    #[serde(default = "default_timeout", with = "connect_utils::humantime_serde")]
    pub timeout: Duration,

    /// Total attempts per request; transport default when unset.
    #[serde(default)]
    pub max_attempts: Option<usize>,

    pub auth: AuthConfig,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_owned()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_owned()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_owned()
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_owned()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl ConnectConfig {
    /// Load from `path` (if given) and the environment.
    ///
    /// # Errors
    /// Returns [`ConnectError::Configuration`] if the file is missing or the
    /// merged values do not form a valid config.
    pub fn load(path: Option<&Path>) -> Result<Self, ConnectError> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConnectError::Configuration(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Yaml::file(path));
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConnectError::Configuration(e.to_string()))?;

        tracing::debug!(
            endpoint = %config.endpoint,
            auth = config.auth.kind(),
            "loaded Vacasa Connect config"
        );
        Ok(config)
    }

    /// Transport settings derived from `timeout` and `max_attempts`.
    #[must_use]
    pub fn http_config(&self) -> HttpClientConfig {
        let retry = match self.max_attempts {
            Some(max_attempts) => RetryConfig::with_max_attempts(max_attempts),
            None => RetryConfig::default(),
        };
        HttpClientConfig {
            request_timeout: self.timeout,
            retry: Some(retry),
            ..HttpClientConfig::default()
        }
    }

    /// Build the configured credential provider.
    ///
    /// # Errors
    /// Returns [`ConnectError::Auth`] if the provider's HTTP client cannot be
    /// built.
    pub fn credentials(&self) -> Result<Arc<dyn CredentialProvider>, ConnectError> {
        let provider: Arc<dyn CredentialProvider> = match &self.auth {
            AuthConfig::Signature {
                api_key,
                api_secret,
            } => Arc::new(SignatureCredentials::new(
                &self.endpoint,
                api_key,
                api_secret.clone(),
            )?),
            AuthConfig::Oidc(oidc) => Arc::new(OidcCredentials::new(oidc.clone())?),
        };
        Ok(provider)
    }
}

impl AuthConfig {
    fn kind(&self) -> &'static str {
        match self {
            Self::Signature { .. } => "signature",
            Self::Oidc(_) => "oidc",
        }
    }
}

impl VacasaConnect {
    /// Build a client and its credential provider from `config`.
    ///
    /// Must be called inside a Tokio runtime.
    ///
    /// # Errors
    /// Returns [`ConnectError::Configuration`] for a non-https endpoint and
    /// [`ConnectError::Auth`] or [`ConnectError::Http`] if a client cannot be
    /// built.
    pub fn from_config(config: &ConnectConfig) -> Result<Self, ConnectError> {
        Self::builder(config.credentials()?)
            .endpoint(&config.endpoint)
            .language(&config.language)
            .currency(&config.currency)
            .timezone(&config.timezone)
            .http_config(config.http_config())
            .build()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::io::Write;

    const ENV_VARS: [&str; 4] = [
        "VACASA_CONNECT_AUTH__SIGNATURE__API_KEY",
        "VACASA_CONNECT_LANGUAGE",
        "VACASA_CONNECT_TIMEOUT",
        "VACASA_CONNECT_ENDPOINT",
    ];

    const SIGNATURE_YAML: &str = "
auth:
  signature:
    api_key: file-key
    api_secret: file-secret
";

    fn write_yaml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    /// Load with none of the test variables set.
    fn load_clean(path: &Path) -> Result<ConnectConfig, ConnectError> {
        temp_env::with_vars_unset(ENV_VARS, || ConnectConfig::load(Some(path)))
    }

    #[test]
    fn yaml_with_defaults() {
        let file = write_yaml(SIGNATURE_YAML);
        let config = load_clean(file.path()).unwrap();

        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.language, "en-US");
        assert_eq!(config.currency, "USD");
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.max_attempts.is_none());
        match config.auth {
            AuthConfig::Signature {
                api_key,
                api_secret,
            } => {
                assert_eq!(api_key, "file-key");
                assert_eq!(api_secret.expose(), "file-secret");
            }
            AuthConfig::Oidc(_) => panic!("expected signature auth"),
        }
    }

    #[test]
    fn env_overrides_yaml() {
        let file = write_yaml(SIGNATURE_YAML);
        let config = temp_env::with_vars(
            [
                ("VACASA_CONNECT_AUTH__SIGNATURE__API_KEY", Some("env-key")),
                ("VACASA_CONNECT_LANGUAGE", Some("es-ES")),
                ("VACASA_CONNECT_TIMEOUT", Some("5s")),
                ("VACASA_CONNECT_ENDPOINT", None),
            ],
            || ConnectConfig::load(Some(file.path())).unwrap(),
        );

        assert_eq!(config.language, "es-ES");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(matches!(
            config.auth,
            AuthConfig::Signature { ref api_key, .. } if api_key == "env-key"
        ));
    }

    #[test]
    fn oidc_section() {
        let file = write_yaml(
            "
endpoint: https://connect.example.com/
max_attempts: 3
auth:
  oidc:
    client_id: my-client
    client_secret: my-secret
    audience: connect.vacasa.com
    scopes: [\"units:read\", \"reservations:write\"]
",
        );
        let config = load_clean(file.path()).unwrap();

        assert_eq!(config.max_attempts, Some(3));
        let AuthConfig::Oidc(oidc) = &config.auth else {
            panic!("expected oidc auth");
        };
        assert_eq!(oidc.idp_url, "https://id.vacasa.com");
        assert_eq!(oidc.scopes, vec!["units:read", "reservations:write"]);

        let http = config.http_config();
        assert_eq!(http.request_timeout, Duration::from_secs(30));
        assert_eq!(http.retry.unwrap().max_attempts, 3);
    }

    #[test]
    fn missing_auth_is_rejected() {
        let file = write_yaml("endpoint: https://connect.vacasa.com\n");
        let err = load_clean(file.path()).unwrap_err();
        assert!(matches!(err, ConnectError::Configuration(msg) if msg.contains("auth")));
    }

    #[test]
    fn missing_file_is_rejected() {
        let err = ConnectConfig::load(Some(Path::new("/nonexistent/connect.yaml"))).unwrap_err();
        assert!(matches!(err, ConnectError::Configuration(msg) if msg.contains("not found")));
    }

    #[test]
    fn secrets_not_in_debug_output() {
        let file = write_yaml(SIGNATURE_YAML);
        let config = load_clean(file.path()).unwrap();
        assert!(!format!("{config:?}").contains("file-secret"));
    }

    #[tokio::test]
    async fn from_config_rejects_http_endpoint() {
        let file = write_yaml(
            "
endpoint: http://connect.vacasa.com
auth:
  signature:
    api_key: k
    api_secret: s
",
        );
        let config = load_clean(file.path()).unwrap();
        let err = VacasaConnect::from_config(&config).unwrap_err();
        assert!(err.to_string().ends_with("`endpoint` scheme must be https"));
    }

    #[tokio::test]
    async fn from_config_builds_client() {
        let file = write_yaml(SIGNATURE_YAML);
        let config = load_clean(file.path()).unwrap();
        let connect = VacasaConnect::from_config(&config).unwrap();
        assert_eq!(connect.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(connect.defaults().language, "en-US");
    }
}
