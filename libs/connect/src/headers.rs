//! Per-request headers sent with every authenticated call.

use connect_utils::SecretString;

pub const AUTHORIZATION: &str = "Authorization";
pub const ACCEPT_LANGUAGE: &str = "Accept-Language";
pub const ACCEPT_CURRENCY: &str = "X-Accept-Currency";
pub const ACCEPT_TIMEZONE: &str = "X-Accept-Timezone";

pub const DEFAULT_LANGUAGE: &str = "en-US";
pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Client-level language, currency and timezone used when a call does not
/// override them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderDefaults {
    pub language: String,
    pub currency: String,
    pub timezone: String,
}

impl Default for HeaderDefaults {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_owned(),
            currency: DEFAULT_CURRENCY.to_owned(),
            timezone: DEFAULT_TIMEZONE.to_owned(),
        }
    }
}

impl HeaderDefaults {
    /// Compose the header set for one request. `language` and `currency`
    /// replace the defaults when given; the timezone is always the default.
    #[must_use]
    pub fn compose(
        &self,
        token: &SecretString,
        language: Option<&str>,
        currency: Option<&str>,
    ) -> Vec<(String, String)> {
        vec![
            (
                AUTHORIZATION.to_owned(),
                format!("Bearer {}", token.expose()),
            ),
            (
                ACCEPT_LANGUAGE.to_owned(),
                language.unwrap_or(&self.language).to_owned(),
            ),
            (
                ACCEPT_CURRENCY.to_owned(),
                currency.unwrap_or(&self.currency).to_owned(),
            ),
            (ACCEPT_TIMEZONE.to_owned(), self.timezone.clone()),
        ]
    }
}
