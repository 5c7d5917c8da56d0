use connect_utils::SecretString;
use serde::Deserialize;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::AuthError;

const SPACE_SEPARATED: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const T_SEPARATED: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// An opaque token with an absolute expiry, as issued by `/auth`.
#[derive(Clone, Debug, Deserialize)]
pub struct ExpiringToken {
    pub token: SecretString,
    #[serde(deserialize_with = "deserialize_expires_at")]
    pub expires_at: OffsetDateTime,
}

impl ExpiringToken {
    /// A token is valid strictly before its expiry.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

/// Parse an `expires_at` value.
///
/// Accepts RFC 3339, or `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS` without
/// an offset, read as UTC.
///
/// # Errors
/// Returns [`AuthError::InvalidResponse`] when no format matches.
pub fn parse_expires_at(raw: &str) -> Result<OffsetDateTime, AuthError> {
    if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(parsed);
    }
    PrimitiveDateTime::parse(raw, SPACE_SEPARATED)
        .or_else(|_| PrimitiveDateTime::parse(raw, T_SEPARATED))
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| AuthError::InvalidResponse(format!("unparseable expires_at '{raw}': {e}")))
}

fn deserialize_expires_at<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_expires_at(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse_expires_at("2019-04-30T16:00:00-07:00").unwrap();
        assert_eq!(parsed, datetime!(2019-04-30 23:00:00 UTC));
    }

    #[test]
    fn parses_naive_timestamps_as_utc() {
        assert_eq!(
            parse_expires_at("2017-01-01 00:00:00").unwrap(),
            datetime!(2017-01-01 00:00:00 UTC)
        );
        assert_eq!(
            parse_expires_at("2017-01-01T00:00:00").unwrap(),
            datetime!(2017-01-01 00:00:00 UTC)
        );
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_expires_at("next tuesday").unwrap_err();
        assert!(matches!(err, AuthError::InvalidResponse(msg) if msg.contains("next tuesday")));
    }

    #[test]
    fn expiry_boundary_is_expired() {
        let token: ExpiringToken = serde_json::from_str(
            r#"{"token": "abc", "expires_at": "2017-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(!token.is_expired_at(datetime!(2016-12-31 23:59:59 UTC)));
        assert!(token.is_expired_at(datetime!(2017-01-01 00:00:00 UTC)));
        assert_eq!(token.token.expose(), "abc");
    }
}
