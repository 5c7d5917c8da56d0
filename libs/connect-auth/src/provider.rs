use async_trait::async_trait;
use connect_utils::SecretString;

use crate::error::AuthError;

/// Source of the bearer token attached to every authenticated request.
///
/// Implementations cache the credential and only go to the network when it
/// is missing or expired. They are shared across tasks behind an `Arc`, so
/// the check-then-refresh sequence must be serialized internally.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Return a token that is valid right now, refreshing it first if needed.
    async fn get_valid_token(&self) -> Result<SecretString, AuthError>;
}
