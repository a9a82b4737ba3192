//! Temporary delegated-role credentials and their cache entries.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// How long an assumed-role session is reused before it is fetched again.
///
/// Sits well below the usual one hour session lifetime.
pub const CREDENTIAL_TTL: Duration = Duration::from_secs(45 * 60);

/// Temporary credentials returned by a role assumption.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl SessionCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.into(),
        }
    }
}

impl std::fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}

/// A credential cache entry, keyed by role ARN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCredential {
    pub role_arn: String,
    pub credentials: SessionCredentials,
    pub obtained_at: DateTime<Utc>,
}

impl CachedCredential {
    pub fn new(
        role_arn: impl Into<String>,
        credentials: SessionCredentials,
        obtained_at: DateTime<Utc>,
    ) -> Self {
        Self {
            role_arn: role_arn.into(),
            credentials,
            obtained_at,
        }
    }

    /// Whether the entry may still be served at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        (now - self.obtained_at).num_milliseconds() < CREDENTIAL_TTL.as_millis() as i64
    }
}

/// Derive a role session name from the caller's identity ARN.
///
/// `arn:aws:iam::123456789012:user/ops/alice` becomes `alice`.
pub fn session_name_from_arn(arn: &str) -> &str {
    arn.rsplit('/').next().unwrap_or(arn)
}

/// Credential acquisition errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("Failed to resolve caller identity: {0}")]
    Identity(String),
    #[error("Failed to assume role {role_arn}: {message}")]
    AssumeRole { role_arn: String, message: String },
    #[error("Credential broker unavailable: {0}")]
    BrokerUnavailable(String),
}
