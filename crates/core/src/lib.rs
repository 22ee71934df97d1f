//! Shared primitives for all Rust crates in Keystock.

#![forbid(unsafe_code)]

/// Request correlation primitives shared across services.
pub mod request;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use request::RequestId;

/// Result type used across Keystock crates.
pub type AppResult<T> = Result<T, AppError>;

/// Tenant identifier used as the isolation boundary for every persisted resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Creates a random tenant identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a tenant identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Parses a tenant identifier from its textual UUID form.
    pub fn parse(value: &str) -> AppResult<Self> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|error| AppError::Validation(format!("invalid tenant id '{value}': {error}")))
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TenantId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write rejected by a uniqueness or check constraint of the store.
    #[error("conflict: {0}")]
    Conflict(String),

    /// User is authenticated but blocked by authorization policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Underlying store failure or other unexpected error, opaque to callers.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::{AppError, TenantId};

    #[test]
    fn tenant_id_formats_as_uuid() {
        let tenant_id = TenantId::new();
        assert_eq!(tenant_id.to_string().len(), 36);
    }

    #[test]
    fn tenant_id_parse_accepts_display_output() {
        let tenant_id = TenantId::new();
        let parsed = TenantId::parse(tenant_id.to_string().as_str());
        assert_eq!(parsed.ok(), Some(tenant_id));
    }

    #[test]
    fn tenant_id_parse_rejects_garbage() {
        let parsed = TenantId::parse("not-a-tenant");
        assert!(matches!(parsed, Err(AppError::Validation(_))));
    }
}
