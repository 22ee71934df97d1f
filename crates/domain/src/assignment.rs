use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use keystock_core::TenantId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CompanyId, CompanyRole, TenantRole, UserId, UserSummary};

/// Stable identifier of a company role assignment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentId(Uuid);

impl AssignmentId {
    /// Creates a new random assignment identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an assignment identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AssignmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AssignmentId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Tenant-wide role grant. Created by tenant provisioning, read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRoleAssignment {
    /// Grantee.
    pub user_id: UserId,
    /// Tenant the grant covers.
    pub tenant_id: TenantId,
    /// Granted role.
    pub role: TenantRole,
    /// Inactive grants are ignored by authorization.
    pub active: bool,
}

/// Company-scoped role grant.
///
/// At most one row exists per `(user_id, company_id)`; removal flips `active`
/// instead of deleting the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRoleAssignment {
    /// Stable row identifier.
    pub assignment_id: AssignmentId,
    /// Grantee.
    pub user_id: UserId,
    /// Company the grant covers.
    pub company_id: CompanyId,
    /// Tenant of the company, copied when the row is created.
    pub tenant_id: TenantId,
    /// Granted role.
    pub role: CompanyRole,
    /// Inactive rows are kept for history only.
    pub active: bool,
    /// First assignment time.
    pub assigned_at: DateTime<Utc>,
    /// Last role or status change.
    pub updated_at: DateTime<Utc>,
}

/// Result of an assignment upsert: the row before and after the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentUpsert {
    /// Row state before the write, `None` when the row was created.
    pub previous: Option<CompanyRoleAssignment>,
    /// Row state after the write.
    pub assignment: CompanyRoleAssignment,
}

/// Active company assignment joined with the member's display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyMember {
    /// The member's assignment.
    pub assignment: CompanyRoleAssignment,
    /// Display data of the member.
    pub user: UserSummary,
}
