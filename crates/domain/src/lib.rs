//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod assignment;
mod audit;
mod identity;
mod security;

pub use assignment::{
    AssignmentId, AssignmentUpsert, CompanyMember, CompanyRoleAssignment, TenantRoleAssignment,
};
pub use audit::{
    ActorContext, AuditAction, AuditEntityType, AuditRecord, AuditStatus, AuditValues,
    changed_fields, changed_fields_note, supplied_fields, supplied_fields_note,
};
pub use identity::{Company, CompanyId, UserId, UserSummary};
pub use security::{CompanyRole, Permission, PermissionMatrix, TenantRole};
