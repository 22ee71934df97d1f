//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_audit_repository;
mod in_memory_identity_store;
mod postgres_audit_log_repository;
mod postgres_audit_repository;
mod postgres_authorization_repository;
mod postgres_identity_repository;
mod postgres_role_assignment_repository;

pub use in_memory_audit_repository::InMemoryAuditRepository;
pub use in_memory_identity_store::InMemoryIdentityStore;
pub use postgres_audit_log_repository::PostgresAuditLogRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_authorization_repository::PostgresAuthorizationRepository;
pub use postgres_identity_repository::PostgresIdentityRepository;
pub use postgres_role_assignment_repository::PostgresRoleAssignmentRepository;

/// Embedded schema migrations for the PostgreSQL adapters.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
