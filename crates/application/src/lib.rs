//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_ports;
mod audit_trail;
mod authorization_service;
mod identity_ports;
mod role_assignment_ports;
mod role_assignment_service;

pub use audit_ports::{AuditEvent, AuditLogQuery, AuditLogRepository, AuditRepository};
pub use audit_trail::{AuditEntry, AuditLogService, AuditTrail};
pub use authorization_service::{AccessLevel, AuthorizationRepository, AuthorizationService};
pub use identity_ports::IdentityRepository;
pub use role_assignment_ports::RoleAssignmentRepository;
pub use role_assignment_service::RoleAssignmentService;
