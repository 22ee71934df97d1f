use std::sync::Arc;

use serde_json::{Value, json};
use tracing::info;

use keystock_core::{AppError, AppResult};
use keystock_domain::{
    ActorContext, AssignmentUpsert, AuditAction, AuditEntityType, AuditValues, Company, CompanyId,
    CompanyMember, CompanyRole, CompanyRoleAssignment, UserId,
};

use crate::{AuditEntry, AuditTrail, IdentityRepository, RoleAssignmentRepository};

/// Application service owning company role assignments.
///
/// Callers are expected to have passed an authorization check before invoking
/// the mutating operations; this service validates the request, applies it and
/// records the outcome in the audit trail either way.
#[derive(Clone)]
pub struct RoleAssignmentService {
    identity_repository: Arc<dyn IdentityRepository>,
    repository: Arc<dyn RoleAssignmentRepository>,
    audit_trail: AuditTrail,
}

impl RoleAssignmentService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        identity_repository: Arc<dyn IdentityRepository>,
        repository: Arc<dyn RoleAssignmentRepository>,
        audit_trail: AuditTrail,
    ) -> Self {
        Self {
            identity_repository,
            repository,
            audit_trail,
        }
    }

    /// Assigns a company role to a user, updating the existing row if any.
    ///
    /// Tenant-wide role names are rejected with `Validation`; unknown users and
    /// companies with `NotFound`.
    pub async fn assign_user_to_company(
        &self,
        context: &ActorContext,
        user_id: UserId,
        company_id: CompanyId,
        role: &str,
    ) -> AppResult<CompanyRoleAssignment> {
        match self.upsert_assignment(user_id, company_id, role).await {
            Ok(upsert) => {
                let assignment = upsert.assignment.clone();
                info!(
                    user_id = %user_id,
                    company_id = %company_id,
                    role = %assignment.role,
                    reactivated = upsert.previous.as_ref().is_some_and(|row| !row.active),
                    "company role assigned"
                );
                self.audit_trail
                    .record(&scoped_context(context, &assignment), assigned_entry(upsert))
                    .await;
                Ok(assignment)
            }
            Err(error) => {
                self.record_failure(context, AuditAction::Assigned, user_id, company_id, &error)
                    .await;
                Err(error)
            }
        }
    }

    /// Deactivates the user's active role in the company.
    ///
    /// Fails with `NotFound` when no active assignment exists for the pair.
    pub async fn remove_user_from_company(
        &self,
        context: &ActorContext,
        user_id: UserId,
        company_id: CompanyId,
    ) -> AppResult<()> {
        let deactivated = self
            .repository
            .deactivate_company_assignment(user_id, company_id)
            .await
            .and_then(|row| {
                row.ok_or_else(|| {
                    AppError::NotFound(format!(
                        "user '{user_id}' has no active role in company '{company_id}'"
                    ))
                })
            });

        match deactivated {
            Ok(assignment) => {
                info!(
                    user_id = %user_id,
                    company_id = %company_id,
                    role = %assignment.role,
                    "company role removed"
                );
                let entry = AuditEntry::new(
                    AuditEntityType::USER_COMPANY_ROLE,
                    AuditAction::Removed,
                    assignment.assignment_id.to_string(),
                )
                .with_old_values(status_values(&assignment, true))
                .with_new_values(status_values(&assignment, false));

                self.audit_trail
                    .record(&scoped_context(context, &assignment), entry)
                    .await;
                Ok(())
            }
            Err(error) => {
                self.record_failure(context, AuditAction::Removed, user_id, company_id, &error)
                    .await;
                Err(error)
            }
        }
    }

    /// Lists a user's active company roles across companies.
    pub async fn user_company_roles(&self, user_id: UserId) -> AppResult<Vec<CompanyRoleAssignment>> {
        self.repository
            .list_active_assignments_for_user(user_id)
            .await
    }

    /// Lists a company's active members with their display data.
    pub async fn company_users(&self, company_id: CompanyId) -> AppResult<Vec<CompanyMember>> {
        self.require_company(company_id).await?;
        self.repository
            .list_active_members_for_company(company_id)
            .await
    }

    async fn upsert_assignment(
        &self,
        user_id: UserId,
        company_id: CompanyId,
        role: &str,
    ) -> AppResult<AssignmentUpsert> {
        let role = CompanyRole::parse_assignable(role)?;
        let company = self.require_company(company_id).await?;

        self.identity_repository
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))?;

        self.repository
            .upsert_company_assignment(user_id, company, role)
            .await
    }

    async fn require_company(&self, company_id: CompanyId) -> AppResult<Company> {
        self.identity_repository
            .find_company(company_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("company '{company_id}' was not found")))
    }

    async fn record_failure(
        &self,
        context: &ActorContext,
        action: AuditAction,
        user_id: UserId,
        company_id: CompanyId,
        error: &AppError,
    ) {
        let context = match self.identity_repository.find_company(company_id).await {
            Ok(Some(company)) => context
                .clone()
                .scoped_to(company.tenant_id(), Some(company_id)),
            _ => {
                let mut context = context.clone();
                context.company_id.get_or_insert(company_id);
                context
            }
        };

        self.audit_trail
            .record_failure(
                &context,
                AuditEntityType::USER_COMPANY_ROLE,
                action,
                format!("{user_id}:{company_id}"),
                error,
            )
            .await;
    }
}

fn scoped_context(context: &ActorContext, assignment: &CompanyRoleAssignment) -> ActorContext {
    context
        .clone()
        .scoped_to(assignment.tenant_id, Some(assignment.company_id))
}

fn assigned_entry(upsert: AssignmentUpsert) -> AuditEntry {
    let entry = AuditEntry::new(
        AuditEntityType::USER_COMPANY_ROLE,
        AuditAction::Assigned,
        upsert.assignment.assignment_id.to_string(),
    )
    .with_new_values(assignment_values(&upsert.assignment));

    match upsert.previous {
        Some(previous) => entry.with_old_values(assignment_values(&previous)),
        None => entry,
    }
}

fn assignment_values(assignment: &CompanyRoleAssignment) -> AuditValues {
    AuditValues::from([
        ("user_id".to_owned(), json!(assignment.user_id.to_string())),
        (
            "company_id".to_owned(),
            json!(assignment.company_id.to_string()),
        ),
        ("role".to_owned(), json!(assignment.role.as_str())),
        ("active".to_owned(), Value::Bool(assignment.active)),
    ])
}

fn status_values(assignment: &CompanyRoleAssignment, active: bool) -> AuditValues {
    AuditValues::from([
        ("role".to_owned(), json!(assignment.role.as_str())),
        ("active".to_owned(), Value::Bool(active)),
    ])
}
