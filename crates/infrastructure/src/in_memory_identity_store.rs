use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use keystock_application::{AuthorizationRepository, IdentityRepository, RoleAssignmentRepository};
use keystock_core::{AppError, AppResult, TenantId};
use keystock_domain::{
    AssignmentId, AssignmentUpsert, Company, CompanyId, CompanyMember, CompanyRole,
    CompanyRoleAssignment, TenantRoleAssignment, UserId, UserSummary,
};
use tokio::sync::RwLock;

/// In-memory tenants, companies, users and role assignments.
///
/// Company assignments are keyed by `(user, company)`, so there is at most one
/// row per pair and every upsert runs under a single write lock.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    tenants: RwLock<HashSet<TenantId>>,
    companies: RwLock<HashMap<CompanyId, Company>>,
    users: RwLock<HashMap<UserId, UserSummary>>,
    tenant_roles: RwLock<Vec<TenantRoleAssignment>>,
    company_roles: RwLock<HashMap<(UserId, CompanyId), CompanyRoleAssignment>>,
}

impl InMemoryIdentityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tenant.
    pub async fn insert_tenant(&self, tenant_id: TenantId) {
        self.tenants.write().await.insert(tenant_id);
    }

    /// Registers a company under an existing tenant.
    pub async fn insert_company(
        &self,
        company_id: CompanyId,
        tenant_id: TenantId,
    ) -> AppResult<Company> {
        if !self.tenants.read().await.contains(&tenant_id) {
            return Err(AppError::NotFound(format!(
                "tenant '{tenant_id}' was not found"
            )));
        }

        let company = Company::new(company_id, tenant_id);
        self.companies.write().await.insert(company_id, company);
        Ok(company)
    }

    /// Registers a user.
    pub async fn insert_user(&self, user: UserSummary) {
        self.users.write().await.insert(user.user_id, user);
    }

    /// Stores a tenant-wide grant. Tenant provisioning owns these rows.
    ///
    /// A second grant of the same role to the same user in the same tenant is a
    /// `Conflict`, active or not.
    pub async fn grant_tenant_role(&self, grant: TenantRoleAssignment) -> AppResult<()> {
        if !self.tenants.read().await.contains(&grant.tenant_id) {
            return Err(AppError::NotFound(format!(
                "tenant '{}' was not found",
                grant.tenant_id
            )));
        }
        if !self.users.read().await.contains_key(&grant.user_id) {
            return Err(AppError::NotFound(format!(
                "user '{}' was not found",
                grant.user_id
            )));
        }

        let mut tenant_roles = self.tenant_roles.write().await;
        if tenant_roles.iter().any(|existing| {
            existing.user_id == grant.user_id
                && existing.tenant_id == grant.tenant_id
                && existing.role == grant.role
        }) {
            return Err(AppError::Conflict(format!(
                "user '{}' already holds role '{}' in tenant '{}'",
                grant.user_id, grant.role, grant.tenant_id
            )));
        }

        tenant_roles.push(grant);
        Ok(())
    }
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityStore {
    async fn find_company(&self, company_id: CompanyId) -> AppResult<Option<Company>> {
        Ok(self.companies.read().await.get(&company_id).copied())
    }

    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserSummary>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }
}

#[async_trait]
impl AuthorizationRepository for InMemoryIdentityStore {
    async fn list_active_tenant_roles(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> AppResult<Vec<String>> {
        let tenant_roles = self.tenant_roles.read().await;

        Ok(tenant_roles
            .iter()
            .filter(|grant| grant.active && grant.user_id == user_id && grant.tenant_id == tenant_id)
            .map(|grant| grant.role.as_str().to_owned())
            .collect())
    }

    async fn find_active_company_role(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> AppResult<Option<String>> {
        let company_roles = self.company_roles.read().await;

        Ok(company_roles
            .get(&(user_id, company_id))
            .filter(|assignment| assignment.active)
            .map(|assignment| assignment.role.as_str().to_owned()))
    }
}

#[async_trait]
impl RoleAssignmentRepository for InMemoryIdentityStore {
    async fn upsert_company_assignment(
        &self,
        user_id: UserId,
        company: Company,
        role: CompanyRole,
    ) -> AppResult<AssignmentUpsert> {
        if !self.users.read().await.contains_key(&user_id) {
            return Err(AppError::NotFound(format!("user '{user_id}' was not found")));
        }

        let tenant_id = self
            .companies
            .read()
            .await
            .get(&company.id())
            .map(Company::tenant_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("company '{}' was not found", company.id()))
            })?;

        let mut company_roles = self.company_roles.write().await;
        let now = Utc::now();
        let key = (user_id, company.id());
        let previous = company_roles.get(&key).cloned();

        let assignment = match &previous {
            Some(existing) => CompanyRoleAssignment {
                role,
                active: true,
                updated_at: now,
                ..existing.clone()
            },
            None => CompanyRoleAssignment {
                assignment_id: AssignmentId::new(),
                user_id,
                company_id: company.id(),
                tenant_id,
                role,
                active: true,
                assigned_at: now,
                updated_at: now,
            },
        };

        company_roles.insert(key, assignment.clone());

        Ok(AssignmentUpsert {
            previous,
            assignment,
        })
    }

    async fn deactivate_company_assignment(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> AppResult<Option<CompanyRoleAssignment>> {
        let mut company_roles = self.company_roles.write().await;

        let Some(assignment) = company_roles
            .get_mut(&(user_id, company_id))
            .filter(|assignment| assignment.active)
        else {
            return Ok(None);
        };

        assignment.active = false;
        assignment.updated_at = Utc::now();
        Ok(Some(assignment.clone()))
    }

    async fn list_active_assignments_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<CompanyRoleAssignment>> {
        let company_roles = self.company_roles.read().await;

        let mut assignments: Vec<CompanyRoleAssignment> = company_roles
            .values()
            .filter(|assignment| assignment.active && assignment.user_id == user_id)
            .cloned()
            .collect();
        assignments.sort_by(|left, right| {
            left.assigned_at
                .cmp(&right.assigned_at)
                .then(left.company_id.cmp(&right.company_id))
        });

        Ok(assignments)
    }

    async fn list_active_members_for_company(
        &self,
        company_id: CompanyId,
    ) -> AppResult<Vec<CompanyMember>> {
        let company_roles = self.company_roles.read().await;
        let users = self.users.read().await;

        let mut members: Vec<CompanyMember> = company_roles
            .values()
            .filter(|assignment| assignment.active && assignment.company_id == company_id)
            .filter_map(|assignment| {
                users.get(&assignment.user_id).map(|user| CompanyMember {
                    assignment: assignment.clone(),
                    user: user.clone(),
                })
            })
            .collect();
        members.sort_by(|left, right| {
            left.user
                .display_name
                .cmp(&right.user.display_name)
                .then(left.user.user_id.cmp(&right.user.user_id))
        });

        Ok(members)
    }
}
