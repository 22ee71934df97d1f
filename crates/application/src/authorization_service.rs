use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use keystock_core::{AppError, AppResult, TenantId};
use keystock_domain::{
    ActorContext, AuditAction, AuditEntityType, Company, CompanyId, Permission,
    PermissionMatrix, TenantRole, UserId,
};

use crate::{AuditTrail, IdentityRepository};

/// Repository port for role lookups used by authorization checks.
///
/// Roles are returned as stored so that values this build does not recognize
/// fail closed instead of failing the lookup.
#[async_trait]
pub trait AuthorizationRepository: Send + Sync {
    /// Lists the roles of active tenant-wide assignments for a user in one tenant.
    async fn list_active_tenant_roles(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> AppResult<Vec<String>>;

    /// Finds the role of the active company assignment for a user in one company.
    async fn find_active_company_role(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> AppResult<Option<String>>;
}

/// Access a user holds on one company, and where it comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessLevel {
    /// Tenant-wide role on the company's tenant; every permission is granted.
    TenantWide(TenantRole),
    /// Company role, granting the role's matrix row.
    Company(String),
    /// No active grant.
    None,
}

impl AccessLevel {
    /// Returns whether this access level grants the permission.
    #[must_use]
    pub fn allows(&self, permission: Permission) -> bool {
        match self {
            Self::TenantWide(_) => true,
            Self::Company(role) => PermissionMatrix::has(role.as_str(), permission),
            Self::None => false,
        }
    }

    /// Returns every permission this access level grants.
    #[must_use]
    pub fn permissions(&self) -> BTreeSet<Permission> {
        match self {
            Self::TenantWide(_) => Permission::all().iter().copied().collect(),
            Self::Company(role) => PermissionMatrix::all(role.as_str()),
            Self::None => BTreeSet::new(),
        }
    }
}

/// Application service resolving company-scoped permission checks.
#[derive(Clone)]
pub struct AuthorizationService {
    identity_repository: Arc<dyn IdentityRepository>,
    repository: Arc<dyn AuthorizationRepository>,
    audit_trail: AuditTrail,
}

impl AuthorizationService {
    /// Creates a new authorization service from its collaborators.
    #[must_use]
    pub fn new(
        identity_repository: Arc<dyn IdentityRepository>,
        repository: Arc<dyn AuthorizationRepository>,
        audit_trail: AuditTrail,
    ) -> Self {
        Self {
            identity_repository,
            repository,
            audit_trail,
        }
    }

    /// Resolves the access a user holds on a company.
    ///
    /// Tenant-wide roles are consulted first and win outright, so a stale or
    /// unrelated company role can never shadow them. Fails with `NotFound` when
    /// the company cannot be resolved to a tenant.
    pub async fn resolve_access(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> AppResult<AccessLevel> {
        let company = self.require_company(company_id).await?;
        self.access_in(user_id, company).await
    }

    /// Returns whether the user holds the permission on the company.
    pub async fn check(
        &self,
        user_id: UserId,
        company_id: CompanyId,
        permission: Permission,
    ) -> AppResult<bool> {
        Ok(self
            .resolve_access(user_id, company_id)
            .await?
            .allows(permission))
    }

    /// Returns every permission the user holds on the company.
    pub async fn list_permissions(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> AppResult<BTreeSet<Permission>> {
        Ok(self
            .resolve_access(user_id, company_id)
            .await?
            .permissions())
    }

    /// Ensures the acting user holds the permission, auditing denials.
    ///
    /// A denial is recorded as a failed `COMPANY_DENIED` entry scoped to the
    /// company's tenant and returned as `Forbidden`. Unknown companies fail with
    /// `NotFound` before any grant is consulted.
    pub async fn require_permission(
        &self,
        context: &ActorContext,
        company_id: CompanyId,
        permission: Permission,
    ) -> AppResult<()> {
        let company = self.require_company(company_id).await?;

        let Some(actor_user_id) = context.actor_user_id else {
            let error = AppError::Forbidden(format!(
                "anonymous caller is missing permission '{permission}' in company '{company_id}'"
            ));
            self.record_denial(context, company, &error).await;
            return Err(error);
        };

        if self
            .access_in(actor_user_id, company)
            .await?
            .allows(permission)
        {
            return Ok(());
        }

        debug!(
            user_id = %actor_user_id,
            company_id = %company_id,
            permission = %permission,
            "permission denied"
        );

        let error = AppError::Forbidden(format!(
            "user '{actor_user_id}' is missing permission '{permission}' in company '{company_id}'"
        ));
        self.record_denial(context, company, &error).await;
        Err(error)
    }

    async fn require_company(&self, company_id: CompanyId) -> AppResult<Company> {
        self.identity_repository
            .find_company(company_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("company '{company_id}' was not found")))
    }

    /// Tenant-wide roles are consulted first and win outright.
    async fn access_in(&self, user_id: UserId, company: Company) -> AppResult<AccessLevel> {
        let tenant_roles = self
            .repository
            .list_active_tenant_roles(user_id, company.tenant_id())
            .await?;
        if let Some(tenant_role) = tenant_roles
            .iter()
            .find_map(|role| TenantRole::from_stored(role))
        {
            return Ok(AccessLevel::TenantWide(tenant_role));
        }

        let company_role = self
            .repository
            .find_active_company_role(user_id, company.id())
            .await?;

        Ok(company_role.map_or(AccessLevel::None, AccessLevel::Company))
    }

    async fn record_denial(&self, context: &ActorContext, company: Company, error: &AppError) {
        let context = context
            .clone()
            .scoped_to(company.tenant_id(), Some(company.id()));

        self.audit_trail
            .record_failure(
                &context,
                AuditEntityType::COMPANY,
                AuditAction::Denied,
                company.id().to_string(),
                error,
            )
            .await;
    }
}

#[cfg(test)]
mod tests;
