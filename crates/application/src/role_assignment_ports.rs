use async_trait::async_trait;

use keystock_core::AppResult;
use keystock_domain::{
    AssignmentUpsert, Company, CompanyId, CompanyMember, CompanyRole, CompanyRoleAssignment,
    UserId,
};

/// Repository port for company role assignments.
#[async_trait]
pub trait RoleAssignmentRepository: Send + Sync {
    /// Creates or reactivates the single assignment row for `(user_id, company)`.
    ///
    /// Implementations must make this an atomic read-modify-write so that
    /// concurrent calls for the same pair leave exactly one row. The row's
    /// tenant is always the company's tenant.
    async fn upsert_company_assignment(
        &self,
        user_id: UserId,
        company: Company,
        role: CompanyRole,
    ) -> AppResult<AssignmentUpsert>;

    /// Deactivates the active assignment for the pair, returning the updated row.
    ///
    /// Returns `None` when no active row exists.
    async fn deactivate_company_assignment(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> AppResult<Option<CompanyRoleAssignment>>;

    /// Lists active assignments of one user across companies.
    async fn list_active_assignments_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<CompanyRoleAssignment>>;

    /// Lists active assignments of one company joined with member display data.
    async fn list_active_members_for_company(
        &self,
        company_id: CompanyId,
    ) -> AppResult<Vec<CompanyMember>>;
}
