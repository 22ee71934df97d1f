use async_trait::async_trait;

use keystock_core::AppResult;
use keystock_domain::{Company, CompanyId, UserId, UserSummary};

/// Read-only port over the identity and tenancy store.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Finds a company and its owning tenant.
    async fn find_company(&self, company_id: CompanyId) -> AppResult<Option<Company>>;

    /// Finds a user's display data.
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserSummary>>;
}
