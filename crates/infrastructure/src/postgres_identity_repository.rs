use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use keystock_application::IdentityRepository;
use keystock_core::{AppError, AppResult, TenantId};
use keystock_domain::{Company, CompanyId, UserId, UserSummary};

/// PostgreSQL-backed lookups for companies and users.
#[derive(Clone)]
pub struct PostgresIdentityRepository {
    pool: PgPool,
}

impl PostgresIdentityRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct CompanyRow {
    id: Uuid,
    tenant_id: Uuid,
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    display_name: String,
    email: Option<String>,
}

#[async_trait]
impl IdentityRepository for PostgresIdentityRepository {
    async fn find_company(&self, company_id: CompanyId) -> AppResult<Option<Company>> {
        let row = sqlx::query_as::<_, CompanyRow>(
            r#"
            SELECT id, tenant_id
            FROM companies
            WHERE id = $1
            "#,
        )
        .bind(company_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find company '{company_id}': {error}"))
        })?;

        Ok(row.map(|row| {
            Company::new(
                CompanyId::from_uuid(row.id),
                TenantId::from_uuid(row.tenant_id),
            )
        }))
    }

    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserSummary>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, display_name, email
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find user '{user_id}': {error}")))?;

        Ok(row.map(|row| UserSummary {
            user_id: UserId::from_uuid(row.id),
            display_name: row.display_name,
            email: row.email,
        }))
    }
}
