use async_trait::async_trait;

use keystock_application::AuthorizationRepository;
use keystock_core::{AppError, AppResult, TenantId};
use keystock_domain::{CompanyId, UserId};

use sqlx::{FromRow, PgPool};

/// PostgreSQL-backed repository for role lookups.
#[derive(Clone)]
pub struct PostgresAuthorizationRepository {
    pool: PgPool,
}

impl PostgresAuthorizationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    role: String,
}

#[async_trait]
impl AuthorizationRepository for PostgresAuthorizationRepository {
    async fn list_active_tenant_roles(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> AppResult<Vec<String>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT role
            FROM user_tenant_roles
            WHERE user_id = $1
                AND tenant_id = $2
                AND active
            ORDER BY created_at, role
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load tenant roles for user '{user_id}' in tenant '{tenant_id}': {error}"
            ))
        })?;

        Ok(rows.into_iter().map(|row| row.role).collect())
    }

    async fn find_active_company_role(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> AppResult<Option<String>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT role
            FROM user_company_roles
            WHERE user_id = $1
                AND company_id = $2
                AND active
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(company_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load company role for user '{user_id}' in company '{company_id}': {error}"
            ))
        })?;

        Ok(row.map(|row| row.role))
    }
}
