use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use keystock_application::RoleAssignmentRepository;
use keystock_core::{AppError, AppResult, TenantId};
use keystock_domain::{
    AssignmentId, AssignmentUpsert, Company, CompanyId, CompanyMember, CompanyRole,
    CompanyRoleAssignment, UserId, UserSummary,
};

/// PostgreSQL-backed repository for company role assignments.
///
/// Upserts for one `(user, company)` pair are serialized with a transaction
/// scoped advisory lock, so the row read as `previous` is the row the write
/// replaced even when the pair has no row yet.
#[derive(Clone)]
pub struct PostgresRoleAssignmentRepository {
    pool: PgPool,
}

impl PostgresRoleAssignmentRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    id: Uuid,
    user_id: Uuid,
    company_id: Uuid,
    tenant_id: Uuid,
    role: String,
    active: bool,
    assigned_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AssignmentRow> for CompanyRoleAssignment {
    type Error = AppError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        let role = CompanyRole::from_str(row.role.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "failed to decode company role '{}' of assignment '{}': {error}",
                row.role, row.id
            ))
        })?;

        Ok(Self {
            assignment_id: AssignmentId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            company_id: CompanyId::from_uuid(row.company_id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            role,
            active: row.active,
            assigned_at: row.assigned_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MemberRow {
    #[sqlx(flatten)]
    assignment: AssignmentRow,
    display_name: String,
    email: Option<String>,
}

#[async_trait]
impl RoleAssignmentRepository for PostgresRoleAssignmentRepository {
    async fn upsert_company_assignment(
        &self,
        user_id: UserId,
        company: Company,
        role: CompanyRole,
    ) -> AppResult<AssignmentUpsert> {
        let company_id = company.id();
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to begin role assignment transaction for user '{user_id}' in company '{company_id}': {error}"
            ))
        })?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("user_company_roles:{user_id}:{company_id}"))
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to lock role assignment: {error}"))
            })?;

        let previous = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT id, user_id, company_id, tenant_id, role, active, assigned_at, updated_at
            FROM user_company_roles
            WHERE user_id = $1 AND company_id = $2
            FOR UPDATE
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(company_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load current role assignment: {error}"))
        })?
        .map(CompanyRoleAssignment::try_from)
        .transpose()?;

        let row = sqlx::query_as::<_, AssignmentRow>(
            r#"
            INSERT INTO user_company_roles (user_id, company_id, tenant_id, role, active)
            VALUES ($1, $2, $3, $4, true)
            ON CONFLICT (user_id, company_id) DO UPDATE
            SET role = EXCLUDED.role,
                active = true,
                updated_at = now()
            RETURNING id, user_id, company_id, tenant_id, role, active, assigned_at, updated_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(company_id.as_uuid())
        .bind(company.tenant_id().as_uuid())
        .bind(role.as_str())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| {
            if let sqlx::Error::Database(database_error) = &error {
                match database_error.code().as_deref() {
                    Some("23503") => {
                        return AppError::NotFound(format!(
                            "user '{user_id}' or company '{company_id}' was not found"
                        ));
                    }
                    Some("23505" | "23514") => {
                        return AppError::Conflict(format!(
                            "role assignment for user '{user_id}' in company '{company_id}' \
                             violates a store constraint: {database_error}"
                        ));
                    }
                    _ => {}
                }
            }

            AppError::Internal(format!("failed to upsert role assignment: {error}"))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit role assignment transaction for user '{user_id}' in company '{company_id}': {error}"
            ))
        })?;

        Ok(AssignmentUpsert {
            previous,
            assignment: CompanyRoleAssignment::try_from(row)?,
        })
    }

    async fn deactivate_company_assignment(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> AppResult<Option<CompanyRoleAssignment>> {
        let row = sqlx::query_as::<_, AssignmentRow>(
            r#"
            UPDATE user_company_roles
            SET active = false,
                updated_at = now()
            WHERE user_id = $1
                AND company_id = $2
                AND active
            RETURNING id, user_id, company_id, tenant_id, role, active, assigned_at, updated_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(company_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to deactivate role assignment: {error}"))
        })?;

        row.map(CompanyRoleAssignment::try_from).transpose()
    }

    async fn list_active_assignments_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<CompanyRoleAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT id, user_id, company_id, tenant_id, role, active, assigned_at, updated_at
            FROM user_company_roles
            WHERE user_id = $1
                AND active
            ORDER BY assigned_at, company_id
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list role assignments for user '{user_id}': {error}"
            ))
        })?;

        rows.into_iter()
            .map(CompanyRoleAssignment::try_from)
            .collect()
    }

    async fn list_active_members_for_company(
        &self,
        company_id: CompanyId,
    ) -> AppResult<Vec<CompanyMember>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT
                roles.id,
                roles.user_id,
                roles.company_id,
                roles.tenant_id,
                roles.role,
                roles.active,
                roles.assigned_at,
                roles.updated_at,
                users.display_name,
                users.email
            FROM user_company_roles AS roles
            INNER JOIN users
                ON users.id = roles.user_id
            WHERE roles.company_id = $1
                AND roles.active
            ORDER BY users.display_name, roles.user_id
            "#,
        )
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list members of company '{company_id}': {error}"
            ))
        })?;

        rows.into_iter()
            .map(|row| {
                let user = UserSummary {
                    user_id: UserId::from_uuid(row.assignment.user_id),
                    display_name: row.display_name,
                    email: row.email,
                };

                Ok(CompanyMember {
                    assignment: CompanyRoleAssignment::try_from(row.assignment)?,
                    user,
                })
            })
            .collect()
    }
}
