use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;

use keystock_application::{AuditEvent, AuditRepository};
use keystock_core::{AppError, AppResult};

/// PostgreSQL-backed append-only audit repository.
///
/// `created_at` is taken from `clock_timestamp()` so records written inside one
/// transaction still order by write time.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        let context = event.context;

        sqlx::query(
            r#"
            INSERT INTO audit_records (
                tenant_id,
                company_id,
                actor_user_id,
                request_id,
                action,
                entity_type,
                entity_id,
                old_values,
                new_values,
                status,
                ip_address,
                user_agent,
                notes,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, clock_timestamp())
            "#,
        )
        .bind(context.tenant_id.map(|tenant_id| tenant_id.as_uuid()))
        .bind(context.company_id.map(|company_id| company_id.as_uuid()))
        .bind(context.actor_user_id.map(|user_id| user_id.as_uuid()))
        .bind(context.request_id.map(|request_id| request_id.as_uuid()))
        .bind(event.action)
        .bind(event.entity_type)
        .bind(event.entity_id)
        .bind(event.old_values.map(Json))
        .bind(event.new_values.map(Json))
        .bind(event.status.as_str())
        .bind(context.ip_address)
        .bind(context.user_agent)
        .bind(event.notes)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to append audit record: {error}")))?;

        Ok(())
    }
}
