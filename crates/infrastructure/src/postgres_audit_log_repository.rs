use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use keystock_application::{AuditLogQuery, AuditLogRepository};
use keystock_core::{AppError, AppResult, RequestId, TenantId};
use keystock_domain::{AuditRecord, AuditStatus, AuditValues, CompanyId, UserId};

/// PostgreSQL-backed repository for audit log reads.
#[derive(Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditRecordRow {
    id: Uuid,
    tenant_id: Option<Uuid>,
    company_id: Option<Uuid>,
    actor_user_id: Option<Uuid>,
    request_id: Option<Uuid>,
    action: String,
    entity_type: String,
    entity_id: String,
    old_values: Option<Json<AuditValues>>,
    new_values: Option<Json<AuditValues>>,
    status: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditRecordRow> for AuditRecord {
    type Error = AppError;

    fn try_from(row: AuditRecordRow) -> Result<Self, Self::Error> {
        let status = AuditStatus::from_str(row.status.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "failed to decode status of audit record '{}': {error}",
                row.id
            ))
        })?;

        Ok(Self {
            record_id: row.id,
            tenant_id: row.tenant_id.map(TenantId::from_uuid),
            company_id: row.company_id.map(CompanyId::from_uuid),
            actor_user_id: row.actor_user_id.map(UserId::from_uuid),
            request_id: row.request_id.map(RequestId::from_uuid),
            action: row.action,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            old_values: row.old_values.map(|values| values.0),
            new_values: row.new_values.map(|values| values.0),
            status,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn list_records(&self, query: AuditLogQuery) -> AppResult<Vec<AuditRecord>> {
        let capped_limit = query.capped_limit() as i64;
        let capped_offset = query.capped_offset() as i64;
        let rows = sqlx::query_as::<_, AuditRecordRow>(
            r#"
            SELECT
                id,
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
            FROM audit_records
            WHERE tenant_id = $1
                AND ($2::UUID IS NULL OR company_id = $2)
                AND ($3::TEXT IS NULL OR entity_type = $3)
                AND ($4::TEXT IS NULL OR entity_id = $4)
                AND ($5::TEXT IS NULL OR action = $5)
                AND ($6::UUID IS NULL OR actor_user_id = $6)
                AND ($7::UUID IS NULL OR request_id = $7)
            ORDER BY created_at DESC, id DESC
            LIMIT $8
            OFFSET $9
            "#,
        )
        .bind(query.tenant_id.as_uuid())
        .bind(query.company_id.map(|company_id| company_id.as_uuid()))
        .bind(query.entity_type)
        .bind(query.entity_id)
        .bind(query.action)
        .bind(query.actor_user_id.map(|user_id| user_id.as_uuid()))
        .bind(query.request_id.map(|request_id| request_id.as_uuid()))
        .bind(capped_limit)
        .bind(capped_offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list audit records: {error}")))?;

        rows.into_iter().map(AuditRecord::try_from).collect()
    }
}
