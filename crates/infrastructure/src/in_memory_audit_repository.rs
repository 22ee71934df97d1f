use async_trait::async_trait;
use chrono::Utc;
use keystock_application::{AuditEvent, AuditLogQuery, AuditLogRepository, AuditRepository};
use keystock_core::AppResult;
use keystock_domain::AuditRecord;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory append-only audit log.
///
/// Timestamps are assigned under the write lock and never go backwards, so
/// insertion order and `created_at` order agree.
#[derive(Debug, Default)]
pub struct InMemoryAuditRepository {
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditRepository {
    /// Creates an empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored record in write order.
    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        let mut records = self.records.write().await;
        let now = Utc::now();
        let created_at = records
            .last()
            .map_or(now, |last| last.created_at.max(now));
        let context = event.context;

        records.push(AuditRecord {
            record_id: Uuid::new_v4(),
            tenant_id: context.tenant_id,
            company_id: context.company_id,
            actor_user_id: context.actor_user_id,
            request_id: context.request_id,
            action: event.action,
            entity_type: event.entity_type,
            entity_id: event.entity_id,
            old_values: event.old_values,
            new_values: event.new_values,
            status: event.status,
            ip_address: context.ip_address,
            user_agent: context.user_agent,
            notes: event.notes,
            created_at,
        });

        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditRepository {
    async fn list_records(&self, query: AuditLogQuery) -> AppResult<Vec<AuditRecord>> {
        let records = self.records.read().await;

        Ok(records
            .iter()
            .rev()
            .filter(|record| record.tenant_id == Some(query.tenant_id))
            .filter(|record| {
                query
                    .company_id
                    .is_none_or(|company_id| record.company_id == Some(company_id))
            })
            .filter(|record| {
                query
                    .entity_type
                    .as_ref()
                    .is_none_or(|entity_type| &record.entity_type == entity_type)
            })
            .filter(|record| {
                query
                    .entity_id
                    .as_ref()
                    .is_none_or(|entity_id| &record.entity_id == entity_id)
            })
            .filter(|record| {
                query
                    .action
                    .as_ref()
                    .is_none_or(|action| &record.action == action)
            })
            .filter(|record| {
                query
                    .actor_user_id
                    .is_none_or(|user_id| record.actor_user_id == Some(user_id))
            })
            .filter(|record| {
                query
                    .request_id
                    .is_none_or(|request_id| record.request_id == Some(request_id))
            })
            .skip(query.capped_offset())
            .take(query.capped_limit())
            .cloned()
            .collect())
    }
}
