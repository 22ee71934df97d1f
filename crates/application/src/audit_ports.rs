use async_trait::async_trait;

use keystock_core::{AppResult, RequestId, TenantId};
use keystock_domain::{ActorContext, AuditRecord, AuditStatus, AuditValues, CompanyId, UserId};

/// Append-only audit payload handed to the store.
///
/// The store assigns the record id and the write timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    /// Actor, scope and request metadata.
    pub context: ActorContext,
    /// Stored action name, `{ENTITY_TYPE}_{VERB}`.
    pub action: String,
    /// Entity type tag.
    pub entity_type: String,
    /// Entity identifier.
    pub entity_id: String,
    /// Values before the mutation.
    pub old_values: Option<AuditValues>,
    /// Values after the mutation.
    pub new_values: Option<AuditValues>,
    /// Outcome.
    pub status: AuditStatus,
    /// Human-readable summary or error text.
    pub notes: Option<String>,
}

/// Port for persisting append-only audit records.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persists one audit record.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}

/// Query parameters for tenant audit log reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogQuery {
    /// Tenant scope, always required.
    pub tenant_id: TenantId,
    /// Optional company filter.
    pub company_id: Option<CompanyId>,
    /// Optional entity type filter.
    pub entity_type: Option<String>,
    /// Optional entity id filter.
    pub entity_id: Option<String>,
    /// Optional action filter.
    pub action: Option<String>,
    /// Optional actor filter.
    pub actor_user_id: Option<UserId>,
    /// Optional request correlation filter.
    pub request_id: Option<RequestId>,
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for offset pagination.
    pub offset: usize,
}

impl AuditLogQuery {
    /// Largest page size adapters return.
    pub const MAX_LIMIT: usize = 200;
    /// Largest offset adapters honor.
    pub const MAX_OFFSET: usize = 5_000;

    /// Creates an unfiltered query for one tenant.
    #[must_use]
    pub fn for_tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            company_id: None,
            entity_type: None,
            entity_id: None,
            action: None,
            actor_user_id: None,
            request_id: None,
            limit: 50,
            offset: 0,
        }
    }

    /// Returns the limit clamped to the supported page size.
    #[must_use]
    pub fn capped_limit(&self) -> usize {
        self.limit.clamp(1, Self::MAX_LIMIT)
    }

    /// Returns the offset capped to the supported window.
    #[must_use]
    pub fn capped_offset(&self) -> usize {
        self.offset.min(Self::MAX_OFFSET)
    }
}

/// Repository port for reading tenant audit logs.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Lists tenant audit records, newest first.
    async fn list_records(&self, query: AuditLogQuery) -> AppResult<Vec<AuditRecord>>;
}
