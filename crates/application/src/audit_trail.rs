use std::fmt::Display;
use std::sync::Arc;

use tracing::warn;

use keystock_core::AppResult;
use keystock_domain::{
    ActorContext, AuditAction, AuditEntityType, AuditRecord, AuditStatus, AuditValues,
    changed_fields, changed_fields_note, supplied_fields, supplied_fields_note,
};

use crate::{AuditEvent, AuditLogQuery, AuditLogRepository, AuditRepository};

/// One audit entry before actor context is attached.
///
/// The same value type serves every audited entity; the entity type tag and
/// the value maps are the only per-entity inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    entity_type: AuditEntityType,
    action: AuditAction,
    entity_id: String,
    old_values: Option<AuditValues>,
    new_values: Option<AuditValues>,
    status: AuditStatus,
    notes: Option<String>,
}

impl AuditEntry {
    /// Creates a successful entry without value snapshots.
    #[must_use]
    pub fn new(
        entity_type: AuditEntityType,
        action: AuditAction,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            entity_type,
            action,
            entity_id: entity_id.into(),
            old_values: None,
            new_values: None,
            status: AuditStatus::Success,
            notes: None,
        }
    }

    /// Creates a `{TYPE}_CREATED` entry.
    #[must_use]
    pub fn created(
        entity_type: AuditEntityType,
        entity_id: impl Into<String>,
        new_values: AuditValues,
    ) -> Self {
        Self::new(entity_type, AuditAction::Created, entity_id).with_new_values(new_values)
    }

    /// Creates a `{TYPE}_UPDATED` entry.
    #[must_use]
    pub fn updated(
        entity_type: AuditEntityType,
        entity_id: impl Into<String>,
        old_values: AuditValues,
        new_values: AuditValues,
    ) -> Self {
        Self::new(entity_type, AuditAction::Updated, entity_id)
            .with_old_values(old_values)
            .with_new_values(new_values)
    }

    /// Creates a `{TYPE}_DELETED` entry.
    #[must_use]
    pub fn deleted(
        entity_type: AuditEntityType,
        entity_id: impl Into<String>,
        old_values: AuditValues,
    ) -> Self {
        Self::new(entity_type, AuditAction::Deleted, entity_id).with_old_values(old_values)
    }

    /// Creates a failed entry carrying the error text and no value snapshots.
    #[must_use]
    pub fn failed(
        entity_type: AuditEntityType,
        action: AuditAction,
        entity_id: impl Into<String>,
        error: impl Display,
    ) -> Self {
        Self::new(entity_type, action, entity_id)
            .with_status(AuditStatus::Failed)
            .with_notes(error.to_string())
    }

    /// Attaches the values before the mutation.
    #[must_use]
    pub fn with_old_values(mut self, old_values: AuditValues) -> Self {
        self.old_values = Some(old_values);
        self
    }

    /// Attaches the values after the mutation.
    #[must_use]
    pub fn with_new_values(mut self, new_values: AuditValues) -> Self {
        self.new_values = Some(new_values);
        self
    }

    /// Overrides the outcome.
    #[must_use]
    pub fn with_status(mut self, status: AuditStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets explicit notes, replacing the synthesized summary.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Returns the stored action name.
    #[must_use]
    pub fn action_name(&self) -> String {
        self.action.qualified(&self.entity_type)
    }

    fn into_event(self, context: &ActorContext) -> AuditEvent {
        let action = self.action_name();
        let failed = self.status == AuditStatus::Failed;
        let notes = self.notes.or_else(|| {
            if failed {
                return None;
            }

            match (&self.old_values, &self.new_values) {
                (Some(old_values), Some(new_values)) => Some(changed_fields_note(
                    &changed_fields(old_values, new_values),
                )),
                (None, Some(new_values)) => {
                    Some(supplied_fields_note(&supplied_fields(new_values)))
                }
                _ => None,
            }
        });

        // Failed attempts never carry payloads.
        let (old_values, new_values) = if failed {
            (None, None)
        } else {
            (self.old_values, self.new_values)
        };

        AuditEvent {
            context: context.clone(),
            action,
            entity_type: self.entity_type.as_str().to_owned(),
            entity_id: self.entity_id,
            old_values,
            new_values,
            status: self.status,
            notes,
        }
    }
}

/// Best-effort writer for the compliance audit log.
///
/// Writes never fail the caller: store errors are logged and dropped so that a
/// completed business mutation is never reported as failed because its audit
/// record could not be stored.
#[derive(Clone)]
pub struct AuditTrail {
    repository: Arc<dyn AuditRepository>,
}

impl AuditTrail {
    /// Creates an audit trail over an append-only repository.
    #[must_use]
    pub fn new(repository: Arc<dyn AuditRepository>) -> Self {
        Self { repository }
    }

    /// Persists one audit record, logging instead of failing on store errors.
    pub async fn record(&self, context: &ActorContext, entry: AuditEntry) {
        let event = entry.into_event(context);
        let action = event.action.clone();
        let entity_id = event.entity_id.clone();

        if let Err(error) = self.repository.append_event(event).await {
            warn!(
                error = %error,
                action = %action,
                entity_id = %entity_id,
                request_id = ?context.request_id,
                "failed to append audit record"
            );
        }
    }

    /// Records a denied or failed attempt with the error text as notes.
    pub async fn record_failure(
        &self,
        context: &ActorContext,
        entity_type: AuditEntityType,
        action: AuditAction,
        entity_id: impl Into<String>,
        error: impl Display,
    ) {
        self.record(
            context,
            AuditEntry::failed(entity_type, action, entity_id, error),
        )
        .await;
    }
}

/// Application service for tenant-scoped audit log reads.
#[derive(Clone)]
pub struct AuditLogService {
    repository: Arc<dyn AuditLogRepository>,
}

impl AuditLogService {
    /// Creates a service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuditLogRepository>) -> Self {
        Self { repository }
    }

    /// Lists tenant audit records, newest first.
    pub async fn list_records(&self, query: AuditLogQuery) -> AppResult<Vec<AuditRecord>> {
        self.repository.list_records(query).await
    }
}
