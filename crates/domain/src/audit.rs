//! Audit vocabulary and the value-map helpers used to summarize mutations.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use keystock_core::{AppError, AppResult, RequestId, TenantId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{CompanyId, UserId};

/// Field name to value snapshot captured before or after a mutation.
pub type AuditValues = BTreeMap<String, Value>;

/// Entity type tag carried by audit records, e.g. `SALES_ORDER`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditEntityType(Cow<'static, str>);

impl AuditEntityType {
    /// Company role assignments managed by this workspace.
    pub const USER_COMPANY_ROLE: Self = Self(Cow::Borrowed("USER_COMPANY_ROLE"));
    /// Companies, used as the target of access decisions.
    pub const COMPANY: Self = Self(Cow::Borrowed("COMPANY"));
    /// Company profile records.
    pub const COMPANY_PROFILE: Self = Self(Cow::Borrowed("COMPANY_PROFILE"));
    /// Warehouses.
    pub const WAREHOUSE: Self = Self(Cow::Borrowed("WAREHOUSE"));
    /// Stock records.
    pub const STOCK_RECORD: Self = Self(Cow::Borrowed("STOCK_RECORD"));
    /// Sales orders.
    pub const SALES_ORDER: Self = Self(Cow::Borrowed("SALES_ORDER"));
    /// Goods receipts.
    pub const GOODS_RECEIPT: Self = Self(Cow::Borrowed("GOODS_RECEIPT"));
    /// Payments.
    pub const PAYMENT: Self = Self(Cow::Borrowed("PAYMENT"));

    /// Creates a validated entity type tag for callers outside the built-in set.
    ///
    /// Tags are upper-case ASCII letters, digits and underscores, starting with
    /// a letter.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let mut characters = value.chars();
        let starts_with_letter = characters
            .next()
            .is_some_and(|character| character.is_ascii_uppercase());
        let rest_is_valid = characters.all(|character| {
            character.is_ascii_uppercase() || character.is_ascii_digit() || character == '_'
        });

        if !starts_with_letter || !rest_is_valid {
            return Err(AppError::Validation(format!(
                "audit entity type '{value}' must be SCREAMING_SNAKE_CASE"
            )));
        }

        Ok(Self(Cow::Owned(value)))
    }

    /// Returns the tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AuditEntityType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Verb half of an audit action. The stored action is `{ENTITY_TYPE}_{VERB}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Record created.
    Created,
    /// Record updated.
    Updated,
    /// Record deleted.
    Deleted,
    /// Access granted or changed.
    Assigned,
    /// Access revoked.
    Removed,
    /// Transaction approved.
    Approved,
    /// Transaction cancelled.
    Cancelled,
    /// Records imported in bulk.
    Imported,
    /// Authorization check refused the caller.
    Denied,
}

impl AuditAction {
    /// Returns a stable storage value for this verb.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Updated => "UPDATED",
            Self::Deleted => "DELETED",
            Self::Assigned => "ASSIGNED",
            Self::Removed => "REMOVED",
            Self::Approved => "APPROVED",
            Self::Cancelled => "CANCELLED",
            Self::Imported => "IMPORTED",
            Self::Denied => "DENIED",
        }
    }

    /// Builds the stored action name for an entity type.
    #[must_use]
    pub fn qualified(&self, entity_type: &AuditEntityType) -> String {
        format!("{}_{}", entity_type.as_str(), self.as_str())
    }
}

/// Outcome recorded on an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    /// Mutation completed.
    Success,
    /// Mutation was denied or failed.
    Failed,
    /// Mutation completed for part of its input.
    Partial,
}

impl AuditStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Partial => "PARTIAL",
        }
    }
}

impl FromStr for AuditStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            "PARTIAL" => Ok(Self::Partial),
            _ => Err(AppError::Validation(format!(
                "unknown audit status '{value}'"
            ))),
        }
    }
}

/// Who did something, where, and as part of which request.
///
/// Every field is optional; callers pass along whatever they know.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    /// Tenant the action happened in.
    pub tenant_id: Option<TenantId>,
    /// Company the action happened in.
    pub company_id: Option<CompanyId>,
    /// Acting user.
    pub actor_user_id: Option<UserId>,
    /// Correlates every record written by one logical operation.
    pub request_id: Option<RequestId>,
    /// Caller IP address.
    pub ip_address: Option<String>,
    /// Caller user agent.
    pub user_agent: Option<String>,
}

impl ActorContext {
    /// Creates a context for an acting user.
    #[must_use]
    pub fn for_actor(actor_user_id: UserId) -> Self {
        Self {
            actor_user_id: Some(actor_user_id),
            ..Self::default()
        }
    }

    /// Sets the request correlation id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Sets the caller's network metadata.
    #[must_use]
    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    /// Fills tenant and company scope that the caller left empty.
    #[must_use]
    pub fn scoped_to(mut self, tenant_id: TenantId, company_id: Option<CompanyId>) -> Self {
        self.tenant_id.get_or_insert(tenant_id);
        if let Some(company_id) = company_id {
            self.company_id.get_or_insert(company_id);
        }
        self
    }
}

/// Immutable audit record as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Stable record identifier.
    pub record_id: Uuid,
    /// Tenant scope.
    pub tenant_id: Option<TenantId>,
    /// Company scope.
    pub company_id: Option<CompanyId>,
    /// Acting user.
    pub actor_user_id: Option<UserId>,
    /// Request correlation id.
    pub request_id: Option<RequestId>,
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
    /// Caller IP address.
    pub ip_address: Option<String>,
    /// Caller user agent.
    pub user_agent: Option<String>,
    /// Human-readable summary or error text.
    pub notes: Option<String>,
    /// Wall-clock write time.
    pub created_at: DateTime<Utc>,
}

/// Returns the keys of `new` whose value differs from `old`.
///
/// Keys only present in `new` count as changed. Keys only present in `old` are
/// ignored, since update payloads are allowed to be partial.
#[must_use]
pub fn changed_fields(old: &AuditValues, new: &AuditValues) -> BTreeSet<String> {
    new.iter()
        .filter(|(key, value)| old.get(key.as_str()) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect()
}

/// Returns the keys of a create payload that hold a user-supplied value.
#[must_use]
pub fn supplied_fields(new: &AuditValues) -> BTreeSet<String> {
    new.iter()
        .filter(|(_, value)| !is_default_value(value))
        .map(|(key, _)| key.clone())
        .collect()
}

/// Formats the note attached to update records.
#[must_use]
pub fn changed_fields_note(fields: &BTreeSet<String>) -> String {
    format!("Changed fields: [{}]", join_fields(fields))
}

/// Formats the note attached to create records.
#[must_use]
pub fn supplied_fields_note(fields: &BTreeSet<String>) -> String {
    format!("Fields supplied: [{}]", join_fields(fields))
}

fn join_fields(fields: &BTreeSet<String>) -> String {
    fields
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_default_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::String(text) => matches!(text.trim(), "" | "0" | "0.00"),
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;
    use serde_json::json;

    use super::{
        ActorContext, AuditAction, AuditEntityType, AuditValues, changed_fields,
        changed_fields_note, supplied_fields, supplied_fields_note,
    };
    use crate::{CompanyId, UserId};
    use keystock_core::TenantId;

    fn values(pairs: &[(&str, serde_json::Value)]) -> AuditValues {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), value.clone()))
            .collect()
    }

    #[test]
    fn changed_fields_reports_modified_and_added_keys() {
        let old = values(&[("name", json!("A")), ("qty", json!("10"))]);
        let new = values(&[
            ("name", json!("A")),
            ("qty", json!("20")),
            ("note", json!("x")),
        ]);

        let changed = changed_fields(&old, &new);

        assert_eq!(
            changed,
            BTreeSet::from(["qty".to_owned(), "note".to_owned()])
        );
        assert_eq!(changed_fields_note(&changed), "Changed fields: [note, qty]");
    }

    #[test]
    fn changed_fields_ignores_keys_missing_from_new() {
        let old = values(&[("name", json!("A")), ("qty", json!("10"))]);
        let new = values(&[("qty", json!("10"))]);

        assert!(changed_fields(&old, &new).is_empty());
    }

    #[test]
    fn supplied_fields_skips_default_looking_values() {
        let new = values(&[
            ("name", json!("Main warehouse")),
            ("code", json!("")),
            ("capacity", json!("0")),
            ("price", json!("0.00")),
            ("is_default", json!(false)),
            ("is_active", json!(true)),
            ("quantity", json!(0)),
            ("notes", json!(null)),
            ("zero_padded", json!("007")),
        ]);

        let supplied = supplied_fields(&new);

        assert_eq!(
            supplied,
            BTreeSet::from([
                "is_active".to_owned(),
                "name".to_owned(),
                "zero_padded".to_owned(),
            ])
        );
        assert_eq!(
            supplied_fields_note(&supplied),
            "Fields supplied: [is_active, name, zero_padded]"
        );
    }

    #[test]
    fn entity_type_requires_screaming_snake_case() {
        assert!(AuditEntityType::new("SALES_ORDER").is_ok());
        assert!(AuditEntityType::new("sales_order").is_err());
        assert!(AuditEntityType::new("_ORDER").is_err());
        assert!(AuditEntityType::new("").is_err());
    }

    #[test]
    fn qualified_action_joins_entity_type_and_verb() {
        assert_eq!(
            AuditAction::Assigned.qualified(&AuditEntityType::USER_COMPANY_ROLE),
            "USER_COMPANY_ROLE_ASSIGNED"
        );

        let custom = AuditEntityType::new("PURCHASE_INVOICE");
        assert_eq!(
            custom.map(|entity_type| AuditAction::Created.qualified(&entity_type)).ok(),
            Some("PURCHASE_INVOICE_CREATED".to_owned())
        );
    }

    #[test]
    fn scoped_to_keeps_caller_supplied_scope() {
        let caller_tenant = TenantId::new();
        let caller_company = CompanyId::new();
        let context = ActorContext {
            tenant_id: Some(caller_tenant),
            company_id: Some(caller_company),
            ..ActorContext::for_actor(UserId::new())
        }
        .scoped_to(TenantId::new(), Some(CompanyId::new()));

        assert_eq!(context.tenant_id, Some(caller_tenant));
        assert_eq!(context.company_id, Some(caller_company));
    }

    #[test]
    fn scoped_to_fills_missing_scope() {
        let tenant_id = TenantId::new();
        let company_id = CompanyId::new();
        let context = ActorContext::default().scoped_to(tenant_id, Some(company_id));

        assert_eq!(context.tenant_id, Some(tenant_id));
        assert_eq!(context.company_id, Some(company_id));
    }

    proptest! {
        #[test]
        fn identical_maps_have_no_changes(entries in prop::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..8)) {
            let map: AuditValues = entries
                .into_iter()
                .map(|(key, value)| (key, serde_json::Value::String(value)))
                .collect();
            prop_assert!(changed_fields(&map, &map).is_empty());
        }

        #[test]
        fn every_key_of_new_is_changed_against_empty_old(entries in prop::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..8)) {
            let map: AuditValues = entries
                .into_iter()
                .map(|(key, value)| (key, serde_json::Value::String(value)))
                .collect();
            let changed = changed_fields(&AuditValues::new(), &map);
            prop_assert_eq!(changed.len(), map.len());
        }
    }
}
