use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use keystock_core::{AppError, AppResult, TenantId};
use keystock_domain::{
    ActorContext, AuditStatus, Company, CompanyId, Permission, TenantRole, UserId, UserSummary,
};

use crate::{AuditEvent, AuditRepository, AuditTrail, IdentityRepository};

use super::{AccessLevel, AuthorizationRepository, AuthorizationService};

#[derive(Default)]
struct FakeAuditRepository {
    events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

#[derive(Default)]
struct FakeIdentityRepository {
    companies: HashMap<CompanyId, Company>,
}

#[async_trait]
impl IdentityRepository for FakeIdentityRepository {
    async fn find_company(&self, company_id: CompanyId) -> AppResult<Option<Company>> {
        Ok(self.companies.get(&company_id).copied())
    }

    async fn find_user(&self, _user_id: UserId) -> AppResult<Option<UserSummary>> {
        Ok(None)
    }
}

#[derive(Default)]
struct FakeAuthorizationRepository {
    tenant_roles: HashMap<(UserId, TenantId), Vec<String>>,
    company_roles: HashMap<(UserId, CompanyId), String>,
}

#[async_trait]
impl AuthorizationRepository for FakeAuthorizationRepository {
    async fn list_active_tenant_roles(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> AppResult<Vec<String>> {
        Ok(self
            .tenant_roles
            .get(&(user_id, tenant_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn find_active_company_role(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> AppResult<Option<String>> {
        Ok(self.company_roles.get(&(user_id, company_id)).cloned())
    }
}

struct Fixture {
    tenant_id: TenantId,
    company_id: CompanyId,
    other_tenant_company_id: CompanyId,
    identity: FakeIdentityRepository,
    grants: FakeAuthorizationRepository,
}

impl Fixture {
    fn new() -> Self {
        let tenant_id = TenantId::new();
        let company_id = CompanyId::new();
        let other_tenant_company_id = CompanyId::new();
        let identity = FakeIdentityRepository {
            companies: HashMap::from([
                (company_id, Company::new(company_id, tenant_id)),
                (
                    other_tenant_company_id,
                    Company::new(other_tenant_company_id, TenantId::new()),
                ),
            ]),
        };

        Self {
            tenant_id,
            company_id,
            other_tenant_company_id,
            identity,
            grants: FakeAuthorizationRepository::default(),
        }
    }

    fn grant_tenant_role(&mut self, user_id: UserId, role: &str) {
        self.grants
            .tenant_roles
            .entry((user_id, self.tenant_id))
            .or_default()
            .push(role.to_owned());
    }

    fn grant_company_role(&mut self, user_id: UserId, role: &str) {
        self.grants
            .company_roles
            .insert((user_id, self.company_id), role.to_owned());
    }

    fn build(self) -> (AuthorizationService, Arc<FakeAuditRepository>) {
        let audit_repository = Arc::new(FakeAuditRepository::default());
        let service = AuthorizationService::new(
            Arc::new(self.identity),
            Arc::new(self.grants),
            AuditTrail::new(audit_repository.clone()),
        );
        (service, audit_repository)
    }
}

#[tokio::test]
async fn tenant_role_grants_every_permission_despite_company_role() {
    let user_id = UserId::new();
    let mut fixture = Fixture::new();
    fixture.grant_tenant_role(user_id, "OWNER");
    fixture.grant_company_role(user_id, "STAFF");
    let company_id = fixture.company_id;
    let (service, _) = fixture.build();

    for permission in Permission::all() {
        let allowed = service.check(user_id, company_id, *permission).await;
        assert!(matches!(allowed, Ok(true)), "{permission} was not granted");
    }
}

#[tokio::test]
async fn tenant_admin_resolves_to_tenant_wide_access() {
    let user_id = UserId::new();
    let mut fixture = Fixture::new();
    fixture.grant_tenant_role(user_id, "TENANT_ADMIN");
    let company_id = fixture.company_id;
    let (service, _) = fixture.build();

    let access = service.resolve_access(user_id, company_id).await;
    assert_eq!(
        access.ok(),
        Some(AccessLevel::TenantWide(TenantRole::TenantAdmin))
    );
}

#[tokio::test]
async fn tenant_role_does_not_cross_tenants() {
    let user_id = UserId::new();
    let mut fixture = Fixture::new();
    fixture.grant_tenant_role(user_id, "OWNER");
    let other_company_id = fixture.other_tenant_company_id;
    let (service, _) = fixture.build();

    let allowed = service
        .check(user_id, other_company_id, Permission::ViewData)
        .await;
    assert!(matches!(allowed, Ok(false)));
}

#[tokio::test]
async fn unrecognized_tenant_role_falls_through_to_company_role() {
    let user_id = UserId::new();
    let mut fixture = Fixture::new();
    fixture.grant_tenant_role(user_id, "AUDITOR");
    fixture.grant_company_role(user_id, "WAREHOUSE");
    let company_id = fixture.company_id;
    let (service, _) = fixture.build();

    let access = service.resolve_access(user_id, company_id).await;
    assert_eq!(access.ok(), Some(AccessLevel::Company("WAREHOUSE".to_owned())));

    let allowed = service
        .check(user_id, company_id, Permission::DeleteData)
        .await;
    assert!(matches!(allowed, Ok(false)));
}

#[tokio::test]
async fn company_role_follows_the_matrix() {
    let user_id = UserId::new();
    let mut fixture = Fixture::new();
    fixture.grant_company_role(user_id, "FINANCE");
    let company_id = fixture.company_id;
    let (service, _) = fixture.build();

    let approve = service
        .check(user_id, company_id, Permission::ApproveTransactions)
        .await;
    let delete = service
        .check(user_id, company_id, Permission::DeleteData)
        .await;

    assert!(matches!(approve, Ok(true)));
    assert!(matches!(delete, Ok(false)));
}

#[tokio::test]
async fn missing_assignment_is_denied() {
    let fixture = Fixture::new();
    let company_id = fixture.company_id;
    let (service, _) = fixture.build();

    let allowed = service
        .check(UserId::new(), company_id, Permission::ViewData)
        .await;
    assert!(matches!(allowed, Ok(false)));
}

#[tokio::test]
async fn unknown_stored_company_role_fails_closed() {
    let user_id = UserId::new();
    let mut fixture = Fixture::new();
    fixture.grant_company_role(user_id, "SUPERVISOR");
    let company_id = fixture.company_id;
    let (service, _) = fixture.build();

    let permissions = service.list_permissions(user_id, company_id).await;
    assert_eq!(permissions.ok(), Some(BTreeSet::new()));
}

#[tokio::test]
async fn unknown_company_is_not_found() {
    let (service, _) = Fixture::new().build();

    let checked = service
        .check(UserId::new(), CompanyId::new(), Permission::ViewData)
        .await;
    let listed = service
        .list_permissions(UserId::new(), CompanyId::new())
        .await;

    assert!(matches!(checked, Err(AppError::NotFound(_))));
    assert!(matches!(listed, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn list_permissions_follows_precedence() {
    let owner = UserId::new();
    let sales = UserId::new();
    let mut fixture = Fixture::new();
    fixture.grant_tenant_role(owner, "OWNER");
    fixture.grant_company_role(sales, "SALES");
    let company_id = fixture.company_id;
    let (service, _) = fixture.build();

    let owner_permissions = service
        .list_permissions(owner, company_id)
        .await
        .unwrap_or_default();
    let sales_permissions = service
        .list_permissions(sales, company_id)
        .await
        .unwrap_or_default();

    assert_eq!(owner_permissions.len(), Permission::all().len());
    assert_eq!(
        sales_permissions,
        BTreeSet::from([
            Permission::ViewData,
            Permission::CreateData,
            Permission::EditData,
            Permission::ViewReports,
        ])
    );
}

#[tokio::test]
async fn require_permission_records_denial() {
    let user_id = UserId::new();
    let mut fixture = Fixture::new();
    fixture.grant_company_role(user_id, "STAFF");
    let tenant_id = fixture.tenant_id;
    let company_id = fixture.company_id;
    let (service, audit_repository) = fixture.build();

    let result = service
        .require_permission(
            &ActorContext::for_actor(user_id),
            company_id,
            Permission::ManageUsers,
        )
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    let events = audit_repository.events.lock().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, "COMPANY_DENIED");
    assert_eq!(events[0].status, AuditStatus::Failed);
    assert_eq!(events[0].entity_id, company_id.to_string());
    assert_eq!(events[0].context.tenant_id, Some(tenant_id));
    assert_eq!(events[0].context.company_id, Some(company_id));
    assert!(
        events[0]
            .notes
            .as_deref()
            .is_some_and(|notes| notes.contains("manage_users"))
    );
}

#[tokio::test]
async fn require_permission_allows_granted_user_without_audit() {
    let user_id = UserId::new();
    let mut fixture = Fixture::new();
    fixture.grant_company_role(user_id, "ADMIN");
    let company_id = fixture.company_id;
    let (service, audit_repository) = fixture.build();

    let result = service
        .require_permission(
            &ActorContext::for_actor(user_id),
            company_id,
            Permission::ManageSettings,
        )
        .await;

    assert!(result.is_ok());
    assert!(audit_repository.events.lock().await.is_empty());
}

#[tokio::test]
async fn require_permission_denies_anonymous_caller() {
    let fixture = Fixture::new();
    let tenant_id = fixture.tenant_id;
    let company_id = fixture.company_id;
    let (service, audit_repository) = fixture.build();

    let result = service
        .require_permission(&ActorContext::default(), company_id, Permission::ViewData)
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
    let events = audit_repository.events.lock().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].context.tenant_id, Some(tenant_id));
    assert_eq!(events[0].context.actor_user_id, None);
}

#[tokio::test]
async fn require_permission_on_unknown_company_is_not_found() {
    let user_id = UserId::new();
    let (service, audit_repository) = Fixture::new().build();

    let result = service
        .require_permission(
            &ActorContext::for_actor(user_id),
            CompanyId::new(),
            Permission::ViewData,
        )
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(audit_repository.events.lock().await.is_empty());
}

#[tokio::test]
async fn stored_roles_must_use_the_exact_storage_spelling() {
    let tenant_user = UserId::new();
    let company_user = UserId::new();
    let mut fixture = Fixture::new();
    fixture.grant_tenant_role(tenant_user, " owner");
    fixture.grant_company_role(company_user, "finance");
    let company_id = fixture.company_id;
    let (service, _) = fixture.build();

    let tenant_access = service.resolve_access(tenant_user, company_id).await;
    let company_permissions = service.list_permissions(company_user, company_id).await;

    assert_eq!(tenant_access.ok(), Some(AccessLevel::None));
    assert_eq!(company_permissions.ok(), Some(BTreeSet::new()));
}
