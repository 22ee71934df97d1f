use std::sync::Arc;

use keystock_application::{
    AuditLogService, AuditTrail, AuthorizationService, RoleAssignmentService,
};
use keystock_core::AppError;
use keystock_infrastructure::{
    MIGRATOR, PostgresAuditLogRepository, PostgresAuditRepository,
    PostgresAuthorizationRepository, PostgresIdentityRepository,
    PostgresRoleAssignmentRepository,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::admin_config::AdminConfig;

#[derive(Clone)]
pub struct AdminServices {
    pub authorization_service: AuthorizationService,
    pub role_assignment_service: RoleAssignmentService,
    pub audit_log_service: AuditLogService,
}

pub async fn connect_and_migrate(config: &AdminConfig) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(config.database_acquire_timeout)
        .connect(config.database_url.as_str())
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    MIGRATOR
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    Ok(pool)
}

pub fn build_admin_services(pool: &PgPool) -> AdminServices {
    let identity_repository = Arc::new(PostgresIdentityRepository::new(pool.clone()));
    let audit_trail = AuditTrail::new(Arc::new(PostgresAuditRepository::new(pool.clone())));

    AdminServices {
        authorization_service: AuthorizationService::new(
            identity_repository.clone(),
            Arc::new(PostgresAuthorizationRepository::new(pool.clone())),
            audit_trail.clone(),
        ),
        role_assignment_service: RoleAssignmentService::new(
            identity_repository,
            Arc::new(PostgresRoleAssignmentRepository::new(pool.clone())),
            audit_trail,
        ),
        audit_log_service: AuditLogService::new(Arc::new(PostgresAuditLogRepository::new(
            pool.clone(),
        ))),
    }
}
