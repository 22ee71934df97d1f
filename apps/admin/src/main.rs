//! Keystock access administration binary.

#![forbid(unsafe_code)]

mod admin_command;
mod admin_config;
mod admin_services;

use std::env;

use keystock_application::AuditLogQuery;
use keystock_core::{AppError, AppResult, RequestId};
use keystock_domain::{ActorContext, CompanyId, Permission};
use serde_json::{Value, json};
use tracing::info;

use crate::admin_command::AdminCommand;
use crate::admin_config::{AdminConfig, init_tracing};
use crate::admin_services::{AdminServices, build_admin_services, connect_and_migrate};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = AdminCommand::parse(&args)?;
    let config = AdminConfig::load()?;
    let pool = connect_and_migrate(&config).await?;

    if command == AdminCommand::Migrate {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let services = build_admin_services(&pool);
    let context = operator_context(&config);
    info!(
        request_id = ?context.request_id,
        actor_user_id = ?context.actor_user_id,
        "running admin command"
    );

    let output = tokio::time::timeout(
        config.operation_timeout,
        run_command(&services, &context, command),
    )
    .await
    .map_err(|_| {
        AppError::Internal(format!(
            "admin command timed out after {} ms",
            config.operation_timeout.as_millis()
        ))
    })??;

    let rendered = serde_json::to_string_pretty(&output)
        .map_err(|error| AppError::Internal(format!("failed to render output: {error}")))?;
    println!("{rendered}");

    Ok(())
}

fn operator_context(config: &AdminConfig) -> ActorContext {
    let context = match config.actor_user_id {
        Some(actor_user_id) => ActorContext::for_actor(actor_user_id),
        None => ActorContext::default(),
    };

    context
        .with_request_id(config.request_id.unwrap_or_else(RequestId::new))
        .with_client(None, Some(format!("keystock-admin/{}", env!("CARGO_PKG_VERSION"))))
}

async fn run_command(
    services: &AdminServices,
    context: &ActorContext,
    command: AdminCommand,
) -> AppResult<Value> {
    match command {
        AdminCommand::Migrate => Ok(json!({ "migrated": true })),
        AdminCommand::Check {
            user_id,
            company_id,
            permission,
        } => {
            let granted = services
                .authorization_service
                .check(user_id, company_id, permission)
                .await?;

            Ok(json!({
                "user_id": user_id,
                "company_id": company_id,
                "permission": permission.as_str(),
                "granted": granted,
            }))
        }
        AdminCommand::Permissions {
            user_id,
            company_id,
        } => {
            let permissions = services
                .authorization_service
                .list_permissions(user_id, company_id)
                .await?;
            let permissions: Vec<&str> = permissions
                .iter()
                .map(|permission| permission.as_str())
                .collect();

            Ok(json!({
                "user_id": user_id,
                "company_id": company_id,
                "permissions": permissions,
            }))
        }
        AdminCommand::Assign {
            user_id,
            company_id,
            role,
        } => {
            require_user_management(services, context, company_id).await?;
            let assignment = services
                .role_assignment_service
                .assign_user_to_company(context, user_id, company_id, role.as_str())
                .await?;

            to_json(&assignment)
        }
        AdminCommand::Remove {
            user_id,
            company_id,
        } => {
            require_user_management(services, context, company_id).await?;
            services
                .role_assignment_service
                .remove_user_from_company(context, user_id, company_id)
                .await?;

            Ok(json!({
                "user_id": user_id,
                "company_id": company_id,
                "removed": true,
            }))
        }
        AdminCommand::Roles { user_id } => to_json(
            &services
                .role_assignment_service
                .user_company_roles(user_id)
                .await?,
        ),
        AdminCommand::Members { company_id } => to_json(
            &services
                .role_assignment_service
                .company_users(company_id)
                .await?,
        ),
        AdminCommand::Audit { tenant_id, limit } => {
            let mut query = AuditLogQuery::for_tenant(tenant_id);
            query.limit = limit;

            to_json(&services.audit_log_service.list_records(query).await?)
        }
    }
}

/// Acting users need `manage_users` on the company; without an acting user the
/// binary runs as the provisioning operator.
async fn require_user_management(
    services: &AdminServices,
    context: &ActorContext,
    company_id: CompanyId,
) -> AppResult<()> {
    if context.actor_user_id.is_none() {
        return Ok(());
    }

    services
        .authorization_service
        .require_permission(context, company_id, Permission::ManageUsers)
        .await
}

fn to_json<T: serde::Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value)
        .map_err(|error| AppError::Internal(format!("failed to serialize output: {error}")))
}
