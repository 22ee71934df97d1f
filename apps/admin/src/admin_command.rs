use std::str::FromStr;

use keystock_core::{AppError, TenantId};
use keystock_domain::{CompanyId, Permission, UserId};

const USAGE: &str = "usage: keystock-admin <migrate | check <user> <company> <permission> | \
permissions <user> <company> | assign <user> <company> <role> | remove <user> <company> | \
roles <user> | members <company> | audit <tenant> [limit]>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Migrate,
    Check {
        user_id: UserId,
        company_id: CompanyId,
        permission: Permission,
    },
    Permissions {
        user_id: UserId,
        company_id: CompanyId,
    },
    Assign {
        user_id: UserId,
        company_id: CompanyId,
        role: String,
    },
    Remove {
        user_id: UserId,
        company_id: CompanyId,
    },
    Roles {
        user_id: UserId,
    },
    Members {
        company_id: CompanyId,
    },
    Audit {
        tenant_id: TenantId,
        limit: usize,
    },
}

impl AdminCommand {
    pub fn parse(args: &[String]) -> Result<Self, AppError> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        match args.as_slice() {
            ["migrate"] => Ok(Self::Migrate),
            ["check", user_id, company_id, permission] => Ok(Self::Check {
                user_id: UserId::parse(user_id)?,
                company_id: CompanyId::parse(company_id)?,
                permission: Permission::from_str(permission)?,
            }),
            ["permissions", user_id, company_id] => Ok(Self::Permissions {
                user_id: UserId::parse(user_id)?,
                company_id: CompanyId::parse(company_id)?,
            }),
            ["assign", user_id, company_id, role] => Ok(Self::Assign {
                user_id: UserId::parse(user_id)?,
                company_id: CompanyId::parse(company_id)?,
                role: (*role).to_owned(),
            }),
            ["remove", user_id, company_id] => Ok(Self::Remove {
                user_id: UserId::parse(user_id)?,
                company_id: CompanyId::parse(company_id)?,
            }),
            ["roles", user_id] => Ok(Self::Roles {
                user_id: UserId::parse(user_id)?,
            }),
            ["members", company_id] => Ok(Self::Members {
                company_id: CompanyId::parse(company_id)?,
            }),
            ["audit", tenant_id] => Ok(Self::Audit {
                tenant_id: TenantId::parse(tenant_id)?,
                limit: 50,
            }),
            ["audit", tenant_id, limit] => Ok(Self::Audit {
                tenant_id: TenantId::parse(tenant_id)?,
                limit: limit.parse::<usize>().map_err(|error| {
                    AppError::Validation(format!("invalid audit limit '{limit}': {error}"))
                })?,
            }),
            _ => Err(AppError::Validation(USAGE.to_owned())),
        }
    }
}
