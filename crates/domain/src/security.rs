use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use keystock_core::AppError;
use serde::{Deserialize, Serialize};

/// Atomic capabilities checked by the authorization engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Allows reading business data.
    ViewData,
    /// Allows creating business records.
    CreateData,
    /// Allows editing business records.
    EditData,
    /// Allows deleting business records.
    DeleteData,
    /// Allows approving financial transactions.
    ApproveTransactions,
    /// Allows managing company users and their roles.
    ManageUsers,
    /// Allows reading reports.
    ViewReports,
    /// Allows changing company settings.
    ManageSettings,
}

const ALL_PERMISSIONS: &[Permission] = &[
    Permission::ViewData,
    Permission::CreateData,
    Permission::EditData,
    Permission::DeleteData,
    Permission::ApproveTransactions,
    Permission::ManageUsers,
    Permission::ViewReports,
    Permission::ManageSettings,
];

const FINANCE_PERMISSIONS: &[Permission] = &[
    Permission::ViewData,
    Permission::CreateData,
    Permission::EditData,
    Permission::ApproveTransactions,
    Permission::ViewReports,
];

const SALES_PERMISSIONS: &[Permission] = &[
    Permission::ViewData,
    Permission::CreateData,
    Permission::EditData,
    Permission::ViewReports,
];

const WAREHOUSE_PERMISSIONS: &[Permission] = &[
    Permission::ViewData,
    Permission::CreateData,
    Permission::EditData,
];

const STAFF_PERMISSIONS: &[Permission] = &[Permission::ViewData];

impl Permission {
    /// Returns a stable storage value for this permission.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewData => "view_data",
            Self::CreateData => "create_data",
            Self::EditData => "edit_data",
            Self::DeleteData => "delete_data",
            Self::ApproveTransactions => "approve_transactions",
            Self::ManageUsers => "manage_users",
            Self::ViewReports => "view_reports",
            Self::ManageSettings => "manage_settings",
        }
    }

    /// Returns all known permissions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        ALL_PERMISSIONS
    }
}

impl Display for Permission {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = AppError;

    /// Accepts the storage value as well as the `ViewData` spelling.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .chars()
            .filter(|character| *character != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "viewdata" => Ok(Self::ViewData),
            "createdata" => Ok(Self::CreateData),
            "editdata" => Ok(Self::EditData),
            "deletedata" => Ok(Self::DeleteData),
            "approvetransactions" => Ok(Self::ApproveTransactions),
            "manageusers" => Ok(Self::ManageUsers),
            "viewreports" => Ok(Self::ViewReports),
            "managesettings" => Ok(Self::ManageSettings),
            _ => Err(AppError::Validation(format!(
                "unknown permission value '{value}'"
            ))),
        }
    }
}

/// Tenant-wide roles granting unrestricted access to every company of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenantRole {
    /// Tenant owner.
    Owner,
    /// Tenant administrator.
    TenantAdmin,
}

impl TenantRole {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::TenantAdmin => "TENANT_ADMIN",
        }
    }

    /// Matches a stored role value by its exact storage spelling.
    #[must_use]
    pub fn from_stored(value: &str) -> Option<Self> {
        [Self::Owner, Self::TenantAdmin]
            .into_iter()
            .find(|role| role.as_str() == value)
    }
}

impl Display for TenantRole {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for TenantRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OWNER" => Ok(Self::Owner),
            "TENANT_ADMIN" => Ok(Self::TenantAdmin),
            _ => Err(AppError::Validation(format!(
                "unknown tenant role '{value}'"
            ))),
        }
    }
}

/// Company-scoped roles granting a fixed permission subset inside one company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompanyRole {
    /// Company administrator.
    Admin,
    /// Finance staff.
    Finance,
    /// Sales staff.
    Sales,
    /// Warehouse staff.
    Warehouse,
    /// Read-only staff.
    Staff,
}

impl CompanyRole {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Finance => "FINANCE",
            Self::Sales => "SALES",
            Self::Warehouse => "WAREHOUSE",
            Self::Staff => "STAFF",
        }
    }

    /// Returns all company roles.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[
            Self::Admin,
            Self::Finance,
            Self::Sales,
            Self::Warehouse,
            Self::Staff,
        ]
    }

    /// Returns the fixed permission row of this role.
    #[must_use]
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Self::Admin => ALL_PERMISSIONS,
            Self::Finance => FINANCE_PERMISSIONS,
            Self::Sales => SALES_PERMISSIONS,
            Self::Warehouse => WAREHOUSE_PERMISSIONS,
            Self::Staff => STAFF_PERMISSIONS,
        }
    }

    /// Parses a role requested for a company assignment.
    ///
    /// Tenant-wide role names are rejected here so they can never be created
    /// through the company assignment path.
    pub fn parse_assignable(value: &str) -> Result<Self, AppError> {
        if let Ok(tenant_role) = TenantRole::from_str(value) {
            return Err(AppError::Validation(format!(
                "role '{tenant_role}' is tenant-wide and cannot be assigned to a company"
            )));
        }

        Self::from_str(value)
    }
}

impl Display for CompanyRole {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for CompanyRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "FINANCE" => Ok(Self::Finance),
            "SALES" => Ok(Self::Sales),
            "WAREHOUSE" => Ok(Self::Warehouse),
            "STAFF" => Ok(Self::Staff),
            _ => Err(AppError::Validation(format!(
                "unknown company role '{value}'"
            ))),
        }
    }
}

/// Fixed mapping from company role names to permission sets.
///
/// Lookups take the stored role name so that a value the store holds but this
/// build does not recognize resolves to no permissions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Returns the permission row for a stored role name, empty when unknown.
    ///
    /// Only the exact storage spelling matches; operator input goes through
    /// `CompanyRole::from_str` instead.
    #[must_use]
    pub fn permissions(role: &str) -> &'static [Permission] {
        CompanyRole::all()
            .iter()
            .find(|candidate| candidate.as_str() == role)
            .map(|role| role.permissions())
            .unwrap_or(&[])
    }

    /// Returns whether the role grants the permission.
    #[must_use]
    pub fn has(role: &str, permission: Permission) -> bool {
        Self::permissions(role).contains(&permission)
    }

    /// Returns the full permission set of the role.
    #[must_use]
    pub fn all(role: &str) -> BTreeSet<Permission> {
        Self::permissions(role).iter().copied().collect()
    }
}
