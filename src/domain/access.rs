//! Roles, the permission catalog and override resolution.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::status::string_enum;

string_enum! {
    Role ("role") {
        Admin => "admin",
        Manager => "manager",
        Receptionist => "receptionist",
        Customer => "customer",
    }
}

string_enum! {
    Permission ("permission") {
        ViewDashboard => "view-dashboard",
        ViewAnalytics => "view-analytics",
        ManageUsers => "manage-users",
        ManageStaff => "manage-staff",
        ManageRoles => "manage-roles",
        ManageRooms => "manage-rooms",
        ManageAmenities => "manage-amenities",
        ViewBookings => "view-bookings",
        ManageBookings => "manage-bookings",
        CheckInOut => "check-in-out",
        HandleChat => "handle-chat",
        ManageComplaints => "manage-complaints",
        ManagePayments => "manage-payments",
        ManageTravel => "manage-travel",
    }
}

/// Permissions the admin role must always keep, otherwise nobody could
/// repair the role table.
pub const ADMIN_LOCKED: &[Permission] = &[Permission::ManageRoles, Permission::ManageUsers];

impl Role {
    /// Grants seeded into `role_permissions` on first migration.
    pub fn default_permissions(&self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Role::Admin => Permission::ALL,
            Role::Manager => &[
                ViewDashboard,
                ViewAnalytics,
                ManageStaff,
                ManageRooms,
                ManageAmenities,
                ViewBookings,
                ManageBookings,
                ManageComplaints,
                ManagePayments,
                ManageTravel,
            ],
            Role::Receptionist => &[
                ViewDashboard,
                ViewBookings,
                ManageBookings,
                CheckInOut,
                HandleChat,
                ManageComplaints,
            ],
            Role::Customer => &[],
        }
    }

    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Customer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantSource {
    Override,
    Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedPermission {
    pub granted: bool,
    pub source: GrantSource,
}

pub fn resolve(
    permission: Permission,
    role_grants: &BTreeSet<Permission>,
    overrides: &BTreeMap<Permission, bool>,
) -> ResolvedPermission {
    match overrides.get(&permission) {
        Some(&granted) => ResolvedPermission {
            granted,
            source: GrantSource::Override,
        },
        None => ResolvedPermission {
            granted: role_grants.contains(&permission),
            source: GrantSource::Role,
        },
    }
}

/// Resolves every catalog permission for one user.
pub fn resolve_all(
    role_grants: &BTreeSet<Permission>,
    overrides: &BTreeMap<Permission, bool>,
) -> BTreeMap<Permission, ResolvedPermission> {
    Permission::ALL
        .iter()
        .map(|permission| (*permission, resolve(*permission, role_grants, overrides)))
        .collect()
}

pub fn granted_set(resolved: &BTreeMap<Permission, ResolvedPermission>) -> BTreeSet<Permission> {
    resolved
        .iter()
        .filter(|(_, value)| value.granted)
        .map(|(permission, _)| *permission)
        .collect()
}

/// Whether an actor holding `actor_permissions` may manage an account of
/// `target_role`.
pub fn can_manage_account(actor_permissions: &BTreeSet<Permission>, target_role: Role) -> bool {
    if actor_permissions.contains(&Permission::ManageUsers) {
        return true;
    }
    actor_permissions.contains(&Permission::ManageStaff) && target_role == Role::Receptionist
}
