//! Role based authorization
//!
//! Every controller action asks `authorize(user, resource, ability)` before
//! touching data. Admins may do everything; other roles get the slices of
//! the school they work with.

use campus::FrameworkError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Accountant,
    Teacher,
    TransportManager,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "admin" => Some(Self::Admin),
            "accountant" => Some(Self::Accountant),
            "teacher" => Some(Self::Teacher),
            "transport_manager" => Some(Self::TransportManager),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Accountant => "accountant",
            Self::Teacher => "teacher",
            Self::TransportManager => "transport_manager",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    AcademicSessions,
    Terms,
    Timetables,
    ClassSections,
    Students,
    Staff,
    Payrolls,
    Vehicles,
    TransportRoutes,
    Hostels,
    Notices,
    Promotions,
    Reports,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ability {
    View,
    Create,
    Update,
    Delete,
    Restore,
    ForceDelete,
    /// Resource specific actions: set current, mark paid, assign driver, publish, execute
    Manage,
    /// Approve or reject a promotion batch
    Approve,
}

pub fn allows(role: Role, resource: Resource, ability: Ability) -> bool {
    use Ability::*;
    use Resource::*;

    if role == Role::Admin {
        return true;
    }
    if matches!(ability, ForceDelete | Approve) {
        return false;
    }

    match (role, resource) {
        (_, Dashboard) | (_, Notices) => ability == View,

        (Role::Accountant, Payrolls) => true,
        (Role::Accountant, Staff) => matches!(ability, View | Create | Update),
        (Role::Accountant, Reports) => matches!(ability, View | Manage),
        (Role::Accountant, Students) => ability == View,

        (Role::Teacher, AcademicSessions | Terms | ClassSections) => ability == View,
        (Role::Teacher, Students | Timetables) => matches!(ability, View | Create | Update | Manage),
        (Role::Teacher, Promotions) => matches!(ability, View | Create),

        (Role::TransportManager, Vehicles | TransportRoutes) => true,
        (Role::TransportManager, Staff | Hostels | Students) => ability == View,

        _ => false,
    }
}

/// 403 unless the role may perform the ability
pub fn authorize(role: Option<Role>, resource: Resource, ability: Ability) -> Result<(), FrameworkError> {
    match role {
        Some(role) if allows(role, resource, ability) => Ok(()),
        _ => {
            tracing::debug!(?role, ?resource, ?ability, "authorization denied");
            Err(FrameworkError::Unauthorized)
        }
    }
}
