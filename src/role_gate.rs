//! Role-based visibility of navigation destinations.
//!
//! This decides what the UI shows, nothing more. The backend still
//! authorizes every call; a hidden entry is a convenience, not a guard.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Account role carried in the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Official,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Official, Role::Admin];

    pub fn label(self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Official => "OFFICIAL",
            Role::Admin => "ADMIN",
        }
    }

    /// Total parse: unknown or missing labels mean "no role".
    pub fn parse(label: Option<&str>) -> Option<Role> {
        label.and_then(|l| l.parse().ok())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error for a role label that is not one of [`Role::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Role::ALL
            .into_iter()
            .find(|r| r.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Screens reachable from the app's navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    ReportIncident,
    MyReports,
    IncidentList,
    IncidentMap,
    UserManagement,
    Profile,
}

/// One navigation entry and the roles allowed to see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub destination: Destination,
    pub label: &'static str,
    pub required_roles: Vec<Role>,
}

impl NavItem {
    pub fn new(destination: Destination, label: &'static str, required_roles: &[Role]) -> Self {
        Self {
            destination,
            label,
            required_roles: required_roles.to_vec(),
        }
    }

    pub fn permits(&self, role: Role) -> bool {
        self.required_roles.contains(&role)
    }
}

/// The single role → navigation table.
#[derive(Debug, Clone)]
pub struct RoleGate {
    items: Vec<NavItem>,
}

impl Default for RoleGate {
    fn default() -> Self {
        Self::standard()
    }
}

impl RoleGate {
    /// Gate over an explicit list of items, in display order.
    pub fn new(items: Vec<NavItem>) -> Self {
        Self { items }
    }

    /// Navigation used by the mobile client.
    pub fn standard() -> Self {
        use Role::{Admin, Official, User};

        Self::new(vec![
            NavItem::new(Destination::ReportIncident, "Report incident", &[User]),
            NavItem::new(Destination::MyReports, "My reports", &[User]),
            NavItem::new(Destination::IncidentList, "Incidents", &[Official, Admin]),
            NavItem::new(Destination::IncidentMap, "Map", &[User, Official, Admin]),
            NavItem::new(Destination::UserManagement, "Users", &[Admin]),
            NavItem::new(Destination::Profile, "Profile", &[User, Official, Admin]),
        ])
    }

    pub fn items(&self) -> &[NavItem] {
        &self.items
    }

    /// Items `role` may see, in declared order. No role sees nothing.
    pub fn visible(&self, role: Option<Role>) -> Vec<&NavItem> {
        match role {
            Some(role) => self.items.iter().filter(|item| item.permits(role)).collect(),
            None => Vec::new(),
        }
    }

    /// Whether `role` may navigate to `destination`.
    pub fn can_access(&self, role: Option<Role>, destination: Destination) -> bool {
        self.visible(role)
            .iter()
            .any(|item| item.destination == destination)
    }
}
