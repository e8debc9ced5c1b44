//! Data models for Civicwatch.
//!
//! These mirror the backend's JSON payloads: enum labels are
//! SCREAMING_SNAKE_CASE, field names are camelCase and timestamps are
//! RFC 3339. The client treats incidents and users as a read-mostly cache;
//! the backend owns their lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ClientError;
use crate::pagination::Keyed;
use crate::role_gate::Role;

/// What kind of problem an incident reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Crime,
    Environment,
    Communal,
    Traffic,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Crime,
        Category::Environment,
        Category::Communal,
        Category::Traffic,
        Category::Other,
    ];

    /// Canonical wire label.
    pub fn label(self) -> &'static str {
        match self {
            Category::Crime => "CRIME",
            Category::Environment => "ENVIRONMENT",
            Category::Communal => "COMMUNAL",
            Category::Traffic => "TRAFFIC",
            Category::Other => "OTHER",
        }
    }

    /// Case-insensitive comparison against the wire label.
    pub fn matches_label(self, label: &str) -> bool {
        self.label().eq_ignore_ascii_case(label.trim())
    }
}

/// Urgency assigned to an incident.
///
/// Some screens of the mobile app labelled the second level `NORMAL` and
/// others `MEDIUM`. `MEDIUM` is canonical; `NORMAL` is accepted everywhere a
/// label is parsed or matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[serde(alias = "NORMAL")]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    /// Canonical wire label.
    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Critical => "CRITICAL",
        }
    }

    pub(crate) fn aliases(self) -> &'static [&'static str] {
        match self {
            Priority::Medium => &["NORMAL"],
            _ => &[],
        }
    }

    /// Case-insensitive comparison against the label or any alias.
    pub fn matches_label(self, label: &str) -> bool {
        let label = label.trim();
        self.label().eq_ignore_ascii_case(label)
            || self.aliases().iter().any(|a| a.eq_ignore_ascii_case(label))
    }
}

/// Where an incident is in its handling lifecycle.
///
/// `ASSIGNED` is accepted as an alias of `IN_PROGRESS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Reported,
    #[serde(alias = "ASSIGNED")]
    InProgress,
    Resolved,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Reported, Status::InProgress, Status::Resolved];

    /// Canonical wire label.
    pub fn label(self) -> &'static str {
        match self {
            Status::Reported => "REPORTED",
            Status::InProgress => "IN_PROGRESS",
            Status::Resolved => "RESOLVED",
        }
    }

    pub(crate) fn aliases(self) -> &'static [&'static str] {
        match self {
            Status::InProgress => &["ASSIGNED"],
            _ => &[],
        }
    }

    /// Case-insensitive comparison against the label or any alias.
    pub fn matches_label(self, label: &str) -> bool {
        let label = label.trim();
        self.label().eq_ignore_ascii_case(label)
            || self.aliases().iter().any(|a| a.eq_ignore_ascii_case(label))
    }
}

macro_rules! label_impls {
    ($ty:ident, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $ty {
            type Err = ClientError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $ty::ALL
                    .into_iter()
                    .find(|v| v.matches_label(s))
                    .ok_or_else(|| ClientError::Validation(format!("unknown {} '{}'", $what, s)))
            }
        }
    };
}

label_impls!(Category, "category");
label_impls!(Priority, "priority");
label_impls!(Status, "status");

/// A point on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Whether both coordinates are finite and within WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// An incident as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Stable backend identifier.
    pub id: i64,

    pub category: Category,

    pub description: String,

    pub priority: Priority,

    pub status: Status,

    pub location: GeoPoint,

    /// Photo URLs in the order they were attached.
    #[serde(default)]
    pub image_urls: Vec<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,

    /// Reporter asked not to be shown to staff.
    #[serde(default)]
    pub anonymous: bool,

    /// Absent for anonymous reports.
    #[serde(default)]
    pub reporter_id: Option<i64>,
}

impl Keyed for Incident {
    fn key(&self) -> i64 {
        self.id
    }
}

/// Payload for submitting a new incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIncident {
    pub category: Category,
    pub description: String,
    pub priority: Priority,
    pub location: GeoPoint,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub anonymous: bool,
}

impl NewIncident {
    /// Check the fields the backend would reject anyway, before a round trip.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.description.trim().is_empty() {
            return Err(ClientError::Validation(
                "Description must not be empty".to_string(),
            ));
        }
        if !self.location.is_valid() {
            return Err(ClientError::Validation(
                "Location is out of range".to_string(),
            ));
        }
        if self.image_urls.iter().any(|u| u.trim().is_empty()) {
            return Err(ClientError::Validation(
                "Image reference must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A user account as seen by the user-management screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    /// `None` when the account has no role this client knows.
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Option<Role>,
    pub created_at: DateTime<Utc>,
}

fn lenient_role<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Role>, D::Error> {
    let label = Option::<String>::deserialize(deserializer)?;
    Ok(Role::parse(label.as_deref()))
}

impl Keyed for User {
    fn key(&self) -> i64 {
        self.id
    }
}

/// Request body for PATCH /incidents/{id}/status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: Status,
}

/// Request body for PATCH /incidents/{id}/priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityUpdate {
    pub priority: Priority,
}

/// Request body for PATCH /users/{id}/role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleUpdate {
    pub role: Role,
}

/// Request body for POST /auth/login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response body for POST /auth/login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}
