//! crates/carelink_core/src/capability.rs
//!
//! The capability gate: which destinations each role may use.
//!
//! This only decides what the client offers. The backend enforces the same
//! rules on its own; a modified client can always skip this check.

use crate::domain::Role;

/// A screen (and the action behind it) that can be gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    Dashboard,
    EligibilityCheck,
    History,
    UserManagement,
}

impl Destination {
    pub const ALL: [Destination; 4] = [
        Destination::Dashboard,
        Destination::EligibilityCheck,
        Destination::History,
        Destination::UserManagement,
    ];

    /// Label used in the navigation menu.
    pub fn label(&self) -> &'static str {
        match self {
            Destination::Dashboard => "Dashboard",
            Destination::EligibilityCheck => "Check Eligibility",
            Destination::History => "History",
            Destination::UserManagement => "Manage Users",
        }
    }
}

/// Copy shown in place of a screen the role may not use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDenied {
    pub destination: Destination,
    pub title: &'static str,
    pub subtitle: &'static str,
}

/// Returns whether `role` may use `destination`.
///
/// Unknown roles fall through to the viewer row.
pub fn permits(role: Role, destination: Destination) -> bool {
    match destination {
        Destination::Dashboard | Destination::History => true,
        Destination::EligibilityCheck => matches!(role, Role::Admin | Role::Staff),
        Destination::UserManagement => matches!(role, Role::Admin),
    }
}

/// The navigation entries `role` gets, in menu order.
pub fn menu(role: Role) -> Vec<Destination> {
    Destination::ALL
        .into_iter()
        .filter(|d| permits(role, *d))
        .collect()
}

/// The blocked-screen copy for `destination`, or `None` if `role` may use it.
pub fn denial(role: Role, destination: Destination) -> Option<AccessDenied> {
    if permits(role, destination) {
        return None;
    }
    let subtitle = match destination {
        Destination::EligibilityCheck => {
            "Viewers can only view eligibility check history. Contact your administrator to upgrade your access."
        }
        Destination::UserManagement => "Only administrators can manage users.",
        Destination::Dashboard | Destination::History => "You do not have access to this page.",
    };
    Some(AccessDenied {
        destination,
        title: "Access Denied",
        subtitle,
    })
}
