//! # Permission catalog
//!
//! The closed set of capability strings recognised by the platform, grouped
//! by resource, plus the fixed role → capability mapping.
//!
//! Capability identifiers are opaque, stable strings (`students.manage`,
//! `donations.verify`, …). The catalog is used two ways:
//!
//! - to seed the role → capability sets consulted by the authorization
//!   evaluator, and
//! - to validate that a claim-update request only references known
//!   capabilities (unknown strings fail with `InvalidCapability`).

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkflowError};

/// One permitted action on a resource.
///
/// The wire/storage form is the dotted string returned by
/// [`Capability::as_str`]; [`Capability::parse`] is the only way back in, so
/// unknown strings cannot enter the system.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Capability {
    #[serde(rename = "users.view")]
    UsersView,
    #[serde(rename = "students.view")]
    StudentsView,
    #[serde(rename = "students.manage")]
    StudentsManage,
    #[serde(rename = "students.approve")]
    StudentsApprove,
    #[serde(rename = "donations.create")]
    DonationsCreate,
    #[serde(rename = "donations.view")]
    DonationsView,
    #[serde(rename = "donations.verify")]
    DonationsVerify,
    #[serde(rename = "progress.view")]
    ProgressView,
    #[serde(rename = "progress.manage")]
    ProgressManage,
    #[serde(rename = "reports.view")]
    ReportsView,
    #[serde(rename = "messages.view")]
    MessagesView,
    #[serde(rename = "messages.manage")]
    MessagesManage,
    #[serde(rename = "notifications.view")]
    NotificationsView,
    #[serde(rename = "notifications.manage")]
    NotificationsManage,
    #[serde(rename = "permissions.manage")]
    PermissionsManage,
}

impl Capability {
    /// Every capability the platform knows about, de-duplicated by
    /// construction.
    pub const ALL: [Capability; 15] = [
        Capability::UsersView,
        Capability::StudentsView,
        Capability::StudentsManage,
        Capability::StudentsApprove,
        Capability::DonationsCreate,
        Capability::DonationsView,
        Capability::DonationsVerify,
        Capability::ProgressView,
        Capability::ProgressManage,
        Capability::ReportsView,
        Capability::MessagesView,
        Capability::MessagesManage,
        Capability::NotificationsView,
        Capability::NotificationsManage,
        Capability::PermissionsManage,
    ];

    /// Stable dotted identifier, `<resource>.<action>`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsersView => "users.view",
            Self::StudentsView => "students.view",
            Self::StudentsManage => "students.manage",
            Self::StudentsApprove => "students.approve",
            Self::DonationsCreate => "donations.create",
            Self::DonationsView => "donations.view",
            Self::DonationsVerify => "donations.verify",
            Self::ProgressView => "progress.view",
            Self::ProgressManage => "progress.manage",
            Self::ReportsView => "reports.view",
            Self::MessagesView => "messages.view",
            Self::MessagesManage => "messages.manage",
            Self::NotificationsView => "notifications.view",
            Self::NotificationsManage => "notifications.manage",
            Self::PermissionsManage => "permissions.manage",
        }
    }

    /// Parse a dotted identifier back into a catalog entry.
    ///
    /// Unknown strings fail with [`WorkflowError::InvalidCapability`]; this
    /// is the validation gate for admin claim-update requests.
    pub fn parse(s: &str) -> Result<Capability> {
        Capability::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| WorkflowError::InvalidCapability(s.to_string()))
    }
}

/// Platform roles. Role membership is resolved by the identity collaborator;
/// this crate only maps each role to its default capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Donor,
    Student,
}

impl Role {
    /// Default capabilities implied by holding this role.
    ///
    /// Explicit claims are layered additively on top of these sets by the
    /// authorization evaluator; a claim is either present or absent, there
    /// is no negative override.
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            // Admins hold every capability in the catalog.
            Role::Admin => &Capability::ALL,
            Role::Manager => &[
                Capability::UsersView,
                Capability::StudentsView,
                Capability::StudentsManage,
                Capability::DonationsView,
                Capability::DonationsVerify,
                Capability::ProgressView,
                Capability::ReportsView,
                Capability::MessagesView,
                Capability::MessagesManage,
                Capability::NotificationsView,
                Capability::NotificationsManage,
            ],
            Role::Donor => &[
                Capability::DonationsCreate,
                Capability::DonationsView,
                Capability::ProgressView,
                Capability::NotificationsView,
                Capability::MessagesView,
            ],
            Role::Student => &[
                Capability::StudentsView,
                Capability::ProgressView,
                Capability::ProgressManage,
                Capability::MessagesView,
                Capability::NotificationsView,
            ],
        }
    }
}
