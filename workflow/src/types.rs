//! # Types
//!
//! Shared data structures used across all modules of the review workflow.
//!
//! ## Design decisions
//!
//! ### Payload / review-trail split
//!
//! An [`Application`] carries two kinds of data:
//!
//! - [`ApplicationPayload`] — written by the submitter; replaced wholesale on
//!   resubmission, never patched field-by-field.
//! - The review trail (reviewer, approver, reason, posting link) — written
//!   only by workflow transitions.
//!
//! ### Status as a Finite-State Machine
//!
//! [`ApplicationStatus`] enforces a strict lifecycle:
//!
//! ```text
//! Pending ──► UnderReview ──► Approved
//!    │  ▲          │
//!    │  └──────────┼──► Incomplete ──► Pending (resubmit)
//!    │             │
//!    └─────────────┴──► Rejected
//! ```
//!
//! `Approved` and `Rejected` are terminal for status changes. An `Approved`
//! application may still be posted (a one-shot flag, not a status change);
//! a `Rejected` application may only be deleted. Every status change goes
//! through [`ApplicationStatus::next`] so illegal transitions are rejected
//! structurally rather than by scattered branching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a funding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    /// Submitted, awaiting manager triage.
    Pending,
    /// A manager has taken the application up for review.
    UnderReview,
    /// Sent back to the submitter with a reason; awaiting resubmission.
    Incomplete,
    /// Approved by an admin; eligible for posting.
    Approved,
    /// Rejected with a reason; may only be deleted.
    Rejected,
}

impl ApplicationStatus {
    /// Short identifier string suitable for logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::UnderReview => "under_review",
            Self::Incomplete => "incomplete",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// An *active* application blocks its owner from submitting another one.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::UnderReview | Self::Incomplete)
    }

    /// The single transition table of the workflow.
    ///
    /// Returns the status reached by applying `action` from `self`, or
    /// `None` when the action is not legal from this status. Actions that do
    /// not change status ([`TransitionAction::Delete`],
    /// [`TransitionAction::Post`]) always return `None`; their guards live in
    /// the store where they must hold under the entity lock.
    pub fn next(self, action: TransitionAction) -> Option<ApplicationStatus> {
        use ApplicationStatus::*;
        use TransitionAction::*;
        match (self, action) {
            (Pending, MarkUnderReview) => Some(UnderReview),
            (Pending | UnderReview, MarkIncomplete) => Some(Incomplete),
            (Incomplete, Resubmit) => Some(Pending),
            (Pending | UnderReview, Reject) => Some(Rejected),
            (UnderReview, Approve) => Some(Approved),
            _ => None,
        }
    }
}

/// Every actor-initiated action the workflow recognises.
///
/// Used both to drive [`ApplicationStatus::next`] and to label
/// `InvalidTransition` errors, including the stale-version conflicts the
/// store detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    Submit,
    MarkUnderReview,
    MarkIncomplete,
    Resubmit,
    Reject,
    Approve,
    Delete,
    Post,
}

impl TransitionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::MarkUnderReview => "mark_under_review",
            Self::MarkIncomplete => "mark_incomplete",
            Self::Resubmit => "resubmit",
            Self::Reject => "reject",
            Self::Approve => "approve",
            Self::Delete => "delete",
            Self::Post => "post",
        }
    }
}

/// Submitter-authored content of an application.
///
/// Replaced in full on resubmission; partial updates are not supported.
/// Document and gallery entries are opaque URLs — their contents live with
/// the file-storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationPayload {
    pub full_name: String,
    pub age: u32,
    pub personal_statement: String,
    pub family_background: String,
    pub academic_record: String,
    /// Requested funding amount, in the platform's minor currency unit.
    pub requested_amount: i64,
    /// Declared household salary, used for triage.
    pub household_salary: i64,
    pub document_urls: Vec<String>,
    pub gallery_urls: Vec<String>,
}

/// A student's funding application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    /// Owning user. Immutable once submitted.
    pub owner: Uuid,
    pub payload: ApplicationPayload,
    pub status: ApplicationStatus,
    /// Manager who took the application under review.
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Admin who approved the application.
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    /// Rejection or incompleteness reason; cleared on resubmission.
    pub status_reason: Option<String>,
    /// One-shot publication flag. Set together with `profile_id`, never cleared.
    pub is_posted: bool,
    /// Funding profile created by posting this application.
    pub profile_id: Option<Uuid>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    /// Build a fresh `Pending` application for `owner`.
    pub fn new(owner: Uuid, payload: ApplicationPayload, now: DateTime<Utc>) -> Self {
        Application {
            id: Uuid::new_v4(),
            owner,
            payload,
            status: ApplicationStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            approved_by: None,
            approved_at: None,
            status_reason: None,
            is_posted: false,
            profile_id: None,
            submitted_at: now,
            updated_at: now,
        }
    }
}

/// A public funding listing, created exactly once by the posting step.
///
/// `amount_raised` is mutated only by the donation ledger rule; every other
/// field is fixed at posting time (visibility may be toggled by moderation,
/// which is outside this crate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    /// Owning user; unique across all profiles.
    pub owner: Uuid,
    pub funding_goal: i64,
    pub amount_raised: i64,
    pub visible: bool,
    pub posted_at: DateTime<Utc>,
}

/// Lifecycle status of a donation, driven by the payment collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Terminal outcome of a donation that never captured payment.
///
/// Settlement is ledger-neutral by construction: the only statuses it can
/// produce are `Failed` and `Cancelled`. `Completed` is reachable solely
/// through the completion path, which carries the raised-total increment
/// with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    Failed,
    Cancelled,
}

impl Settlement {
    pub fn status(self) -> DonationStatus {
        match self {
            Self::Failed => DonationStatus::Failed,
            Self::Cancelled => DonationStatus::Cancelled,
        }
    }
}

/// A donation against a [`Profile`].
///
/// Only its interaction with `Profile::amount_raised` is in scope here: a
/// donation reaching `Completed` must increment the profile's raised total
/// by exactly `amount`, atomically with the status write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub donor: Uuid,
    pub amount: i64,
    pub status: DonationStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
