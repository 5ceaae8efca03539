//! # Bursary review workflow
//!
//! Core of the Bursary donation platform: the pipeline that takes a
//! student's funding application from submission through manager triage and
//! admin approval to publication as a donation-eligible funding profile.
//!
//! | Phase         | Entry point(s)                                              |
//! |---------------|-------------------------------------------------------------|
//! | Submission    | [`ReviewWorkflow::submit`], [`ReviewWorkflow::resubmit`]    |
//! | Triage        | [`ReviewWorkflow::mark_under_review`], [`ReviewWorkflow::mark_incomplete`] |
//! | Decision      | [`ReviewWorkflow::approve`], [`ReviewWorkflow::reject`]     |
//! | Publication   | [`ReviewWorkflow::post_as_profile`]                         |
//! | Cleanup       | [`ReviewWorkflow::delete_rejected`]                         |
//! | Permissions   | [`ReviewWorkflow::update_permissions`]                      |
//! | Ledger        | [`DonationLedger`]                                          |
//!
//! ## Architecture
//!
//! Authorization is fully delegated to [`authz`], backed by the permission
//! catalog in [`capability`]. The transition table lives on
//! [`types::ApplicationStatus`]; [`machine`] contains only guards, side
//! data, and notification fan-out. Storage access goes through the
//! [`store::WorkflowStore`] contract, whose in-memory implementation gives
//! every operation the atomic read-modify-write semantics the workflow
//! relies on. Notification delivery is a fire-and-forget boundary defined
//! in [`notify`].

pub mod authz;
pub mod capability;
pub mod error;
pub mod ledger;
pub mod machine;
pub mod notify;
pub mod posting;
pub mod store;
pub mod types;
pub mod validate;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_machine;
#[cfg(test)]
mod test_posting;

pub use authz::{AuditEntry, AuthzEvaluator, RoleDirectory, StaticRoleDirectory};
pub use capability::{Capability, Role};
pub use error::{Result, WorkflowError};
pub use ledger::DonationLedger;
pub use machine::ReviewWorkflow;
pub use notify::{Notifier, NotifyError, Severity};
pub use store::{MemoryStore, Versioned, WorkflowStore};
pub use types::{
    Application, ApplicationPayload, ApplicationStatus, Donation, DonationStatus, Profile,
    Settlement, TransitionAction,
};
