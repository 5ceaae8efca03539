//! Workflow-wide error taxonomy.
//!
//! Every variant is returned to the caller synchronously; nothing here is
//! swallowed. Notification delivery failures are deliberately absent — they
//! are logged and suppressed, never surfaced for a committed transition.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// Capability check failed; no state was changed.
    #[error("caller lacks the required capability")]
    Unauthorized,

    /// The action is not legal from the entity's current status. Also raised
    /// when a transition computed against stale state loses a race — the
    /// second writer observes the already-changed status and fails here.
    #[error("`{action}` is not legal from status `{from}`")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },

    /// Submission payload out of bounds; rejected before any Application
    /// record exists.
    #[error("submission rejected: {0}")]
    ValidationFailed(String),

    /// The application has already been posted as a profile.
    #[error("application has already been posted")]
    AlreadyPosted,

    /// Posting requires an Approved application.
    #[error("application is not approved")]
    NotApproved,

    /// The owning user already has a funding profile.
    #[error("owner already has a funding profile")]
    DuplicateProfile,

    /// The entity id did not resolve.
    #[error("entity not found")]
    NotFound,

    /// A claim-update request referenced a string outside the permission
    /// catalog.
    #[error("unknown capability `{0}`")]
    InvalidCapability(String),

    /// A posting-atomicity or ledger 1:1 invariant violation was detected.
    /// This is a data-integrity fault requiring operator intervention, not
    /// an ordinary error return.
    #[error("data integrity fault: {0}")]
    IntegrityViolation(String),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
