//! Notification fan-out contract.
//!
//! The workflow informs the submitter, the reviewing manager, and admins of
//! each committed transition through this boundary. Delivery mechanics
//! (in-app push, email transport) live with external collaborators; the
//! workflow never waits on delivery success. A transition is durably
//! committed *before* any notification is attempted, and a delivery failure
//! is logged and suppressed — it must not roll back or fail the transition.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Display severity of an in-app notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Raised by a notifier when delivery could not be handed off.
///
/// Callers inside this crate only ever log it; see
/// `ReviewWorkflow::deliver`.
#[derive(Debug, Clone, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// The delivery boundary consumed by the workflow. Fire-and-forget relative
/// to the state transition that triggered it.
pub trait Notifier: Send + Sync {
    /// Deliver an in-app notification to `user_id`.
    fn notify(
        &self,
        user_id: Uuid,
        title: &str,
        message: &str,
        severity: Severity,
        link: Option<&str>,
    ) -> std::result::Result<(), NotifyError>;

    /// Deliver an email through the mail collaborator.
    fn notify_email(
        &self,
        address: &str,
        subject: &str,
        body: &str,
    ) -> std::result::Result<(), NotifyError>;
}
