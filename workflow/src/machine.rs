//! # Application state machine
//!
//! Owns the lifecycle of a single funding application: every actor action is
//! gated by the authorization evaluator, validated against the transition
//! table in [`ApplicationStatus::next`], and applied as one optimistic
//! (version-checked) read-modify-write. Two managers racing to act on the
//! same application are serialized by the store — the second writer fails
//! with `InvalidTransition` instead of silently overwriting.
//!
//! Notifications fan out *after* the transition is durably committed and are
//! fire-and-forget: a delivery failure is logged and suppressed, never
//! surfaced to the caller.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::authz::{AuditEntry, AuthzEvaluator, RoleDirectory};
use crate::capability::{Capability, Role};
use crate::error::{Result, WorkflowError};
use crate::notify::{Notifier, Severity};
use crate::store::WorkflowStore;
use crate::types::{Application, ApplicationPayload, ApplicationStatus, TransitionAction};
use crate::validate;

/// The review workflow service. Cheap to share behind an `Arc`; all methods
/// take `&self`.
pub struct ReviewWorkflow {
    pub(crate) store: Arc<dyn WorkflowStore>,
    pub(crate) directory: Arc<dyn RoleDirectory>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) authz: AuthzEvaluator,
}

impl ReviewWorkflow {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        directory: Arc<dyn RoleDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let authz = AuthzEvaluator::new(directory.clone(), store.clone());
        ReviewWorkflow {
            store,
            directory,
            notifier,
            authz,
        }
    }

    /// The capability evaluator guarding this workflow.
    pub fn authz(&self) -> &AuthzEvaluator {
        &self.authz
    }

    /// Grant/revoke explicit permission claims for `target`. Guarded by
    /// `permissions.manage`; audited append-only.
    pub fn update_permissions(
        &self,
        actor: Uuid,
        target: Uuid,
        grants: &[String],
        revokes: &[String],
    ) -> Result<AuditEntry> {
        self.authz.update_permissions(actor, target, grants, revokes)
    }

    // ── Transitions ──────────────────────────────────────────

    /// Submit a new funding application for `owner`.
    ///
    /// The payload is validated against the fixed bounds before any record
    /// exists; an owner with another active application is refused. On
    /// success the application enters `Pending` and all managers are
    /// notified.
    pub fn submit(&self, owner: Uuid, payload: ApplicationPayload) -> Result<Uuid> {
        validate::validate_payload(&payload)?;
        if self.store.active_application_for(owner).is_some() {
            return Err(WorkflowError::ValidationFailed(
                "owner already has an active application".to_string(),
            ));
        }

        let app = Application::new(owner, payload, Utc::now());
        let id = app.id;
        // The store re-checks the active-application rule under its lock.
        self.store.insert_application(app)?;
        info!(application = %id, %owner, "application submitted");

        self.fan_out(
            Role::Manager,
            "New funding application",
            "A student has submitted a funding application for triage.",
            Severity::Info,
            Some(&application_link(id)),
        );
        Ok(id)
    }

    /// A manager takes the application up for review. `Pending → UnderReview`.
    pub fn mark_under_review(&self, id: Uuid, actor: Uuid) -> Result<()> {
        self.authz.require(actor, Capability::StudentsManage)?;
        let loaded = self.store.load_application(id)?;
        let mut app = loaded.record;

        app.status = self.transition(&app, TransitionAction::MarkUnderReview)?;
        app.reviewed_by = Some(actor);
        app.reviewed_at = Some(Utc::now());
        app.updated_at = Utc::now();
        self.store
            .update_application(loaded.version, app, TransitionAction::MarkUnderReview)?;
        info!(application = %id, reviewer = %actor, "application under review");

        self.fan_out(
            Role::Admin,
            "Application ready for decision",
            "A manager has taken a funding application under review.",
            Severity::Info,
            Some(&application_link(id)),
        );
        Ok(())
    }

    /// Send the application back to the submitter with a reason.
    /// `Pending | UnderReview → Incomplete`.
    pub fn mark_incomplete(&self, id: Uuid, actor: Uuid, reason: &str) -> Result<()> {
        self.authz.require(actor, Capability::StudentsManage)?;
        let loaded = self.store.load_application(id)?;
        let mut app = loaded.record;

        app.status = self.transition(&app, TransitionAction::MarkIncomplete)?;
        app.status_reason = Some(reason.to_string());
        app.updated_at = Utc::now();
        let owner = app.owner;
        self.store
            .update_application(loaded.version, app, TransitionAction::MarkIncomplete)?;
        info!(application = %id, "application marked incomplete");

        self.deliver(
            owner,
            "Your application needs more information",
            reason,
            Severity::Warning,
            Some(&application_link(id)),
        );
        Ok(())
    }

    /// The owner resubmits an incomplete application with a full replacement
    /// payload. `Incomplete → Pending`; the reason field is cleared.
    pub fn resubmit(&self, id: Uuid, actor: Uuid, payload: ApplicationPayload) -> Result<()> {
        let loaded = self.store.load_application(id)?;
        let mut app = loaded.record;
        if app.owner != actor {
            return Err(WorkflowError::Unauthorized);
        }

        app.status = self.transition(&app, TransitionAction::Resubmit)?;
        validate::validate_payload(&payload)?;
        app.payload = payload;
        app.status_reason = None;
        app.updated_at = Utc::now();
        self.store
            .update_application(loaded.version, app, TransitionAction::Resubmit)?;
        info!(application = %id, "application resubmitted");

        self.fan_out(
            Role::Manager,
            "Application resubmitted",
            "A student has resubmitted a previously incomplete application.",
            Severity::Info,
            Some(&application_link(id)),
        );
        Ok(())
    }

    /// Reject the application with a reason. `Pending | UnderReview →
    /// Rejected` — an admin may reject straight from `Pending`, unlike
    /// approval.
    pub fn reject(&self, id: Uuid, actor: Uuid, reason: &str) -> Result<()> {
        self.authz.require(actor, Capability::StudentsManage)?;
        let loaded = self.store.load_application(id)?;
        let mut app = loaded.record;

        app.status = self.transition(&app, TransitionAction::Reject)?;
        app.status_reason = Some(reason.to_string());
        app.updated_at = Utc::now();
        let owner = app.owner;
        let reviewer = app.reviewed_by;
        self.store
            .update_application(loaded.version, app, TransitionAction::Reject)?;
        info!(application = %id, "application rejected");

        self.deliver(
            owner,
            "Your application was rejected",
            reason,
            Severity::Error,
            Some(&application_link(id)),
        );
        // The reviewing manager, if any, learns the outcome too.
        if let Some(reviewer) = reviewer {
            self.deliver(
                reviewer,
                "Reviewed application rejected",
                reason,
                Severity::Info,
                Some(&application_link(id)),
            );
        }
        Ok(())
    }

    /// Approve the application. Requires `students.approve` and a status of
    /// exactly `UnderReview` — `Pending` cannot be approved directly, every
    /// approval passes through review first.
    pub fn approve(&self, id: Uuid, actor: Uuid) -> Result<()> {
        self.authz.require(actor, Capability::StudentsApprove)?;
        let loaded = self.store.load_application(id)?;
        let mut app = loaded.record;

        app.status = self.transition(&app, TransitionAction::Approve)?;
        app.approved_by = Some(actor);
        app.approved_at = Some(Utc::now());
        app.updated_at = Utc::now();
        let owner = app.owner;
        self.store
            .update_application(loaded.version, app, TransitionAction::Approve)?;
        info!(application = %id, approver = %actor, "application approved");

        self.deliver(
            owner,
            "Your application was approved",
            "Congratulations — your funding application has been approved.",
            Severity::Success,
            Some(&application_link(id)),
        );
        Ok(())
    }

    /// Delete a rejected application. Only legal from `Rejected`.
    pub fn delete_rejected(&self, id: Uuid, actor: Uuid) -> Result<()> {
        self.authz.require(actor, Capability::StudentsManage)?;
        let loaded = self.store.load_application(id)?;
        if loaded.record.status != ApplicationStatus::Rejected {
            return Err(WorkflowError::InvalidTransition {
                from: loaded.record.status.as_str(),
                action: TransitionAction::Delete.as_str(),
            });
        }
        self.store.delete_application(id, loaded.version)?;
        info!(application = %id, "rejected application deleted");
        Ok(())
    }

    // ── Helpers ──────────────────────────────────────────────

    /// Look up `action` in the transition table for the application's
    /// current status.
    fn transition(
        &self,
        app: &Application,
        action: TransitionAction,
    ) -> Result<ApplicationStatus> {
        app.status
            .next(action)
            .ok_or(WorkflowError::InvalidTransition {
                from: app.status.as_str(),
                action: action.as_str(),
            })
    }

    /// Fire-and-forget delivery to one user. The triggering transition is
    /// already committed; a failure is logged and suppressed.
    pub(crate) fn deliver(
        &self,
        user_id: Uuid,
        title: &str,
        message: &str,
        severity: Severity,
        link: Option<&str>,
    ) {
        if let Err(e) = self.notifier.notify(user_id, title, message, severity, link) {
            warn!(%user_id, error = %e, "notification dropped");
        }
    }

    /// Deliver to every member of `role`, in directory order.
    fn fan_out(
        &self,
        role: Role,
        title: &str,
        message: &str,
        severity: Severity,
        link: Option<&str>,
    ) {
        for user_id in self.directory.members_of(role) {
            self.deliver(user_id, title, message, severity, link);
        }
    }
}

/// In-app link to an application's detail page.
fn application_link(id: Uuid) -> String {
    format!("/applications/{id}")
}
