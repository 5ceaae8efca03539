//! # Posting step
//!
//! One-shot conversion of an Approved application into a public funding
//! [`Profile`](crate::types::Profile) — the only path by which a profile
//! comes to exist, and therefore the only path to donation eligibility.
//!
//! The profile row and the application's posting link commit as one atomic
//! store operation; partial application of either write is a corruption the
//! store must prevent. Concurrent double-posts resolve to exactly one
//! success, the loser observing `AlreadyPosted`.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::capability::Capability;
use crate::error::{Result, WorkflowError};
use crate::machine::ReviewWorkflow;
use crate::notify::Severity;
use crate::types::{ApplicationStatus, Profile};

impl ReviewWorkflow {
    /// Publish an Approved application as a funding profile.
    ///
    /// `goal_override`, when given, replaces the requested amount as the
    /// profile's funding goal. Fails with `NotApproved` before review has
    /// concluded, `AlreadyPosted` on a second attempt, and
    /// `DuplicateProfile` when the owner somehow already has a listing.
    pub fn post_as_profile(
        &self,
        application_id: Uuid,
        actor: Uuid,
        goal_override: Option<i64>,
    ) -> Result<Uuid> {
        self.authz.require(actor, Capability::StudentsManage)?;
        let loaded = self.store.load_application(application_id)?;
        let app = loaded.record;

        if app.is_posted {
            return Err(WorkflowError::AlreadyPosted);
        }
        if app.status != ApplicationStatus::Approved {
            return Err(WorkflowError::NotApproved);
        }

        let profile = Profile {
            id: Uuid::new_v4(),
            owner: app.owner,
            funding_goal: goal_override.unwrap_or(app.payload.requested_amount),
            amount_raised: 0,
            visible: true,
            posted_at: Utc::now(),
        };

        // The store re-checks all preconditions under its lock and commits
        // the profile and the posting link together.
        let profile_id = self
            .store
            .post_profile(application_id, loaded.version, profile)?;
        info!(application = %application_id, profile = %profile_id, "application posted");

        self.deliver(
            app.owner,
            "Your funding profile is live",
            "Your approved application is now listed and can receive donations.",
            Severity::Success,
            Some(&format!("/students/{profile_id}")),
        );
        Ok(profile_id)
    }
}
