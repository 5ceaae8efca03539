//! # Persistence contract
//!
//! Typed storage boundary for the workflow, plus the in-memory
//! implementation used by the core and its tests.
//!
//! ## Optimistic concurrency
//!
//! Every entity load returns a [`Versioned`] wrapper; every update carries
//! the version the caller read. A mismatch means another writer committed
//! first — the stale transition fails with `InvalidTransition` instead of
//! silently overwriting. Nothing is retried automatically.
//!
//! ## Atomic pairs
//!
//! Two operations intentionally span entities and must commit as a unit:
//!
//! | Operation                 | Writes                                         |
//! |---------------------------|------------------------------------------------|
//! | [`WorkflowStore::post_profile`]      | new `Profile` + application posting link |
//! | [`WorkflowStore::complete_donation`] | donation status + profile raised total   |
//!
//! [`MemoryStore`] holds all entities behind one lock, so each trait method
//! is a single atomic read-modify-write. Production adapters must provide
//! the same atomicity (one transaction or a compensating rollback).

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::authz::AuditEntry;
use crate::capability::Capability;
use crate::error::{Result, WorkflowError};
use crate::types::{
    Application, Donation, DonationStatus, Profile, Settlement, TransitionAction,
};

/// An entity snapshot together with its optimistic-concurrency token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub record: T,
    pub version: u64,
}

/// Storage boundary consumed by the workflow, the posting step, and the
/// donation ledger.
pub trait WorkflowStore: Send + Sync {
    // ── Applications ─────────────────────────────────────────

    /// Insert a freshly submitted application.
    ///
    /// Enforces the one-active-application-per-owner rule under the store
    /// lock, so two racing submissions cannot both land.
    fn insert_application(&self, app: Application) -> Result<()>;

    fn load_application(&self, id: Uuid) -> Result<Versioned<Application>>;

    /// Id of the owner's active (Pending/UnderReview/Incomplete)
    /// application, if any.
    fn active_application_for(&self, owner: Uuid) -> Option<Uuid>;

    /// Compare-and-swap update. `expected_version` must match the stored
    /// version; on mismatch the currently stored status is reported in an
    /// `InvalidTransition` labelled with `action`.
    fn update_application(
        &self,
        expected_version: u64,
        app: Application,
        action: TransitionAction,
    ) -> Result<u64>;

    /// Remove a rejected application. Same CAS semantics as
    /// [`Self::update_application`].
    fn delete_application(&self, id: Uuid, expected_version: u64) -> Result<()>;

    // ── Posting (atomic pair) ────────────────────────────────

    /// Create `profile` and set the application's posting link in one atomic
    /// step. Re-checks every posting precondition under the lock so that
    /// concurrent double-posts resolve to at most one success.
    fn post_profile(
        &self,
        application_id: Uuid,
        expected_version: u64,
        profile: Profile,
    ) -> Result<Uuid>;

    fn load_profile(&self, id: Uuid) -> Result<Versioned<Profile>>;

    /// Id of the profile owned by `owner`, if one exists (unique per owner).
    fn profile_for_owner(&self, owner: Uuid) -> Option<Uuid>;

    // ── Donations (ledger rule) ──────────────────────────────

    fn insert_donation(&self, donation: Donation) -> Result<()>;

    fn load_donation(&self, id: Uuid) -> Result<Versioned<Donation>>;

    /// Mark a Pending donation Completed and increment the referenced
    /// profile's raised total by exactly the donation amount, atomically.
    fn complete_donation(&self, id: Uuid) -> Result<()>;

    /// Move a Pending donation to a ledger-neutral terminal outcome
    /// (Failed or Cancelled). Settlement cannot produce `Completed`.
    fn settle_donation(&self, id: Uuid, outcome: Settlement) -> Result<()>;

    fn donations_for_profile(&self, profile_id: Uuid) -> Vec<Donation>;

    // ── Claims & audit ───────────────────────────────────────

    fn grant_claim(&self, user: Uuid, capability: Capability);

    fn revoke_claim(&self, user: Uuid, capability: Capability);

    fn claims_for(&self, user: Uuid) -> BTreeSet<Capability>;

    /// Append-only; entries are never mutated or deleted.
    fn append_audit(&self, entry: AuditEntry);

    fn audit_entries(&self) -> Vec<AuditEntry>;
}

#[derive(Default)]
struct Inner {
    applications: HashMap<Uuid, Versioned<Application>>,
    profiles: HashMap<Uuid, Versioned<Profile>>,
    /// Unique owner → profile index backing the DuplicateProfile invariant.
    owner_profiles: HashMap<Uuid, Uuid>,
    donations: HashMap<Uuid, Versioned<Donation>>,
    claims: HashMap<Uuid, BTreeSet<Capability>>,
    audit: Vec<AuditEntry>,
}

/// In-memory [`WorkflowStore`]. One lock over all entities makes every
/// trait method a single atomic read-modify-write.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkflowStore for MemoryStore {
    fn insert_application(&self, app: Application) -> Result<()> {
        let mut inner = self.inner.lock();
        let already_active = inner
            .applications
            .values()
            .any(|v| v.record.owner == app.owner && v.record.status.is_active());
        if already_active {
            return Err(WorkflowError::ValidationFailed(
                "owner already has an active application".to_string(),
            ));
        }
        inner
            .applications
            .insert(app.id, Versioned { record: app, version: 1 });
        Ok(())
    }

    fn load_application(&self, id: Uuid) -> Result<Versioned<Application>> {
        self.inner
            .lock()
            .applications
            .get(&id)
            .cloned()
            .ok_or(WorkflowError::NotFound)
    }

    fn active_application_for(&self, owner: Uuid) -> Option<Uuid> {
        self.inner
            .lock()
            .applications
            .values()
            .find(|v| v.record.owner == owner && v.record.status.is_active())
            .map(|v| v.record.id)
    }

    fn update_application(
        &self,
        expected_version: u64,
        app: Application,
        action: TransitionAction,
    ) -> Result<u64> {
        let mut inner = self.inner.lock();
        let stored = inner
            .applications
            .get_mut(&app.id)
            .ok_or(WorkflowError::NotFound)?;
        if stored.version != expected_version {
            // Lost the race: report the status the winner left behind.
            return Err(WorkflowError::InvalidTransition {
                from: stored.record.status.as_str(),
                action: action.as_str(),
            });
        }
        stored.record = app;
        stored.version += 1;
        Ok(stored.version)
    }

    fn delete_application(&self, id: Uuid, expected_version: u64) -> Result<()> {
        let mut inner = self.inner.lock();
        let stored = inner.applications.get(&id).ok_or(WorkflowError::NotFound)?;
        if stored.version != expected_version {
            return Err(WorkflowError::InvalidTransition {
                from: stored.record.status.as_str(),
                action: TransitionAction::Delete.as_str(),
            });
        }
        inner.applications.remove(&id);
        Ok(())
    }

    fn post_profile(
        &self,
        application_id: Uuid,
        expected_version: u64,
        profile: Profile,
    ) -> Result<Uuid> {
        let mut inner = self.inner.lock();

        // Re-validate every precondition under the lock; the caller's checks
        // may have been computed against stale state.
        let stored = inner
            .applications
            .get(&application_id)
            .ok_or(WorkflowError::NotFound)?;
        if stored.record.is_posted {
            return Err(WorkflowError::AlreadyPosted);
        }
        if stored.record.status != crate::types::ApplicationStatus::Approved {
            return Err(WorkflowError::NotApproved);
        }
        if inner.owner_profiles.contains_key(&profile.owner) {
            return Err(WorkflowError::DuplicateProfile);
        }
        if stored.version != expected_version {
            return Err(WorkflowError::InvalidTransition {
                from: stored.record.status.as_str(),
                action: TransitionAction::Post.as_str(),
            });
        }

        // Both writes commit under the same lock hold: the profile row and
        // the application's posting link are never observable apart.
        let profile_id = profile.id;
        let owner = profile.owner;
        inner
            .profiles
            .insert(profile_id, Versioned { record: profile, version: 1 });
        inner.owner_profiles.insert(owner, profile_id);

        let stored = inner
            .applications
            .get_mut(&application_id)
            .ok_or(WorkflowError::NotFound)?;
        stored.record.is_posted = true;
        stored.record.profile_id = Some(profile_id);
        stored.record.updated_at = Utc::now();
        stored.version += 1;

        Ok(profile_id)
    }

    fn load_profile(&self, id: Uuid) -> Result<Versioned<Profile>> {
        self.inner
            .lock()
            .profiles
            .get(&id)
            .cloned()
            .ok_or(WorkflowError::NotFound)
    }

    fn profile_for_owner(&self, owner: Uuid) -> Option<Uuid> {
        self.inner.lock().owner_profiles.get(&owner).copied()
    }

    fn insert_donation(&self, donation: Donation) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.profiles.contains_key(&donation.profile_id) {
            return Err(WorkflowError::NotFound);
        }
        // Donations enter the store Pending; the only way to Completed is
        // `complete_donation`, which carries the ledger increment with it.
        if donation.status != DonationStatus::Pending {
            return Err(WorkflowError::ValidationFailed(
                "donations are recorded as pending".to_string(),
            ));
        }
        inner
            .donations
            .insert(donation.id, Versioned { record: donation, version: 1 });
        Ok(())
    }

    fn load_donation(&self, id: Uuid) -> Result<Versioned<Donation>> {
        self.inner
            .lock()
            .donations
            .get(&id)
            .cloned()
            .ok_or(WorkflowError::NotFound)
    }

    fn complete_donation(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock();
        let donation = inner.donations.get(&id).ok_or(WorkflowError::NotFound)?;
        if donation.record.status != DonationStatus::Pending {
            return Err(WorkflowError::InvalidTransition {
                from: donation.record.status.as_str(),
                action: "complete",
            });
        }
        let profile_id = donation.record.profile_id;
        let amount = donation.record.amount;

        // Status write and ledger increment commit under the same lock hold;
        // neither is ever applied without the other.
        let profile = inner
            .profiles
            .get_mut(&profile_id)
            .ok_or_else(|| {
                WorkflowError::IntegrityViolation(format!(
                    "donation {id} references missing profile {profile_id}"
                ))
            })?;
        profile.record.amount_raised += amount;
        profile.version += 1;

        let donation = inner
            .donations
            .get_mut(&id)
            .ok_or(WorkflowError::NotFound)?;
        donation.record.status = DonationStatus::Completed;
        donation.record.completed_at = Some(Utc::now());
        donation.version += 1;
        Ok(())
    }

    fn settle_donation(&self, id: Uuid, outcome: Settlement) -> Result<()> {
        let mut inner = self.inner.lock();
        let donation = inner
            .donations
            .get_mut(&id)
            .ok_or(WorkflowError::NotFound)?;
        if donation.record.status != DonationStatus::Pending {
            return Err(WorkflowError::InvalidTransition {
                from: donation.record.status.as_str(),
                action: "settle",
            });
        }
        donation.record.status = outcome.status();
        donation.version += 1;
        Ok(())
    }

    fn donations_for_profile(&self, profile_id: Uuid) -> Vec<Donation> {
        self.inner
            .lock()
            .donations
            .values()
            .filter(|v| v.record.profile_id == profile_id)
            .map(|v| v.record.clone())
            .collect()
    }

    fn grant_claim(&self, user: Uuid, capability: Capability) {
        self.inner
            .lock()
            .claims
            .entry(user)
            .or_default()
            .insert(capability);
    }

    fn revoke_claim(&self, user: Uuid, capability: Capability) {
        if let Some(set) = self.inner.lock().claims.get_mut(&user) {
            set.remove(&capability);
        }
    }

    fn claims_for(&self, user: Uuid) -> BTreeSet<Capability> {
        self.inner
            .lock()
            .claims
            .get(&user)
            .cloned()
            .unwrap_or_default()
    }

    fn append_audit(&self, entry: AuditEntry) {
        self.inner.lock().audit.push(entry);
    }

    fn audit_entries(&self) -> Vec<AuditEntry> {
        self.inner.lock().audit.clone()
    }
}
