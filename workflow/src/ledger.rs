//! # Donation ledger rule
//!
//! Cross-cutting invariant, not a payment engine: whenever a donation
//! reaches `Completed`, the referenced profile's `amount_raised` grows by
//! exactly that donation's amount, in the same atomic unit as the status
//! write. No path marks a donation Completed without the increment and no
//! path increments the total without a Completed donation — regardless of
//! which payment collaborator produced the completion.
//!
//! [`DonationLedger::verify_profile`] rechecks the 1:1 correspondence; a
//! mismatch is a data-integrity fault (`IntegrityViolation`), not an
//! ordinary error.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{Result, WorkflowError};
use crate::store::WorkflowStore;
use crate::types::{Donation, DonationStatus, Settlement};

/// Ledger-side entry points for the payment collaborators.
pub struct DonationLedger {
    store: Arc<dyn WorkflowStore>,
}

impl DonationLedger {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        DonationLedger { store }
    }

    /// Record a pending donation against a profile, ahead of payment
    /// capture. The amount must be positive; the profile must exist.
    pub fn record_pending(&self, profile_id: Uuid, donor: Uuid, amount: i64) -> Result<Uuid> {
        if amount <= 0 {
            return Err(WorkflowError::ValidationFailed(format!(
                "donation amount must be positive, got {amount}"
            )));
        }
        let donation = Donation {
            id: Uuid::new_v4(),
            profile_id,
            donor,
            amount,
            status: DonationStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
        };
        let id = donation.id;
        self.store.insert_donation(donation)?;
        Ok(id)
    }

    /// Payment captured: mark Completed and apply the ledger increment
    /// atomically. Only legal from `Pending`.
    pub fn complete(&self, donation_id: Uuid) -> Result<()> {
        self.store.complete_donation(donation_id)?;
        info!(donation = %donation_id, "donation completed, ledger updated");
        Ok(())
    }

    /// Payment failed; the ledger is untouched.
    pub fn fail(&self, donation_id: Uuid) -> Result<()> {
        self.store.settle_donation(donation_id, Settlement::Failed)
    }

    /// Donor cancelled before capture; the ledger is untouched.
    pub fn cancel(&self, donation_id: Uuid) -> Result<()> {
        self.store.settle_donation(donation_id, Settlement::Cancelled)
    }

    /// Recheck the ledger invariant for one profile:
    /// `amount_raised == Σ(amount of its Completed donations)`.
    ///
    /// A mismatch means a code path broke the 1:1 correspondence; it is
    /// reported as `IntegrityViolation` and requires operator intervention.
    pub fn verify_profile(&self, profile_id: Uuid) -> Result<()> {
        let profile = self.store.load_profile(profile_id)?.record;
        let completed_total: i64 = self
            .store
            .donations_for_profile(profile_id)
            .iter()
            .filter(|d| d.status == DonationStatus::Completed)
            .map(|d| d.amount)
            .sum();
        if profile.amount_raised != completed_total {
            error!(
                profile = %profile_id,
                raised = profile.amount_raised,
                completed_total,
                "ledger invariant violated"
            );
            return Err(WorkflowError::IntegrityViolation(format!(
                "profile {profile_id} raised total {} does not match completed donations {}",
                profile.amount_raised, completed_total
            )));
        }
        Ok(())
    }
}
