#![allow(dead_code)]

//! Reusable invariant assertions shared by the workflow tests.

use crate::types::{Application, ApplicationStatus, Donation, DonationStatus, Profile};

/// INV-1: the posting link is all-or-nothing — `is_posted` and `profile_id`
/// are set together, and posting implies Approved.
pub fn assert_posting_link_consistent(app: &Application) {
    assert_eq!(
        app.is_posted,
        app.profile_id.is_some(),
        "INV-1 violated: application {} has is_posted={} but profile_id={:?}",
        app.id,
        app.is_posted,
        app.profile_id
    );
    if app.is_posted {
        assert_eq!(
            app.status,
            ApplicationStatus::Approved,
            "INV-1 violated: application {} is posted but not approved",
            app.id
        );
    }
}

/// INV-2: ledger equality — a profile's raised total equals the sum of its
/// Completed donations.
pub fn assert_ledger_balanced(profile: &Profile, donations: &[Donation]) {
    let completed: i64 = donations
        .iter()
        .filter(|d| d.profile_id == profile.id && d.status == DonationStatus::Completed)
        .map(|d| d.amount)
        .sum();
    assert_eq!(
        profile.amount_raised, completed,
        "INV-2 violated: profile {} raised {} but completed donations sum to {}",
        profile.id, profile.amount_raised, completed
    );
}

/// INV-3: raised totals never go negative.
pub fn assert_raised_non_negative(profile: &Profile) {
    assert!(
        profile.amount_raised >= 0,
        "INV-3 violated: profile {} has negative raised total {}",
        profile.id,
        profile.amount_raised
    );
}

/// INV-4: an approved application carries its full review trail — it was
/// reviewed before it was approved.
pub fn assert_review_trail(app: &Application) {
    if app.status == ApplicationStatus::Approved {
        assert!(
            app.reviewed_by.is_some() && app.reviewed_at.is_some(),
            "INV-4 violated: application {} approved without a recorded reviewer",
            app.id
        );
        assert!(
            app.approved_by.is_some() && app.approved_at.is_some(),
            "INV-4 violated: application {} approved without a recorded approver",
            app.id
        );
    }
}

/// INV-5: fields fixed at submission never change.
pub fn assert_submission_immutable(original: &Application, current: &Application) {
    assert_eq!(
        original.id, current.id,
        "INV-5 violated: application id changed"
    );
    assert_eq!(
        original.owner, current.owner,
        "INV-5 violated: application owner changed"
    );
    assert_eq!(
        original.submitted_at, current.submitted_at,
        "INV-5 violated: submitted_at changed"
    );
}
