//! State machine tests: guards, transition table, review trail, races, and
//! notification fan-out.

use std::sync::Arc;
use std::thread;

use uuid::Uuid;

use crate::authz::StaticRoleDirectory;
use crate::capability::Role;
use crate::error::WorkflowError;
use crate::invariants;
use crate::machine::ReviewWorkflow;
use crate::notify::testutil::RecordingNotifier;
use crate::store::{MemoryStore, WorkflowStore};
use crate::types::{ApplicationPayload, ApplicationStatus};

struct Harness {
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
    workflow: Arc<ReviewWorkflow>,
    student: Uuid,
    manager: Uuid,
    admin: Uuid,
}

fn setup() -> Harness {
    setup_with_notifier(Arc::new(RecordingNotifier::default()))
}

fn setup_with_notifier(notifier: Arc<RecordingNotifier>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(StaticRoleDirectory::new());
    let student = Uuid::new_v4();
    let manager = Uuid::new_v4();
    let admin = Uuid::new_v4();
    directory.assign(student, Role::Student);
    directory.assign(manager, Role::Manager);
    directory.assign(admin, Role::Admin);
    let workflow = Arc::new(ReviewWorkflow::new(
        store.clone(),
        directory,
        notifier.clone(),
    ));
    Harness {
        store,
        notifier,
        workflow,
        student,
        manager,
        admin,
    }
}

fn payload() -> ApplicationPayload {
    ApplicationPayload {
        full_name: "Amina Diallo".to_string(),
        age: 20,
        personal_statement: "First-generation CS student.".to_string(),
        family_background: "Single-income household.".to_string(),
        academic_record: "Top decile, two semesters.".to_string(),
        requested_amount: 500,
        household_salary: 12_000,
        document_urls: vec!["https://files.example/transcript.pdf".to_string()],
        gallery_urls: vec![],
    }
}

#[test]
fn happy_path_submit_review_approve() {
    let h = setup();
    let id = h.workflow.submit(h.student, payload()).unwrap();

    let app = h.store.load_application(id).unwrap().record;
    assert_eq!(app.status, ApplicationStatus::Pending);
    assert_eq!(app.owner, h.student);
    let original = app.clone();

    h.workflow.mark_under_review(id, h.manager).unwrap();
    let app = h.store.load_application(id).unwrap().record;
    assert_eq!(app.status, ApplicationStatus::UnderReview);
    assert_eq!(app.reviewed_by, Some(h.manager));
    assert!(app.reviewed_at.is_some());

    h.workflow.approve(id, h.admin).unwrap();
    let app = h.store.load_application(id).unwrap().record;
    assert_eq!(app.status, ApplicationStatus::Approved);
    assert_eq!(app.approved_by, Some(h.admin));

    invariants::assert_review_trail(&app);
    invariants::assert_posting_link_consistent(&app);
    invariants::assert_submission_immutable(&original, &app);
}

#[test]
fn underage_submission_creates_no_application() {
    let h = setup();
    let mut p = payload();
    p.age = 15;
    let err = h.workflow.submit(h.student, p).unwrap_err();
    assert!(matches!(err, WorkflowError::ValidationFailed(_)));
    assert!(h.store.active_application_for(h.student).is_none());
}

#[test]
fn out_of_range_amount_and_salary_are_rejected() {
    let h = setup();

    let mut p = payload();
    p.requested_amount = 99;
    assert!(matches!(
        h.workflow.submit(h.student, p).unwrap_err(),
        WorkflowError::ValidationFailed(_)
    ));

    let mut p = payload();
    p.requested_amount = 1_000_000;
    assert!(matches!(
        h.workflow.submit(h.student, p).unwrap_err(),
        WorkflowError::ValidationFailed(_)
    ));

    let mut p = payload();
    p.household_salary = -1;
    assert!(matches!(
        h.workflow.submit(h.student, p).unwrap_err(),
        WorkflowError::ValidationFailed(_)
    ));
}

#[test]
fn second_active_application_is_refused() {
    let h = setup();
    h.workflow.submit(h.student, payload()).unwrap();
    let err = h.workflow.submit(h.student, payload()).unwrap_err();
    assert!(matches!(err, WorkflowError::ValidationFailed(_)));
}

#[test]
fn pending_cannot_be_approved_directly() {
    let h = setup();
    let id = h.workflow.submit(h.student, payload()).unwrap();

    let err = h.workflow.approve(id, h.admin).unwrap_err();
    assert_eq!(
        err,
        WorkflowError::InvalidTransition {
            from: "pending",
            action: "approve",
        }
    );
    // Must pass through review first.
    let app = h.store.load_application(id).unwrap().record;
    assert_eq!(app.status, ApplicationStatus::Pending);
}

#[test]
fn unprivileged_caller_cannot_review() {
    let h = setup();
    let id = h.workflow.submit(h.student, payload()).unwrap();

    let err = h.workflow.mark_under_review(id, h.student).unwrap_err();
    assert_eq!(err, WorkflowError::Unauthorized);
    let app = h.store.load_application(id).unwrap().record;
    assert_eq!(app.status, ApplicationStatus::Pending);
}

#[test]
fn mark_incomplete_stores_reason_and_notifies_submitter() {
    let h = setup();
    let id = h.workflow.submit(h.student, payload()).unwrap();

    h.workflow
        .mark_incomplete(id, h.manager, "transcript missing")
        .unwrap();
    let app = h.store.load_application(id).unwrap().record;
    assert_eq!(app.status, ApplicationStatus::Incomplete);
    assert_eq!(app.status_reason.as_deref(), Some("transcript missing"));

    let titles = h.notifier.titles_for(h.student);
    assert_eq!(titles, vec!["Your application needs more information"]);
}

#[test]
fn resubmit_clears_reason_and_returns_to_pending() {
    let h = setup();
    let id = h.workflow.submit(h.student, payload()).unwrap();
    h.workflow
        .mark_incomplete(id, h.manager, "transcript missing")
        .unwrap();

    let mut replacement = payload();
    replacement.requested_amount = 750;
    h.workflow.resubmit(id, h.student, replacement).unwrap();

    let app = h.store.load_application(id).unwrap().record;
    assert_eq!(app.status, ApplicationStatus::Pending);
    assert_eq!(app.status_reason, None);
    assert_eq!(app.payload.requested_amount, 750);
}

#[test]
fn resubmit_is_only_legal_from_incomplete() {
    let h = setup();
    let id = h.workflow.submit(h.student, payload()).unwrap();

    let err = h.workflow.resubmit(id, h.student, payload()).unwrap_err();
    assert_eq!(
        err,
        WorkflowError::InvalidTransition {
            from: "pending",
            action: "resubmit",
        }
    );
}

#[test]
fn resubmit_by_non_owner_is_unauthorized() {
    let h = setup();
    let id = h.workflow.submit(h.student, payload()).unwrap();
    h.workflow
        .mark_incomplete(id, h.manager, "needs documents")
        .unwrap();

    let err = h.workflow.resubmit(id, h.manager, payload()).unwrap_err();
    assert_eq!(err, WorkflowError::Unauthorized);
}

#[test]
fn admin_may_reject_straight_from_pending() {
    let h = setup();
    let id = h.workflow.submit(h.student, payload()).unwrap();

    h.workflow.reject(id, h.admin, "duplicate identity").unwrap();
    let app = h.store.load_application(id).unwrap().record;
    assert_eq!(app.status, ApplicationStatus::Rejected);
    assert_eq!(app.status_reason.as_deref(), Some("duplicate identity"));
}

#[test]
fn rejecting_a_reviewed_application_notifies_the_reviewer() {
    let h = setup();
    let id = h.workflow.submit(h.student, payload()).unwrap();
    h.workflow.mark_under_review(id, h.manager).unwrap();

    h.workflow.reject(id, h.admin, "ineligible program").unwrap();

    assert_eq!(
        h.notifier.titles_for(h.student),
        vec!["Your application was rejected"]
    );
    let manager_titles = h.notifier.titles_for(h.manager);
    assert!(manager_titles.contains(&"Reviewed application rejected".to_string()));
}

#[test]
fn rejected_applications_can_be_deleted_and_nothing_else() {
    let h = setup();
    let id = h.workflow.submit(h.student, payload()).unwrap();

    // Delete is not legal while pending.
    let err = h.workflow.delete_rejected(id, h.manager).unwrap_err();
    assert_eq!(
        err,
        WorkflowError::InvalidTransition {
            from: "pending",
            action: "delete",
        }
    );

    h.workflow.reject(id, h.manager, "out of scope").unwrap();
    // Rejected is terminal for status changes.
    let err = h.workflow.mark_under_review(id, h.manager).unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

    h.workflow.delete_rejected(id, h.manager).unwrap();
    assert_eq!(
        h.store.load_application(id).unwrap_err(),
        WorkflowError::NotFound
    );
}

#[test]
fn owner_may_submit_again_after_posting() {
    let h = setup();
    let id = h.workflow.submit(h.student, payload()).unwrap();
    h.workflow.mark_under_review(id, h.manager).unwrap();
    h.workflow.approve(id, h.admin).unwrap();
    h.workflow.post_as_profile(id, h.manager, None).unwrap();

    // Approved-and-posted is not active, so a fresh submission is allowed.
    h.workflow.submit(h.student, payload()).unwrap();
}

#[test]
fn concurrent_reviews_serialize_to_one_winner() {
    let h = setup();
    let manager_b = Uuid::new_v4();
    // Both managers resolved through the directory used at setup; grant the
    // second one a claim instead to keep the harness simple.
    h.workflow
        .update_permissions(
            h.admin,
            manager_b,
            &["students.manage".to_string()],
            &[],
        )
        .unwrap();

    let id = h.workflow.submit(h.student, payload()).unwrap();

    let w1 = h.workflow.clone();
    let w2 = h.workflow.clone();
    let m1 = h.manager;
    let t1 = thread::spawn(move || w1.mark_under_review(id, m1));
    let t2 = thread::spawn(move || w2.mark_under_review(id, manager_b));
    let r1 = t1.join().unwrap();
    let r2 = t2.join().unwrap();

    assert!(
        r1.is_ok() ^ r2.is_ok(),
        "exactly one concurrent review must win, got {r1:?} / {r2:?}"
    );
    let loser = if r1.is_err() { r1 } else { r2 };
    assert!(matches!(
        loser.unwrap_err(),
        WorkflowError::InvalidTransition { .. }
    ));

    let app = h.store.load_application(id).unwrap().record;
    assert_eq!(app.status, ApplicationStatus::UnderReview);
}

#[test]
fn notification_failure_never_fails_the_transition() {
    let h = setup_with_notifier(Arc::new(RecordingNotifier::failing()));
    let id = h.workflow.submit(h.student, payload()).unwrap();

    h.workflow.mark_under_review(id, h.manager).unwrap();
    let app = h.store.load_application(id).unwrap().record;
    assert_eq!(app.status, ApplicationStatus::UnderReview);
}

#[test]
fn submission_notifies_every_manager() {
    let h = setup();
    h.workflow.submit(h.student, payload()).unwrap();

    assert_eq!(
        h.notifier.titles_for(h.manager),
        vec!["New funding application"]
    );
}
