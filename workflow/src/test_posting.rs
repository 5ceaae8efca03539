//! Posting step tests: one-shot publication, atomicity of the profile +
//! posting-link pair, and the owner-uniqueness invariant.

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
    workflow: Arc<ReviewWorkflow>,
    student: Uuid,
    manager: Uuid,
    admin: Uuid,
}

fn setup() -> Harness {
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
        Arc::new(RecordingNotifier::default()),
    ));
    Harness {
        store,
        workflow,
        student,
        manager,
        admin,
    }
}

fn payload() -> ApplicationPayload {
    ApplicationPayload {
        full_name: "Kwame Mensah".to_string(),
        age: 22,
        personal_statement: "Final-year engineering student.".to_string(),
        family_background: "Farming family, three siblings.".to_string(),
        academic_record: "Dean's list.".to_string(),
        requested_amount: 500,
        household_salary: 8_000,
        document_urls: vec![],
        gallery_urls: vec![],
    }
}

/// Submit → review → approve, returning the application id.
fn approved_application(h: &Harness, owner: Uuid) -> Uuid {
    let id = h.workflow.submit(owner, payload()).unwrap();
    h.workflow.mark_under_review(id, h.manager).unwrap();
    h.workflow.approve(id, h.admin).unwrap();
    id
}

#[test]
fn posting_creates_profile_and_links_it_back() {
    let h = setup();
    let id = approved_application(&h, h.student);

    let profile_id = h.workflow.post_as_profile(id, h.manager, None).unwrap();

    let profile = h.store.load_profile(profile_id).unwrap().record;
    assert_eq!(profile.owner, h.student);
    assert_eq!(profile.funding_goal, 500);
    assert_eq!(profile.amount_raised, 0);
    assert!(profile.visible);

    let app = h.store.load_application(id).unwrap().record;
    assert!(app.is_posted);
    assert_eq!(app.profile_id, Some(profile_id));
    assert_eq!(app.status, ApplicationStatus::Approved);
    invariants::assert_posting_link_consistent(&app);
}

#[test]
fn goal_override_replaces_requested_amount() {
    let h = setup();
    let id = approved_application(&h, h.student);

    let profile_id = h
        .workflow
        .post_as_profile(id, h.manager, Some(1_200))
        .unwrap();
    let profile = h.store.load_profile(profile_id).unwrap().record;
    assert_eq!(profile.funding_goal, 1_200);
}

#[test]
fn only_approved_applications_can_be_posted() {
    let h = setup();
    let id = h.workflow.submit(h.student, payload()).unwrap();

    assert_eq!(
        h.workflow.post_as_profile(id, h.manager, None).unwrap_err(),
        WorkflowError::NotApproved
    );

    h.workflow.mark_under_review(id, h.manager).unwrap();
    assert_eq!(
        h.workflow.post_as_profile(id, h.manager, None).unwrap_err(),
        WorkflowError::NotApproved
    );
}

#[test]
fn posting_requires_students_manage() {
    let h = setup();
    let id = approved_application(&h, h.student);

    assert_eq!(
        h.workflow.post_as_profile(id, h.student, None).unwrap_err(),
        WorkflowError::Unauthorized
    );
}

#[test]
fn second_post_fails_with_already_posted() {
    let h = setup();
    let id = approved_application(&h, h.student);

    h.workflow.post_as_profile(id, h.manager, None).unwrap();
    assert_eq!(
        h.workflow.post_as_profile(id, h.manager, None).unwrap_err(),
        WorkflowError::AlreadyPosted
    );
}

#[test]
fn concurrent_double_post_yields_exactly_one_profile() {
    let h = setup();
    let id = approved_application(&h, h.student);

    let w1 = h.workflow.clone();
    let w2 = h.workflow.clone();
    let (m1, m2) = (h.manager, h.admin);
    let t1 = thread::spawn(move || w1.post_as_profile(id, m1, None));
    let t2 = thread::spawn(move || w2.post_as_profile(id, m2, None));
    let r1 = t1.join().unwrap();
    let r2 = t2.join().unwrap();

    assert!(
        r1.is_ok() ^ r2.is_ok(),
        "exactly one concurrent post must win, got {r1:?} / {r2:?}"
    );
    let loser = if r1.is_err() { &r1 } else { &r2 };
    assert_eq!(
        loser.clone().unwrap_err(),
        WorkflowError::AlreadyPosted
    );

    let app = h.store.load_application(id).unwrap().record;
    assert!(app.is_posted);
    let winner = r1.or(r2).unwrap();
    assert_eq!(app.profile_id, Some(winner));
}

#[test]
fn one_profile_per_owner() {
    let h = setup();

    // First application posts a profile.
    let first = approved_application(&h, h.student);
    h.workflow.post_as_profile(first, h.manager, None).unwrap();

    // A second, later application by the same owner approves fine but
    // cannot produce a second profile.
    let second = approved_application(&h, h.student);
    assert_eq!(
        h.workflow
            .post_as_profile(second, h.manager, None)
            .unwrap_err(),
        WorkflowError::DuplicateProfile
    );

    // The losing application keeps a consistent (unposted) link state.
    let app = h.store.load_application(second).unwrap().record;
    assert!(!app.is_posted);
    assert_eq!(app.profile_id, None);
    invariants::assert_posting_link_consistent(&app);
}
