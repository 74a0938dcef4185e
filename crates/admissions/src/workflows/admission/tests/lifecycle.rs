use std::sync::Arc;

use super::common::*;
use crate::workflows::admission::domain::{AdmissionStatus, Permission};
use crate::workflows::admission::lifecycle::{
    allowed_actions, plan, AdmissionAction, AdmissionError,
};
use crate::workflows::admission::repository::ApplicationRepository;

#[test]
fn plan_resolves_legal_edges() {
    let rule = plan(AdmissionAction::Review, AdmissionStatus::Submitted).expect("legal edge");
    assert_eq!(rule.to, AdmissionStatus::UnderReview);

    let rule = plan(AdmissionAction::FinalizeBilling, AdmissionStatus::PaymentCorrection)
        .expect("re-billing after correction is legal");
    assert_eq!(rule.to, AdmissionStatus::PaymentPending);
}

#[test]
fn plan_rejects_illegal_edges() {
    match plan(AdmissionAction::Approve, AdmissionStatus::Draft) {
        Err(AdmissionError::InvalidTransition { action, status }) => {
            assert_eq!(action, AdmissionAction::Approve);
            assert_eq!(status, AdmissionStatus::Draft);
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }

    assert!(plan(AdmissionAction::Enrol, AdmissionStatus::Recommended).is_err());
    assert!(plan(AdmissionAction::Submit, AdmissionStatus::Submitted).is_err());
    // Terminal happy state: nothing leaves enrolled.
    assert!(allowed_actions(AdmissionStatus::Enrolled).is_empty());
}

#[test]
fn reject_is_reachable_from_every_active_stage() {
    for status in [
        AdmissionStatus::Submitted,
        AdmissionStatus::UnderReview,
        AdmissionStatus::DocsVerified,
        AdmissionStatus::PaymentPending,
        AdmissionStatus::PaymentSubmitted,
        AdmissionStatus::PaymentVerified,
        AdmissionStatus::Recommended,
    ] {
        let rule = plan(AdmissionAction::Reject, status).expect("reject is reachable");
        assert_eq!(rule.to, AdmissionStatus::Rejected);
    }

    assert!(plan(AdmissionAction::Reject, AdmissionStatus::Approved).is_err());
    assert!(plan(AdmissionAction::Reject, AdmissionStatus::Enrolled).is_err());
}

#[test]
fn allowed_actions_reflect_the_table() {
    let from_submitted = allowed_actions(AdmissionStatus::Submitted);
    assert!(from_submitted.contains(&AdmissionAction::Review));
    assert!(from_submitted.contains(&AdmissionAction::Reject));
    assert!(!from_submitted.contains(&AdmissionAction::Approve));

    let from_rejected = allowed_actions(AdmissionStatus::Rejected);
    assert_eq!(from_rejected, vec![AdmissionAction::Revoke]);
}

#[test]
fn submit_requires_the_owning_applicant() {
    let world = world();
    let draft = world.service.create_draft(intake()).expect("draft");

    match world.service.submit(&officer(), &draft.id) {
        Err(AdmissionError::NotRecordOwner { action }) => {
            assert_eq!(action, AdmissionAction::Submit);
        }
        other => panic!("expected ownership violation, got {other:?}"),
    }

    let stranger = crate::workflows::admission::Actor::Applicant(
        crate::workflows::admission::ApplicantId("someone-else".to_string()),
    );
    assert!(matches!(
        world.service.submit(&stranger, &draft.id),
        Err(AdmissionError::NotRecordOwner { .. })
    ));

    let stored = world
        .repository
        .fetch(&draft.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.status, AdmissionStatus::Draft);
}

#[test]
fn permission_denial_leaves_status_unchanged() {
    let world = world_with_permissions(Arc::new(GrantList(vec![Permission::Review])));
    let record = submitted_application(&world);
    let reviewed = world
        .service
        .review(&officer(), &record.id, None)
        .expect("review permission granted");
    assert_eq!(reviewed.status, AdmissionStatus::UnderReview);

    match world.service.reject(&officer(), &record.id, "incomplete") {
        Err(AdmissionError::PermissionDenied { action, permission }) => {
            assert_eq!(action, AdmissionAction::Reject);
            assert_eq!(permission, Permission::Reject);
        }
        other => panic!("expected permission denial, got {other:?}"),
    }

    let stored = world
        .repository
        .fetch(&record.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.status, AdmissionStatus::UnderReview);
}

#[test]
fn approve_without_permission_is_denied_and_state_keeps() {
    let full = world();
    let record = recommended_application(&full);

    // Same store, restricted evaluator: the actor can no longer approve.
    let restricted = Arc::new(crate::workflows::admission::AdmissionService::new(
        full.repository.clone(),
        full.audit.clone(),
        crate::workflows::admission::Collaborators {
            permissions: Arc::new(GrantList(vec![Permission::Review])),
            catalog: Arc::new(DenyCatalog),
            directory: full.directory.clone(),
            notifier: full.notifier.clone(),
            provisioner: full.provisioner.clone(),
        },
    ));

    match restricted.approve(&head(), &record.id, None) {
        Err(AdmissionError::PermissionDenied { action, permission }) => {
            assert_eq!(action, AdmissionAction::Approve);
            assert_eq!(permission, Permission::Approve);
        }
        other => panic!("expected permission denial, got {other:?}"),
    }

    let stored = full
        .repository
        .fetch(&record.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.status, AdmissionStatus::Recommended);
}

struct DenyCatalog;

impl crate::workflows::admission::FeeCatalog for DenyCatalog {
    fn selectable(
        &self,
        _academic_session: &str,
        _grade_level: &str,
    ) -> Result<Vec<crate::workflows::admission::FeeStructure>, crate::workflows::admission::CollaboratorError>
    {
        Err(crate::workflows::admission::CollaboratorError::Unavailable(
            "catalog offline".to_string(),
        ))
    }
}

#[test]
fn revoke_reopens_a_rejected_application() {
    let world = world();
    let record = submitted_application(&world);
    world
        .service
        .review(&officer(), &record.id, None)
        .expect("review succeeds");
    let rejected = world
        .service
        .reject(&officer(), &record.id, "missing transcripts")
        .expect("reject succeeds");
    assert_eq!(rejected.status, AdmissionStatus::Rejected);
    assert_eq!(
        rejected.rejection_reason.as_deref(),
        Some("missing transcripts")
    );

    let reopened = world
        .service
        .revoke(&officer(), &record.id, Some("rejected in error".to_string()))
        .expect("revoke succeeds");
    assert_eq!(reopened.status, AdmissionStatus::Submitted);
    assert!(reopened.rejection_reason.is_none());
    assert!(reopened.rejected_at.is_none());
}

#[test]
fn full_happy_path_reaches_enrolled() {
    let world = world();
    let record = enrolled_application(&world);
    assert_eq!(record.status, AdmissionStatus::Enrolled);
    assert!(record.payment.verified);
    assert!(record.submitted_at.is_some());
    assert!(record.recommended_at.is_some());
    assert!(record.approved_at.is_some());
    assert_eq!(world.provisioner.provisioned(), vec![record.id.clone()]);
}

#[test]
fn payment_resubmission_after_correction() {
    let world = world();
    let record = payment_submitted_application(&world);

    let corrected = world
        .service
        .verify_fee(
            &finance(),
            &record.id,
            crate::workflows::admission::FeeVerdict::Correction,
            Some("reference does not match the bank statement".to_string()),
        )
        .expect("correction succeeds");
    assert_eq!(corrected.status, AdmissionStatus::PaymentCorrection);
    assert_eq!(
        corrected.finance_remarks.as_deref(),
        Some("reference does not match the bank statement")
    );

    let resubmitted = world
        .service
        .submit_payment(
            &applicant(),
            &record.id,
            crate::workflows::admission::PaymentMode::Online,
            "TXN-88413".to_string(),
            None,
        )
        .expect("resubmission succeeds");
    assert_eq!(resubmitted.status, AdmissionStatus::PaymentSubmitted);
    assert_eq!(resubmitted.payment.reference.as_deref(), Some("TXN-88413"));
    assert!(
        resubmitted.finance_remarks.is_none(),
        "resubmission clears the correction note"
    );
}

#[test]
fn reject_requires_a_reason() {
    let world = world();
    let record = submitted_application(&world);

    match world.service.reject(&officer(), &record.id, "   ") {
        Err(AdmissionError::Validation(message)) => {
            assert!(message.contains("reason"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let stored = world
        .repository
        .fetch(&record.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.status, AdmissionStatus::Submitted);
    assert!(stored.rejection_reason.is_none());
}
