use std::sync::Arc;

use super::common::*;
use crate::audits::catalog::TemplateCatalog;
use crate::audits::domain::{AuditSubject, InstanceStatus, RagStatus, Verdict};
use crate::audits::lifecycle::LifecycleError;
use crate::audits::memory::{
    MemoryActionItemRepository, MemoryEventPublisher, MemoryInstanceRepository, StaticDirectory,
};
use crate::audits::repository::InstanceRepository;
use crate::audits::service::{AuditService, EngineSettings, ServiceError};

#[test]
fn acceptance_creates_a_scheduled_instance_with_a_bound_snapshot() {
    let harness = harness();
    let instance = accept_one(&harness, "medication_management", date(2025, 1, 10));

    assert_eq!(instance.status, InstanceStatus::Scheduled);
    assert_eq!(instance.owner, "registered-manager");
    assert_eq!(instance.template.version, 1);
    assert!(!instance.template.sections.is_empty());
    assert!(instance.subject.is_none());
}

#[test]
fn second_acceptance_of_an_overlapping_suggestion_conflicts() {
    let harness = harness();
    let first = accept_one(&harness, "medication_management", date(2025, 1, 10));

    let error = harness
        .service
        .accept_suggestion(
            &suggestion("medication_management", date(2025, 1, 25)),
            "deputy-manager",
        )
        .expect_err("overlapping acceptance must fail");

    match error {
        ServiceError::Lifecycle(LifecycleError::Conflict { existing }) => {
            assert_eq!(existing, first.id, "the conflicting instance is named");
        }
        other => panic!("expected scheduling conflict, got {other:?}"),
    }
}

#[test]
fn staff_scoped_acceptance_fans_out_per_staff_member() {
    let harness = harness();
    harness.directory.assign_staff(location(), staff_roster(4));

    let report = harness
        .service
        .accept_suggestion(
            &suggestion("staff_supervision", date(2025, 2, 1)),
            "registered-manager",
        )
        .expect("fan-out succeeds");

    assert_eq!(report.created.len(), 4);
    assert!(report.failures.is_empty());
    let subjects: Vec<_> = report
        .created
        .iter()
        .map(|instance| instance.subject.clone().expect("person-scoped"))
        .collect();
    assert!(matches!(subjects[0], AuditSubject::Staff(_)));
    assert!(report
        .created
        .iter()
        .all(|instance| instance.scheduled_for == date(2025, 2, 1)
            && instance.template == report.created[0].template));
}

#[test]
fn service_user_scoped_acceptance_fans_out_per_resident() {
    let harness = harness();
    harness
        .directory
        .assign_service_users(location(), resident_roster(3));

    let report = harness
        .service
        .accept_suggestion(
            &suggestion("care_plan_review", date(2025, 2, 1)),
            "registered-manager",
        )
        .expect("fan-out succeeds");

    assert_eq!(report.created.len(), 3);
    assert!(report
        .created
        .iter()
        .all(|instance| matches!(instance.subject, Some(AuditSubject::ServiceUser(_)))));
}

#[test]
fn fan_out_without_targets_is_rejected() {
    let harness = harness();

    let error = harness
        .service
        .accept_suggestion(
            &suggestion("care_plan_review", date(2025, 2, 1)),
            "registered-manager",
        )
        .expect_err("no residents assigned");

    assert!(matches!(
        error,
        ServiceError::Lifecycle(LifecycleError::Validation(_))
    ));
}

#[test]
fn fan_out_reports_the_gap_for_retry() {
    let harness = harness();
    harness.directory.assign_staff(location(), staff_roster(1));
    let first = harness
        .service
        .accept_suggestion(
            &suggestion("staff_supervision", date(2025, 2, 1)),
            "registered-manager",
        )
        .expect("initial fan-out");
    assert_eq!(first.created.len(), 1);

    // A second staff member joins; re-running the acceptance fills only the
    // gap and reports the existing instance instead of duplicating it.
    harness.directory.assign_staff(location(), staff_roster(2));
    let second = harness
        .service
        .accept_suggestion(
            &suggestion("staff_supervision", date(2025, 2, 1)),
            "registered-manager",
        )
        .expect("partial fan-out succeeds");

    assert_eq!(second.created.len(), 1);
    assert_eq!(second.failures.len(), 1);
    let failure = &second.failures[0];
    assert_eq!(failure.conflict_with, Some(first.created[0].id.clone()));
    assert_eq!(
        failure.subject,
        first.created[0].subject.clone(),
        "the failed target names the already-covered staff member"
    );
}

#[test]
fn first_response_moves_a_scheduled_instance_in_progress() {
    let harness = harness();
    let instance = accept_one(&harness, "medication_management", date(2025, 1, 10));

    let updated = harness
        .service
        .record_response(
            &instance.id,
            answer("storage_temperature", Verdict::Compliant, date(2025, 1, 12)),
        )
        .expect("response recorded");

    assert_eq!(updated.status, InstanceStatus::InProgress);
    assert_eq!(updated.responses.len(), 1);
}

#[test]
fn unknown_questions_are_rejected() {
    let harness = harness();
    let instance = accept_one(&harness, "medication_management", date(2025, 1, 10));

    let error = harness
        .service
        .record_response(
            &instance.id,
            answer("not_a_question", Verdict::Compliant, date(2025, 1, 12)),
        )
        .expect_err("unknown question");

    assert!(matches!(
        error,
        ServiceError::Lifecycle(LifecycleError::QuestionNotFound { .. })
    ));
}

#[test]
fn completion_names_every_missing_required_question() {
    let harness = harness();
    let instance = accept_one(&harness, "medication_management", date(2025, 1, 10));

    for key in [
        "storage_temperature",
        "controlled_drugs_register",
        "keys_custody",
        "mar_gaps",
    ] {
        harness
            .service
            .record_response(&instance.id, answer(key, Verdict::Compliant, date(2025, 1, 12)))
            .expect("response recorded");
    }

    let error = harness
        .service
        .complete(&instance.id, None, date(2025, 1, 12))
        .expect_err("one required question unanswered");
    match error {
        ServiceError::Lifecycle(LifecycleError::Incomplete { missing }) => {
            assert_eq!(missing, vec!["prn_protocols".to_string()]);
        }
        other => panic!("expected incomplete error, got {other:?}"),
    }

    harness
        .service
        .record_response(
            &instance.id,
            answer("prn_protocols", Verdict::Compliant, date(2025, 1, 12)),
        )
        .expect("final required answer");
    let outcome = harness
        .service
        .complete(&instance.id, Some("monthly check".to_string()), date(2025, 1, 12))
        .expect("completion succeeds");

    assert_eq!(outcome.instance.status, InstanceStatus::Completed);
    assert_eq!(outcome.instance.overall_score, Some(100));
    assert_eq!(outcome.instance.rag, Some(RagStatus::Green));
    assert_eq!(outcome.instance.occurred_on, Some(date(2025, 1, 12)));
}

#[test]
fn optional_questions_do_not_block_completion() {
    let harness = harness();
    let instance = accept_one(&harness, "medication_management", date(2025, 1, 10));

    for key in [
        "storage_temperature",
        "controlled_drugs_register",
        "keys_custody",
        "mar_gaps",
        "prn_protocols",
    ] {
        harness
            .service
            .record_response(&instance.id, answer(key, Verdict::Compliant, date(2025, 1, 12)))
            .expect("response recorded");
    }

    // covert_authorisation is optional and stays unanswered.
    harness
        .service
        .complete(&instance.id, None, date(2025, 1, 12))
        .expect("completion succeeds without the optional answer");
}

#[test]
fn completed_instances_are_immutable() {
    let harness = harness();
    let instance = accept_one(&harness, "medication_management", date(2025, 1, 10));
    answer_all(&harness, &instance.id, Verdict::Compliant, date(2025, 1, 12));
    harness
        .service
        .complete(&instance.id, None, date(2025, 1, 12))
        .expect("completion succeeds");

    let error = harness
        .service
        .record_response(
            &instance.id,
            answer("mar_gaps", Verdict::NonCompliant, date(2025, 1, 13)),
        )
        .expect_err("completed instances take no edits");

    match error {
        ServiceError::Lifecycle(LifecycleError::InvalidState { current, .. }) => {
            assert_eq!(current, InstanceStatus::Completed);
        }
        other => panic!("expected invalid state, got {other:?}"),
    }
}

#[test]
fn archive_is_only_reachable_from_completed() {
    let harness = harness();
    let instance = accept_one(&harness, "medication_management", date(2025, 1, 10));

    let error = harness
        .service
        .archive(&instance.id)
        .expect_err("scheduled instances cannot be archived");
    assert!(matches!(
        error,
        ServiceError::Lifecycle(LifecycleError::InvalidState { .. })
    ));

    answer_all(&harness, &instance.id, Verdict::Compliant, date(2025, 1, 12));
    harness
        .service
        .complete(&instance.id, None, date(2025, 1, 12))
        .expect("completion succeeds");
    let archived = harness
        .service
        .archive(&instance.id)
        .expect("archive succeeds after completion");
    assert_eq!(archived.status, InstanceStatus::Archived);
}

#[test]
fn bulk_delete_requires_the_exact_confirmation_token() {
    let harness = harness();
    let instance = accept_one(&harness, "medication_management", date(2025, 1, 10));

    let error = harness
        .service
        .bulk_delete(&location(), "willow", "area-manager", date(2025, 6, 1))
        .expect_err("token mismatch");
    assert!(matches!(
        error,
        ServiceError::Lifecycle(LifecycleError::Validation(_))
    ));
    assert!(
        harness.instances.fetch_snapshot(&instance.id).is_some(),
        "nothing is deleted on validation failure"
    );
}

#[test]
fn bulk_delete_writes_the_trail_before_committing() {
    let harness = harness();
    let instance = accept_one(&harness, "medication_management", date(2025, 1, 10));

    let receipt = harness
        .service
        .bulk_delete(&location(), "willow-lodge", "area-manager", date(2025, 6, 1))
        .expect("bulk delete succeeds");

    assert_eq!(receipt.deleted, vec![instance.id.clone()]);
    assert!(harness.instances.fetch_snapshot(&instance.id).is_none());

    let trail = harness.trail.records();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action, "audit.bulk_delete");
    assert_eq!(trail[0].actor, "area-manager");
    assert_eq!(trail[0].deleted_instances, vec![instance.id]);
}

#[test]
fn bulk_delete_aborts_when_the_trail_write_fails() {
    let catalog = Arc::new(TemplateCatalog::standard());
    let instances = Arc::new(MemoryInstanceRepository::default());
    let service = AuditService::new(
        catalog,
        instances.clone(),
        Arc::new(MemoryActionItemRepository::default()),
        Arc::new(StaticDirectory::default()),
        Arc::new(FailingTrail),
        Arc::new(MemoryEventPublisher::default()),
        EngineSettings::default(),
    );

    let report = service
        .accept_suggestion(
            &suggestion("medication_management", date(2025, 1, 10)),
            "registered-manager",
        )
        .expect("acceptance succeeds");
    let id = report.created[0].id.clone();

    let error = service
        .bulk_delete(&location(), "willow-lodge", "area-manager", date(2025, 6, 1))
        .expect_err("trail failure aborts the delete");
    assert!(matches!(
        error,
        ServiceError::Lifecycle(LifecycleError::Trail(_))
    ));
    assert!(
        instances.fetch(&id).expect("repository reachable").is_some(),
        "no deletion is committed without a trail record"
    );
}
