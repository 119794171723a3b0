use std::sync::Arc;

use care_audit::audits::memory::{
    MemoryActionItemRepository, MemoryEventPublisher, MemoryInstanceRepository, MemoryTrail,
    StaticDirectory,
};
use care_audit::audits::{
    AuditService, EngineSettings, InstanceStatus, LifecycleError, LocationId,
    RecordResponseRequest, ScheduleSuggestion, ServiceError, StaffId, TemplateCatalog, Verdict,
};
use chrono::NaiveDate;

type Service = AuditService<
    MemoryInstanceRepository,
    MemoryActionItemRepository,
    StaticDirectory,
    MemoryTrail,
    MemoryEventPublisher,
>;

struct Fixture {
    service: Service,
    directory: Arc<StaticDirectory>,
}

fn fixture() -> Fixture {
    let directory = Arc::new(StaticDirectory::default());
    let service = AuditService::new(
        Arc::new(TemplateCatalog::standard()),
        Arc::new(MemoryInstanceRepository::default()),
        Arc::new(MemoryActionItemRepository::default()),
        directory.clone(),
        Arc::new(MemoryTrail::default()),
        Arc::new(MemoryEventPublisher::default()),
        EngineSettings::default(),
    );
    Fixture { service, directory }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn location() -> LocationId {
    LocationId("rowan-house".to_string())
}

fn suggestion(audit_type: &str, on: NaiveDate) -> ScheduleSuggestion {
    ScheduleSuggestion {
        audit_type: audit_type.to_string(),
        location: location(),
        suggested_date: on,
    }
}

fn answer(question: &str, verdict: Verdict) -> RecordResponseRequest {
    RecordResponseRequest {
        question: question.to_string(),
        verdict,
        note: None,
        recorded_by: "lead-auditor".to_string(),
        recorded_on: date(2025, 4, 2),
    }
}

#[test]
fn person_scoped_acceptance_creates_one_instance_per_staff_member() {
    let fixture = fixture();
    fixture.directory.assign_staff(
        location(),
        (1..=4).map(|n| StaffId(format!("staff-{n:02}"))).collect(),
    );

    let report = fixture
        .service
        .accept_suggestion(&suggestion("staff_supervision", date(2025, 4, 1)), "manager")
        .expect("fan-out succeeds");

    assert_eq!(report.created.len(), 4);
    assert!(report.failures.is_empty());
    let template = &report.created[0].template;
    assert!(report.created.iter().all(|instance| {
        instance.scheduled_for == date(2025, 4, 1) && instance.template == *template
    }));
}

#[test]
fn completion_is_blocked_until_every_required_question_is_answered() {
    let fixture = fixture();
    let report = fixture
        .service
        .accept_suggestion(&suggestion("care_plan_review", date(2025, 4, 1)), "manager")
        .map(|_| ())
        .err();
    assert!(report.is_some(), "no residents assigned yet");

    fixture.directory.assign_service_users(
        location(),
        vec![care_audit::audits::ServiceUserId("resident-01".to_string())],
    );
    let report = fixture
        .service
        .accept_suggestion(&suggestion("care_plan_review", date(2025, 4, 1)), "manager")
        .expect("fan-out succeeds");
    let instance = &report.created[0];

    for key in ["reviewed_in_month", "risk_assessments_current", "resident_voice"] {
        fixture
            .service
            .record_response(&instance.id, answer(key, Verdict::Compliant))
            .expect("response recorded");
    }

    let error = fixture
        .service
        .complete(&instance.id, None, date(2025, 4, 2))
        .expect_err("one required question is still open");
    match error {
        ServiceError::Lifecycle(LifecycleError::Incomplete { missing }) => {
            assert_eq!(missing, vec!["consent_recorded".to_string()]);
        }
        other => panic!("expected incomplete, got {other:?}"),
    }

    fixture
        .service
        .record_response(&instance.id, answer("consent_recorded", Verdict::Compliant))
        .expect("final answer recorded");
    let outcome = fixture
        .service
        .complete(&instance.id, Some("reviewed with family".to_string()), date(2025, 4, 2))
        .expect("completion succeeds");

    assert_eq!(outcome.instance.status, InstanceStatus::Completed);
    assert_eq!(outcome.instance.overall_score, Some(100));

    let error = fixture
        .service
        .record_response(&instance.id, answer("consent_recorded", Verdict::Partial))
        .expect_err("completed audits are read-only");
    assert!(matches!(
        error,
        ServiceError::Lifecycle(LifecycleError::InvalidState { .. })
    ));
}

#[test]
fn overlapping_acceptances_leave_exactly_one_instance() {
    let fixture = fixture();
    let first = fixture
        .service
        .accept_suggestion(&suggestion("medication_management", date(2025, 4, 10)), "manager")
        .expect("first acceptance succeeds");

    let error = fixture
        .service
        .accept_suggestion(&suggestion("medication_management", date(2025, 4, 20)), "deputy")
        .expect_err("second acceptance collides");

    match error {
        ServiceError::Lifecycle(LifecycleError::Conflict { existing }) => {
            assert_eq!(existing, first.created[0].id);
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}
