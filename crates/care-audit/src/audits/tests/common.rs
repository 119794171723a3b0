use std::sync::Arc;

use chrono::NaiveDate;

use crate::audits::catalog::TemplateCatalog;
use crate::audits::domain::{
    AuditInstance, InstanceId, LocationId, ServiceUserId, StaffId, Verdict,
};
use crate::audits::memory::{
    MemoryActionItemRepository, MemoryEventPublisher, MemoryInstanceRepository, MemoryTrail,
    StaticDirectory,
};
use crate::audits::repository::{TrailError, TrailRecord, TrailSink};
use crate::audits::schedule::ScheduleSuggestion;
use crate::audits::service::{AuditService, EngineSettings, RecordResponseRequest};

pub(super) type TestService = AuditService<
    MemoryInstanceRepository,
    MemoryActionItemRepository,
    StaticDirectory,
    MemoryTrail,
    MemoryEventPublisher,
>;

pub(super) struct Harness {
    pub(super) service: TestService,
    pub(super) instances: Arc<MemoryInstanceRepository>,
    pub(super) actions: Arc<MemoryActionItemRepository>,
    pub(super) directory: Arc<StaticDirectory>,
    pub(super) trail: Arc<MemoryTrail>,
    pub(super) events: Arc<MemoryEventPublisher>,
}

pub(super) fn harness() -> Harness {
    harness_with_settings(EngineSettings::default())
}

pub(super) fn harness_with_settings(settings: EngineSettings) -> Harness {
    let catalog = Arc::new(TemplateCatalog::standard());
    let instances = Arc::new(MemoryInstanceRepository::default());
    let actions = Arc::new(MemoryActionItemRepository::default());
    let directory = Arc::new(StaticDirectory::default());
    let trail = Arc::new(MemoryTrail::default());
    let events = Arc::new(MemoryEventPublisher::default());

    let service = AuditService::new(
        catalog,
        instances.clone(),
        actions.clone(),
        directory.clone(),
        trail.clone(),
        events.clone(),
        settings,
    );

    Harness {
        service,
        instances,
        actions,
        directory,
        trail,
        events,
    }
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn location() -> LocationId {
    LocationId("willow-lodge".to_string())
}

pub(super) fn suggestion(audit_type: &str, on: NaiveDate) -> ScheduleSuggestion {
    ScheduleSuggestion {
        audit_type: audit_type.to_string(),
        location: location(),
        suggested_date: on,
    }
}

pub(super) fn staff_roster(count: usize) -> Vec<StaffId> {
    (1..=count)
        .map(|index| StaffId(format!("staff-{index:02}")))
        .collect()
}

pub(super) fn resident_roster(count: usize) -> Vec<ServiceUserId> {
    (1..=count)
        .map(|index| ServiceUserId(format!("resident-{index:02}")))
        .collect()
}

pub(super) fn answer(question: &str, verdict: Verdict, on: NaiveDate) -> RecordResponseRequest {
    RecordResponseRequest {
        question: question.to_string(),
        verdict,
        note: None,
        recorded_by: "lead-auditor".to_string(),
        recorded_on: on,
    }
}

/// Accepts a general-scope suggestion and returns the single created
/// instance.
pub(super) fn accept_one(
    harness: &Harness,
    audit_type: &str,
    on: NaiveDate,
) -> AuditInstance {
    let report = harness
        .service
        .accept_suggestion(&suggestion(audit_type, on), "registered-manager")
        .expect("acceptance succeeds");
    assert_eq!(report.created.len(), 1, "general scope creates one instance");
    report.created.into_iter().next().expect("created instance")
}

/// Answers every question on the instance's bound template with one verdict.
pub(super) fn answer_all(
    harness: &Harness,
    id: &InstanceId,
    verdict: Verdict,
    on: NaiveDate,
) -> AuditInstance {
    let instance = harness
        .instances
        .fetch_snapshot(id)
        .expect("instance present");
    let mut latest = instance.clone();
    for section in &instance.template.sections {
        for question in &section.questions {
            latest = harness
                .service
                .record_response(id, answer(&question.key, verdict, on))
                .expect("response recorded");
        }
    }
    latest
}

impl MemoryInstanceRepository {
    pub(crate) fn fetch_snapshot(&self, id: &InstanceId) -> Option<AuditInstance> {
        use crate::audits::repository::InstanceRepository;
        self.fetch(id).expect("repository reachable")
    }
}

/// Trail sink that always fails, for exercising the write-trail-first rule.
#[derive(Default, Clone)]
pub(super) struct FailingTrail;

impl TrailSink for FailingTrail {
    fn append(&self, _record: TrailRecord) -> Result<(), TrailError> {
        Err(TrailError::Unavailable("trail store offline".to_string()))
    }
}
