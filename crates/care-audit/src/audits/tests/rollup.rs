use std::collections::BTreeMap;

use super::common::*;
use crate::audits::domain::{
    AuditInstance, AuditResponse, AuditSubject, InstanceId, InstanceStatus, StaffId, Verdict,
};
use crate::audits::rollup::{
    AssessmentWindow, ComplianceRollup, RollupEntity, RollupError,
};
use crate::audits::TemplateCatalog;

#[test]
fn rollup_is_reproducible_from_raw_data() {
    let harness = harness();
    let instance = accept_one(&harness, "medication_management", date(2025, 1, 10));
    answer_all(&harness, &instance.id, Verdict::Compliant, date(2025, 1, 12));
    harness
        .service
        .complete(&instance.id, None, date(2025, 1, 12))
        .expect("completion succeeds");

    let first = harness
        .service
        .rollup_for(RollupEntity::Location(location()), date(2025, 2, 1))
        .expect("first rebuild");
    let second = harness
        .service
        .rollup_for(RollupEntity::Location(location()), date(2025, 2, 1))
        .expect("second rebuild");

    assert_eq!(first, second);
    assert_eq!(first.rag_counts.green, 1);
    assert_eq!(first.total_sections, 2);
    assert_eq!(first.assessed_sections, 2);
    assert_eq!(first.percentage, 100);
}

#[test]
fn rag_buckets_tally_completed_instances() {
    let harness = harness();

    let green = accept_one(&harness, "medication_management", date(2025, 1, 10));
    answer_all(&harness, &green.id, Verdict::Compliant, date(2025, 1, 12));
    harness
        .service
        .complete(&green.id, None, date(2025, 1, 12))
        .expect("green completion");

    let red = accept_one(&harness, "infection_control", date(2025, 1, 20));
    answer_all(&harness, &red.id, Verdict::NonCompliant, date(2025, 1, 22));
    harness
        .service
        .complete(&red.id, None, date(2025, 1, 22))
        .expect("red completion");

    let snapshot = harness
        .service
        .rollup_for(RollupEntity::Location(location()), date(2025, 2, 1))
        .expect("rollup rebuilds");

    assert_eq!(snapshot.rag_counts.green, 1);
    assert_eq!(snapshot.rag_counts.red, 1);
    assert_eq!(snapshot.rag_counts.amber, 0);
    // Two sections per template across two audit types.
    assert_eq!(snapshot.total_sections, 4);
    assert_eq!(snapshot.overdue_actions, 0);
}

#[test]
fn instances_outside_the_window_are_ignored() {
    let harness = harness();
    let old = accept_one(&harness, "medication_management", date(2023, 1, 10));
    answer_all(&harness, &old.id, Verdict::Compliant, date(2023, 1, 12));
    harness
        .service
        .complete(&old.id, None, date(2023, 1, 12))
        .expect("completion succeeds");

    let snapshot = harness
        .service
        .rollup_for(RollupEntity::Location(location()), date(2025, 2, 1))
        .expect("rollup rebuilds");

    assert_eq!(snapshot.total_sections, 0);
    assert_eq!(snapshot.rag_counts.green, 0);
}

fn corrupt_instance(subject: StaffId) -> AuditInstance {
    let template = TemplateCatalog::standard()
        .template_for("staff_supervision")
        .expect("template present")
        .clone();
    let mut responses = BTreeMap::new();
    responses.insert(
        "question_dropped_from_template".to_string(),
        AuditResponse {
            question: "question_dropped_from_template".to_string(),
            verdict: Verdict::Compliant,
            note: None,
            recorded_by: "importer".to_string(),
            recorded_on: date(2025, 1, 12),
        },
    );
    AuditInstance {
        id: InstanceId("audit-corrupt".to_string()),
        audit_type: "staff_supervision".to_string(),
        location: location(),
        subject: Some(AuditSubject::Staff(subject)),
        template,
        scheduled_for: date(2025, 1, 10),
        occurred_on: Some(date(2025, 1, 12)),
        owner: "importer".to_string(),
        status: InstanceStatus::Completed,
        responses,
        overall_score: Some(100),
        rag: None,
        summary: None,
    }
}

fn healthy_instance(subject: StaffId) -> AuditInstance {
    let template = TemplateCatalog::standard()
        .template_for("staff_supervision")
        .expect("template present")
        .clone();
    let mut responses = BTreeMap::new();
    for section in &template.sections {
        for question in &section.questions {
            responses.insert(
                question.key.clone(),
                AuditResponse {
                    question: question.key.clone(),
                    verdict: Verdict::Compliant,
                    note: None,
                    recorded_by: "lead-auditor".to_string(),
                    recorded_on: date(2025, 1, 12),
                },
            );
        }
    }
    AuditInstance {
        id: InstanceId("audit-healthy".to_string()),
        audit_type: "staff_supervision".to_string(),
        location: location(),
        subject: Some(AuditSubject::Staff(subject)),
        template,
        scheduled_for: date(2025, 1, 10),
        occurred_on: Some(date(2025, 1, 12)),
        owner: "lead-auditor".to_string(),
        status: InstanceStatus::Completed,
        responses,
        overall_score: Some(100),
        rag: None,
        summary: None,
    }
}

#[test]
fn one_corrupt_entity_does_not_block_the_others() {
    let rollup = ComplianceRollup::default();
    let corrupt_staff = StaffId("staff-corrupt".to_string());
    let healthy_staff = StaffId("staff-healthy".to_string());
    let instances = vec![
        corrupt_instance(corrupt_staff.clone()),
        healthy_instance(healthy_staff.clone()),
    ];
    let window = AssessmentWindow::trailing_year(date(2025, 6, 1));

    let results = rollup.snapshot_many(
        vec![
            RollupEntity::Staff(corrupt_staff),
            RollupEntity::Staff(healthy_staff),
        ],
        &instances,
        &[],
        window,
        date(2025, 6, 1),
    );

    assert_eq!(results.len(), 2);
    match &results[0].1 {
        Err(RollupError::CorruptRecord { instance, .. }) => {
            assert_eq!(instance.0, "audit-corrupt");
        }
        other => panic!("expected corrupt record error, got {other:?}"),
    }
    let healthy = results[1].1.as_ref().expect("healthy entity still rolls up");
    assert_eq!(healthy.rag_counts.green, 1);
    assert_eq!(healthy.percentage, 100);
}

#[test]
fn empty_templates_are_surfaced_as_corruption() {
    let rollup = ComplianceRollup::default();
    let mut instance = healthy_instance(StaffId("staff-01".to_string()));
    instance.template.sections.clear();
    instance.responses.clear();
    let window = AssessmentWindow::trailing_year(date(2025, 6, 1));

    let result = rollup.snapshot(
        RollupEntity::Tenant,
        &[instance],
        &[],
        window,
        date(2025, 6, 1),
    );

    assert!(matches!(
        result,
        Err(RollupError::CorruptRecord { .. })
    ));
}

#[test]
fn overdue_actions_feed_the_snapshot() {
    let harness = harness();
    let instance = accept_one(&harness, "medication_management", date(2025, 1, 10));
    answer_all(&harness, &instance.id, Verdict::NonCompliant, date(2025, 1, 12));
    harness
        .service
        .complete(&instance.id, None, date(2025, 1, 12))
        .expect("completion succeeds");

    // Look well past every spawned item's 30 day target date.
    let snapshot = harness
        .service
        .rollup_for(RollupEntity::Location(location()), date(2025, 4, 1))
        .expect("rollup rebuilds");

    assert_eq!(snapshot.overdue_actions, 6);
    assert_eq!(snapshot.rag_counts.red, 1);
}
