use super::common::*;
use crate::audits::alerts::{
    AlertCondition, AlertEvaluator, AlertSeverity, AlertThresholds,
};
use crate::audits::domain::Verdict;
use crate::audits::repository::EngineEvent;
use crate::audits::rollup::{AssessmentWindow, RagCounts, RollupEntity, RollupSnapshot};

fn snapshot(percentage: u8, red: u32, overdue: usize) -> RollupSnapshot {
    RollupSnapshot {
        entity: RollupEntity::Location(location()),
        window: AssessmentWindow::trailing_year(date(2025, 6, 1)),
        total_sections: 8,
        assessed_sections: 6,
        percentage,
        rag_counts: RagCounts {
            green: 3,
            amber: 1,
            red,
        },
        overdue_actions: overdue,
    }
}

#[test]
fn a_healthy_snapshot_raises_nothing() {
    let evaluator = AlertEvaluator::default();
    assert!(evaluator.evaluate(&snapshot(90, 0, 0)).is_empty());
}

#[test]
fn compliance_below_the_floor_is_critical() {
    let evaluator = AlertEvaluator::default();
    let alerts = evaluator.evaluate(&snapshot(60, 0, 0));

    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.condition, AlertCondition::ComplianceBelowFloor);
    assert_eq!(alert.severity, AlertSeverity::Critical);
    assert_eq!(alert.measured, 60);
    assert_eq!(alert.limit, 75);
    assert!(alert.message.contains("60%"));
}

#[test]
fn overdue_and_red_ceilings_raise_separately() {
    let evaluator = AlertEvaluator::new(AlertThresholds {
        compliance_floor_pct: 50,
        max_overdue_actions: 2,
        max_red_instances: 0,
    });
    let alerts = evaluator.evaluate(&snapshot(80, 1, 3));

    assert_eq!(alerts.len(), 2);
    assert!(alerts
        .iter()
        .any(|alert| alert.condition == AlertCondition::OverdueActionsAboveCeiling
            && alert.severity == AlertSeverity::Warning
            && alert.measured == 3));
    assert!(alerts
        .iter()
        .any(|alert| alert.condition == AlertCondition::RedInstancesAboveCeiling
            && alert.severity == AlertSeverity::Critical));
}

#[test]
fn evaluation_is_stateless_and_repeatable() {
    let evaluator = AlertEvaluator::default();
    let snapshot = snapshot(40, 2, 5);

    let first = evaluator.evaluate(&snapshot);
    let second = evaluator.evaluate(&snapshot);

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn an_empty_entity_raises_no_compliance_alert() {
    let evaluator = AlertEvaluator::default();
    let mut empty = snapshot(0, 0, 0);
    empty.total_sections = 0;
    empty.assessed_sections = 0;

    assert!(evaluator.evaluate(&empty).is_empty());
}

#[test]
fn completion_publishes_alerts_alongside_the_lifecycle_event() {
    let harness = harness();
    let instance = accept_one(&harness, "medication_management", date(2025, 1, 10));
    answer_all(&harness, &instance.id, Verdict::NonCompliant, date(2025, 1, 12));
    let outcome = harness
        .service
        .complete(&instance.id, None, date(2025, 1, 12))
        .expect("completion succeeds");

    assert!(
        !outcome.alerts.is_empty(),
        "an all-red audit must breach the red ceiling"
    );

    let events = harness.events.events();
    assert!(events
        .iter()
        .any(|event| matches!(event, EngineEvent::InstanceCompleted { instance: id, .. } if *id == instance.id)));
    assert!(events
        .iter()
        .any(|event| matches!(event, EngineEvent::ThresholdAlert(_))));
}
