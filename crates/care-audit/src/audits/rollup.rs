use std::collections::BTreeSet;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::{
    ActionPlanItem, AuditInstance, AuditSubject, InstanceId, InstanceStatus, LocationId,
    ServiceUserId, StaffId,
};
use super::scoring::ResponseAggregator;

/// The entity a rollup snapshot describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollupEntity {
    /// The whole tenant; the caller has already scoped the data set.
    Tenant,
    Location(LocationId),
    Staff(StaffId),
    ServiceUser(ServiceUserId),
}

impl RollupEntity {
    pub fn label(&self) -> String {
        match self {
            Self::Tenant => "tenant".to_owned(),
            Self::Location(id) => format!("location {}", id.0),
            Self::Staff(id) => format!("staff {}", id.0),
            Self::ServiceUser(id) => format!("service user {}", id.0),
        }
    }

    fn covers_instance(&self, instance: &AuditInstance) -> bool {
        match self {
            Self::Tenant => true,
            Self::Location(id) => instance.location == *id,
            Self::Staff(id) => {
                matches!(&instance.subject, Some(AuditSubject::Staff(subject)) if subject == id)
            }
            Self::ServiceUser(id) => matches!(
                &instance.subject,
                Some(AuditSubject::ServiceUser(subject)) if subject == id
            ),
        }
    }

    fn covers_action(&self, item: &ActionPlanItem) -> bool {
        match self {
            Self::Tenant => true,
            Self::Location(id) => item.location == *id,
            Self::Staff(id) => {
                matches!(&item.subject, Some(AuditSubject::Staff(subject)) if subject == id)
            }
            Self::ServiceUser(id) => matches!(
                &item.subject,
                Some(AuditSubject::ServiceUser(subject)) if subject == id
            ),
        }
    }
}

/// Date range the rollup folds over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl AssessmentWindow {
    /// The trailing twelve months ending today, the default dashboard view.
    pub fn trailing_year(today: NaiveDate) -> Self {
        let from = today
            .checked_sub_months(Months::new(12))
            .unwrap_or(NaiveDate::MIN);
        Self { from, to: today }
    }

    fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Tally of instance-level RAG outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagCounts {
    pub green: u32,
    pub amber: u32,
    pub red: u32,
}

impl RagCounts {
    fn record(&mut self, rag: super::domain::RagStatus) {
        match rag {
            super::domain::RagStatus::Green => self.green += 1,
            super::domain::RagStatus::Amber => self.amber += 1,
            super::domain::RagStatus::Red => self.red += 1,
        }
    }
}

/// Derived dashboard figures for one entity. Always recomputable from the
/// underlying responses and action items; a cache, never a source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupSnapshot {
    pub entity: RollupEntity,
    pub window: AssessmentWindow,
    /// Distinct template sections applicable to the entity in the window.
    pub total_sections: usize,
    /// Sections with at least one recorded assessment.
    pub assessed_sections: usize,
    pub percentage: u8,
    pub rag_counts: RagCounts,
    pub overdue_actions: usize,
}

/// Recomputation failure for one entity; isolated so one corrupt record
/// never blocks the other entities' figures.
#[derive(Debug, thiserror::Error)]
pub enum RollupError {
    #[error("corrupt audit record {instance}: {detail}")]
    CorruptRecord { instance: InstanceId, detail: String },
}

/// Folds completed-instance verdicts and action items into per-entity
/// dashboard figures.
#[derive(Debug, Clone, Default)]
pub struct ComplianceRollup {
    aggregator: ResponseAggregator,
}

impl ComplianceRollup {
    pub fn new(aggregator: ResponseAggregator) -> Self {
        Self { aggregator }
    }

    /// Rebuilds one entity's snapshot from raw data.
    pub fn snapshot(
        &self,
        entity: RollupEntity,
        instances: &[AuditInstance],
        actions: &[ActionPlanItem],
        window: AssessmentWindow,
        today: NaiveDate,
    ) -> Result<RollupSnapshot, RollupError> {
        let mut applicable_sections: BTreeSet<(String, String)> = BTreeSet::new();
        let mut assessed_sections: BTreeSet<(String, String)> = BTreeSet::new();
        let mut rag_counts = RagCounts::default();

        for instance in instances {
            if !entity.covers_instance(instance)
                || instance.status == InstanceStatus::Cancelled
                || !window.contains(instance.effective_date())
            {
                continue;
            }
            if instance.template.sections.is_empty() {
                return Err(RollupError::CorruptRecord {
                    instance: instance.id.clone(),
                    detail: "bound template has no sections".to_owned(),
                });
            }
            for question in instance.responses.keys() {
                if instance.template.question(question).is_none() {
                    return Err(RollupError::CorruptRecord {
                        instance: instance.id.clone(),
                        detail: format!("response '{question}' has no question in the template"),
                    });
                }
            }

            for section in &instance.template.sections {
                let key = (instance.audit_type.clone(), section.key.clone());
                applicable_sections.insert(key.clone());
                let answered = section
                    .questions
                    .iter()
                    .any(|question| instance.responses.contains_key(&question.key));
                if answered {
                    assessed_sections.insert(key);
                }
            }

            if instance.status == InstanceStatus::Completed {
                let assessment = self
                    .aggregator
                    .assess(&instance.template, &instance.responses);
                if let Some(rag) = assessment.rag {
                    rag_counts.record(rag);
                }
            }
        }

        let total_sections = applicable_sections.len();
        let assessed = assessed_sections.len();
        let percentage = if total_sections == 0 {
            0
        } else {
            ((assessed as f64 / total_sections as f64) * 100.0).round() as u8
        };

        let overdue_actions = actions
            .iter()
            .filter(|item| entity.covers_action(item) && item.is_overdue(today))
            .count();

        Ok(RollupSnapshot {
            entity,
            window,
            total_sections,
            assessed_sections: assessed,
            percentage,
            rag_counts,
            overdue_actions,
        })
    }

    /// Rebuilds many entities, isolating per-entity failures: each entry is
    /// that entity's own result.
    pub fn snapshot_many(
        &self,
        entities: Vec<RollupEntity>,
        instances: &[AuditInstance],
        actions: &[ActionPlanItem],
        window: AssessmentWindow,
        today: NaiveDate,
    ) -> Vec<(RollupEntity, Result<RollupSnapshot, RollupError>)> {
        entities
            .into_iter()
            .map(|entity| {
                let result = self.snapshot(entity.clone(), instances, actions, window, today);
                (entity, result)
            })
            .collect()
    }
}
