use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::catalog::{CatalogError, TemplateCatalog};
use super::domain::{
    AuditInstance, AuditSubject, InstanceId, InstanceStatus, LocationId, TargetScope, Verdict,
};
use super::repository::{
    Directory, DirectoryError, InstanceRepository, RepositoryError, TrailError, TrailRecord,
    TrailSink,
};
use super::schedule::{ProjectorSettings, ScheduleSuggestion};
use super::scoring::ResponseAggregator;

/// Error raised by lifecycle transitions.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("audit instance {0} not found")]
    InstanceNotFound(InstanceId),
    #[error("question '{question}' is not part of the bound template")]
    QuestionNotFound { question: String },
    #[error("scheduling conflict: instance {existing} already occupies the recurrence slot")]
    Conflict { existing: InstanceId },
    #[error("'{operation}' is not permitted while the instance is {current}")]
    InvalidState {
        operation: &'static str,
        current: InstanceStatus,
    },
    #[error("completion blocked, unanswered required questions: {}", .missing.join(", "))]
    Incomplete { missing: Vec<String> },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Trail(#[from] TrailError),
}

/// Per-target failure inside a fan-out, so the caller can retry only the gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanOutFailure {
    pub subject: Option<AuditSubject>,
    pub error: String,
    pub conflict_with: Option<InstanceId>,
}

/// Outcome of accepting one suggestion: which instances were created and
/// exactly which targets failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanOutReport {
    pub suggestion: ScheduleSuggestion,
    pub created: Vec<AuditInstance>,
    pub failures: Vec<FanOutFailure>,
}

/// Receipt for the one destructive operation the engine exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDeleteReceipt {
    pub location: LocationId,
    pub deleted: Vec<InstanceId>,
}

static INSTANCE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_instance_id() -> InstanceId {
    let id = INSTANCE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    InstanceId(format!("audit-{id:06}"))
}

/// Drives audit instances through their state machine: creation (with
/// person-scoped fan-out), response recording, completion, archival,
/// cancellation, and audited bulk deletion.
pub struct InstanceLifecycleManager<R, D, T> {
    catalog: Arc<TemplateCatalog>,
    repository: Arc<R>,
    directory: Arc<D>,
    trail: Arc<T>,
    aggregator: ResponseAggregator,
    settings: ProjectorSettings,
}

impl<R, D, T> InstanceLifecycleManager<R, D, T>
where
    R: InstanceRepository + 'static,
    D: Directory + 'static,
    T: TrailSink + 'static,
{
    pub fn new(
        catalog: Arc<TemplateCatalog>,
        repository: Arc<R>,
        directory: Arc<D>,
        trail: Arc<T>,
        aggregator: ResponseAggregator,
        settings: ProjectorSettings,
    ) -> Self {
        Self {
            catalog,
            repository,
            directory,
            trail,
            aggregator,
            settings,
        }
    }

    /// Turns an accepted suggestion into persisted instances. The collision
    /// invariant is re-checked at write time through the repository's
    /// conditional insert, closing the race between preview and acceptance.
    pub fn accept(
        &self,
        suggestion: &ScheduleSuggestion,
        owner: &str,
    ) -> Result<FanOutReport, LifecycleError> {
        let audit_type = self.catalog.audit_type(&suggestion.audit_type)?;
        let template = self.catalog.template_for(&suggestion.audit_type)?.clone();
        let min_interval = self
            .settings
            .min_interval_overrides
            .get(&audit_type.id)
            .copied()
            .or_else(|| audit_type.frequency.interval_months())
            .unwrap_or(0);

        let subjects: Vec<Option<AuditSubject>> = match audit_type.scope {
            TargetScope::General => vec![None],
            TargetScope::Staff => self
                .directory
                .active_staff_for(&suggestion.location)?
                .into_iter()
                .map(|id| Some(AuditSubject::Staff(id)))
                .collect(),
            TargetScope::ServiceUser => self
                .directory
                .active_service_users_for(&suggestion.location)?
                .into_iter()
                .map(|id| Some(AuditSubject::ServiceUser(id)))
                .collect(),
        };

        if subjects.is_empty() {
            return Err(LifecycleError::Validation(format!(
                "no active {} targets assigned to location {}",
                audit_type.scope.label().to_lowercase(),
                suggestion.location
            )));
        }

        let mut created = Vec::new();
        let mut failures = Vec::new();
        let mut first_outage: Option<RepositoryError> = None;

        for subject in subjects {
            let instance = AuditInstance {
                id: next_instance_id(),
                audit_type: audit_type.id.clone(),
                location: suggestion.location.clone(),
                subject: subject.clone(),
                template: template.clone(),
                scheduled_for: suggestion.suggested_date,
                occurred_on: None,
                owner: owner.to_owned(),
                status: InstanceStatus::Scheduled,
                responses: Default::default(),
                overall_score: None,
                rag: None,
                summary: None,
            };

            match self.repository.insert_if_slot_free(instance, min_interval) {
                Ok(stored) => created.push(stored),
                Err(RepositoryError::Conflict { existing }) => failures.push(FanOutFailure {
                    subject,
                    error: format!("recurrence slot occupied by {existing}"),
                    conflict_with: Some(existing),
                }),
                Err(other) => {
                    failures.push(FanOutFailure {
                        subject,
                        error: other.to_string(),
                        conflict_with: None,
                    });
                    first_outage.get_or_insert(other);
                }
            }
        }

        if created.is_empty() {
            if let Some(existing) = failures.iter().find_map(|f| f.conflict_with.clone()) {
                return Err(LifecycleError::Conflict { existing });
            }
            if let Some(outage) = first_outage {
                return Err(LifecycleError::Repository(outage));
            }
        }

        Ok(FanOutReport {
            suggestion: suggestion.clone(),
            created,
            failures,
        })
    }

    /// Records one answer. The first response on a scheduled instance flips
    /// it to in-progress. Completed and archived instances are immutable.
    pub fn record_response(
        &self,
        id: &InstanceId,
        question: &str,
        verdict: Verdict,
        note: Option<String>,
        recorded_by: &str,
        recorded_on: NaiveDate,
    ) -> Result<AuditInstance, LifecycleError> {
        let mut instance = self.fetch_existing(id)?;

        if !instance.status.accepts_responses() {
            return Err(LifecycleError::InvalidState {
                operation: "record_response",
                current: instance.status,
            });
        }
        if instance.template.question(question).is_none() {
            return Err(LifecycleError::QuestionNotFound {
                question: question.to_owned(),
            });
        }

        instance.responses.insert(
            question.to_owned(),
            super::domain::AuditResponse {
                question: question.to_owned(),
                verdict,
                note,
                recorded_by: recorded_by.to_owned(),
                recorded_on,
            },
        );
        if instance.status == InstanceStatus::Scheduled {
            instance.status = InstanceStatus::InProgress;
        }

        self.repository.update(instance.clone())?;
        Ok(instance)
    }

    /// Completes an instance, freezing its overall score and RAG. Every
    /// required question must carry a response (an explicit
    /// `not_applicable` counts); the error names the gaps otherwise.
    pub fn complete(
        &self,
        id: &InstanceId,
        summary: Option<String>,
        completed_on: NaiveDate,
    ) -> Result<AuditInstance, LifecycleError> {
        let mut instance = self.fetch_existing(id)?;

        if !instance.status.accepts_responses() {
            return Err(LifecycleError::InvalidState {
                operation: "complete",
                current: instance.status,
            });
        }

        let answered: BTreeSet<&str> = instance.responses.keys().map(String::as_str).collect();
        let missing: Vec<String> = instance
            .template
            .required_question_keys()
            .into_iter()
            .filter(|key| !answered.contains(key))
            .map(str::to_owned)
            .collect();
        if !missing.is_empty() {
            return Err(LifecycleError::Incomplete { missing });
        }

        let assessment = self.aggregator.assess(&instance.template, &instance.responses);
        instance.overall_score = assessment.score;
        instance.rag = assessment.rag;
        instance.summary = summary;
        instance.occurred_on = Some(completed_on);
        instance.status = InstanceStatus::Completed;

        self.repository.update(instance.clone())?;
        Ok(instance)
    }

    /// Retention-policy transition; permits no content changes.
    pub fn archive(&self, id: &InstanceId) -> Result<AuditInstance, LifecycleError> {
        let mut instance = self.fetch_existing(id)?;
        if instance.status != InstanceStatus::Completed {
            return Err(LifecycleError::InvalidState {
                operation: "archive",
                current: instance.status,
            });
        }
        instance.status = InstanceStatus::Archived;
        self.repository.update(instance.clone())?;
        Ok(instance)
    }

    /// Cancels an open instance, releasing its recurrence slot.
    pub fn cancel(&self, id: &InstanceId) -> Result<AuditInstance, LifecycleError> {
        let mut instance = self.fetch_existing(id)?;
        if !instance.status.accepts_responses() {
            return Err(LifecycleError::InvalidState {
                operation: "cancel",
                current: instance.status,
            });
        }
        instance.status = InstanceStatus::Cancelled;
        self.repository.update(instance.clone())?;
        Ok(instance)
    }

    /// Deletes every instance at a location. The confirmation token must be
    /// supplied out of band and match the location identifier exactly, and
    /// the trail record is written before the deletion counts as committed:
    /// a trail failure aborts the whole operation.
    pub fn bulk_delete(
        &self,
        location: &LocationId,
        confirmation_token: &str,
        actor: &str,
        on: NaiveDate,
    ) -> Result<BulkDeleteReceipt, LifecycleError> {
        if confirmation_token != location.0 {
            return Err(LifecycleError::Validation(
                "confirmation token does not match the location identifier".to_owned(),
            ));
        }

        let doomed: Vec<InstanceId> = self
            .repository
            .for_location(location)?
            .into_iter()
            .map(|instance| instance.id)
            .collect();

        self.trail.append(TrailRecord {
            occurred_on: on,
            actor: actor.to_owned(),
            action: "audit.bulk_delete".to_owned(),
            location: location.clone(),
            deleted_instances: doomed.clone(),
            detail: format!("bulk delete of {} audit instances", doomed.len()),
        })?;

        let deleted = self
            .repository
            .delete_for_location(location)?
            .into_iter()
            .map(|instance| instance.id)
            .collect();

        Ok(BulkDeleteReceipt {
            location: location.clone(),
            deleted,
        })
    }

    fn fetch_existing(&self, id: &InstanceId) -> Result<AuditInstance, LifecycleError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| LifecycleError::InstanceNotFound(id.clone()))
    }
}
