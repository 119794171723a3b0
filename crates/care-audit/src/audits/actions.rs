use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::{
    ActionItemId, ActionOrigin, ActionPlanItem, ActionStatus, AuditInstance, CompletionEvidence,
    LocationId, RagStatus, Verdict,
};
use super::repository::{ActionItemRepository, RepositoryError};

/// Error raised by the action plan tracker.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("action item {0} not found")]
    NotFound(ActionItemId),
    #[error("marking an action item completed requires a completion note")]
    MissingEvidence,
    #[error("action item is already completed and can no longer change")]
    AlreadyCompleted,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Severity of an incident that spawns a remedial item directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentSeverity {
    Routine,
    Critical,
}

const DEFAULT_PARTIAL_DAYS: i64 = 30;
const DEFAULT_NON_COMPLIANT_DAYS: i64 = 30;
const DEFAULT_INCIDENT_DAYS: i64 = 7;

/// Severity-derived lead times for target dates, injected per tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadTimeConfig {
    partial_days: i64,
    non_compliant_days: i64,
    incident_days: i64,
}

impl LeadTimeConfig {
    /// Builds a config, falling back to the defaults when any lead time is
    /// not a positive number of days.
    pub fn new(partial_days: i64, non_compliant_days: i64, incident_days: i64) -> Self {
        if partial_days < 1 || non_compliant_days < 1 || incident_days < 1 {
            return Self::default();
        }
        Self {
            partial_days,
            non_compliant_days,
            incident_days,
        }
    }

    pub fn partial_days(&self) -> i64 {
        self.partial_days
    }

    pub fn non_compliant_days(&self) -> i64 {
        self.non_compliant_days
    }

    pub fn incident_days(&self) -> i64 {
        self.incident_days
    }
}

impl Default for LeadTimeConfig {
    fn default() -> Self {
        Self {
            partial_days: DEFAULT_PARTIAL_DAYS,
            non_compliant_days: DEFAULT_NON_COMPLIANT_DAYS,
            incident_days: DEFAULT_INCIDENT_DAYS,
        }
    }
}

static ACTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_action_id() -> ActionItemId {
    let id = ACTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ActionItemId(format!("action-{id:06}"))
}

/// Derives and tracks remedial action items from non-compliant findings and
/// incidents.
pub struct ActionPlanTracker<A> {
    repository: Arc<A>,
    lead_times: LeadTimeConfig,
}

impl<A> ActionPlanTracker<A>
where
    A: ActionItemRepository + 'static,
{
    pub fn new(repository: Arc<A>, lead_times: LeadTimeConfig) -> Self {
        Self {
            repository,
            lead_times,
        }
    }

    /// Spawns one item per `partial`/`non_compliant` response on a completed
    /// instance, skipping responses that already have an open item. Safe to
    /// re-run: the open-item check makes the operation idempotent.
    pub fn spawn_for_completed(
        &self,
        instance: &AuditInstance,
        completed_on: NaiveDate,
    ) -> Result<Vec<ActionPlanItem>, ActionError> {
        let mut spawned = Vec::new();

        for response in instance.responses.values() {
            let (rag, lead_days) = match response.verdict {
                Verdict::NonCompliant => (RagStatus::Red, self.lead_times.non_compliant_days),
                Verdict::Partial => (RagStatus::Amber, self.lead_times.partial_days),
                Verdict::Compliant | Verdict::NotApplicable => continue,
            };

            let origin = ActionOrigin::Response {
                instance: instance.id.clone(),
                question: response.question.clone(),
            };
            if self.repository.open_for_origin(&origin)?.is_some() {
                continue;
            }

            let prompt = instance
                .template
                .question(&response.question)
                .map(|question| question.prompt.clone())
                .unwrap_or_else(|| response.question.clone());

            let item = ActionPlanItem {
                id: next_action_id(),
                description: format!("Resolve {} finding: {}", response.verdict.label(), prompt),
                owner: instance.owner.clone(),
                location: instance.location.clone(),
                subject: instance.subject.clone(),
                origin,
                rag,
                status: ActionStatus::NotStarted,
                opened_on: completed_on,
                target_date: completed_on + Duration::days(lead_days),
                completion: None,
            };
            spawned.push(self.repository.insert(item)?);
        }

        Ok(spawned)
    }

    /// Raises an item directly from an incident, with a shorter lead time
    /// for critical severity.
    pub fn open_incident_action(
        &self,
        reference: &str,
        description: &str,
        severity: IncidentSeverity,
        location: LocationId,
        owner: &str,
        raised_on: NaiveDate,
    ) -> Result<ActionPlanItem, ActionError> {
        let origin = ActionOrigin::Incident {
            reference: reference.to_owned(),
        };
        if let Some(existing) = self.repository.open_for_origin(&origin)? {
            return Ok(existing);
        }

        let (rag, lead_days) = match severity {
            IncidentSeverity::Critical => (RagStatus::Red, self.lead_times.incident_days),
            IncidentSeverity::Routine => (RagStatus::Amber, self.lead_times.partial_days),
        };

        let item = ActionPlanItem {
            id: next_action_id(),
            description: description.to_owned(),
            owner: owner.to_owned(),
            location,
            subject: None,
            origin,
            rag,
            status: ActionStatus::NotStarted,
            opened_on: raised_on,
            target_date: raised_on + Duration::days(lead_days),
            completion: None,
        };
        Ok(self.repository.insert(item)?)
    }

    /// Caller-driven status change. Completed items are final, and reaching
    /// `completed` requires a non-empty completion note.
    pub fn transition(
        &self,
        id: &ActionItemId,
        status: ActionStatus,
        evidence: Option<CompletionEvidence>,
    ) -> Result<ActionPlanItem, ActionError> {
        let mut item = self
            .repository
            .fetch(id)?
            .ok_or_else(|| ActionError::NotFound(id.clone()))?;

        if item.status == ActionStatus::Completed {
            return Err(ActionError::AlreadyCompleted);
        }

        if status == ActionStatus::Completed {
            let evidence = evidence.filter(|e| !e.note.trim().is_empty());
            match evidence {
                Some(evidence) => item.completion = Some(evidence),
                None => return Err(ActionError::MissingEvidence),
            }
        }

        item.status = status;
        self.repository.update(item.clone())?;
        Ok(item)
    }

    /// Items currently overdue. Derived from `target_date` and `status` at
    /// read time; completing an item removes it with no flag update.
    pub fn overdue(&self, today: NaiveDate) -> Result<Vec<ActionPlanItem>, ActionError> {
        let mut items: Vec<ActionPlanItem> = self
            .repository
            .all()?
            .into_iter()
            .filter(|item| item.is_overdue(today))
            .collect();
        items.sort_by(|a, b| a.target_date.cmp(&b.target_date));
        Ok(items)
    }
}
