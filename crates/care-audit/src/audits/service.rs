use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::actions::{ActionError, ActionPlanTracker, IncidentSeverity, LeadTimeConfig};
use super::alerts::{AlertDescriptor, AlertEvaluator, AlertThresholds};
use super::catalog::{CatalogError, TemplateCatalog};
use super::domain::{
    ActionItemId, ActionPlanItem, ActionStatus, AuditInstance, AuditSubject, CompletionEvidence,
    InstanceId, LocationId, Verdict,
};
use super::lifecycle::{
    BulkDeleteReceipt, FanOutReport, InstanceLifecycleManager, LifecycleError,
};
use super::repository::{
    ActionItemRepository, Directory, EngineEvent, EventPublisher, InstanceRepository,
    RepositoryError, TrailSink,
};
use super::rollup::{
    AssessmentWindow, ComplianceRollup, RollupEntity, RollupError, RollupSnapshot,
};
use super::schedule::{PlanningWindow, ProjectorSettings, ScheduleProjector, ScheduleSuggestion};
use super::scoring::{ResponseAggregator, ScoringConfig};

const DEFAULT_HORIZON_MONTHS: u32 = 12;

/// Tenant-level tuning for the whole engine. Every threshold the engine
/// consults is injected here rather than hard-coded.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub scoring: ScoringConfig,
    pub lead_times: LeadTimeConfig,
    pub thresholds: AlertThresholds,
    pub horizon_months: u32,
    pub projector: ProjectorSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            lead_times: LeadTimeConfig::default(),
            thresholds: AlertThresholds::default(),
            horizon_months: DEFAULT_HORIZON_MONTHS,
            projector: ProjectorSettings::default(),
        }
    }
}

/// Error raised by the audit service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Rollup(#[from] RollupError),
}

/// What a successful completion produced: the frozen instance, the remedial
/// items spawned from its findings, and any threshold alerts the refreshed
/// location figures triggered.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub instance: AuditInstance,
    pub spawned_actions: Vec<ActionPlanItem>,
    pub alerts: Vec<AlertDescriptor>,
}

/// Dashboard payload for one location: the location rollup, per-person
/// breakdowns, threshold alerts, and the current overdue set. Entities whose
/// recomputation failed are reported by name instead of blocking the rest.
#[derive(Debug, Clone, Serialize)]
pub struct LocationDashboard {
    pub location: RollupSnapshot,
    pub subjects: Vec<RollupSnapshot>,
    pub failed_entities: Vec<String>,
    pub alerts: Vec<AlertDescriptor>,
    pub overdue_actions: Vec<ActionPlanItem>,
}

/// Request payload for recording one answer.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordResponseRequest {
    pub question: String,
    pub verdict: Verdict,
    #[serde(default)]
    pub note: Option<String>,
    pub recorded_by: String,
    pub recorded_on: NaiveDate,
}

/// Service composing the catalog, scheduler, lifecycle manager, aggregator,
/// rollup, action tracker, and alert evaluator.
pub struct AuditService<R, A, D, T, P> {
    catalog: Arc<TemplateCatalog>,
    instances: Arc<R>,
    actions: Arc<A>,
    events: Arc<P>,
    lifecycle: InstanceLifecycleManager<R, D, T>,
    tracker: ActionPlanTracker<A>,
    rollup: ComplianceRollup,
    evaluator: AlertEvaluator,
    settings: EngineSettings,
}

impl<R, A, D, T, P> AuditService<R, A, D, T, P>
where
    R: InstanceRepository + 'static,
    A: ActionItemRepository + 'static,
    D: Directory + 'static,
    T: TrailSink + 'static,
    P: EventPublisher + 'static,
{
    pub fn new(
        catalog: Arc<TemplateCatalog>,
        instances: Arc<R>,
        actions: Arc<A>,
        directory: Arc<D>,
        trail: Arc<T>,
        events: Arc<P>,
        settings: EngineSettings,
    ) -> Self {
        let aggregator = ResponseAggregator::new(settings.scoring);
        let lifecycle = InstanceLifecycleManager::new(
            catalog.clone(),
            instances.clone(),
            directory,
            trail,
            aggregator.clone(),
            settings.projector.clone(),
        );
        let tracker = ActionPlanTracker::new(actions.clone(), settings.lead_times);
        let rollup = ComplianceRollup::new(aggregator);
        let evaluator = AlertEvaluator::new(settings.thresholds);

        Self {
            catalog,
            instances,
            actions,
            events,
            lifecycle,
            tracker,
            rollup,
            evaluator,
            settings,
        }
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    /// Side-effect-free preview of the forward audit calendar for a
    /// location. Safe to call repeatedly.
    pub fn preview_schedule(
        &self,
        location: &LocationId,
        from: NaiveDate,
        horizon_months: Option<u32>,
    ) -> Result<Vec<ScheduleSuggestion>, ServiceError> {
        let existing = self.instances.for_location(location)?;
        let window = PlanningWindow::spanning_months(
            from,
            horizon_months.unwrap_or(self.settings.horizon_months),
        );
        let projector = ScheduleProjector::new(&self.catalog, self.settings.projector.clone());
        Ok(projector.project(location, &existing, window))
    }

    /// Accepts one suggestion, fanning out per person when the audit type is
    /// person-scoped.
    pub fn accept_suggestion(
        &self,
        suggestion: &ScheduleSuggestion,
        owner: &str,
    ) -> Result<FanOutReport, ServiceError> {
        let report = self.lifecycle.accept(suggestion, owner)?;
        if report.failures.is_empty() {
            info!(
                audit_type = %suggestion.audit_type,
                location = %suggestion.location,
                created = report.created.len(),
                "schedule suggestion accepted"
            );
        } else {
            warn!(
                audit_type = %suggestion.audit_type,
                location = %suggestion.location,
                created = report.created.len(),
                failed = report.failures.len(),
                "schedule acceptance completed with gaps"
            );
        }
        Ok(report)
    }

    pub fn record_response(
        &self,
        id: &InstanceId,
        request: RecordResponseRequest,
    ) -> Result<AuditInstance, ServiceError> {
        let instance = self.lifecycle.record_response(
            id,
            &request.question,
            request.verdict,
            request.note,
            &request.recorded_by,
            request.recorded_on,
        )?;
        Ok(instance)
    }

    /// Completes an instance, spawns remedial items for its findings, and
    /// re-evaluates the location's alert thresholds.
    pub fn complete(
        &self,
        id: &InstanceId,
        summary: Option<String>,
        completed_on: NaiveDate,
    ) -> Result<CompletionOutcome, ServiceError> {
        let instance = self.lifecycle.complete(id, summary, completed_on)?;
        let spawned = self.tracker.spawn_for_completed(&instance, completed_on)?;
        let alerts = self.location_alerts(&instance.location, completed_on)?;

        self.publish(EngineEvent::InstanceCompleted {
            instance: instance.id.clone(),
            location: instance.location.clone(),
            score: instance.overall_score,
            rag: instance.rag,
        });
        for alert in &alerts {
            self.publish(EngineEvent::ThresholdAlert(alert.clone()));
        }

        info!(
            instance = %instance.id,
            location = %instance.location,
            score = ?instance.overall_score,
            actions = spawned.len(),
            "audit instance completed"
        );

        Ok(CompletionOutcome {
            instance,
            spawned_actions: spawned,
            alerts,
        })
    }

    pub fn archive(&self, id: &InstanceId) -> Result<AuditInstance, ServiceError> {
        Ok(self.lifecycle.archive(id)?)
    }

    pub fn cancel(&self, id: &InstanceId) -> Result<AuditInstance, ServiceError> {
        Ok(self.lifecycle.cancel(id)?)
    }

    pub fn bulk_delete(
        &self,
        location: &LocationId,
        confirmation_token: &str,
        actor: &str,
        on: NaiveDate,
    ) -> Result<BulkDeleteReceipt, ServiceError> {
        let receipt = self
            .lifecycle
            .bulk_delete(location, confirmation_token, actor, on)?;
        warn!(
            location = %receipt.location,
            deleted = receipt.deleted.len(),
            actor,
            "bulk delete executed"
        );
        Ok(receipt)
    }

    /// Rebuilds the dashboard for one location from raw data.
    pub fn location_dashboard(
        &self,
        location: &LocationId,
        today: NaiveDate,
    ) -> Result<LocationDashboard, ServiceError> {
        let instances = self.instances.for_location(location)?;
        let actions = self.actions.for_location(location)?;
        let window = AssessmentWindow::trailing_year(today);

        let location_snapshot = self.rollup.snapshot(
            RollupEntity::Location(location.clone()),
            &instances,
            &actions,
            window,
            today,
        )?;

        let subjects: BTreeSet<AuditSubject> = instances
            .iter()
            .filter_map(|instance| instance.subject.clone())
            .collect();
        let entities: Vec<RollupEntity> = subjects
            .into_iter()
            .map(|subject| match subject {
                AuditSubject::Staff(id) => RollupEntity::Staff(id),
                AuditSubject::ServiceUser(id) => RollupEntity::ServiceUser(id),
            })
            .collect();

        let mut subject_snapshots = Vec::new();
        let mut failed_entities = Vec::new();
        for (entity, result) in
            self.rollup
                .snapshot_many(entities, &instances, &actions, window, today)
        {
            match result {
                Ok(snapshot) => subject_snapshots.push(snapshot),
                Err(err) => {
                    warn!(entity = %entity.label(), %err, "rollup recomputation failed");
                    failed_entities.push(format!("{}: {err}", entity.label()));
                }
            }
        }

        let alerts = self.evaluator.evaluate(&location_snapshot);
        let overdue_actions = actions
            .iter()
            .filter(|item| item.is_overdue(today))
            .cloned()
            .collect();

        Ok(LocationDashboard {
            location: location_snapshot,
            subjects: subject_snapshots,
            failed_entities,
            alerts,
            overdue_actions,
        })
    }

    /// Rebuilds one entity's snapshot over the whole data set.
    pub fn rollup_for(
        &self,
        entity: RollupEntity,
        today: NaiveDate,
    ) -> Result<RollupSnapshot, ServiceError> {
        let instances = self.instances.all()?;
        let actions = self.actions.all()?;
        let window = AssessmentWindow::trailing_year(today);
        Ok(self
            .rollup
            .snapshot(entity, &instances, &actions, window, today)?)
    }

    pub fn transition_action(
        &self,
        id: &ActionItemId,
        status: ActionStatus,
        evidence: Option<CompletionEvidence>,
    ) -> Result<ActionPlanItem, ServiceError> {
        Ok(self.tracker.transition(id, status, evidence)?)
    }

    pub fn open_incident_action(
        &self,
        reference: &str,
        description: &str,
        severity: IncidentSeverity,
        location: LocationId,
        owner: &str,
        raised_on: NaiveDate,
    ) -> Result<ActionPlanItem, ServiceError> {
        Ok(self.tracker.open_incident_action(
            reference,
            description,
            severity,
            location,
            owner,
            raised_on,
        )?)
    }

    pub fn overdue_actions(&self, today: NaiveDate) -> Result<Vec<ActionPlanItem>, ServiceError> {
        Ok(self.tracker.overdue(today)?)
    }

    /// Emits an `action_item_overdue` event per overdue item, for the
    /// external reminder scheduler to fan out.
    pub fn publish_overdue(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<ActionPlanItem>, ServiceError> {
        let items = self.tracker.overdue(today)?;
        for item in &items {
            self.publish(EngineEvent::ActionItemOverdue {
                item: item.id.clone(),
                location: item.location.clone(),
                target_date: item.target_date,
            });
        }
        Ok(items)
    }

    fn location_alerts(
        &self,
        location: &LocationId,
        today: NaiveDate,
    ) -> Result<Vec<AlertDescriptor>, ServiceError> {
        let instances = self.instances.for_location(location)?;
        let actions = self.actions.for_location(location)?;
        let window = AssessmentWindow::trailing_year(today);
        let snapshot = self.rollup.snapshot(
            RollupEntity::Location(location.clone()),
            &instances,
            &actions,
            window,
            today,
        )?;
        Ok(self.evaluator.evaluate(&snapshot))
    }

    /// Event delivery is best-effort: a transport failure is logged and the
    /// underlying data change stands.
    fn publish(&self, event: EngineEvent) {
        if let Err(err) = self.events.publish(event) {
            warn!(%err, "event delivery failed");
        }
    }
}
