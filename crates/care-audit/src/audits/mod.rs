//! Audit scheduling and compliance roll-up engine.
//!
//! The catalog supplies read-only audit types and template snapshots; the
//! projector turns a location's history into a conflict-free forward
//! calendar; the lifecycle manager walks accepted instances through their
//! state machine while the aggregator folds recorded verdicts into section
//! and instance RAG figures; the rollup and alert evaluator keep the
//! dashboard numbers and threshold alerts derivable from raw data at any
//! time.

pub mod actions;
pub mod alerts;
pub mod catalog;
pub mod domain;
pub mod export;
pub mod lifecycle;
pub mod memory;
pub mod repository;
pub mod rollup;
pub mod router;
pub mod schedule;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use actions::{ActionError, ActionPlanTracker, IncidentSeverity, LeadTimeConfig};
pub use alerts::{
    AlertCondition, AlertDescriptor, AlertEvaluator, AlertSeverity, AlertThresholds,
};
pub use catalog::{CatalogError, TemplateCatalog};
pub use domain::{
    ActionItemId, ActionOrigin, ActionPlanItem, ActionStatus, AuditInstance, AuditResponse,
    AuditSubject, AuditTemplate, AuditType, CompletionEvidence, Frequency, InstanceId,
    InstanceStatus, LocationId, RagStatus, ServiceUserId, StaffId, TargetScope, TemplateQuestion,
    TemplateSection, Verdict,
};
pub use lifecycle::{
    BulkDeleteReceipt, FanOutFailure, FanOutReport, InstanceLifecycleManager, LifecycleError,
};
pub use repository::{
    ActionItemRepository, Directory, DirectoryError, EngineEvent, EventPublisher,
    InstanceRepository, PublishError, RepositoryError, TrailError, TrailRecord, TrailSink,
};
pub use rollup::{
    AssessmentWindow, ComplianceRollup, RagCounts, RollupEntity, RollupError, RollupSnapshot,
};
pub use router::audit_router;
pub use schedule::{
    dates_collide, PlanningWindow, ProjectorSettings, ScheduleProjector, ScheduleSuggestion,
};
pub use scoring::{InstanceAssessment, ResponseAggregator, ScoringConfig, SectionAssessment};
pub use service::{
    AuditService, CompletionOutcome, EngineSettings, LocationDashboard, RecordResponseRequest,
    ServiceError,
};
