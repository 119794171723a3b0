use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::alerts::AlertDescriptor;
use super::domain::{
    ActionItemId, ActionOrigin, ActionPlanItem, AuditInstance, InstanceId, LocationId, RagStatus,
    ServiceUserId, StaffId,
};

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("conflicting instance {existing} already occupies the recurrence slot")]
    Conflict { existing: InstanceId },
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Durable storage for audit instances. `insert_if_slot_free` is the
/// conditional-write primitive that enforces the scheduling invariant at the
/// storage boundary: the insert must fail with `Conflict` when a
/// non-cancelled, non-archived instance of the same audit type, location,
/// and subject sits within `min_interval_months` of the new date.
///
/// Writes against one instance are expected to be serialized by the caller
/// or the store; reads are lock-free and may trail the latest write.
pub trait InstanceRepository: Send + Sync {
    fn insert_if_slot_free(
        &self,
        instance: AuditInstance,
        min_interval_months: u32,
    ) -> Result<AuditInstance, RepositoryError>;
    fn update(&self, instance: AuditInstance) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &InstanceId) -> Result<Option<AuditInstance>, RepositoryError>;
    fn for_location(&self, location: &LocationId) -> Result<Vec<AuditInstance>, RepositoryError>;
    fn all(&self) -> Result<Vec<AuditInstance>, RepositoryError>;
    fn delete_for_location(
        &self,
        location: &LocationId,
    ) -> Result<Vec<AuditInstance>, RepositoryError>;
}

/// Durable storage for remedial action items.
pub trait ActionItemRepository: Send + Sync {
    fn insert(&self, item: ActionPlanItem) -> Result<ActionPlanItem, RepositoryError>;
    fn update(&self, item: ActionPlanItem) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ActionItemId) -> Result<Option<ActionPlanItem>, RepositoryError>;
    /// The open (not completed) item already raised for an origin, if any.
    fn open_for_origin(
        &self,
        origin: &ActionOrigin,
    ) -> Result<Option<ActionPlanItem>, RepositoryError>;
    fn for_location(&self, location: &LocationId)
        -> Result<Vec<ActionPlanItem>, RepositoryError>;
    fn all(&self) -> Result<Vec<ActionPlanItem>, RepositoryError>;
}

/// Identity/location directory consumed during person-scoped fan-out.
pub trait Directory: Send + Sync {
    fn active_staff_for(&self, location: &LocationId) -> Result<Vec<StaffId>, DirectoryError>;
    fn active_service_users_for(
        &self,
        location: &LocationId,
    ) -> Result<Vec<ServiceUserId>, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Append-only record of a destructive or bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailRecord {
    pub occurred_on: NaiveDate,
    pub actor: String,
    pub action: String,
    pub location: LocationId,
    pub deleted_instances: Vec<InstanceId>,
    pub detail: String,
}

/// Append-only sink for trail records. A failed append must abort the
/// operation it documents.
pub trait TrailSink: Send + Sync {
    fn append(&self, record: TrailRecord) -> Result<(), TrailError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TrailError {
    #[error("trail sink unavailable: {0}")]
    Unavailable(String),
}

/// Lifecycle and alerting events handed to downstream subscribers (PDF
/// export, e-mail, dashboards). Delivery failure never rolls back the data
/// change that produced the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum EngineEvent {
    InstanceCompleted {
        instance: InstanceId,
        location: LocationId,
        score: Option<u8>,
        rag: Option<RagStatus>,
    },
    ActionItemOverdue {
        item: ActionItemId,
        location: LocationId,
        target_date: NaiveDate,
    },
    ThresholdAlert(AlertDescriptor),
}

/// Trait describing the outbound notification hook.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: EngineEvent) -> Result<(), PublishError>;
}

/// Event dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
}
