//! In-memory adapter implementations of the storage and collaborator
//! traits, used by the service shell, the demo CLI, and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::domain::{
    ActionItemId, ActionOrigin, ActionPlanItem, ActionStatus, AuditInstance, InstanceId,
    LocationId, ServiceUserId, StaffId,
};
use super::repository::{
    ActionItemRepository, Directory, DirectoryError, EngineEvent, EventPublisher,
    InstanceRepository, PublishError, RepositoryError, TrailError, TrailRecord, TrailSink,
};
use super::schedule::dates_collide;

#[derive(Default, Clone)]
pub struct MemoryInstanceRepository {
    records: Arc<Mutex<HashMap<InstanceId, AuditInstance>>>,
}

impl InstanceRepository for MemoryInstanceRepository {
    fn insert_if_slot_free(
        &self,
        instance: AuditInstance,
        min_interval_months: u32,
    ) -> Result<AuditInstance, RepositoryError> {
        // The map lock doubles as the per-key serialization point: the
        // collision scan and the insert happen under one critical section.
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if let Some(existing) = guard.values().find(|candidate| {
            candidate.audit_type == instance.audit_type
                && candidate.location == instance.location
                && candidate.subject == instance.subject
                && candidate.status.occupies_schedule()
                && dates_collide(
                    candidate.effective_date(),
                    instance.scheduled_for,
                    min_interval_months,
                )
        }) {
            return Err(RepositoryError::Conflict {
                existing: existing.id.clone(),
            });
        }
        guard.insert(instance.id.clone(), instance.clone());
        Ok(instance)
    }

    fn update(&self, instance: AuditInstance) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&instance.id) {
            guard.insert(instance.id.clone(), instance);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &InstanceId) -> Result<Option<AuditInstance>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn for_location(&self, location: &LocationId) -> Result<Vec<AuditInstance>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut instances: Vec<AuditInstance> = guard
            .values()
            .filter(|instance| instance.location == *location)
            .cloned()
            .collect();
        instances.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(instances)
    }

    fn all(&self) -> Result<Vec<AuditInstance>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut instances: Vec<AuditInstance> = guard.values().cloned().collect();
        instances.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(instances)
    }

    fn delete_for_location(
        &self,
        location: &LocationId,
    ) -> Result<Vec<AuditInstance>, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let doomed: Vec<InstanceId> = guard
            .values()
            .filter(|instance| instance.location == *location)
            .map(|instance| instance.id.clone())
            .collect();
        let mut deleted: Vec<AuditInstance> = doomed
            .iter()
            .filter_map(|id| guard.remove(id))
            .collect();
        deleted.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(deleted)
    }
}

#[derive(Default, Clone)]
pub struct MemoryActionItemRepository {
    items: Arc<Mutex<HashMap<ActionItemId, ActionPlanItem>>>,
}

impl ActionItemRepository for MemoryActionItemRepository {
    fn insert(&self, item: ActionPlanItem) -> Result<ActionPlanItem, RepositoryError> {
        let mut guard = self.items.lock().expect("action mutex poisoned");
        if guard.contains_key(&item.id) {
            return Err(RepositoryError::Unavailable(format!(
                "action item {} already stored",
                item.id
            )));
        }
        guard.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    fn update(&self, item: ActionPlanItem) -> Result<(), RepositoryError> {
        let mut guard = self.items.lock().expect("action mutex poisoned");
        if guard.contains_key(&item.id) {
            guard.insert(item.id.clone(), item);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &ActionItemId) -> Result<Option<ActionPlanItem>, RepositoryError> {
        let guard = self.items.lock().expect("action mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn open_for_origin(
        &self,
        origin: &ActionOrigin,
    ) -> Result<Option<ActionPlanItem>, RepositoryError> {
        let guard = self.items.lock().expect("action mutex poisoned");
        Ok(guard
            .values()
            .find(|item| item.origin == *origin && item.status != ActionStatus::Completed)
            .cloned())
    }

    fn for_location(
        &self,
        location: &LocationId,
    ) -> Result<Vec<ActionPlanItem>, RepositoryError> {
        let guard = self.items.lock().expect("action mutex poisoned");
        let mut items: Vec<ActionPlanItem> = guard
            .values()
            .filter(|item| item.location == *location)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    fn all(&self) -> Result<Vec<ActionPlanItem>, RepositoryError> {
        let guard = self.items.lock().expect("action mutex poisoned");
        let mut items: Vec<ActionPlanItem> = guard.values().cloned().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }
}

/// Directory with a fixed assignment of people to locations.
#[derive(Default, Clone)]
pub struct StaticDirectory {
    staff: Arc<Mutex<HashMap<LocationId, Vec<StaffId>>>>,
    service_users: Arc<Mutex<HashMap<LocationId, Vec<ServiceUserId>>>>,
}

impl StaticDirectory {
    pub fn assign_staff(&self, location: LocationId, staff: Vec<StaffId>) {
        self.staff
            .lock()
            .expect("directory mutex poisoned")
            .insert(location, staff);
    }

    pub fn assign_service_users(&self, location: LocationId, service_users: Vec<ServiceUserId>) {
        self.service_users
            .lock()
            .expect("directory mutex poisoned")
            .insert(location, service_users);
    }
}

impl Directory for StaticDirectory {
    fn active_staff_for(&self, location: &LocationId) -> Result<Vec<StaffId>, DirectoryError> {
        let guard = self.staff.lock().expect("directory mutex poisoned");
        Ok(guard.get(location).cloned().unwrap_or_default())
    }

    fn active_service_users_for(
        &self,
        location: &LocationId,
    ) -> Result<Vec<ServiceUserId>, DirectoryError> {
        let guard = self.service_users.lock().expect("directory mutex poisoned");
        Ok(guard.get(location).cloned().unwrap_or_default())
    }
}

#[derive(Default, Clone)]
pub struct MemoryTrail {
    records: Arc<Mutex<Vec<TrailRecord>>>,
}

impl MemoryTrail {
    pub fn records(&self) -> Vec<TrailRecord> {
        self.records.lock().expect("trail mutex poisoned").clone()
    }
}

impl TrailSink for MemoryTrail {
    fn append(&self, record: TrailRecord) -> Result<(), TrailError> {
        self.records
            .lock()
            .expect("trail mutex poisoned")
            .push(record);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct MemoryEventPublisher {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl MemoryEventPublisher {
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl EventPublisher for MemoryEventPublisher {
    fn publish(&self, event: EngineEvent) -> Result<(), PublishError> {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .push(event);
        Ok(())
    }
}
