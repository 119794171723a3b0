use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use care_audit::audits::memory::{
    MemoryActionItemRepository, MemoryEventPublisher, MemoryInstanceRepository, MemoryTrail,
    StaticDirectory,
};
use care_audit::audits::{AuditService, TemplateCatalog};
use care_audit::config::load_engine_settings;
use care_audit::error::AppError;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type ApiAuditService = AuditService<
    MemoryInstanceRepository,
    MemoryActionItemRepository,
    StaticDirectory,
    MemoryTrail,
    MemoryEventPublisher,
>;

/// Collaborator handles kept alongside the service so the demo and tests can
/// seed the directory and inspect published events.
pub(crate) struct Collaborators {
    pub(crate) service: Arc<ApiAuditService>,
    pub(crate) directory: Arc<StaticDirectory>,
    pub(crate) events: Arc<MemoryEventPublisher>,
}

pub(crate) fn build_service() -> Result<Collaborators, AppError> {
    let settings = load_engine_settings()?;
    let directory = Arc::new(StaticDirectory::default());
    let events = Arc::new(MemoryEventPublisher::default());
    let service = Arc::new(AuditService::new(
        Arc::new(TemplateCatalog::standard()),
        Arc::new(MemoryInstanceRepository::default()),
        Arc::new(MemoryActionItemRepository::default()),
        directory.clone(),
        Arc::new(MemoryTrail::default()),
        events.clone(),
        settings,
    ));

    Ok(Collaborators {
        service,
        directory,
        events,
    })
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
