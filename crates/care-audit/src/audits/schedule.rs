use std::collections::BTreeMap;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::catalog::TemplateCatalog;
use super::domain::{AuditInstance, AuditType, LocationId};

/// One projected due date, produced for an operator to accept or reject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSuggestion {
    pub audit_type: String,
    pub location: LocationId,
    pub suggested_date: NaiveDate,
}

/// Forward calendar covered by a projection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl PlanningWindow {
    pub fn spanning_months(from: NaiveDate, months: u32) -> Self {
        let to = from
            .checked_add_months(Months::new(months))
            .unwrap_or(NaiveDate::MAX);
        Self { from, to }
    }
}

/// Tenant-level projection tuning. Overrides replace a type's nominal
/// recurrence interval for collision checks only; the stepping cadence stays
/// the declared frequency.
#[derive(Debug, Clone, Default)]
pub struct ProjectorSettings {
    pub min_interval_overrides: BTreeMap<String, u32>,
}

/// Whether two dates of the same audit series sit closer together than the
/// minimum recurrence interval. The boundary is open: exactly one interval
/// apart is not a collision.
pub fn dates_collide(a: NaiveDate, b: NaiveDate, interval_months: u32) -> bool {
    let (earlier, later) = if a <= b { (a, b) } else { (b, a) };
    match earlier.checked_add_months(Months::new(interval_months)) {
        Some(limit) => later < limit,
        None => true,
    }
}

/// Projects a conflict-free forward calendar of audit due dates. Pure reads:
/// repeated preview calls with identical inputs yield identical output.
pub struct ScheduleProjector<'a> {
    catalog: &'a TemplateCatalog,
    settings: ProjectorSettings,
}

impl<'a> ScheduleProjector<'a> {
    pub fn new(catalog: &'a TemplateCatalog, settings: ProjectorSettings) -> Self {
        Self { catalog, settings }
    }

    /// Minimum recurrence interval for a type: the tenant override when one
    /// is configured, the nominal frequency interval otherwise.
    pub fn min_interval_months(&self, audit_type: &AuditType) -> Option<u32> {
        self.settings
            .min_interval_overrides
            .get(&audit_type.id)
            .copied()
            .or_else(|| audit_type.frequency.interval_months())
    }

    pub fn project(
        &self,
        location: &LocationId,
        existing: &[AuditInstance],
        window: PlanningWindow,
    ) -> Vec<ScheduleSuggestion> {
        let mut suggestions = Vec::new();

        for audit_type in self.catalog.types() {
            let Some(step_months) = audit_type.frequency.interval_months() else {
                // Ad-hoc types are raised manually, never auto-projected.
                continue;
            };
            let min_interval = self
                .min_interval_months(audit_type)
                .unwrap_or(step_months);

            let history: Vec<NaiveDate> = existing
                .iter()
                .filter(|instance| {
                    instance.audit_type == audit_type.id
                        && instance.location == *location
                        && instance.status.occupies_schedule()
                })
                .map(AuditInstance::effective_date)
                .collect();

            let anchor = history.iter().max().copied().unwrap_or(window.from);

            // Earlier emissions count as occupied too, so a widened minimum
            // interval cannot produce a calendar that conflicts with itself.
            let mut occupied = history;
            for step_index in 1u32.. {
                let Some(candidate) =
                    anchor.checked_add_months(Months::new(step_months * step_index))
                else {
                    break;
                };
                if candidate > window.to {
                    break;
                }
                if candidate < window.from {
                    continue;
                }
                let collides = occupied
                    .iter()
                    .any(|taken| dates_collide(*taken, candidate, min_interval));
                if !collides {
                    occupied.push(candidate);
                    suggestions.push(ScheduleSuggestion {
                        audit_type: audit_type.id.clone(),
                        location: location.clone(),
                        suggested_date: candidate,
                    });
                }
            }
        }

        suggestions.sort_by(|a, b| {
            a.suggested_date
                .cmp(&b.suggested_date)
                .then_with(|| a.audit_type.cmp(&b.audit_type))
        });

        suggestions
    }
}
