use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for a care location (home, unit, or site).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationId(pub String);

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for a staff member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StaffId(pub String);

/// Identifier wrapper for a service user (resident).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceUserId(pub String);

/// Identifier wrapper for a concrete audit instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub String);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for a remedial action item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionItemId(pub String);

impl fmt::Display for ActionItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who an audit type assesses: the location itself, or one person per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetScope {
    General,
    Staff,
    ServiceUser,
}

impl TargetScope {
    pub const fn label(self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Staff => "Staff",
            Self::ServiceUser => "Service User",
        }
    }
}

/// Declared recurrence cadence for an audit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Monthly,
    Quarterly,
    Biannual,
    Annual,
    AdHoc,
}

impl Frequency {
    /// Nominal interval in months; `None` for ad-hoc types, which are never
    /// auto-projected.
    pub const fn interval_months(self) -> Option<u32> {
        match self {
            Self::Monthly => Some(1),
            Self::Quarterly => Some(3),
            Self::Biannual => Some(6),
            Self::Annual => Some(12),
            Self::AdHoc => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Monthly => "Monthly",
            Self::Quarterly => "Quarterly",
            Self::Biannual => "Biannual",
            Self::Annual => "Annual",
            Self::AdHoc => "Ad hoc",
        }
    }
}

/// Lifecycle state of one audit instance. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Scheduled,
    InProgress,
    Completed,
    Archived,
    Cancelled,
}

impl InstanceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Scheduled => "Scheduled",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Archived => "Archived",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether responses may still be recorded against the instance.
    pub const fn accepts_responses(self) -> bool {
        matches!(self, Self::Scheduled | Self::InProgress)
    }

    /// Whether the instance occupies its recurrence slot. Cancelled and
    /// archived instances no longer block new scheduling.
    pub const fn occupies_schedule(self) -> bool {
        matches!(self, Self::Scheduled | Self::InProgress | Self::Completed)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Compliance verdict recorded against one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Compliant,
    Partial,
    NonCompliant,
    NotApplicable,
}

impl Verdict {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Compliant => "Compliant",
            Self::Partial => "Partially Compliant",
            Self::NonCompliant => "Non-Compliant",
            Self::NotApplicable => "Not Applicable",
        }
    }

    /// Severity ordering used by worst-case roll-up. `NotApplicable` carries
    /// no severity and is excluded before ranking.
    pub(crate) const fn severity(self) -> u8 {
        match self {
            Self::Compliant => 0,
            Self::Partial => 1,
            Self::NonCompliant => 2,
            Self::NotApplicable => 0,
        }
    }

    pub const fn is_assessable(self) -> bool {
        !matches!(self, Self::NotApplicable)
    }
}

/// Red/Amber/Green classification derived from a compliance percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RagStatus {
    Green,
    Amber,
    Red,
}

impl RagStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Green => "Green",
            Self::Amber => "Amber",
            Self::Red => "Red",
        }
    }
}

/// Caller-driven status of a remedial action item. "Overdue" is never stored
/// here; it is derived from `target_date` at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    NotStarted,
    InProgress,
    PartiallyCompleted,
    Completed,
}

impl ActionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::PartiallyCompleted => "Partially Completed",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The person a person-scoped audit instance assesses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSubject {
    Staff(StaffId),
    ServiceUser(ServiceUserId),
}

impl AuditSubject {
    pub fn label(&self) -> String {
        match self {
            Self::Staff(id) => format!("staff {}", id.0),
            Self::ServiceUser(id) => format!("service user {}", id.0),
        }
    }
}

/// A category of recurring compliance check. Immutable reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditType {
    pub id: String,
    pub name: String,
    pub scope: TargetScope,
    pub frequency: Frequency,
}

/// One question inside a template section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateQuestion {
    pub key: String,
    pub prompt: String,
    pub required: bool,
}

/// A named group of questions assessed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSection {
    pub key: String,
    pub name: String,
    pub questions: Vec<TemplateQuestion>,
}

/// Versioned snapshot of the sections and questions belonging to an audit
/// type. An instance clones the snapshot at creation time so later catalog
/// edits never retroactively change a completed audit's meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTemplate {
    pub audit_type: String,
    pub version: u32,
    pub sections: Vec<TemplateSection>,
}

impl AuditTemplate {
    pub fn question(&self, key: &str) -> Option<&TemplateQuestion> {
        self.sections
            .iter()
            .flat_map(|section| section.questions.iter())
            .find(|question| question.key == key)
    }

    pub fn required_question_keys(&self) -> Vec<&str> {
        self.sections
            .iter()
            .flat_map(|section| section.questions.iter())
            .filter(|question| question.required)
            .map(|question| question.key.as_str())
            .collect()
    }
}

/// One answer to one template question within one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditResponse {
    pub question: String,
    pub verdict: Verdict,
    pub note: Option<String>,
    pub recorded_by: String,
    pub recorded_on: NaiveDate,
}

/// One occurrence of an audit for one location and, when the type is
/// person-scoped, one subject. Mutated only through lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditInstance {
    pub id: InstanceId,
    pub audit_type: String,
    pub location: LocationId,
    pub subject: Option<AuditSubject>,
    pub template: AuditTemplate,
    pub scheduled_for: NaiveDate,
    pub occurred_on: Option<NaiveDate>,
    pub owner: String,
    pub status: InstanceStatus,
    pub responses: BTreeMap<String, AuditResponse>,
    pub overall_score: Option<u8>,
    pub rag: Option<RagStatus>,
    pub summary: Option<String>,
}

impl AuditInstance {
    /// Effective date for recurrence arithmetic: the occurrence date once
    /// known, the booked date otherwise.
    pub fn effective_date(&self) -> NaiveDate {
        self.occurred_on.unwrap_or(self.scheduled_for)
    }
}

/// What gave rise to a remedial action item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOrigin {
    Response {
        instance: InstanceId,
        question: String,
    },
    Incident {
        reference: String,
    },
}

/// Closing evidence captured when an action item is marked completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvidence {
    pub note: String,
    pub evidence_ref: Option<String>,
    pub completed_on: NaiveDate,
}

/// A tracked remedial task arising from a non-compliant finding or incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPlanItem {
    pub id: ActionItemId,
    pub description: String,
    pub owner: String,
    pub location: LocationId,
    pub subject: Option<AuditSubject>,
    pub origin: ActionOrigin,
    pub rag: RagStatus,
    pub status: ActionStatus,
    pub opened_on: NaiveDate,
    pub target_date: NaiveDate,
    pub completion: Option<CompletionEvidence>,
}

impl ActionPlanItem {
    /// Overdue is derived at read time, never stored, so it can never drift
    /// from the clock.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != ActionStatus::Completed && self.target_date < today
    }
}
