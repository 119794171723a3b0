use serde::{Deserialize, Serialize};

use super::rollup::{RollupEntity, RollupSnapshot};

/// Severity attached to an alert descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl AlertSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Warning => "Warning",
            Self::Critical => "Critical",
        }
    }
}

/// Which configured threshold a snapshot breached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCondition {
    ComplianceBelowFloor,
    OverdueActionsAboveCeiling,
    RedInstancesAboveCeiling,
}

impl AlertCondition {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ComplianceBelowFloor => "compliance below floor",
            Self::OverdueActionsAboveCeiling => "overdue actions above ceiling",
            Self::RedInstancesAboveCeiling => "red instances above ceiling",
        }
    }
}

/// Alert payload handed to the notification dispatcher. The evaluator never
/// sends anything itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDescriptor {
    pub entity: RollupEntity,
    pub condition: AlertCondition,
    pub severity: AlertSeverity,
    pub measured: u32,
    pub limit: u32,
    pub message: String,
}

const DEFAULT_COMPLIANCE_FLOOR_PCT: u8 = 75;

/// Configured threshold set, injected per tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Entity compliance percentage below which an alert fires.
    pub compliance_floor_pct: u8,
    /// Overdue action items tolerated before an alert fires.
    pub max_overdue_actions: u32,
    /// Red-rated instances tolerated before an alert fires.
    pub max_red_instances: u32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            compliance_floor_pct: DEFAULT_COMPLIANCE_FLOOR_PCT,
            max_overdue_actions: 0,
            max_red_instances: 0,
        }
    }
}

/// Stateless comparison of rollup figures against thresholds. The same
/// snapshot always yields the same descriptors, so callers may poll.
#[derive(Debug, Clone, Default)]
pub struct AlertEvaluator {
    thresholds: AlertThresholds,
}

impl AlertEvaluator {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    pub fn evaluate(&self, snapshot: &RollupSnapshot) -> Vec<AlertDescriptor> {
        let mut alerts = Vec::new();
        let entity = snapshot.entity.label();

        if snapshot.total_sections > 0
            && snapshot.percentage < self.thresholds.compliance_floor_pct
        {
            alerts.push(AlertDescriptor {
                entity: snapshot.entity.clone(),
                condition: AlertCondition::ComplianceBelowFloor,
                severity: AlertSeverity::Critical,
                measured: u32::from(snapshot.percentage),
                limit: u32::from(self.thresholds.compliance_floor_pct),
                message: format!(
                    "{entity} compliance at {}% against a floor of {}%",
                    snapshot.percentage, self.thresholds.compliance_floor_pct
                ),
            });
        }

        let overdue = snapshot.overdue_actions as u32;
        if overdue > self.thresholds.max_overdue_actions {
            alerts.push(AlertDescriptor {
                entity: snapshot.entity.clone(),
                condition: AlertCondition::OverdueActionsAboveCeiling,
                severity: AlertSeverity::Warning,
                measured: overdue,
                limit: self.thresholds.max_overdue_actions,
                message: format!(
                    "{entity} has {overdue} overdue action items (ceiling {})",
                    self.thresholds.max_overdue_actions
                ),
            });
        }

        if snapshot.rag_counts.red > self.thresholds.max_red_instances {
            alerts.push(AlertDescriptor {
                entity: snapshot.entity.clone(),
                condition: AlertCondition::RedInstancesAboveCeiling,
                severity: AlertSeverity::Critical,
                measured: snapshot.rag_counts.red,
                limit: self.thresholds.max_red_instances,
                message: format!(
                    "{entity} has {} red-rated audits (ceiling {})",
                    snapshot.rag_counts.red, self.thresholds.max_red_instances
                ),
            });
        }

        alerts
    }
}
