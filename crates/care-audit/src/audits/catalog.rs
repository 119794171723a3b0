use std::collections::BTreeMap;

use super::domain::{
    AuditTemplate, AuditType, Frequency, TargetScope, TemplateQuestion, TemplateSection,
};

/// Lookup failures against the catalog. A type without a template is a
/// data-integrity fault and is surfaced, never skipped.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("unknown audit type '{0}'")]
    UnknownAuditType(String),
    #[error("audit type '{0}' has no template definition")]
    MissingTemplate(String),
}

/// Read-only in-memory view of audit types and their template snapshots.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    types: Vec<AuditType>,
    templates: BTreeMap<String, AuditTemplate>,
}

impl TemplateCatalog {
    pub fn new(types: Vec<AuditType>, templates: Vec<AuditTemplate>) -> Self {
        let templates = templates
            .into_iter()
            .map(|template| (template.audit_type.clone(), template))
            .collect();
        Self { types, templates }
    }

    /// The built-in care-facility catalog used by the demo shell and tests.
    pub fn standard() -> Self {
        Self::new(standard_types(), standard_templates())
    }

    pub fn types(&self) -> &[AuditType] {
        &self.types
    }

    pub fn types_by_scope(&self, scope: TargetScope) -> Vec<&AuditType> {
        self.types
            .iter()
            .filter(|audit_type| audit_type.scope == scope)
            .collect()
    }

    pub fn audit_type(&self, id: &str) -> Result<&AuditType, CatalogError> {
        self.types
            .iter()
            .find(|audit_type| audit_type.id == id)
            .ok_or_else(|| CatalogError::UnknownAuditType(id.to_owned()))
    }

    pub fn template_for(&self, id: &str) -> Result<&AuditTemplate, CatalogError> {
        self.audit_type(id)?;
        self.templates
            .get(id)
            .ok_or_else(|| CatalogError::MissingTemplate(id.to_owned()))
    }

    pub fn frequency_of(&self, id: &str) -> Result<Frequency, CatalogError> {
        self.audit_type(id).map(|audit_type| audit_type.frequency)
    }
}

fn audit_type(id: &str, name: &str, scope: TargetScope, frequency: Frequency) -> AuditType {
    AuditType {
        id: id.to_owned(),
        name: name.to_owned(),
        scope,
        frequency,
    }
}

fn question(key: &str, prompt: &str, required: bool) -> TemplateQuestion {
    TemplateQuestion {
        key: key.to_owned(),
        prompt: prompt.to_owned(),
        required,
    }
}

fn section(key: &str, name: &str, questions: Vec<TemplateQuestion>) -> TemplateSection {
    TemplateSection {
        key: key.to_owned(),
        name: name.to_owned(),
        questions,
    }
}

fn template(audit_type: &str, sections: Vec<TemplateSection>) -> AuditTemplate {
    AuditTemplate {
        audit_type: audit_type.to_owned(),
        version: 1,
        sections,
    }
}

fn standard_types() -> Vec<AuditType> {
    vec![
        audit_type(
            "medication_management",
            "Medication Management Audit",
            TargetScope::General,
            Frequency::Monthly,
        ),
        audit_type(
            "care_plan_review",
            "Care Plan Review",
            TargetScope::ServiceUser,
            Frequency::Monthly,
        ),
        audit_type(
            "infection_control",
            "Infection Prevention and Control Audit",
            TargetScope::General,
            Frequency::Quarterly,
        ),
        audit_type(
            "staff_supervision",
            "Staff Supervision Record Audit",
            TargetScope::Staff,
            Frequency::Quarterly,
        ),
        audit_type(
            "training_compliance",
            "Mandatory Training Compliance Check",
            TargetScope::Staff,
            Frequency::Biannual,
        ),
        audit_type(
            "premises_safety",
            "Premises Health and Safety Audit",
            TargetScope::General,
            Frequency::Annual,
        ),
        audit_type(
            "safeguarding_spot_check",
            "Safeguarding Spot Check",
            TargetScope::General,
            Frequency::AdHoc,
        ),
    ]
}

fn standard_templates() -> Vec<AuditTemplate> {
    vec![
        template(
            "medication_management",
            vec![
                section(
                    "storage",
                    "Storage and Security",
                    vec![
                        question(
                            "storage_temperature",
                            "Are medication fridge and room temperatures recorded daily and within range?",
                            true,
                        ),
                        question(
                            "controlled_drugs_register",
                            "Is the controlled drugs register complete with two signatures per entry?",
                            true,
                        ),
                        question(
                            "keys_custody",
                            "Are medication keys held only by authorised staff on duty?",
                            true,
                        ),
                    ],
                ),
                section(
                    "administration",
                    "Administration Records",
                    vec![
                        question(
                            "mar_gaps",
                            "Are MAR charts free of unexplained gaps for the sampled week?",
                            true,
                        ),
                        question(
                            "prn_protocols",
                            "Does every PRN medication have a current protocol in place?",
                            true,
                        ),
                        question(
                            "covert_authorisation",
                            "Where covert administration occurs, is a best-interests authorisation on file?",
                            false,
                        ),
                    ],
                ),
            ],
        ),
        template(
            "care_plan_review",
            vec![
                section(
                    "currency",
                    "Plan Currency",
                    vec![
                        question(
                            "reviewed_in_month",
                            "Has the care plan been reviewed and signed within the last month?",
                            true,
                        ),
                        question(
                            "risk_assessments_current",
                            "Are all linked risk assessments in date?",
                            true,
                        ),
                    ],
                ),
                section(
                    "involvement",
                    "Person Involvement",
                    vec![
                        question(
                            "resident_voice",
                            "Is the service user's (or representative's) view recorded in the review?",
                            true,
                        ),
                        question(
                            "consent_recorded",
                            "Is consent or a best-interests decision recorded for the current plan?",
                            true,
                        ),
                    ],
                ),
            ],
        ),
        template(
            "infection_control",
            vec![
                section(
                    "environment",
                    "Environment and Equipment",
                    vec![
                        question(
                            "cleaning_schedules",
                            "Are cleaning schedules complete for all clinical areas this quarter?",
                            true,
                        ),
                        question(
                            "ppe_stock",
                            "Is PPE stocked at or above the minimum holding level?",
                            true,
                        ),
                    ],
                ),
                section(
                    "practice",
                    "Staff Practice",
                    vec![
                        question(
                            "hand_hygiene_observed",
                            "Did observed practice meet the hand hygiene standard?",
                            true,
                        ),
                        question(
                            "outbreak_plan",
                            "Is the outbreak management plan current and known to the shift lead?",
                            false,
                        ),
                    ],
                ),
            ],
        ),
        template(
            "staff_supervision",
            vec![
                section(
                    "records",
                    "Supervision Records",
                    vec![
                        question(
                            "supervision_in_quarter",
                            "Has a recorded one-to-one supervision taken place this quarter?",
                            true,
                        ),
                        question(
                            "actions_followed_up",
                            "Were actions from the previous supervision followed up?",
                            true,
                        ),
                    ],
                ),
            ],
        ),
        template(
            "training_compliance",
            vec![
                section(
                    "mandatory",
                    "Mandatory Modules",
                    vec![
                        question(
                            "core_modules_in_date",
                            "Are all core mandatory modules in date for this staff member?",
                            true,
                        ),
                        question(
                            "role_specific_training",
                            "Is role-specific training (e.g. medication competency) in date?",
                            true,
                        ),
                    ],
                ),
            ],
        ),
        template(
            "premises_safety",
            vec![
                section(
                    "fire",
                    "Fire Safety",
                    vec![
                        question(
                            "fire_risk_assessment",
                            "Is the fire risk assessment within its review period?",
                            true,
                        ),
                        question(
                            "evacuation_plans",
                            "Does every service user have a current personal evacuation plan?",
                            true,
                        ),
                    ],
                ),
                section(
                    "utilities",
                    "Utilities and Equipment",
                    vec![
                        question(
                            "water_temperature_checks",
                            "Are hot water outlet checks recorded monthly and within limits?",
                            true,
                        ),
                        question(
                            "lifting_equipment_loler",
                            "Is lifting equipment within its statutory examination interval?",
                            true,
                        ),
                    ],
                ),
            ],
        ),
        template(
            "safeguarding_spot_check",
            vec![
                section(
                    "awareness",
                    "Staff Awareness",
                    vec![
                        question(
                            "reporting_route_known",
                            "Can sampled staff describe the safeguarding reporting route?",
                            true,
                        ),
                        question(
                            "concerns_logged",
                            "Are recent concerns logged with outcomes recorded?",
                            true,
                        ),
                    ],
                ),
            ],
        ),
    ]
}
