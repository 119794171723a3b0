mod config;

pub use config::ScoringConfig;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{AuditResponse, AuditTemplate, RagStatus, Verdict};

/// Per-section view of the recorded verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionAssessment {
    pub section: String,
    pub name: String,
    /// Worst verdict among the section's assessable responses; `None` when
    /// nothing assessable has been recorded yet.
    pub verdict: Option<Verdict>,
    pub answered: usize,
    pub question_count: usize,
}

/// Instance-level compliance verdict derived purely from recorded responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceAssessment {
    pub sections: Vec<SectionAssessment>,
    /// Percentage of assessable responses judged compliant, rounded to the
    /// nearest integer. `None` when every response is `not_applicable` or
    /// nothing has been recorded.
    pub score: Option<u8>,
    pub rag: Option<RagStatus>,
    pub missing_required: Vec<String>,
}

/// Stateless roll-up of recorder-supplied verdicts. Judgment stays with the
/// recorder; this component only folds.
#[derive(Debug, Clone)]
pub struct ResponseAggregator {
    config: ScoringConfig,
}

impl ResponseAggregator {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn classify(&self, score: u8) -> RagStatus {
        if score >= self.config.green_floor() {
            RagStatus::Green
        } else if score >= self.config.amber_floor() {
            RagStatus::Amber
        } else {
            RagStatus::Red
        }
    }

    /// Recomputes the full assessment from raw responses. Deterministic:
    /// the same template and responses always produce the same result.
    pub fn assess(
        &self,
        template: &AuditTemplate,
        responses: &BTreeMap<String, AuditResponse>,
    ) -> InstanceAssessment {
        let mut sections = Vec::with_capacity(template.sections.len());
        let mut assessable = 0usize;
        let mut compliant = 0usize;
        let mut missing_required = Vec::new();

        for section in &template.sections {
            let mut worst: Option<Verdict> = None;
            let mut answered = 0usize;

            for question in &section.questions {
                match responses.get(&question.key) {
                    Some(response) => {
                        answered += 1;
                        if response.verdict.is_assessable() {
                            assessable += 1;
                            if response.verdict == Verdict::Compliant {
                                compliant += 1;
                            }
                            worst = Some(match worst {
                                Some(current)
                                    if current.severity() >= response.verdict.severity() =>
                                {
                                    current
                                }
                                _ => response.verdict,
                            });
                        }
                    }
                    None => {
                        if question.required {
                            missing_required.push(question.key.clone());
                        }
                    }
                }
            }

            sections.push(SectionAssessment {
                section: section.key.clone(),
                name: section.name.clone(),
                verdict: worst,
                answered,
                question_count: section.questions.len(),
            });
        }

        let score = if assessable == 0 {
            None
        } else {
            let pct = (compliant as f64 / assessable as f64) * 100.0;
            Some(pct.round() as u8)
        };
        let rag = score.map(|value| self.classify(value));

        InstanceAssessment {
            sections,
            score,
            rag,
            missing_required,
        }
    }
}

impl Default for ResponseAggregator {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}
