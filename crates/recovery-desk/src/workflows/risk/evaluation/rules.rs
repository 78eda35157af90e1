use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::super::domain::{ChannelToggles, CooldownUnit, GradeRule, TemplateRefs};
use super::{AnalysisError, DebtorMetrics};

/// Immutable, versioned snapshot of the grading waterfall.
///
/// Rules are stably sorted by ascending priority on construction, so rules that
/// share a priority keep their input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RuleSetDocument")]
pub struct RuleSet {
    version: u64,
    rules: Vec<GradeRule>,
}

#[derive(Deserialize)]
struct RuleSetDocument {
    #[serde(default)]
    version: u64,
    rules: Vec<GradeRule>,
}

impl From<RuleSetDocument> for RuleSet {
    fn from(document: RuleSetDocument) -> Self {
        RuleSet::new(document.version, document.rules)
    }
}

impl RuleSet {
    pub fn new(version: u64, mut rules: Vec<GradeRule>) -> Self {
        rules.sort_by_key(|rule| rule.priority);
        Self { version, rules }
    }

    /// Four-grade ladder used when no rule file is configured.
    pub fn standard() -> Self {
        RuleSet::new(
            1,
            vec![
                standard_rule("D", 1, 50_000.0, 90, 15, 48, CooldownUnit::Hours),
                standard_rule("C", 2, 20_000.0, 45, 7, 3, CooldownUnit::Days),
                standard_rule("B", 3, 5_000.0, 15, 30, 7, CooldownUnit::Days),
                standard_rule("A", 4, 0.0, 0, 0, 14, CooldownUnit::Days),
            ],
        )
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[GradeRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Position of the first rule carrying `grade`, in evaluation order.
    pub fn position(&self, grade: &str) -> Option<usize> {
        self.rules.iter().position(|rule| rule.id == grade)
    }

    /// Runs the waterfall: the first rule whose thresholds are all met wins,
    /// otherwise the last rule in evaluation order is returned as the fallback.
    pub fn select(&self, metrics: &DebtorMetrics) -> Result<&GradeRule, AnalysisError> {
        let fallback = self
            .rules
            .last()
            .ok_or_else(|| AnalysisError::InvalidConfiguration {
                reason: "rule set contains no grade rules".to_string(),
            })?;

        Ok(self
            .rules
            .iter()
            .find(|rule| matches_rule(rule, metrics))
            .unwrap_or(fallback))
    }

    /// Upstream configuration checks. The waterfall still resolves for every
    /// warning listed here; they flag rule sets that rely on best-effort fallback.
    pub fn validate(&self) -> Vec<RuleSetWarning> {
        let mut warnings = Vec::new();

        if let Some(last) = self.rules.last() {
            if !last.is_catch_all() {
                warnings.push(RuleSetWarning::MissingCatchAll {
                    fallback_grade: last.id.clone(),
                });
            }
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.id.as_str()) {
                warnings.push(RuleSetWarning::DuplicateGrade {
                    grade: rule.id.clone(),
                });
            }
            if rule.min_balance < 0.0 {
                warnings.push(RuleSetWarning::NegativeBalanceThreshold {
                    grade: rule.id.clone(),
                    min_balance: rule.min_balance,
                });
            }
            if rule.cooldown_amount == 0 {
                warnings.push(RuleSetWarning::ZeroCooldown {
                    grade: rule.id.clone(),
                });
            }
        }

        warnings
    }
}

pub(crate) fn matches_rule(rule: &GradeRule, metrics: &DebtorMetrics) -> bool {
    metrics.current_balance >= rule.min_balance
        && metrics.days_since_payment >= i64::from(rule.min_days_since_payment)
        && metrics.days_since_contact >= i64::from(rule.min_days_since_contact)
}

/// Findings from [`RuleSet::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleSetWarning {
    MissingCatchAll { fallback_grade: String },
    DuplicateGrade { grade: String },
    NegativeBalanceThreshold { grade: String, min_balance: f64 },
    ZeroCooldown { grade: String },
}

impl RuleSetWarning {
    pub fn summary(&self) -> String {
        match self {
            RuleSetWarning::MissingCatchAll { fallback_grade } => format!(
                "last rule {fallback_grade} has thresholds; unmatched debtors fall back to it anyway"
            ),
            RuleSetWarning::DuplicateGrade { grade } => {
                format!("grade {grade} appears more than once")
            }
            RuleSetWarning::NegativeBalanceThreshold { grade, min_balance } => {
                format!("grade {grade} has negative minimum balance {min_balance:.2}")
            }
            RuleSetWarning::ZeroCooldown { grade } => {
                format!("grade {grade} has no anti-spam cooldown")
            }
        }
    }
}

fn standard_rule(
    grade: &str,
    priority: i32,
    min_balance: f64,
    min_days_since_payment: u32,
    min_days_since_contact: u32,
    cooldown_amount: u32,
    cooldown_unit: CooldownUnit,
) -> GradeRule {
    let template = format!("reminder_grade_{}", grade.to_ascii_lowercase());
    GradeRule {
        id: grade.to_string(),
        priority,
        min_balance,
        min_days_since_payment,
        min_days_since_contact,
        cooldown_amount,
        cooldown_unit,
        channels: ChannelToggles {
            chat: true,
            sms: priority <= 2,
            push: true,
        },
        templates: TemplateRefs {
            chat: Some(template.clone()),
            sms: (priority <= 2).then(|| template.clone()),
            push: Some(template),
        },
    }
}
