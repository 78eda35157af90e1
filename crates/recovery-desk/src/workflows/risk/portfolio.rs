use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::DebtorId;
use super::evaluation::{AnalysisResult, RuleSet};

/// Dashboard filters applied to analysed rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebtorFilter {
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub blocked: Option<bool>,
    #[serde(default)]
    pub min_balance: Option<f64>,
}

impl DebtorFilter {
    pub fn matches(&self, analysis: &AnalysisResult) -> bool {
        if let Some(grade) = &self.grade {
            if !analysis.assigned_grade.eq_ignore_ascii_case(grade) {
                return false;
            }
        }
        if let Some(blocked) = self.blocked {
            if analysis.is_contact_blocked != blocked {
                return false;
            }
        }
        if let Some(min_balance) = self.min_balance {
            if analysis.balance < min_balance {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeBucket {
    pub grade: String,
    pub debtors: usize,
    pub blocked: usize,
    pub outstanding_balance: f64,
    pub outstanding_commodity: f64,
}

impl GradeBucket {
    fn empty(grade: &str) -> Self {
        Self {
            grade: grade.to_string(),
            debtors: 0,
            blocked: 0,
            outstanding_balance: 0.0,
            outstanding_commodity: 0.0,
        }
    }
}

/// Debtor surfaced on the dashboard because of a low health score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionEntry {
    pub debtor_id: DebtorId,
    pub grade: String,
    pub health_score: f64,
    pub balance: f64,
    pub days_since_last_payment: i64,
    pub is_contact_blocked: bool,
}

/// Portfolio rollup computed from a single evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub rule_set_version: u64,
    pub evaluated_at: DateTime<Utc>,
    pub debtor_count: usize,
    pub total_outstanding: f64,
    pub total_commodity_outstanding: f64,
    pub blocked_count: usize,
    pub contactable_count: usize,
    pub average_health_score: f64,
    pub grades: Vec<GradeBucket>,
    pub attention: Vec<AttentionEntry>,
}

impl PortfolioSummary {
    /// Aggregates analyses that were all produced against `rules`.
    ///
    /// Buckets follow the waterfall order and include grades with no debtors.
    pub fn from_analyses(
        rules: &RuleSet,
        analyses: &[AnalysisResult],
        attention_limit: usize,
        evaluated_at: DateTime<Utc>,
    ) -> Self {
        let mut grades: Vec<GradeBucket> = Vec::new();
        for rule in rules.rules() {
            if !grades.iter().any(|bucket| bucket.grade == rule.id) {
                grades.push(GradeBucket::empty(&rule.id));
            }
        }

        let mut total_outstanding = 0.0;
        let mut total_commodity_outstanding = 0.0;
        let mut blocked_count = 0;
        let mut health_total = 0.0;

        for analysis in analyses {
            total_outstanding += analysis.balance;
            total_commodity_outstanding += analysis.commodity_balance;
            health_total += analysis.health_score;
            if analysis.is_contact_blocked {
                blocked_count += 1;
            }

            let index = match grades
                .iter()
                .position(|bucket| bucket.grade == analysis.assigned_grade)
            {
                Some(index) => index,
                None => {
                    grades.push(GradeBucket::empty(&analysis.assigned_grade));
                    grades.len() - 1
                }
            };
            let bucket = &mut grades[index];
            bucket.debtors += 1;
            bucket.outstanding_balance += analysis.balance;
            bucket.outstanding_commodity += analysis.commodity_balance;
            if analysis.is_contact_blocked {
                bucket.blocked += 1;
            }
        }

        let debtor_count = analyses.len();
        let average_health_score = if debtor_count == 0 {
            0.0
        } else {
            health_total / debtor_count as f64
        };

        Self {
            rule_set_version: rules.version(),
            evaluated_at,
            debtor_count,
            total_outstanding,
            total_commodity_outstanding,
            blocked_count,
            contactable_count: debtor_count - blocked_count,
            average_health_score,
            grades,
            attention: attention_list(analyses, attention_limit),
        }
    }
}

/// Lowest health first; ties go to the larger balance, then to the debtor id.
fn attention_list(analyses: &[AnalysisResult], limit: usize) -> Vec<AttentionEntry> {
    let mut ranked: Vec<&AnalysisResult> = analyses.iter().collect();
    ranked.sort_by(|left, right| {
        left.health_score
            .partial_cmp(&right.health_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                right
                    .balance
                    .partial_cmp(&left.balance)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| left.debtor_id.cmp(&right.debtor_id))
    });

    ranked
        .into_iter()
        .take(limit)
        .map(|analysis| AttentionEntry {
            debtor_id: analysis.debtor_id.clone(),
            grade: analysis.assigned_grade.clone(),
            health_score: analysis.health_score,
            balance: analysis.balance,
            days_since_last_payment: analysis.days_since_last_payment,
            is_contact_blocked: analysis.is_contact_blocked,
        })
        .collect()
}
