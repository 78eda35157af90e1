mod gate;
mod health;
mod rules;

pub use gate::{blocked_until, is_blocked};
pub use health::health_score;
pub use rules::{RuleSet, RuleSetWarning};

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::contact::last_contact_date;
use super::domain::{ContactEvent, Debtor, DebtorId, GradeRule};
use super::ledger::{last_payment_date, LedgerSummary};

/// Days substituted for missing payment or contact history.
///
/// Rule thresholds are tuned against this exact value: a debtor with no history
/// meets every day threshold up to 365 and none above it.
pub const NO_HISTORY_SENTINEL_DAYS: i64 = 365;

/// Raised when the rule set cannot produce a grade at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("invalid rule configuration: {reason}")]
    InvalidConfiguration { reason: String },
}

/// Point-in-time inputs to the waterfall, derived from one debtor snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtorMetrics {
    pub current_balance: f64,
    pub last_payment_on: Option<NaiveDate>,
    pub last_contact_at: Option<DateTime<Utc>>,
    pub days_since_payment: i64,
    pub days_since_contact: i64,
}

impl DebtorMetrics {
    pub fn measure(
        debtor: &Debtor,
        contact_log: Option<&[ContactEvent]>,
        now: DateTime<Utc>,
    ) -> Self {
        let last_payment_on = last_payment_date(debtor);
        let last_contact_at = last_contact_date(debtor, contact_log);

        let days_since_payment = last_payment_on
            .map(|date| (now.date_naive() - date).num_days().max(0))
            .unwrap_or(NO_HISTORY_SENTINEL_DAYS);
        let days_since_contact = last_contact_at
            .map(|at| now.signed_duration_since(at).num_days().max(0))
            .unwrap_or(NO_HISTORY_SENTINEL_DAYS);

        Self {
            current_balance: debtor.current_balance,
            last_payment_on,
            last_contact_at,
            days_since_payment,
            days_since_contact,
        }
    }
}

/// Runs the waterfall for a single debtor and returns the matched rule.
pub fn classify<'r>(
    debtor: &Debtor,
    rules: &'r RuleSet,
    contact_log: Option<&[ContactEvent]>,
    now: DateTime<Utc>,
) -> Result<&'r GradeRule, AnalysisError> {
    let metrics = DebtorMetrics::measure(debtor, contact_log, now);
    rules.select(&metrics)
}

/// Stateless evaluator bound to one frozen rule-set snapshot.
///
/// Every caller (list rows, detail view, dashboard rollups, simulator) goes
/// through [`RiskEngine::analyze`], so the grade and gate decision for a given
/// debtor, snapshot and instant are identical everywhere.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    rules: Arc<RuleSet>,
}

impl RiskEngine {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn analyze(
        &self,
        debtor: &Debtor,
        contact_log: Option<&[ContactEvent]>,
        now: DateTime<Utc>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let metrics = DebtorMetrics::measure(debtor, contact_log, now);
        let matched_rule = self.rules.select(&metrics)?;
        let blocked_until = blocked_until(matched_rule, metrics.last_contact_at, now);

        Ok(AnalysisResult {
            debtor_id: debtor.id.clone(),
            assigned_grade: matched_rule.id.clone(),
            matched_rule: matched_rule.clone(),
            balance: debtor.current_balance,
            commodity_balance: debtor.current_commodity_balance,
            days_since_last_payment: metrics.days_since_payment,
            days_since_last_contact: metrics.days_since_contact,
            last_payment_on: metrics.last_payment_on,
            last_contact_at: metrics.last_contact_at,
            is_contact_blocked: blocked_until.is_some(),
            blocked_until,
            health_score: health_score(debtor, metrics.days_since_payment),
            ledger: LedgerSummary::from_entries(&debtor.transactions),
            rule_set_version: self.rules.version(),
            evaluated_at: now,
        })
    }
}

/// Ephemeral engine output. Recomputed on every call, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub debtor_id: DebtorId,
    pub assigned_grade: String,
    pub matched_rule: GradeRule,
    pub balance: f64,
    pub commodity_balance: f64,
    pub days_since_last_payment: i64,
    pub days_since_last_contact: i64,
    pub last_payment_on: Option<NaiveDate>,
    pub last_contact_at: Option<DateTime<Utc>>,
    pub is_contact_blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_until: Option<DateTime<Utc>>,
    pub health_score: f64,
    pub ledger: LedgerSummary,
    pub rule_set_version: u64,
    pub evaluated_at: DateTime<Utc>,
}
