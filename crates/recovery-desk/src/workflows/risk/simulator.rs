//! What-if simulation over synthetic debtors.
//!
//! The simulator never grades on its own: it builds a [`Debtor`] that reproduces
//! the requested balance and dormancy and hands it to [`RiskEngine::analyze`].

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Debtor, DebtorId, EntryKind, LedgerEntry, LedgerUnit};
use super::evaluation::{AnalysisError, AnalysisResult, RiskEngine};

pub const SIMULATED_DEBTOR_ID: &str = "simulated";

/// Inputs collected by the interactive simulator. `None` dormancy means "no history".
///
/// Dormancy reaching before the calendar's first representable day is pinned to that day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationInput {
    pub balance: f64,
    #[serde(default)]
    pub commodity_balance: f64,
    #[serde(default)]
    pub days_since_payment: Option<u32>,
    #[serde(default)]
    pub days_since_contact: Option<u32>,
}

impl SimulationInput {
    pub fn synthetic_debtor(&self, now: DateTime<Utc>) -> Debtor {
        let transactions = self
            .days_since_payment
            .map(|days| {
                vec![LedgerEntry {
                    kind: EntryKind::Credit,
                    unit: LedgerUnit::Currency,
                    amount: 0.0,
                    occurred_on: now
                        .date_naive()
                        .checked_sub_signed(Duration::days(i64::from(days)))
                        .unwrap_or(NaiveDate::MIN),
                    running_balance_after: self.balance,
                }]
            })
            .unwrap_or_default();

        Debtor {
            id: DebtorId(SIMULATED_DEBTOR_ID.to_string()),
            name: "Simulated debtor".to_string(),
            current_balance: self.balance,
            current_commodity_balance: self.commodity_balance,
            transactions,
            last_chat_at: self
                .days_since_contact
                .map(|days| {
                    now.checked_sub_signed(Duration::days(i64::from(days)))
                        .unwrap_or(DateTime::<Utc>::MIN_UTC)
                }),
            last_call_at: None,
        }
    }
}

pub fn simulate(
    engine: &RiskEngine,
    input: &SimulationInput,
    now: DateTime<Utc>,
) -> Result<AnalysisResult, AnalysisError> {
    let debtor = input.synthetic_debtor(now);
    engine.analyze(&debtor, None, now)
}
