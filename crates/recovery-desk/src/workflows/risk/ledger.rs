use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{Debtor, LedgerEntry, LedgerUnit};

/// Tolerance used when comparing stored running balances with replayed ones.
const BALANCE_TOLERANCE: f64 = 0.005;

/// Most recent payment received by the debtor, across both units.
///
/// `None` means the debtor has never paid and must be treated as maximally stale.
pub fn last_payment_date(debtor: &Debtor) -> Option<NaiveDate> {
    debtor
        .transactions
        .iter()
        .filter(|entry| entry.is_payment())
        .map(|entry| entry.occurred_on)
        .max()
}

/// Point-in-time position for a single ledger unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitPosition {
    /// Stored running balance after the latest entry, zero without entries.
    pub balance: f64,
    pub entries: usize,
    pub last_payment: Option<LedgerEntry>,
}

impl UnitPosition {
    fn from_entries<'a>(entries: impl Iterator<Item = &'a LedgerEntry>) -> Self {
        let mut position = UnitPosition::default();
        let mut latest_on: Option<NaiveDate> = None;

        for entry in entries {
            position.entries += 1;

            // `>=` keeps the later input row when two entries share a date.
            if latest_on.map_or(true, |date| entry.occurred_on >= date) {
                latest_on = Some(entry.occurred_on);
                position.balance = entry.running_balance_after;
            }

            if entry.is_payment()
                && position
                    .last_payment
                    .as_ref()
                    .map_or(true, |current| entry.occurred_on >= current.occurred_on)
            {
                position.last_payment = Some(entry.clone());
            }
        }

        position
    }
}

/// Dual-unit reduction of a debtor's transaction history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub currency: UnitPosition,
    pub commodity: UnitPosition,
}

impl LedgerSummary {
    pub fn from_entries(entries: &[LedgerEntry]) -> Self {
        Self {
            currency: UnitPosition::from_entries(
                entries
                    .iter()
                    .filter(|entry| entry.unit == LedgerUnit::Currency),
            ),
            commodity: UnitPosition::from_entries(
                entries
                    .iter()
                    .filter(|entry| entry.unit == LedgerUnit::Commodity),
            ),
        }
    }

    pub fn position(&self, unit: LedgerUnit) -> &UnitPosition {
        match unit {
            LedgerUnit::Currency => &self.currency,
            LedgerUnit::Commodity => &self.commodity,
        }
    }

    pub fn last_payment_date(&self) -> Option<NaiveDate> {
        [&self.currency, &self.commodity]
            .into_iter()
            .filter_map(|position| position.last_payment.as_ref())
            .map(|entry| entry.occurred_on)
            .max()
    }
}

/// Stored running balance that disagrees with sequential application of amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceDrift {
    pub unit: LedgerUnit,
    pub occurred_on: NaiveDate,
    pub expected: f64,
    pub recorded: f64,
}

/// Replays entries per unit in date order and reports running balances that drift.
///
/// The opening balance is inferred from the first entry, so a single-entry unit
/// never drifts. Diagnostic only; grading always trusts the stored balances.
pub fn reconcile(entries: &[LedgerEntry]) -> Vec<BalanceDrift> {
    let mut drifts = Vec::new();

    for unit in [LedgerUnit::Currency, LedgerUnit::Commodity] {
        let mut ordered: Vec<&LedgerEntry> =
            entries.iter().filter(|entry| entry.unit == unit).collect();
        ordered.sort_by_key(|entry| entry.occurred_on);

        let mut iter = ordered.into_iter();
        let Some(first) = iter.next() else {
            continue;
        };

        let mut running = first.running_balance_after;
        for entry in iter {
            let expected = running + entry.signed_amount();
            if (expected - entry.running_balance_after).abs() > BALANCE_TOLERANCE {
                drifts.push(BalanceDrift {
                    unit,
                    occurred_on: entry.occurred_on,
                    expected,
                    recorded: entry.running_balance_after,
                });
            }
            running = entry.running_balance_after;
        }
    }

    drifts
}
