mod parser;

use crate::workflows::risk::domain::{Debtor, DebtorId};
use crate::workflows::risk::ledger::{reconcile, LedgerSummary};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use parser::ParseFailure;

#[derive(Debug)]
pub enum LedgerImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: u64, reason: String },
}

impl std::fmt::Display for LedgerImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerImportError::Io(err) => write!(f, "failed to read ledger export: {}", err),
            LedgerImportError::Csv(err) => write!(f, "invalid ledger CSV data: {}", err),
            LedgerImportError::InvalidRow { line, reason } => {
                write!(f, "invalid ledger row on line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for LedgerImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LedgerImportError::Io(err) => Some(err),
            LedgerImportError::Csv(err) => Some(err),
            LedgerImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for LedgerImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for LedgerImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<ParseFailure> for LedgerImportError {
    fn from(failure: ParseFailure) -> Self {
        match failure {
            ParseFailure::Csv(err) => Self::Csv(err),
            ParseFailure::Row(row) => Self::InvalidRow {
                line: row.line,
                reason: row.reason,
            },
        }
    }
}

/// Builds debtor snapshots from a ledger CSV export.
///
/// Expected headers: `Debtor ID`, `Kind`, `Unit`, `Amount`, `Occurred On`,
/// `Running Balance`, with optional `Name`, `Last Chat At` and `Last Call At`.
/// Current balances are taken from the latest stored running balance per unit.
/// Contact markers keep the latest value seen across a debtor's rows; without
/// them the debtor is treated as never contacted.
pub struct LedgerImporter;

impl LedgerImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Debtor>, LedgerImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Debtor>, LedgerImportError> {
        let mut debtors: BTreeMap<String, Debtor> = BTreeMap::new();
        let mut rows = 0usize;

        for record in parser::parse_records(reader)? {
            rows += 1;
            let debtor = debtors
                .entry(record.debtor_id.clone())
                .or_insert_with(|| Debtor {
                    id: DebtorId(record.debtor_id.clone()),
                    name: String::new(),
                    current_balance: 0.0,
                    current_commodity_balance: 0.0,
                    transactions: Vec::new(),
                    last_chat_at: None,
                    last_call_at: None,
                });
            if let Some(name) = record.name {
                debtor.name = name;
            }
            debtor.last_chat_at = debtor.last_chat_at.max(record.last_chat_at);
            debtor.last_call_at = debtor.last_call_at.max(record.last_call_at);
            debtor.transactions.push(record.entry);
        }

        let debtors: Vec<Debtor> = debtors.into_values().map(apply_summary).collect();
        info!(rows, debtors = debtors.len(), "ledger export imported");
        Ok(debtors)
    }
}

fn apply_summary(mut debtor: Debtor) -> Debtor {
    let summary = LedgerSummary::from_entries(&debtor.transactions);
    debtor.current_balance = summary.currency.balance;
    debtor.current_commodity_balance = summary.commodity.balance;

    for drift in reconcile(&debtor.transactions) {
        warn!(
            debtor = %debtor.id.0,
            unit = drift.unit.label(),
            occurred_on = %drift.occurred_on,
            expected = drift.expected,
            recorded = drift.recorded,
            "stored running balance disagrees with ledger amounts"
        );
    }

    debtor
}
