use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use std::io::Read;

use crate::workflows::risk::domain::{EntryKind, LedgerEntry, LedgerUnit};

#[derive(Debug)]
pub(crate) struct LedgerRecord {
    pub(crate) debtor_id: String,
    pub(crate) name: Option<String>,
    pub(crate) entry: LedgerEntry,
    pub(crate) last_chat_at: Option<DateTime<Utc>>,
    pub(crate) last_call_at: Option<DateTime<Utc>>,
}

/// Row-level problem detected after CSV decoding succeeded.
#[derive(Debug)]
pub(crate) struct RowError {
    pub(crate) line: u64,
    pub(crate) reason: String,
}

pub(crate) enum ParseFailure {
    Csv(csv::Error),
    Row(RowError),
}

impl From<csv::Error> for ParseFailure {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<LedgerRecord>, ParseFailure> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut records = Vec::new();

    for result in csv_reader.records() {
        let raw = result?;
        let line = raw.position().map_or(0, |position| position.line());
        let row: LedgerRow = raw.deserialize(Some(&headers))?;
        records.push(row.into_record(line).map_err(ParseFailure::Row)?);
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct LedgerRow {
    #[serde(rename = "Debtor ID")]
    debtor_id: String,
    #[serde(rename = "Name", default, deserialize_with = "empty_string_as_none")]
    name: Option<String>,
    #[serde(rename = "Kind")]
    kind: String,
    #[serde(rename = "Unit")]
    unit: String,
    #[serde(rename = "Amount")]
    amount: f64,
    #[serde(rename = "Occurred On")]
    occurred_on: String,
    #[serde(rename = "Running Balance")]
    running_balance: f64,
    #[serde(rename = "Last Chat At", default, deserialize_with = "empty_string_as_none")]
    last_chat_at: Option<String>,
    #[serde(rename = "Last Call At", default, deserialize_with = "empty_string_as_none")]
    last_call_at: Option<String>,
}

impl LedgerRow {
    fn into_record(self, line: u64) -> Result<LedgerRecord, RowError> {
        let invalid = |reason: String| RowError { line, reason };

        if self.debtor_id.is_empty() {
            return Err(invalid("missing debtor id".to_string()));
        }
        let kind = parse_kind(&self.kind)
            .ok_or_else(|| invalid(format!("unknown entry kind '{}'", self.kind)))?;
        let unit = parse_unit(&self.unit)
            .ok_or_else(|| invalid(format!("unknown ledger unit '{}'", self.unit)))?;
        if !(self.amount.is_finite() && self.amount >= 0.0) {
            return Err(invalid(format!(
                "amount must be a non-negative number, got {}",
                self.amount
            )));
        }
        let occurred_on = parse_date(&self.occurred_on)
            .ok_or_else(|| invalid(format!("unparseable date '{}'", self.occurred_on)))?;
        let last_chat_at = match self.last_chat_at.as_deref() {
            Some(raw) => Some(
                parse_instant(raw)
                    .ok_or_else(|| invalid(format!("unparseable chat timestamp '{raw}'")))?,
            ),
            None => None,
        };
        let last_call_at = match self.last_call_at.as_deref() {
            Some(raw) => Some(
                parse_instant(raw)
                    .ok_or_else(|| invalid(format!("unparseable call timestamp '{raw}'")))?,
            ),
            None => None,
        };

        Ok(LedgerRecord {
            debtor_id: self.debtor_id,
            name: self.name,
            entry: LedgerEntry {
                kind,
                unit,
                amount: self.amount,
                occurred_on,
                running_balance_after: self.running_balance,
            },
            last_chat_at,
            last_call_at,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_kind(value: &str) -> Option<EntryKind> {
    match value.trim().to_ascii_lowercase().as_str() {
        "debit" | "charge" | "increase" => Some(EntryKind::Debit),
        "credit" | "payment" | "decrease" => Some(EntryKind::Credit),
        _ => None,
    }
}

fn parse_unit(value: &str) -> Option<LedgerUnit> {
    match value.trim().to_ascii_lowercase().as_str() {
        "currency" | "cash" | "money" => Some(LedgerUnit::Currency),
        "commodity" | "gold" | "grams" => Some(LedgerUnit::Commodity),
        _ => None,
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }

    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.naive_utc().date())
}

/// RFC 3339 instant, or a plain date read as midnight UTC.
fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(instant.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
}

#[cfg(test)]
pub(crate) fn parse_date_for_tests(value: &str) -> Option<NaiveDate> {
    parse_date(value)
}
