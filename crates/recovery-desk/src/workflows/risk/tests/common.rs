use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::risk::domain::{
    ContactEvent, CooldownUnit, Debtor, DebtorId, EntryKind, GradeRule, LedgerEntry, LedgerUnit,
};
use crate::workflows::risk::evaluation::{RiskEngine, RuleSet};
use crate::workflows::risk::repository::{
    DebtorRepository, DispatchError, ReminderDispatch, ReminderPublisher, RepositoryError,
    RuleSetRepository,
};
use crate::workflows::risk::{risk_router, RiskService};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn days_ago(days: i64) -> NaiveDate {
    now().date_naive() - Duration::days(days)
}

pub(super) fn standard_rules() -> RuleSet {
    RuleSet::standard()
}

pub(super) fn engine() -> RiskEngine {
    RiskEngine::new(Arc::new(standard_rules()))
}

pub(super) fn rule(
    id: &str,
    priority: i32,
    min_balance: f64,
    min_days_since_payment: u32,
    min_days_since_contact: u32,
) -> GradeRule {
    GradeRule {
        id: id.to_string(),
        priority,
        min_balance,
        min_days_since_payment,
        min_days_since_contact,
        cooldown_amount: 24,
        cooldown_unit: CooldownUnit::Hours,
        channels: Default::default(),
        templates: Default::default(),
    }
}

pub(super) fn charge(amount: f64, on: NaiveDate, running: f64) -> LedgerEntry {
    LedgerEntry {
        kind: EntryKind::Debit,
        unit: LedgerUnit::Currency,
        amount,
        occurred_on: on,
        running_balance_after: running,
    }
}

pub(super) fn payment(amount: f64, on: NaiveDate, running: f64) -> LedgerEntry {
    LedgerEntry {
        kind: EntryKind::Credit,
        unit: LedgerUnit::Currency,
        amount,
        occurred_on: on,
        running_balance_after: running,
    }
}

pub(super) fn commodity(kind: EntryKind, amount: f64, on: NaiveDate, running: f64) -> LedgerEntry {
    LedgerEntry {
        kind,
        unit: LedgerUnit::Commodity,
        amount,
        occurred_on: on,
        running_balance_after: running,
    }
}

/// Debtor with an opening charge, an optional payment `paid_days_ago` and an
/// optional chat `contacted_days_ago`.
pub(super) fn debtor(
    id: &str,
    balance: f64,
    paid_days_ago: Option<i64>,
    contacted_days_ago: Option<i64>,
) -> Debtor {
    let mut transactions = vec![charge(balance + 1_000.0, days_ago(400), balance + 1_000.0)];
    if let Some(days) = paid_days_ago {
        transactions.push(payment(1_000.0, days_ago(days), balance));
    }

    Debtor {
        id: DebtorId(id.to_string()),
        name: format!("Debtor {id}"),
        current_balance: balance,
        current_commodity_balance: 0.0,
        transactions,
        last_chat_at: contacted_days_ago.map(|days| now() - Duration::days(days)),
        last_call_at: None,
    }
}

pub(super) fn never_touched(id: &str, balance: f64) -> Debtor {
    Debtor {
        id: DebtorId(id.to_string()),
        name: String::new(),
        current_balance: balance,
        current_commodity_balance: 0.0,
        transactions: Vec::new(),
        last_chat_at: None,
        last_call_at: None,
    }
}

/// Scenario A debtor: 60000 outstanding, paid 120 days ago, contacted 60 days ago.
pub(super) fn scenario_a_debtor() -> Debtor {
    debtor("scenario-a", 60_000.0, Some(120), Some(60))
}

#[derive(Default, Clone)]
pub(super) struct MemoryDebtors {
    pub(super) debtors: Arc<Mutex<Vec<Debtor>>>,
    pub(super) logs: Arc<Mutex<HashMap<DebtorId, Vec<ContactEvent>>>>,
}

impl MemoryDebtors {
    pub(super) fn with(debtors: Vec<Debtor>) -> Self {
        Self {
            debtors: Arc::new(Mutex::new(debtors)),
            logs: Arc::default(),
        }
    }

    pub(super) fn set_log(&self, id: &str, events: Vec<ContactEvent>) {
        self.logs
            .lock()
            .expect("log mutex poisoned")
            .insert(DebtorId(id.to_string()), events);
    }
}

impl DebtorRepository for MemoryDebtors {
    fn fetch(&self, id: &DebtorId) -> Result<Option<Debtor>, RepositoryError> {
        let guard = self.debtors.lock().expect("debtor mutex poisoned");
        Ok(guard.iter().find(|debtor| &debtor.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<Debtor>, RepositoryError> {
        Ok(self.debtors.lock().expect("debtor mutex poisoned").clone())
    }

    fn contact_log(&self, id: &DebtorId) -> Result<Option<Vec<ContactEvent>>, RepositoryError> {
        Ok(self.logs.lock().expect("log mutex poisoned").get(id).cloned())
    }

    fn record_contact(&self, id: &DebtorId, event: ContactEvent) -> Result<(), RepositoryError> {
        self.logs
            .lock()
            .expect("log mutex poisoned")
            .entry(id.clone())
            .or_default()
            .push(event);
        Ok(())
    }
}

#[derive(Clone)]
pub(super) struct MemoryRules {
    pub(super) current: Arc<Mutex<Arc<RuleSet>>>,
}

impl Default for MemoryRules {
    fn default() -> Self {
        Self::with(standard_rules())
    }
}

impl MemoryRules {
    pub(super) fn with(rule_set: RuleSet) -> Self {
        Self {
            current: Arc::new(Mutex::new(Arc::new(rule_set))),
        }
    }
}

impl RuleSetRepository for MemoryRules {
    fn snapshot(&self) -> Result<Arc<RuleSet>, RepositoryError> {
        Ok(self.current.lock().expect("rules mutex poisoned").clone())
    }

    fn replace(&self, rules: Vec<GradeRule>) -> Result<Arc<RuleSet>, RepositoryError> {
        let mut guard = self.current.lock().expect("rules mutex poisoned");
        let next = Arc::new(RuleSet::new(guard.version() + 1, rules));
        *guard = next.clone();
        Ok(next)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryReminders {
    events: Arc<Mutex<Vec<ReminderDispatch>>>,
}

impl MemoryReminders {
    pub(super) fn events(&self) -> Vec<ReminderDispatch> {
        self.events.lock().expect("reminder mutex poisoned").clone()
    }
}

impl ReminderPublisher for MemoryReminders {
    fn publish(&self, dispatch: ReminderDispatch) -> Result<(), DispatchError> {
        self.events
            .lock()
            .expect("reminder mutex poisoned")
            .push(dispatch);
        Ok(())
    }
}

pub(super) struct OfflineReminders;

impl ReminderPublisher for OfflineReminders {
    fn publish(&self, _dispatch: ReminderDispatch) -> Result<(), DispatchError> {
        Err(DispatchError::Transport("gateway offline".to_string()))
    }
}

pub(super) struct UnavailableDebtors;

impl DebtorRepository for UnavailableDebtors {
    fn fetch(&self, _id: &DebtorId) -> Result<Option<Debtor>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self) -> Result<Vec<Debtor>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn contact_log(&self, _id: &DebtorId) -> Result<Option<Vec<ContactEvent>>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn record_contact(&self, _id: &DebtorId, _event: ContactEvent) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) type MemoryService = RiskService<MemoryDebtors, MemoryRules, MemoryReminders>;

/// Portfolio used across service and routing tests.
pub(super) fn portfolio() -> Vec<Debtor> {
    vec![
        scenario_a_debtor(),
        debtor("cust-c", 25_000.0, Some(50), Some(10)),
        debtor("cust-b", 8_000.0, Some(20), Some(40)),
        debtor("cust-a", 1_500.0, Some(2), Some(1)),
        never_touched("cust-new", 70_000.0),
    ]
}

pub(super) fn build_service() -> (MemoryService, MemoryDebtors, MemoryRules, MemoryReminders) {
    let debtors = MemoryDebtors::with(portfolio());
    let rules = MemoryRules::default();
    let reminders = MemoryReminders::default();
    let service = RiskService::new(
        Arc::new(debtors.clone()),
        Arc::new(rules.clone()),
        Arc::new(reminders.clone()),
    );
    (service, debtors, rules, reminders)
}

pub(super) fn router_with_service(service: MemoryService) -> axum::Router {
    risk_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
