use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use recovery_desk::error::AppError;
use recovery_desk::workflows::ledger_import::LedgerImporter;
use recovery_desk::workflows::risk::{
    ContactEvent, Debtor, DebtorId, DebtorRepository, DispatchError, GradeRule, ReminderDispatch,
    ReminderPublisher, RepositoryError, RiskService, RuleSet, RuleSetRepository,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn poisoned(store: &str) -> RepositoryError {
    RepositoryError::Unavailable(format!("{store} lock poisoned"))
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryDebtorRepository {
    debtors: Arc<RwLock<Vec<Debtor>>>,
    contacts: Arc<RwLock<HashMap<DebtorId, Vec<ContactEvent>>>>,
}

impl InMemoryDebtorRepository {
    pub(crate) fn with_debtors(debtors: Vec<Debtor>) -> Self {
        Self {
            debtors: Arc::new(RwLock::new(debtors)),
            contacts: Arc::default(),
        }
    }
}

impl DebtorRepository for InMemoryDebtorRepository {
    fn fetch(&self, id: &DebtorId) -> Result<Option<Debtor>, RepositoryError> {
        let guard = self.debtors.read().map_err(|_| poisoned("debtor"))?;
        Ok(guard.iter().find(|debtor| &debtor.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<Debtor>, RepositoryError> {
        let guard = self.debtors.read().map_err(|_| poisoned("debtor"))?;
        Ok(guard.clone())
    }

    fn contact_log(&self, id: &DebtorId) -> Result<Option<Vec<ContactEvent>>, RepositoryError> {
        let guard = self.contacts.read().map_err(|_| poisoned("contact log"))?;
        Ok(guard.get(id).cloned())
    }

    /// Appends to the debtor's communications log; once present it replaces the scalar markers.
    fn record_contact(&self, id: &DebtorId, event: ContactEvent) -> Result<(), RepositoryError> {
        let mut guard = self.contacts.write().map_err(|_| poisoned("contact log"))?;
        guard.entry(id.clone()).or_default().push(event);
        Ok(())
    }
}

pub(crate) struct InMemoryRuleSetStore {
    current: RwLock<Arc<RuleSet>>,
}

impl InMemoryRuleSetStore {
    pub(crate) fn new(rule_set: RuleSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(rule_set)),
        }
    }
}

impl RuleSetRepository for InMemoryRuleSetStore {
    fn snapshot(&self) -> Result<Arc<RuleSet>, RepositoryError> {
        let guard = self.current.read().map_err(|_| poisoned("rule set"))?;
        Ok(guard.clone())
    }

    fn replace(&self, rules: Vec<GradeRule>) -> Result<Arc<RuleSet>, RepositoryError> {
        let mut guard = self.current.write().map_err(|_| poisoned("rule set"))?;
        let next = Arc::new(RuleSet::new(guard.version() + 1, rules));
        *guard = Arc::clone(&next);
        Ok(next)
    }
}

/// Stands in for the chat/SMS/push gateways: logs each dispatch and keeps it for inspection.
#[derive(Default, Clone)]
pub(crate) struct LoggingReminderPublisher {
    outbox: Arc<Mutex<Vec<ReminderDispatch>>>,
}

impl ReminderPublisher for LoggingReminderPublisher {
    fn publish(&self, dispatch: ReminderDispatch) -> Result<(), DispatchError> {
        info!(
            debtor = %dispatch.debtor_id.0,
            grade = %dispatch.grade,
            channel = dispatch.channel.label(),
            template = dispatch.template.as_deref().unwrap_or("-"),
            "reminder queued"
        );
        let mut guard = self
            .outbox
            .lock()
            .map_err(|_| DispatchError::Transport("outbox lock poisoned".to_string()))?;
        guard.push(dispatch);
        Ok(())
    }
}

impl LoggingReminderPublisher {
    pub(crate) fn dispatched(&self) -> Vec<ReminderDispatch> {
        match self.outbox.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => Vec::new(),
        }
    }
}

pub(crate) type DeskService =
    RiskService<InMemoryDebtorRepository, InMemoryRuleSetStore, LoggingReminderPublisher>;

/// Wires the in-memory stores into a service; the returned handles share state with it.
pub(crate) fn build_service(
    repository: InMemoryDebtorRepository,
    rule_set: RuleSet,
    attention_limit: usize,
) -> (
    Arc<DeskService>,
    InMemoryDebtorRepository,
    LoggingReminderPublisher,
) {
    let outbox = LoggingReminderPublisher::default();
    let service = RiskService::new(
        Arc::new(repository.clone()),
        Arc::new(InMemoryRuleSetStore::new(rule_set)),
        Arc::new(outbox.clone()),
    )
    .with_attention_limit(attention_limit);
    (Arc::new(service), repository, outbox)
}

/// Reads a JSON rule document, or falls back to the built-in four-grade ladder.
pub(crate) fn load_rule_set(path: Option<&Path>) -> Result<RuleSet, AppError> {
    let Some(path) = path else {
        return Ok(RuleSet::standard());
    };

    let raw = std::fs::read_to_string(path)?;
    let rule_set: RuleSet = serde_json::from_str(&raw)?;
    for warning in rule_set.validate() {
        warn!(path = %path.display(), "{}", warning.summary());
    }
    info!(
        path = %path.display(),
        version = rule_set.version(),
        rules = rule_set.rules().len(),
        "grade rule set loaded"
    );
    Ok(rule_set)
}

pub(crate) fn load_ledger(path: &Path) -> Result<Vec<Debtor>, AppError> {
    Ok(LedgerImporter::from_path(path)?)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Accepts an RFC 3339 instant or a plain date, read as midnight UTC.
pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&Utc));
    }

    let date = parse_date(trimmed)?;
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .ok_or_else(|| format!("'{raw}' has no midnight in UTC"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::demo_portfolio;
    use chrono::Duration;
    use recovery_desk::workflows::risk::{
        ContactChannel, CooldownUnit, OutboundChannel, ReminderDecision,
    };

    fn sample_rule(id: &str, priority: i32) -> GradeRule {
        GradeRule {
            id: id.to_string(),
            priority,
            min_balance: 0.0,
            min_days_since_payment: 0,
            min_days_since_contact: 0,
            cooldown_amount: 1,
            cooldown_unit: CooldownUnit::Days,
            channels: Default::default(),
            templates: Default::default(),
        }
    }

    #[test]
    fn parse_instant_accepts_dates_and_timestamps() {
        let expected = Utc
            .with_ymd_and_hms(2026, 6, 15, 0, 0, 0)
            .single()
            .expect("valid instant");

        assert_eq!(parse_instant("2026-06-15"), Ok(expected));
        assert_eq!(parse_instant("2026-06-15T02:00:00+02:00"), Ok(expected));
        assert!(parse_instant("15/06/2026").is_err());
    }

    #[test]
    fn rule_store_versions_each_replacement() {
        let store = InMemoryRuleSetStore::new(RuleSet::standard());

        let next = store
            .replace(vec![sample_rule("ONLY", 1)])
            .expect("replace succeeds");

        assert_eq!(next.version(), 2);
        assert_eq!(store.snapshot().expect("snapshot").rules()[0].id, "ONLY");
    }

    #[test]
    fn debtor_repository_keeps_contact_logs_per_debtor() {
        let repository = InMemoryDebtorRepository::default();
        let id = DebtorId("ACC-9".to_string());
        let event = ContactEvent {
            channel: ContactChannel::Chat,
            occurred_at: Utc::now(),
        };

        assert_eq!(repository.contact_log(&id).expect("log"), None);
        repository
            .record_contact(&id, event.clone())
            .expect("record contact");

        assert_eq!(repository.contact_log(&id).expect("log"), Some(vec![event]));
    }

    #[test]
    fn publisher_keeps_dispatched_reminders() {
        let publisher = LoggingReminderPublisher::default();

        publisher
            .publish(ReminderDispatch {
                debtor_id: DebtorId("ACC-1".to_string()),
                grade: "D".to_string(),
                channel: OutboundChannel::Sms,
                template: Some("reminder_grade_d".to_string()),
            })
            .expect("publish");

        assert_eq!(publisher.dispatched().len(), 1);
    }

    #[test]
    fn wired_service_records_its_own_reminders() {
        let now = Utc
            .with_ymd_and_hms(2026, 6, 15, 12, 0, 0)
            .single()
            .expect("valid instant");
        let id = DebtorId("ACC-1001".to_string());
        let (service, repository, outbox) = build_service(
            InMemoryDebtorRepository::with_debtors(demo_portfolio(now)),
            RuleSet::standard(),
            3,
        );

        let first = service
            .send_reminder(&id, OutboundChannel::Chat, now)
            .expect("first decision");
        let second = service
            .send_reminder(&id, OutboundChannel::Sms, now + Duration::minutes(1))
            .expect("second decision");

        assert!(matches!(first, ReminderDecision::Sent(_)));
        assert!(matches!(second, ReminderDecision::Suppressed { .. }));
        assert_eq!(outbox.dispatched().len(), 1);
        assert_eq!(
            repository.contact_log(&id).expect("log").map(|log| log.len()),
            Some(1)
        );
    }

    #[test]
    fn missing_rule_path_uses_standard_ladder() {
        let rule_set = load_rule_set(None).expect("standard rules");

        assert_eq!(rule_set, RuleSet::standard());
    }
}
