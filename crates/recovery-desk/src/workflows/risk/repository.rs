use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::{ContactEvent, Debtor, DebtorId, GradeRule, OutboundChannel};
use super::evaluation::RuleSet;

/// Debtor records and their communications log.
pub trait DebtorRepository: Send + Sync {
    fn fetch(&self, id: &DebtorId) -> Result<Option<Debtor>, RepositoryError>;
    fn list(&self) -> Result<Vec<Debtor>, RepositoryError>;
    /// `Ok(None)` when no event log exists for the debtor; scalar markers apply then.
    fn contact_log(&self, id: &DebtorId) -> Result<Option<Vec<ContactEvent>>, RepositoryError>;
    /// Appends to the debtor's communications log.
    fn record_contact(&self, id: &DebtorId, event: ContactEvent) -> Result<(), RepositoryError>;
}

/// Versioned store for the editable grading waterfall.
pub trait RuleSetRepository: Send + Sync {
    /// Current snapshot. Callers evaluate a whole batch against one snapshot.
    fn snapshot(&self) -> Result<Arc<RuleSet>, RepositoryError>;
    /// Stores `rules` as the next version and returns the new snapshot.
    fn replace(&self, rules: Vec<GradeRule>) -> Result<Arc<RuleSet>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound messaging hook (chat, SMS or push adapters).
pub trait ReminderPublisher: Send + Sync {
    fn publish(&self, dispatch: ReminderDispatch) -> Result<(), DispatchError>;
}

/// Reminder handed to the messaging dispatcher once the gate is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderDispatch {
    pub debtor_id: DebtorId,
    pub grade: String,
    pub channel: OutboundChannel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// Reminder dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("reminder transport unavailable: {0}")]
    Transport(String),
}
