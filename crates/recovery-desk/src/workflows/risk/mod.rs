//! Risk classification and contact gating for debtor portfolios.
//!
//! The ledger aggregator and contact resolver reduce a debtor snapshot into
//! point-in-time metrics, the grade waterfall picks exactly one rule, and the
//! anti-spam gate decides whether a reminder may go out under that rule's
//! cooldown. Every surface (list, detail, dashboard, simulator) goes through the
//! same [`RiskEngine::analyze`] call.

pub mod contact;
pub mod domain;
pub mod evaluation;
pub mod ledger;
pub mod portfolio;
pub mod repository;
pub mod router;
pub mod service;
pub mod simulator;

#[cfg(test)]
mod tests;

pub use contact::last_contact_date;
pub use domain::{
    ChannelToggles, ContactChannel, ContactEvent, CooldownUnit, Debtor, DebtorId, EntryKind,
    GradeRule, LedgerEntry, LedgerUnit, OutboundChannel, TemplateRefs,
};
pub use evaluation::{
    blocked_until, classify, health_score, is_blocked, AnalysisError, AnalysisResult,
    DebtorMetrics, RiskEngine, RuleSet, RuleSetWarning, NO_HISTORY_SENTINEL_DAYS,
};
pub use ledger::{last_payment_date, reconcile, BalanceDrift, LedgerSummary, UnitPosition};
pub use portfolio::{AttentionEntry, DebtorFilter, GradeBucket, PortfolioSummary};
pub use repository::{
    DebtorRepository, DispatchError, ReminderDispatch, ReminderPublisher, RepositoryError,
    RuleSetRepository,
};
pub use router::risk_router;
pub use service::{
    ReminderDecision, RiskService, RiskServiceError, RuleSetUpdate, DEFAULT_ATTENTION_LIMIT,
};
pub use simulator::{simulate, SimulationInput};
