use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{ContactEvent, Debtor, DebtorId, GradeRule, OutboundChannel};
use super::evaluation::{AnalysisError, AnalysisResult, RiskEngine, RuleSet, RuleSetWarning};
use super::portfolio::{DebtorFilter, PortfolioSummary};
use super::repository::{
    DebtorRepository, DispatchError, ReminderDispatch, ReminderPublisher, RepositoryError,
    RuleSetRepository,
};
use super::simulator::{simulate, SimulationInput};

pub const DEFAULT_ATTENTION_LIMIT: usize = 5;

/// Service composing the debtor store, the rule-set store and the reminder dispatcher.
pub struct RiskService<D, S, P> {
    debtors: Arc<D>,
    rules: Arc<S>,
    reminders: Arc<P>,
    attention_limit: usize,
}

impl<D, S, P> RiskService<D, S, P>
where
    D: DebtorRepository + 'static,
    S: RuleSetRepository + 'static,
    P: ReminderPublisher + 'static,
{
    pub fn new(debtors: Arc<D>, rules: Arc<S>, reminders: Arc<P>) -> Self {
        Self {
            debtors,
            rules,
            reminders,
            attention_limit: DEFAULT_ATTENTION_LIMIT,
        }
    }

    pub fn with_attention_limit(mut self, attention_limit: usize) -> Self {
        self.attention_limit = attention_limit;
        self
    }

    pub fn attention_limit(&self) -> usize {
        self.attention_limit
    }

    /// Current rule-set snapshot.
    pub fn rules(&self) -> Result<Arc<RuleSet>, RiskServiceError> {
        Ok(self.rules.snapshot()?)
    }

    /// Replace the waterfall. Empty sets are rejected; other findings are returned as warnings.
    pub fn replace_rules(&self, rules: Vec<GradeRule>) -> Result<RuleSetUpdate, RiskServiceError> {
        if rules.is_empty() {
            return Err(AnalysisError::InvalidConfiguration {
                reason: "rule set must contain at least one grade rule".to_string(),
            }
            .into());
        }

        let rule_set = self.rules.replace(rules)?;
        let warnings = rule_set.validate();
        for warning in &warnings {
            warn!(version = rule_set.version(), "{}", warning.summary());
        }
        info!(
            version = rule_set.version(),
            rules = rule_set.rules().len(),
            "grade rule set replaced"
        );

        Ok(RuleSetUpdate { rule_set, warnings })
    }

    /// Detail view for one debtor.
    pub fn analyze(
        &self,
        debtor_id: &DebtorId,
        now: DateTime<Utc>,
    ) -> Result<AnalysisResult, RiskServiceError> {
        let debtor = self
            .debtors
            .fetch(debtor_id)?
            .ok_or(RepositoryError::NotFound)?;
        let engine = self.engine()?;
        self.evaluate(&engine, &debtor, now)
    }

    /// List view: every debtor evaluated against a single rule-set snapshot.
    pub fn analyze_all(
        &self,
        filter: &DebtorFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<AnalysisResult>, RiskServiceError> {
        let engine = self.engine()?;
        let analyses = self.evaluate_batch(&engine, now)?;
        Ok(analyses
            .into_iter()
            .filter(|analysis| filter.matches(analysis))
            .collect())
    }

    /// Dashboard rollup computed from one evaluation pass.
    pub fn dashboard(
        &self,
        attention_limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<PortfolioSummary, RiskServiceError> {
        let engine = self.engine()?;
        let analyses = self.evaluate_batch(&engine, now)?;
        Ok(PortfolioSummary::from_analyses(
            engine.rules(),
            &analyses,
            attention_limit.unwrap_or(self.attention_limit),
            now,
        ))
    }

    pub fn simulate(
        &self,
        input: &SimulationInput,
        now: DateTime<Utc>,
    ) -> Result<AnalysisResult, RiskServiceError> {
        let engine = self.engine()?;
        Ok(simulate(&engine, input, now)?)
    }

    /// Consult the anti-spam gate and the matched rule before handing a reminder
    /// to the dispatcher. A sent reminder is logged as a contact at `now`, so the
    /// matched rule's cooldown applies to the next request.
    pub fn send_reminder(
        &self,
        debtor_id: &DebtorId,
        channel: OutboundChannel,
        now: DateTime<Utc>,
    ) -> Result<ReminderDecision, RiskServiceError> {
        let analysis = self.analyze(debtor_id, now)?;
        let rule = &analysis.matched_rule;

        if let Some(blocked_until) = analysis.blocked_until {
            debug!(
                debtor = %debtor_id.0,
                grade = %rule.id,
                %blocked_until,
                "reminder suppressed"
            );
            return Ok(ReminderDecision::Suppressed {
                grade: analysis.assigned_grade,
                blocked_until,
            });
        }

        if !rule.channels.allows(channel) {
            return Ok(ReminderDecision::ChannelDisabled {
                grade: analysis.assigned_grade,
                channel,
            });
        }

        let dispatch = ReminderDispatch {
            debtor_id: debtor_id.clone(),
            grade: analysis.assigned_grade.clone(),
            channel,
            template: rule.templates.for_channel(channel).map(str::to_string),
        };
        self.reminders.publish(dispatch.clone())?;
        let contact = ContactEvent {
            channel: channel.into(),
            occurred_at: now,
        };
        if let Err(err) = self.debtors.record_contact(debtor_id, contact) {
            warn!(
                debtor = %debtor_id.0,
                error = %err,
                "reminder sent but not recorded in the contact log"
            );
        }
        info!(
            debtor = %debtor_id.0,
            grade = %dispatch.grade,
            channel = channel.label(),
            "reminder dispatched"
        );

        Ok(ReminderDecision::Sent(dispatch))
    }

    fn engine(&self) -> Result<RiskEngine, RiskServiceError> {
        let snapshot = self.rules.snapshot()?;
        if snapshot.is_empty() {
            return Err(AnalysisError::InvalidConfiguration {
                reason: "rule set contains no grade rules".to_string(),
            }
            .into());
        }
        Ok(RiskEngine::new(snapshot))
    }

    fn evaluate(
        &self,
        engine: &RiskEngine,
        debtor: &Debtor,
        now: DateTime<Utc>,
    ) -> Result<AnalysisResult, RiskServiceError> {
        let contact_log = self.debtors.contact_log(&debtor.id)?;
        Ok(engine.analyze(debtor, contact_log.as_deref(), now)?)
    }

    fn evaluate_batch(
        &self,
        engine: &RiskEngine,
        now: DateTime<Utc>,
    ) -> Result<Vec<AnalysisResult>, RiskServiceError> {
        let debtors = self.debtors.list()?;
        let analyses = debtors
            .iter()
            .map(|debtor| self.evaluate(engine, debtor, now))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            debtors = analyses.len(),
            version = engine.rules().version(),
            "evaluated debtor batch"
        );
        Ok(analyses)
    }
}

/// Result of replacing the rule set.
#[derive(Debug, Clone)]
pub struct RuleSetUpdate {
    pub rule_set: Arc<RuleSet>,
    pub warnings: Vec<RuleSetWarning>,
}

/// Outcome of a reminder request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReminderDecision {
    Sent(ReminderDispatch),
    Suppressed {
        grade: String,
        blocked_until: DateTime<Utc>,
    },
    ChannelDisabled {
        grade: String,
        channel: OutboundChannel,
    },
}

impl ReminderDecision {
    pub fn summary(&self) -> String {
        match self {
            ReminderDecision::Sent(dispatch) => match &dispatch.template {
                Some(template) => format!(
                    "sent {} reminder using template {}",
                    dispatch.channel.label(),
                    template
                ),
                None => format!("sent {} reminder", dispatch.channel.label()),
            },
            ReminderDecision::Suppressed {
                grade,
                blocked_until,
            } => format!("suppressed by grade {grade} cooldown until {blocked_until}"),
            ReminderDecision::ChannelDisabled { grade, channel } => {
                format!("{} disabled for grade {grade}", channel.label())
            }
        }
    }
}

/// Error raised by the risk service.
#[derive(Debug, thiserror::Error)]
pub enum RiskServiceError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
