use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::domain::{DebtorId, GradeRule, OutboundChannel};
use super::evaluation::AnalysisError;
use super::portfolio::DebtorFilter;
use super::repository::{DebtorRepository, ReminderPublisher, RepositoryError, RuleSetRepository};
use super::service::{ReminderDecision, RiskService, RiskServiceError};
use super::simulator::SimulationInput;

/// Router builder exposing the list, detail, dashboard, simulator and rule endpoints.
pub fn risk_router<D, S, P>(service: Arc<RiskService<D, S, P>>) -> Router
where
    D: DebtorRepository + 'static,
    S: RuleSetRepository + 'static,
    P: ReminderPublisher + 'static,
{
    Router::new()
        .route("/api/v1/debtors", get(list_handler::<D, S, P>))
        .route("/api/v1/debtors/:debtor_id", get(detail_handler::<D, S, P>))
        .route(
            "/api/v1/debtors/:debtor_id/reminders",
            post(reminder_handler::<D, S, P>),
        )
        .route("/api/v1/dashboard", get(dashboard_handler::<D, S, P>))
        .route("/api/v1/simulator", post(simulator_handler::<D, S, P>))
        .route(
            "/api/v1/rules",
            get(rules_handler::<D, S, P>).put(replace_rules_handler::<D, S, P>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub blocked: Option<bool>,
    #[serde(default)]
    pub min_balance: Option<f64>,
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AsOfQuery {
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attention: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ReminderRequest {
    pub channel: OutboundChannel,
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct SimulationRequest {
    #[serde(flatten)]
    pub input: SimulationInput,
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct RuleSetPayload {
    pub rules: Vec<GradeRule>,
}

pub(crate) async fn list_handler<D, S, P>(
    State(service): State<Arc<RiskService<D, S, P>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    D: DebtorRepository + 'static,
    S: RuleSetRepository + 'static,
    P: ReminderPublisher + 'static,
{
    let filter = DebtorFilter {
        grade: query.grade,
        blocked: query.blocked,
        min_balance: query.min_balance,
    };
    let now = query.as_of.unwrap_or_else(Utc::now);

    match service.analyze_all(&filter, now) {
        Ok(analyses) => (StatusCode::OK, axum::Json(analyses)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn detail_handler<D, S, P>(
    State(service): State<Arc<RiskService<D, S, P>>>,
    Path(debtor_id): Path<String>,
    Query(query): Query<AsOfQuery>,
) -> Response
where
    D: DebtorRepository + 'static,
    S: RuleSetRepository + 'static,
    P: ReminderPublisher + 'static,
{
    let id = DebtorId(debtor_id);
    let now = query.as_of.unwrap_or_else(Utc::now);

    match service.analyze(&id, now) {
        Ok(analysis) => (StatusCode::OK, axum::Json(analysis)).into_response(),
        Err(RiskServiceError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({
                "debtor_id": id.0,
                "error": "debtor not found",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reminder_handler<D, S, P>(
    State(service): State<Arc<RiskService<D, S, P>>>,
    Path(debtor_id): Path<String>,
    axum::Json(request): axum::Json<ReminderRequest>,
) -> Response
where
    D: DebtorRepository + 'static,
    S: RuleSetRepository + 'static,
    P: ReminderPublisher + 'static,
{
    let id = DebtorId(debtor_id);
    let now = request.as_of.unwrap_or_else(Utc::now);

    match service.send_reminder(&id, request.channel, now) {
        Ok(decision) => {
            let status = match &decision {
                ReminderDecision::Sent(_) => StatusCode::ACCEPTED,
                ReminderDecision::Suppressed { .. } => StatusCode::TOO_MANY_REQUESTS,
                ReminderDecision::ChannelDisabled { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            };
            (status, axum::Json(decision)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn dashboard_handler<D, S, P>(
    State(service): State<Arc<RiskService<D, S, P>>>,
    Query(query): Query<DashboardQuery>,
) -> Response
where
    D: DebtorRepository + 'static,
    S: RuleSetRepository + 'static,
    P: ReminderPublisher + 'static,
{
    let now = query.as_of.unwrap_or_else(Utc::now);

    match service.dashboard(query.attention, now) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn simulator_handler<D, S, P>(
    State(service): State<Arc<RiskService<D, S, P>>>,
    axum::Json(request): axum::Json<SimulationRequest>,
) -> Response
where
    D: DebtorRepository + 'static,
    S: RuleSetRepository + 'static,
    P: ReminderPublisher + 'static,
{
    let now = request.as_of.unwrap_or_else(Utc::now);

    match service.simulate(&request.input, now) {
        Ok(analysis) => (StatusCode::OK, axum::Json(analysis)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn rules_handler<D, S, P>(
    State(service): State<Arc<RiskService<D, S, P>>>,
) -> Response
where
    D: DebtorRepository + 'static,
    S: RuleSetRepository + 'static,
    P: ReminderPublisher + 'static,
{
    match service.rules() {
        Ok(rule_set) => {
            let payload = json!({
                "rule_set": &*rule_set,
                "warnings": rule_set.validate(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn replace_rules_handler<D, S, P>(
    State(service): State<Arc<RiskService<D, S, P>>>,
    axum::Json(payload): axum::Json<RuleSetPayload>,
) -> Response
where
    D: DebtorRepository + 'static,
    S: RuleSetRepository + 'static,
    P: ReminderPublisher + 'static,
{
    match service.replace_rules(payload.rules) {
        Ok(update) => {
            let payload = json!({
                "rule_set": &*update.rule_set,
                "warnings": update.warnings,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

fn error_response(error: RiskServiceError) -> Response {
    let status = match &error {
        RiskServiceError::Analysis(AnalysisError::InvalidConfiguration { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        RiskServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        RiskServiceError::Dispatch(_) => StatusCode::BAD_GATEWAY,
        RiskServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
