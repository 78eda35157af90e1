use crate::cli::ServeArgs;
use crate::demo::demo_portfolio;
use crate::infra::{build_service, load_ledger, load_rule_set, AppState, InMemoryDebtorRepository};
use crate::routes::with_risk_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use recovery_desk::config::AppConfig;
use recovery_desk::error::AppError;
use recovery_desk::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let rule_set = load_rule_set(config.risk.rules_path.as_deref())?;
    let debtors = match (args.ledger.take(), args.seed_demo) {
        (Some(path), _) => load_ledger(&path)?,
        (None, true) => demo_portfolio(Utc::now()),
        (None, false) => Vec::new(),
    };
    info!(
        debtors = debtors.len(),
        rules = rule_set.rules().len(),
        "portfolio loaded"
    );

    let (service, _, _) = build_service(
        InMemoryDebtorRepository::with_debtors(debtors),
        rule_set,
        config.risk.attention_limit,
    );

    let app = with_risk_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "recovery desk ready");

    axum::serve(listener, app).await?;
    Ok(())
}
