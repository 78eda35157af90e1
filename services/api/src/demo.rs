use crate::infra::{
    build_service, load_ledger, load_rule_set, parse_instant, InMemoryDebtorRepository,
};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use recovery_desk::config::AppConfig;
use recovery_desk::error::AppError;
use recovery_desk::workflows::risk::{
    AnalysisResult, ContactChannel, ContactEvent, Debtor, DebtorFilter, DebtorId,
    DebtorRepository, EntryKind, LedgerEntry, LedgerUnit, OutboundChannel, PortfolioSummary,
    RiskServiceError, SimulationInput,
};
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluation instant (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = parse_instant)]
    pub(crate) as_of: Option<DateTime<Utc>>,
    /// Optional JSON rule document replacing the built-in grade ladder.
    #[arg(long)]
    pub(crate) rules: Option<PathBuf>,
    /// Skip the reminder dispatch walkthrough.
    #[arg(long)]
    pub(crate) skip_reminders: bool,
}

#[derive(Args, Debug)]
pub(crate) struct AnalyzeArgs {
    /// Ledger CSV export to grade
    #[arg(long)]
    pub(crate) ledger: PathBuf,
    /// JSON rule document (defaults to RISK_RULES_PATH, then the built-in ladder)
    #[arg(long)]
    pub(crate) rules: Option<PathBuf>,
    /// Evaluation instant (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = parse_instant)]
    pub(crate) as_of: Option<DateTime<Utc>>,
    /// Only list debtors with this grade
    #[arg(long)]
    pub(crate) grade: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct SimulateArgs {
    /// Outstanding currency balance
    #[arg(long)]
    pub(crate) balance: f64,
    /// Outstanding commodity balance
    #[arg(long, default_value_t = 0.0)]
    pub(crate) commodity_balance: f64,
    /// Days since the last payment; omit for "never paid"
    #[arg(long)]
    pub(crate) days_since_payment: Option<u32>,
    /// Days since the last contact; omit for "never contacted"
    #[arg(long)]
    pub(crate) days_since_contact: Option<u32>,
    /// JSON rule document (defaults to RISK_RULES_PATH, then the built-in ladder)
    #[arg(long)]
    pub(crate) rules: Option<PathBuf>,
    /// Evaluation instant (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = parse_instant)]
    pub(crate) as_of: Option<DateTime<Utc>>,
}

pub(crate) fn run_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let AnalyzeArgs {
        ledger,
        rules,
        as_of,
        grade,
    } = args;

    let config = AppConfig::load()?;
    let rules_path = rules.or(config.risk.rules_path);
    let rule_set = load_rule_set(rules_path.as_deref())?;
    let debtors = load_ledger(&ledger)?;
    let now = as_of.unwrap_or_else(Utc::now);

    let (service, _, _) = build_service(
        InMemoryDebtorRepository::with_debtors(debtors),
        rule_set,
        config.risk.attention_limit,
    );
    let filter = DebtorFilter {
        grade,
        ..DebtorFilter::default()
    };
    let rows = service.analyze_all(&filter, now)?;
    let summary = service.dashboard(None, now)?;

    println!("Risk analysis for {} as of {}", ledger.display(), now);
    render_analysis_rows(&rows);
    render_dashboard(&summary);
    Ok(())
}

pub(crate) fn run_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let SimulateArgs {
        balance,
        commodity_balance,
        days_since_payment,
        days_since_contact,
        rules,
        as_of,
    } = args;

    let config = AppConfig::load()?;
    let rules_path = rules.or(config.risk.rules_path);
    let rule_set = load_rule_set(rules_path.as_deref())?;
    let now = as_of.unwrap_or_else(Utc::now);

    let (service, _, _) = build_service(
        InMemoryDebtorRepository::default(),
        rule_set,
        config.risk.attention_limit,
    );
    let input = SimulationInput {
        balance,
        commodity_balance,
        days_since_payment,
        days_since_contact,
    };
    let analysis = service.simulate(&input, now)?;

    println!("Simulated debtor as of {}", now);
    render_analysis_detail(&analysis);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        as_of,
        rules,
        skip_reminders,
    } = args;

    let now = as_of.unwrap_or_else(Utc::now);
    let rule_set = load_rule_set(rules.as_deref())?;
    let repository = InMemoryDebtorRepository::with_debtors(demo_portfolio(now));
    repository
        .record_contact(
            &DebtorId("ACC-1002".to_string()),
            ContactEvent {
                channel: ContactChannel::VoiceCall,
                occurred_at: now - Duration::days(10),
            },
        )
        .map_err(RiskServiceError::from)?;

    let (service, _, outbox) = build_service(repository, rule_set, 3);

    println!("Debt recovery desk demo ({})", now);
    let rows = service.analyze_all(&DebtorFilter::default(), now)?;
    render_analysis_rows(&rows);
    render_dashboard(&service.dashboard(None, now)?);

    println!("\nWhat-if: 60000 outstanding, paid 120 days ago, contacted 60 days ago");
    let simulated = service.simulate(
        &SimulationInput {
            balance: 60_000.0,
            commodity_balance: 0.0,
            days_since_payment: Some(120),
            days_since_contact: Some(60),
        },
        now,
    )?;
    render_analysis_detail(&simulated);

    if skip_reminders {
        return Ok(());
    }

    println!("\nReminder walkthrough");
    for row in &rows {
        for channel in [OutboundChannel::Chat, OutboundChannel::Sms] {
            let outcome = match service.send_reminder(&row.debtor_id, channel, now) {
                Ok(decision) => decision.summary(),
                Err(err) => format!("unavailable ({err})"),
            };
            println!("  - {} [{}]: {}", row.debtor_id.0, channel.label(), outcome);
        }
    }
    println!("  {} reminders queued", outbox.dispatched().len());

    Ok(())
}

/// Synthetic portfolio covering every standard grade plus a blocked and a never-touched debtor.
pub(crate) fn demo_portfolio(now: DateTime<Utc>) -> Vec<Debtor> {
    vec![
        seeded_debtor(now, "ACC-1001", "Parisa Ahmadi", 60_000.0, Some(120), Some(60)),
        seeded_debtor(now, "ACC-1002", "Kian Moradi", 25_000.0, Some(50), None),
        with_commodity(
            now,
            seeded_debtor(now, "ACC-1003", "Laleh Tehrani", 8_000.0, Some(20), Some(40)),
            12.5,
        ),
        seeded_debtor(now, "ACC-1004", "Omid Rostami", 1_500.0, Some(2), Some(1)),
        seeded_debtor(now, "ACC-1005", "Shirin Farahani", 70_000.0, None, None),
    ]
}

fn seeded_debtor(
    now: DateTime<Utc>,
    id: &str,
    name: &str,
    balance: f64,
    paid_days_ago: Option<i64>,
    chat_days_ago: Option<i64>,
) -> Debtor {
    let today = now.date_naive();
    let opening = balance + 1_000.0;
    let mut transactions = vec![LedgerEntry {
        kind: EntryKind::Debit,
        unit: LedgerUnit::Currency,
        amount: opening,
        occurred_on: today - Duration::days(400),
        running_balance_after: opening,
    }];
    if let Some(days) = paid_days_ago {
        transactions.push(LedgerEntry {
            kind: EntryKind::Credit,
            unit: LedgerUnit::Currency,
            amount: 1_000.0,
            occurred_on: today - Duration::days(days),
            running_balance_after: balance,
        });
    }

    Debtor {
        id: DebtorId(id.to_string()),
        name: name.to_string(),
        current_balance: balance,
        current_commodity_balance: 0.0,
        transactions,
        last_chat_at: chat_days_ago.map(|days| now - Duration::days(days)),
        last_call_at: None,
    }
}

fn with_commodity(now: DateTime<Utc>, mut debtor: Debtor, grams: f64) -> Debtor {
    debtor.transactions.push(LedgerEntry {
        kind: EntryKind::Debit,
        unit: LedgerUnit::Commodity,
        amount: grams,
        occurred_on: now.date_naive() - Duration::days(30),
        running_balance_after: grams,
    });
    debtor.current_commodity_balance = grams;
    debtor
}

fn render_analysis_rows(rows: &[AnalysisResult]) {
    if rows.is_empty() {
        println!("  no debtors matched");
        return;
    }
    for row in rows {
        let gate = match row.blocked_until {
            Some(until) => format!("blocked until {}", until.format("%Y-%m-%d %H:%M")),
            None => "contactable".to_string(),
        };
        println!(
            "  - {} grade {} | balance {:.2} | {} days unpaid | {} days uncontacted | health {:.1} | {}",
            row.debtor_id.0,
            row.assigned_grade,
            row.balance,
            row.days_since_last_payment,
            row.days_since_last_contact,
            row.health_score,
            gate
        );
    }
}

fn render_analysis_detail(analysis: &AnalysisResult) {
    println!(
        "  Grade: {} (rule priority {})",
        analysis.assigned_grade, analysis.matched_rule.priority
    );
    println!(
        "  Dormancy: {} days since payment | {} days since contact",
        analysis.days_since_last_payment, analysis.days_since_last_contact
    );
    println!("  Health score: {:.1}", analysis.health_score);
    match analysis.blocked_until {
        Some(until) => println!("  Contact gate: blocked until {}", until),
        None => println!(
            "  Contact gate: open ({} hour cooldown after next contact)",
            analysis.matched_rule.cooldown_hours()
        ),
    }
}

fn render_dashboard(summary: &PortfolioSummary) {
    println!(
        "\nPortfolio: {} debtors | outstanding {:.2} (+{:.2} commodity) | {} blocked | avg health {:.1} | rules v{}",
        summary.debtor_count,
        summary.total_outstanding,
        summary.total_commodity_outstanding,
        summary.blocked_count,
        summary.average_health_score,
        summary.rule_set_version
    );
    for bucket in &summary.grades {
        println!(
            "  - grade {}: {} debtors ({} blocked) | {:.2} outstanding",
            bucket.grade, bucket.debtors, bucket.blocked, bucket.outstanding_balance
        );
    }
    if !summary.attention.is_empty() {
        println!("Needs attention:");
        for entry in &summary.attention {
            println!(
                "  - {} (grade {}) health {:.1} | balance {:.2}",
                entry.debtor_id.0, entry.grade, entry.health_score, entry.balance
            );
        }
    }
}
