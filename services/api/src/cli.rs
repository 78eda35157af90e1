use crate::demo::{run_analyze, run_demo, run_simulate, AnalyzeArgs, DemoArgs, SimulateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use recovery_desk::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Recovery Desk",
    about = "Grade debtor portfolios and gate collection reminders from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Grade every debtor in a ledger CSV export and print the portfolio rollup
    Analyze(AnalyzeArgs),
    /// Grade a hypothetical debtor without touching any stored data
    Simulate(SimulateArgs),
    /// Print a dashboard and reminder walkthrough for a synthetic portfolio
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Ledger CSV export to serve instead of an empty portfolio
    #[arg(long, conflicts_with = "seed_demo")]
    pub(crate) ledger: Option<PathBuf>,
    /// Serve the synthetic demo portfolio
    #[arg(long)]
    pub(crate) seed_demo: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Analyze(args) => run_analyze(args),
        Command::Simulate(args) => run_simulate(args),
        Command::Demo(args) => run_demo(args),
    }
}
