use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use forksync_config::{ConfigLoader, DEFAULT_CONFIG_FILE};
use forksync_core::{AssetSlot, DisplayAmount};
use tracing::{error, info, warn};

use crate::reconcile::{ActionOutcome, CorrectionPlan, PoolInspection, RunReport};
use crate::telemetry::{self, LogFormat};
use crate::wiring::build_engine;

#[derive(Parser, Debug)]
#[command(
    name = "forksync",
    version,
    about = "Keep a forked sandbox pool's reserves in line with the reference chain"
)]
pub struct Cli {
    /// TOML configuration file; missing files are ignored
    #[arg(long, global = true, env = "FORKSYNC_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
    /// Also write JSON logs to daily files in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    /// Overrides `logging.level` from the configuration
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Snapshot, correct, commit and verify the configured pool
    Reconcile(ReconcileArgs),
    /// Print reserves, delta, native balance and asset metadata
    Inspect,
    /// Fund the pool with an amount of one slot's asset
    Fund(ManualArgs),
    /// Burn an amount of one slot's asset from the pool
    Burn(ManualArgs),
}

#[derive(Args, Debug, Default)]
pub struct ReconcileArgs {
    /// Print the planned corrective actions without changing the sandbox
    #[arg(long)]
    dry_run: bool,
    /// Exit non-zero when the sandbox does not converge
    #[arg(long)]
    strict: bool,
}

#[derive(Args, Debug)]
pub struct ManualArgs {
    /// Asset slot in the pool's own order
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    slot: u8,
    /// Amount in whole units of the asset, e.g. `1.5`
    #[arg(long)]
    amount: DisplayAmount,
}

pub async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let raw = ConfigLoader::new()
        .with_file(&cli.config)
        .load()
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let level = cli.log_level.clone().unwrap_or_else(|| raw.logging.level.clone());
    let _telemetry = telemetry::init(&level, cli.log_format, cli.log_dir.as_deref())?;

    let settings = raw.validate().context("invalid configuration")?;
    info!(
        pool = %settings.pool.pool(),
        asset0 = %settings.pool.asset(AssetSlot::Asset0),
        asset1 = %settings.pool.asset(AssetSlot::Asset1),
        bootstrap = settings.bootstrap.enabled,
        "configuration loaded"
    );
    let engine = build_engine(&settings);

    match cli.command.unwrap_or(Commands::Reconcile(ReconcileArgs::default())) {
        Commands::Reconcile(args) if args.dry_run => {
            let plan = engine.plan().await?;
            print_plan(&plan);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Reconcile(args) => {
            let report = engine.run().await?;
            print_report(&report);
            if !report.succeeded() {
                error!("reconciliation failed");
                return Ok(ExitCode::FAILURE);
            }
            if args.strict && !report.converged() {
                error!("sandbox did not converge and --strict is set");
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Inspect => {
            let inspection = engine.inspect().await?;
            print_inspection(&inspection);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Fund(args) => {
            let slot = parse_slot(args.slot)?;
            let result = engine.fund_slot(slot, args.amount).await?;
            if let Some(err) = result.error {
                warn!(slot = %slot, error = %err, "funding failed");
                return Ok(ExitCode::FAILURE);
            }
            println!(
                "funded {slot}: balance {} -> {}",
                display_opt(result.balance_before),
                display_opt(result.balance_after)
            );
            Ok(ExitCode::SUCCESS)
        }
        Commands::Burn(args) => {
            let slot = parse_slot(args.slot)?;
            let result = engine.burn_slot(slot, args.amount).await?;
            println!(
                "burned {slot}: balance {} -> {} (tx {})",
                display_opt(result.balance_before),
                display_opt(result.balance_after),
                result.transfer_tx
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn parse_slot(raw: u8) -> Result<AssetSlot> {
    AssetSlot::try_from(raw).map_err(|value| anyhow::anyhow!("asset slot {value} does not exist"))
}

fn display_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "?".to_string(), |value| value.to_string())
}

fn print_plan(plan: &CorrectionPlan) {
    println!("reference reserves: {}", plan.snapshots.reference);
    println!("sandbox reserves:   {}", plan.snapshots.sandbox);
    if plan.is_converged() {
        println!("no corrective actions needed");
        return;
    }
    for action in &plan.actions {
        println!("planned: {action}");
    }
}

fn print_inspection(inspection: &PoolInspection) {
    println!("reference reserves: {}", inspection.snapshots.reference);
    println!("sandbox reserves:   {}", inspection.snapshots.sandbox);
    for slot in AssetSlot::ALL {
        println!(
            "{slot}: missing={} excess={}",
            inspection.delta.missing(slot),
            inspection.delta.excess(slot)
        );
    }
    println!(
        "pool native balance: {}",
        display_opt(inspection.native_balance)
    );
    for metadata in inspection.metadata.iter() {
        println!(
            "asset {}: {} ({}), {} decimals",
            metadata.address, metadata.name, metadata.symbol, metadata.decimals
        );
    }
}

fn print_report(report: &RunReport) {
    println!("run {}", report.run_id);
    println!(
        "  duration: {} ms",
        (report.finished_at - report.started_at).num_milliseconds()
    );
    println!("  reference: {}", report.plan.snapshots.reference);
    println!("  sandbox:   {}", report.plan.snapshots.sandbox);
    for outcome in &report.actions {
        let status = if outcome.succeeded() { "ok" } else { "FAILED" };
        let detail = match outcome {
            ActionOutcome::Funded { result, .. } => result
                .error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            ActionOutcome::Burned { result, .. } => result
                .as_ref()
                .err()
                .map(ToString::to_string)
                .unwrap_or_default(),
        };
        println!("  {}: {status} {detail}", outcome.action());
    }
    match &report.finalize {
        None => println!("  commit: skipped (already converged)"),
        Some(state) => match (state.commit_path(), state.error()) {
            (Some(path), _) => println!("  commit: {path}"),
            (None, Some(err)) => println!("  commit: FAILED {err}"),
            (None, None) => println!("  commit: incomplete"),
        },
    }
    match report.verification.warning() {
        Some(warning) => println!("  verification: {warning}"),
        None => println!(
            "  verification: converged at {}",
            report.verification.snapshots().sandbox
        ),
    }
}
