use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use db_bootstrap::app::bootstrap::Bootstrapper;
use db_bootstrap::app::context::BootstrapContext;
use db_bootstrap::app::error::BootstrapError;
use db_bootstrap::app::status::migration_status;
use db_bootstrap::domain::model::BootstrapConfig;
use db_bootstrap::infra::config::{ConfigLoader, ConfigOverrides};
use db_bootstrap::infra::logging::init_logging;
use db_bootstrap::infra::postgres::{PgMigrationLedger, PgReadinessProbe, lazy_pool};
use db_bootstrap::infra::sql_dir::SqlDirSource;
use db_bootstrap::infra::tokio_sleeper::TokioSleeper;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Wait for Postgres, then apply ordered SQL migrations"
)]
struct Args {
    /// Probe budget before giving up (overrides BOOTSTRAP_MAX_ATTEMPTS).
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    /// Seconds between probes (overrides BOOTSTRAP_RETRY_INTERVAL_SECS).
    #[arg(long, global = true)]
    interval_secs: Option<u64>,

    /// Directory of <version>_<name>.sql files (overrides MIGRATIONS_DIR).
    #[arg(long, global = true)]
    migrations_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Wait for the database, then apply pending migrations (default).
    Run,
    /// Only wait for the database to accept connections.
    Wait,
    /// Probe once and list applied, pending and unknown migrations.
    Status,
}

/// Binary entrypoint:
/// - builds the config once from env (`.env` first) plus CLI overrides
/// - exits 3 on bad config, before any probing
/// - otherwise runs the chosen command and exits 0, 1 (database unreachable)
///   or 2 (migration failure)
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    let overrides = ConfigOverrides {
        max_attempts: args.max_attempts,
        interval_secs: args.interval_secs,
        migrations_dir: args.migrations_dir.clone(),
    };

    let cfg = match ConfigLoader::from_env()
        .and_then(|c| ConfigLoader::apply_overrides(c, &overrides))
    {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("db-bootstrap: {e}");
            return ExitCode::from(e.exit_code());
        }
    };
    init_logging(&cfg.log_level, cfg.log_format);

    info!(
        database = %cfg.target,
        migrations_dir = %cfg.migrations_dir.display(),
        "Loaded config"
    );

    let outcome = match args.command.unwrap_or(Command::Run) {
        Command::Run => run(&cfg).await,
        Command::Wait => wait(&cfg).await,
        Command::Status => status(&cfg).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(e.exit_code()),
    }
}

fn build_context(
    cfg: &BootstrapConfig,
) -> BootstrapContext<PgReadinessProbe, PgMigrationLedger, SqlDirSource, TokioSleeper> {
    BootstrapContext {
        retry: cfg.retry,
        probe: PgReadinessProbe::new(&cfg.target, cfg.connect_timeout),
        ledger: PgMigrationLedger::new(lazy_pool(&cfg.target, cfg.connect_timeout)),
        source: SqlDirSource::new(&cfg.migrations_dir),
        sleeper: TokioSleeper,
    }
}

async fn run(cfg: &BootstrapConfig) -> Result<(), BootstrapError> {
    let ctx = build_context(cfg);
    Bootstrapper::run(&ctx).await?;
    Ok(())
}

async fn wait(cfg: &BootstrapConfig) -> Result<(), BootstrapError> {
    let ctx = build_context(cfg);
    Bootstrapper::wait_for_database(&ctx).await?;
    Ok(())
}

async fn status(cfg: &BootstrapConfig) -> Result<(), BootstrapError> {
    let ctx = build_context(cfg);
    let report = migration_status(&ctx.probe, &ctx.ledger, &ctx.source)
        .await
        .inspect_err(|e| error!(error = %e, "Status failed"))?;

    for line in &report.lines {
        let applied_at = line
            .applied_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>14}  {:<8}  {:<25}  {}",
            line.version,
            line.state.as_str(),
            applied_at,
            line.name
        );
    }

    if let Some(problem) = report.problem {
        error!(error = %problem, "Pending migrations cannot be applied");
        return Err(BootstrapError::MigrationFailure {
            version: Some(problem.version()),
            reason: problem.to_string(),
        });
    }
    Ok(())
}
