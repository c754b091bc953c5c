use clap::Parser;
use commands::{Commands, LogsCommand};
use engine_config::{EngineEnv, JobValidator};
use engine_runtime::EngineClients;
use error::CliError;
use model::run::RunStatus;
use std::process;
use tracing::info;

mod clients;
mod commands;
mod env;
mod error;
mod output;

#[derive(Parser)]
#[command(name = "sync", version = "0.1.0", about = "Warehouse/spreadsheet sync engine CLI")]
struct Cli {
    #[arg(long, global = true, help = "Load KEY=VALUE pairs from this file before reading the environment")]
    env_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        tracing::error!("{err}");
        process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    if let Some(path) = &cli.env_file {
        env::load_dotenv(path)?;
    }

    match cli.command {
        Commands::Run { job_file, batch, run_id, dry_run } => run_batch_command(&job_file, batch, run_id, dry_run).await,
        Commands::Logs { command } => logs_command(command).await,
        Commands::Validate { job_file } => validate_command(&job_file),
    }
}

async fn run_batch_command(job_file: &str, batch: u32, run_id: Option<String>, dry_run: bool) -> Result<(), CliError> {
    let engine_env = EngineEnv::from_env()?;
    let clients = clients::build(&engine_env)?;
    let engine_clients = EngineClients {
        source: &clients.source,
        sink: &clients.sink,
        state_store: &clients.state_store,
        logger: &clients.logger,
        metrics: &clients.metrics,
    };

    let job = engine_config::load_job_file(job_file)?;
    let mut job = JobValidator::new().validate(job)?.into_inner();
    let run_id = run_id.unwrap_or_else(engine_core::new_run_id);

    info!(job_id = %job.id, run_id = %run_id, batch, dry_run, "running batch");
    let result = engine_runtime::run_batch(&engine_clients, &mut job, &run_id, batch, dry_run).await?;

    output::print_batch_result(&result)?;
    if !result.has_more {
        let status = if job.last_run.as_ref().map(|r| r.status) == Some(model::job::LastStatus::Success) {
            RunStatus::Success
        } else {
            RunStatus::Error
        };
        info!(job_id = %job.id, run_id, ?status, "run finished");
    } else {
        info!(job_id = %job.id, run_id, next_batch = ?result.next_batch, "more batches remain");
    }

    let snapshot = clients.metrics.snapshot();
    tracing::debug!(?snapshot, "metrics after batch");
    Ok(())
}

async fn logs_command(command: LogsCommand) -> Result<(), CliError> {
    let engine_env = EngineEnv::from_env()?;
    let logger = run_logger::RunLogger::open(&engine_env.log_dir)?;

    match command {
        LogsCommand::Show { job_id, run, limit } => {
            let run_id = match run {
                Some(run_id) => run_id,
                None => logger
                    .list_runs(&job_id)?
                    .first()
                    .map(|info| info.run_id.clone())
                    .ok_or_else(|| CliError::Config(engine_config::ConfigError::Validation(
                        format!("no runs recorded for job {job_id}"),
                    )))?,
            };
            let entries = logger.read(&job_id, &run_id, limit)?;
            output::print_log_entries(&entries);
            Ok(())
        }
        LogsCommand::Clear { job_id, run } => {
            let removed = logger.clear(&job_id, run.as_deref())?;
            println!("cleared {removed} entries");
            Ok(())
        }
    }
}

fn validate_command(job_file: &str) -> Result<(), CliError> {
    let job = engine_config::load_job_file(job_file)?;
    let job_id = job.id.clone();
    JobValidator::new().validate(job)?;
    println!("{job_id}: valid");
    Ok(())
}
