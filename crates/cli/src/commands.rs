use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Runs one batch of a job (§11 CLI surface).
    Run {
        /// Path to a TOML or JSON job definition.
        job_file: String,

        #[arg(long, default_value_t = 1, help = "Batch number to run")]
        batch: u32,

        #[arg(long, help = "Run id to continue; generated for a new batch-1 run")]
        run_id: Option<String>,

        #[arg(long, help = "Compute and log the batch without writing to the sink")]
        dry_run: bool,
    },
    /// Reads or clears a job's persisted Run Logger entries.
    Logs {
        #[command(subcommand)]
        command: LogsCommand,
    },
    /// Validates a job file without running it.
    Validate {
        job_file: String,
    },
}

#[derive(Subcommand)]
pub enum LogsCommand {
    /// Prints log entries for a job, optionally scoped to one run.
    Show {
        job_id: String,

        #[arg(long, help = "Run id to scope to; defaults to the job's latest run")]
        run: Option<String>,

        #[arg(long, default_value_t = 50, help = "Maximum entries to print")]
        limit: usize,
    },
    /// Clears a job's persisted log entries.
    Clear {
        job_id: String,

        #[arg(long, help = "Run id to clear; clears every run for the job if omitted")]
        run: Option<String>,
    },
}
