use crate::error::CliError;
use model::log::LogEntry;
use model::run::BatchResult;

pub fn print_batch_result(result: &BatchResult) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(result).map_err(CliError::JsonSerialize)?;
    println!("{json}");
    Ok(())
}

pub fn print_log_entries(entries: &[LogEntry]) {
    if entries.is_empty() {
        println!("(no log entries)");
        return;
    }
    for entry in entries {
        println!(
            "[{}] {:?} {:<10} {}",
            entry.timestamp.to_rfc3339(),
            entry.level,
            entry.phase,
            entry.message
        );
    }
}
