use crate::keyenc::canonical_key;
use crate::{sql, EngineClients};
use engine_core::EngineError;
use model::job::Job;
use model::log::{LogEntry, LogLevel};
use std::collections::HashSet;

const SINK_PAGE_SIZE: u64 = 10_000;
/// Hard ceiling on source keys materialized in memory (§9 open question,
/// resolved in SPEC_FULL.md §11). Exceeding it fails loudly rather than
/// degrading the safety gates below by truncating the key set.
pub const DELETE_KEY_SCAN_CEILING: usize = 2_000_000;

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Removes sink rows whose upsert-key tuple no longer appears in the source
/// (§4.4 delete-detection sub-procedure), bounded by three safety gates.
/// Returns the number of rows deleted.
pub async fn run(clients: &EngineClients<'_>, job: &Job) -> Result<u64, EngineError> {
    let force_string_set: HashSet<String> = job.force_string_fields.iter().cloned().collect();
    let key_scan_sql = sql::build_key_scan(job);
    let source_rows = clients
        .source
        .query_paginated(&job.source.project, &key_scan_sql, &force_string_set)
        .await?;

    if source_rows.len() > DELETE_KEY_SCAN_CEILING {
        return Err(EngineError::KeyScanTooLarge);
    }

    // Safety gate A: source-empty.
    if source_rows.is_empty() {
        tracing::warn!(job_id = %job.id, "delete detection: source returned 0 keys; skipping as likely misconfiguration");
        clients.logger.log(LogEntry::new(
            LogLevel::Warning,
            "delete_scan",
            &job.id,
            "",
            "source returned 0 keys; delete phase skipped",
        ))?;
        return Ok(0);
    }

    let source_keys: HashSet<String> = source_rows
        .iter()
        .map(|row| canonical_key(row, &job.upsert_columns))
        .collect();

    let sink_rows = fetch_sink_keys(clients, job).await?;

    // Safety gate B: first-sync (empty sink is an optimization, not a failure).
    if sink_rows.is_empty() {
        return Ok(0);
    }

    let candidates: Vec<Vec<model::value::Value>> = sink_rows
        .iter()
        .filter(|row| !source_keys.contains(&canonical_key(row, &job.upsert_columns)))
        .map(|row| row.project(&job.upsert_columns))
        .collect();

    // Safety gate C: runaway delete.
    if candidates.len() as f64 > 0.5 * sink_rows.len() as f64 {
        tracing::error!(
            job_id = %job.id,
            candidates = candidates.len(),
            sink_total = sink_rows.len(),
            "delete detection: candidate ratio exceeds safety threshold"
        );
        return Err(EngineError::DestructiveAnomaly);
    }

    if candidates.is_empty() {
        return Ok(0);
    }

    let deleted = clients
        .sink
        .delete(&job.sink.table, &job.upsert_columns, &candidates)
        .await?;
    clients.metrics.record_deleted(deleted);
    Ok(deleted)
}

async fn fetch_sink_keys(clients: &EngineClients<'_>, job: &Job) -> Result<Vec<model::row::Row>, EngineError> {
    let columns = job
        .upsert_columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let order_by = columns.clone();

    let mut all_rows = Vec::new();
    let mut offset = 0u64;
    loop {
        let sql = format!(
            "SELECT {columns} FROM {} ORDER BY {order_by} LIMIT {SINK_PAGE_SIZE} OFFSET {offset}",
            quote_ident(&job.sink.table)
        );
        let page = clients.sink.exec_query(&sql).await?;
        let page_len = page.len() as u64;
        all_rows.extend(page);
        if page_len < SINK_PAGE_SIZE {
            break;
        }
        offset += SINK_PAGE_SIZE;
    }
    Ok(all_rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_constant_matches_resolved_design_decision() {
        assert_eq!(DELETE_KEY_SCAN_CEILING, 2_000_000);
    }
}
