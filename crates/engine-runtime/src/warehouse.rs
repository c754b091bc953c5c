use crate::{delete, sql, EngineClients};
use chrono::Utc;
use engine_core::EngineError;
use model::field::Schema;
use model::job::Job;
use model::log::{LogEntry, LogLevel};
use model::pagination::CursorTuple;
use model::run::{BatchResult, BatchStats, RunState};
use model::value::Value;
use std::collections::HashSet;
use std::time::Duration;

/// Runs one batch of the warehouse->sink variant (§4.4).
pub async fn run(
    clients: &EngineClients<'_>,
    job: &mut Job,
    run_id: &str,
    batch_number: u32,
    dry_run: bool,
) -> Result<BatchResult, EngineError> {
    clients.metrics.record_batch();
    let mut state = if batch_number == 1 {
        init_and_reconcile(clients, job, run_id, dry_run).await?
    } else {
        let state = clients
            .state_store
            .load(&job.id, run_id)?
            .ok_or(EngineError::RunExpired)?;
        if !state.schema_sync_done {
            return Err(EngineError::SchemaIncomplete);
        }
        state
    };

    let force_string_set: HashSet<String> = job.force_string_fields.iter().cloned().collect();
    let select_sql = sql::build_select(job, state.last_sync_value.as_ref(), state.cursor.as_ref());
    tracing::debug!(job_id = %job.id, run_id, batch_number, "fetch query composed");
    let rows = clients
        .source
        .query_paginated(&job.source.project, &select_sql, &force_string_set)
        .await?;
    clients.logger.log(LogEntry::new(
        LogLevel::Info,
        "fetch",
        &job.id,
        run_id,
        format!("batch {batch_number} fetched {} rows", rows.len()),
    ))?;

    if dry_run {
        tracing::info!(job_id = %job.id, rows = rows.len(), "dry run: skipping upsert");
    } else {
        for chunk in rows.chunks(sql::SUBBATCH_SIZE) {
            clients.sink.upsert(&job.sink.table, chunk, &job.upsert_columns).await?;
        }
        clients.metrics.record_upserted(rows.len() as u64);
    }

    state.rows_processed += rows.len() as u64;

    if rows.len() as u64 == sql::FETCH_LIMIT {
        let last = rows.last().expect("FETCH_LIMIT > 0, so a full page is non-empty");
        let (inc_col, tie_col) = sql::inc_tie_columns(job);
        state.cursor = Some(CursorTuple::new(
            last.get(&inc_col).cloned().unwrap_or(Value::Null),
            last.get(&tie_col).cloned().unwrap_or(Value::Null),
        ));
        if !dry_run {
            clients.state_store.save(&job.id, run_id, &state)?;
        }
        return Ok(BatchResult {
            success: true,
            run_id: run_id.to_string(),
            has_more: true,
            next_batch: Some(batch_number + 1),
            rows_processed: rows.len() as u64,
            rows_deleted: None,
            stats: Some(BatchStats {
                total_rows_processed: state.rows_processed,
                elapsed_seconds: elapsed_secs(state.start_time),
            }),
        });
    }

    let deleted = if dry_run {
        tracing::info!(job_id = %job.id, "dry run: skipping delete detection");
        0
    } else {
        delete::run(clients, job).await?
    };

    let elapsed = Utc::now().signed_duration_since(state.start_time);
    let summary = format_summary(state.rows_processed, deleted, elapsed);
    job.mark_success(summary.clone());
    clients.logger.end_run(&job.id, run_id, model::run::RunStatus::Success, summary)?;
    if !dry_run {
        clients.state_store.delete(&job.id, run_id)?;
    }

    Ok(BatchResult {
        success: true,
        run_id: run_id.to_string(),
        has_more: false,
        next_batch: None,
        rows_processed: rows.len() as u64,
        rows_deleted: Some(deleted),
        stats: Some(BatchStats {
            total_rows_processed: state.rows_processed,
            elapsed_seconds: elapsed.num_milliseconds().max(0) as f64 / 1000.0,
        }),
    })
}

async fn init_and_reconcile(
    clients: &EngineClients<'_>,
    job: &Job,
    run_id: &str,
    dry_run: bool,
) -> Result<RunState, EngineError> {
    let now = Utc::now();
    let mut state = RunState::init(&job.id, run_id, now);

    let source_schema = clients
        .source
        .get_metadata(&job.source.project, &job.source.dataset, &job.source.table)
        .await?;
    schema_reconcile::validate_upsert_keys(&job.upsert_columns, &source_schema)?;

    let sink_fields_before = clients.sink.describe(&job.sink.table).await?;
    let is_new_table = sink_fields_before.is_empty();

    let create_statements =
        schema_reconcile::create_table_statement(&job.sink.table, &source_schema.fields, &job.upsert_columns);
    if !dry_run {
        for statement in &create_statements {
            clients.sink.exec_ddl(statement).await?;
        }
    }

    let sink_schema_after = if dry_run {
        Schema::new(sink_fields_before)
    } else {
        Schema::new(clients.sink.describe(&job.sink.table).await?)
    };
    let drift = schema_reconcile::detect_changes(&source_schema, &sink_schema_after);
    if !drift.is_empty() && !dry_run {
        if !drift.to_add.is_empty() {
            for statement in schema_reconcile::add_column_statements(&job.sink.table, &drift.to_add) {
                clients.sink.exec_ddl(&statement).await?;
            }
        }
        if !drift.to_drop.is_empty() {
            for statement in schema_reconcile::drop_column_statements(&job.sink.table, &drift.to_drop) {
                clients.sink.exec_ddl(&statement).await?;
            }
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    let last_sync_value = match (&job.incremental_column, dry_run) {
        (Some(column), false) => clients.sink.last_value(&job.sink.table, column).await?,
        _ => None,
    };

    state.source_schema = source_schema;
    state.last_sync_value = last_sync_value;
    state.schema_sync_done = true;
    state.is_new_table = is_new_table;
    if !dry_run {
        clients.state_store.save(&job.id, run_id, &state)?;
    }
    Ok(state)
}

fn elapsed_secs(start: chrono::DateTime<Utc>) -> f64 {
    Utc::now().signed_duration_since(start).num_milliseconds().max(0) as f64 / 1000.0
}

fn format_summary(rows: u64, deleted: u64, elapsed: chrono::Duration) -> String {
    let total_secs = elapsed.num_seconds().max(0);
    format!("{rows} rows synced, {deleted} deleted in {}m {}s", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_reports_rows_and_deletes() {
        let summary = format_summary(12, 3, chrono::Duration::seconds(75));
        assert_eq!(summary, "12 rows synced, 3 deleted in 1m 15s");
    }
}
