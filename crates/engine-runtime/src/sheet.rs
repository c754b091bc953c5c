use crate::EngineClients;
use chrono::Utc;
use connectors::source::LoadMode;
use engine_core::EngineError;
use model::field::{FieldClass, Schema, SchemaField};
use model::job::Job;
use model::log::{LogEntry, LogLevel};
use model::run::{BatchResult, BatchStats, RunState, RunStatus};
use regex::Regex;
use std::sync::OnceLock;

const FETCH_LIMIT: u64 = 5000;

/// Runs one batch of the sheet->warehouse variant (§4.4 spreadsheet fork).
/// `job.source` carries the spreadsheet id (`dataset`) and sheet/tab name
/// (`table`); `job.sink` carries the warehouse destination (`project`,
/// `dataset`, `table`), since the Source Client's BigQuery-style surface is
/// what actually creates/loads the warehouse table in this variant.
pub async fn run(
    clients: &EngineClients<'_>,
    job: &mut Job,
    run_id: &str,
    batch_number: u32,
    dry_run: bool,
) -> Result<BatchResult, EngineError> {
    clients.metrics.record_batch();
    let spreadsheet_id = &job.source.dataset;
    let sheet_name = &job.source.table;
    let warehouse_project = job.sink.project.clone().unwrap_or_default();
    let warehouse_dataset = job.sink.dataset.clone().unwrap_or_default();
    let warehouse_table = job.sink.table.clone();

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

    let start_row = state.sheet_row_offset.unwrap_or(2);
    let end_row = start_row + FETCH_LIMIT - 1;
    let raw_rows = clients
        .source
        .read_sheet_rows(spreadsheet_id, sheet_name, start_row, end_row)
        .await?;
    let rows_read = raw_rows.len() as u64;

    let headers: Vec<String> = state.source_schema.fields.iter().map(|f| f.name.clone()).collect();

    if state.is_new_table && batch_number == 1 {
        state.source_schema = infer_schema(&headers, &raw_rows);
    }

    if !state.is_new_table && !dry_run {
        let sink_fields = clients
            .source
            .get_metadata(&warehouse_project, &warehouse_dataset, &warehouse_table)
            .await?;
        let new_columns: Vec<String> = headers
            .iter()
            .filter(|h| !sink_fields.contains(h.as_str()))
            .cloned()
            .collect();
        if !new_columns.is_empty() {
            clients
                .source
                .update_schema(&warehouse_project, &warehouse_dataset, &warehouse_table, &new_columns)
                .await?;
        }
    }

    let ndjson = build_ndjson(&headers, &raw_rows);
    let mode = if job.sheets_append || batch_number > 1 {
        LoadMode::Append
    } else {
        LoadMode::Truncate
    };
    let schema_for_load = state.is_new_table.then(|| state.source_schema.clone());

    if dry_run {
        tracing::info!(job_id = %job.id, rows = rows_read, "dry run: skipping spreadsheet load job");
    } else if !raw_rows.is_empty() || state.is_new_table {
        let result = clients
            .source
            .load_ndjson(
                &warehouse_project,
                &warehouse_dataset,
                &warehouse_table,
                &ndjson,
                mode,
                schema_for_load.as_ref(),
            )
            .await?;
        clients.metrics.record_upserted(result.rows_loaded);
        if !result.error_rows.is_empty() {
            clients.logger.log(LogEntry::new(
                LogLevel::Warning,
                "upsert",
                &job.id,
                run_id,
                format!("{} rows rejected by the load job", result.error_rows.len()),
            ))?;
        }
    }

    let retries = clients.source.take_retries();
    if retries > 0 {
        clients.metrics.record_retry_count(retries);
    }

    state.rows_processed += rows_read;
    state.sheet_row_offset = Some(start_row + rows_read.max(1).min(FETCH_LIMIT));
    let has_more = rows_read == FETCH_LIMIT;

    if has_more {
        if !dry_run {
            clients.state_store.save(&job.id, run_id, &state)?;
        }
        return Ok(BatchResult {
            success: true,
            run_id: run_id.to_string(),
            has_more: true,
            next_batch: Some(batch_number + 1),
            rows_processed: rows_read,
            rows_deleted: None,
            stats: Some(BatchStats {
                total_rows_processed: state.rows_processed,
                elapsed_seconds: elapsed_secs(state.start_time),
            }),
        });
    }

    let elapsed = Utc::now().signed_duration_since(state.start_time);
    let summary = format!(
        "{} rows synced in {}m {}s",
        state.rows_processed,
        elapsed.num_seconds().max(0) / 60,
        elapsed.num_seconds().max(0) % 60
    );
    job.mark_success(summary.clone());
    clients.logger.end_run(&job.id, run_id, RunStatus::Success, summary)?;
    if !dry_run {
        clients.state_store.delete(&job.id, run_id)?;
    }

    Ok(BatchResult {
        success: true,
        run_id: run_id.to_string(),
        has_more: false,
        next_batch: None,
        rows_processed: rows_read,
        rows_deleted: None,
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

    let header_rows = clients
        .source
        .read_sheet_rows(&job.source.dataset, &job.source.table, 1, 2)
        .await?;
    let raw_headers = header_rows.into_iter().next().unwrap_or_default();
    let headers: Vec<String> = raw_headers.iter().map(|h| sanitize_header(h)).collect();

    let warehouse_project = job.sink.project.clone().unwrap_or_default();
    let warehouse_dataset = job.sink.dataset.clone().unwrap_or_default();
    let is_new_table = match clients
        .source
        .get_metadata(&warehouse_project, &warehouse_dataset, &job.sink.table)
        .await
    {
        Ok(_) => false,
        Err(connectors::error::SourceError::NotFound(_)) => true,
        Err(e) => return Err(e.into()),
    };

    state.source_schema = Schema::new(
        headers
            .into_iter()
            .map(|name| SchemaField::new(name, FieldClass::String, true))
            .collect(),
    );
    state.is_new_table = is_new_table;
    state.sheet_row_offset = Some(2);
    state.schema_sync_done = true;
    if !dry_run {
        clients.state_store.save(&job.id, run_id, &state)?;
    }
    Ok(state)
}

/// Sanitizes a raw header cell to `[a-z0-9_]` with a leading-digit guard
/// (§4.4 spreadsheet `Reconcile`).
pub fn sanitize_header(raw: &str) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    let pattern = INVALID.get_or_init(|| Regex::new("[^a-z0-9_]").expect("static pattern is valid"));
    let lowered = raw.trim().to_ascii_lowercase();
    let sanitized = pattern.replace_all(&lowered, "_").to_string();
    match sanitized.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("_{sanitized}"),
        Some(_) => sanitized,
        None => "_".to_string(),
    }
}

/// Infers a warehouse schema from each column's non-null sample values, in
/// the order `{date, timestamp, float, integer, else string}` (§4.4).
fn infer_schema(headers: &[String], rows: &[Vec<String>]) -> Schema {
    let fields = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let samples: Vec<&str> = rows
                .iter()
                .filter_map(|row| row.get(idx))
                .map(String::as_str)
                .filter(|s| !s.is_empty())
                .collect();
            SchemaField::new(name.clone(), infer_class(&samples), true)
        })
        .collect();
    Schema::new(fields)
}

fn infer_class(samples: &[&str]) -> FieldClass {
    if samples.is_empty() {
        return FieldClass::String;
    }
    if samples.iter().all(|s| is_date_like(s)) {
        FieldClass::Date
    } else if samples.iter().all(|s| is_timestamp_like(s)) {
        FieldClass::Timestamp
    } else if samples.iter().all(|s| s.parse::<f64>().is_ok()) && samples.iter().any(|s| s.contains('.')) {
        FieldClass::Float
    } else if samples.iter().all(|s| s.parse::<i64>().is_ok()) {
        FieldClass::Int
    } else {
        FieldClass::String
    }
}

fn is_date_like(s: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static pattern is valid"))
        .is_match(s)
}

fn is_timestamp_like(s: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:\d{2}$").expect("static pattern is valid"))
        .is_match(s)
}

/// Builds NDJSON for one page, coercing timestamp-looking cells to
/// `YYYY-MM-DD HH:MM:SS` and empty strings to `null` (§4.4 spreadsheet Upsert).
fn build_ndjson(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut lines = Vec::with_capacity(rows.len());
    for row in rows {
        let mut obj = serde_json::Map::new();
        for (idx, header) in headers.iter().enumerate() {
            let cell = row.get(idx).map(String::as_str).unwrap_or("");
            let value = if cell.is_empty() {
                serde_json::Value::Null
            } else if is_timestamp_like(cell) {
                serde_json::Value::String(cell.replace('T', " "))
            } else {
                serde_json::Value::String(cell.to_string())
            };
            obj.insert(header.clone(), value);
        }
        lines.push(serde_json::Value::Object(obj).to_string());
    }
    lines.join("\n")
}

fn elapsed_secs(start: chrono::DateTime<Utc>) -> f64 {
    Utc::now().signed_duration_since(start).num_milliseconds().max(0) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_sanitization_guards_leading_digit() {
        assert_eq!(sanitize_header("2024 Revenue"), "_2024_revenue");
    }

    #[test]
    fn header_sanitization_lowercases_and_replaces_invalid_chars() {
        assert_eq!(sanitize_header("Customer Name!"), "customer_name_");
    }

    #[test]
    fn type_inference_follows_date_timestamp_float_integer_string_order() {
        assert_eq!(infer_class(&["2024-01-01", "2024-01-02"]), FieldClass::Date);
        assert_eq!(infer_class(&["2024-01-01 10:00:00"]), FieldClass::Timestamp);
        assert_eq!(infer_class(&["3.14", "2.0"]), FieldClass::Float);
        assert_eq!(infer_class(&["1", "2", "3"]), FieldClass::Int);
        assert_eq!(infer_class(&["x", "y"]), FieldClass::String);
    }

    #[test]
    fn ndjson_coerces_empty_strings_to_null() {
        let headers = vec!["a".to_string(), "b".to_string()];
        let rows = vec![vec!["1".to_string(), "".to_string()]];
        let ndjson = build_ndjson(&headers, &rows);
        assert_eq!(ndjson, r#"{"a":"1","b":null}"#);
    }
}
