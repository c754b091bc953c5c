use model::job::{Job, OnDateTie};
use model::pagination::CursorTuple;
use model::value::Value;

pub const FETCH_LIMIT: u64 = 5000;
pub const SUBBATCH_SIZE: usize = 2500;

/// Resolves the incremental/tie-breaker column pair a run orders and filters
/// by (§4.4, GLOSSARY: Tie-breaker). The tie-breaker is always the first
/// upsert column; when the job declares no incremental column, resumption
/// falls back to ordering by the upsert columns themselves.
pub fn inc_tie_columns(job: &Job) -> (String, String) {
    match &job.incremental_column {
        Some(inc) => {
            let tie = job.upsert_columns.first().cloned().unwrap_or_else(|| inc.clone());
            (inc.clone(), tie)
        }
        None => {
            let inc = job.upsert_columns.first().cloned().unwrap_or_default();
            let tie = job.upsert_columns.get(1).cloned().unwrap_or_else(|| inc.clone());
            (inc, tie)
        }
    }
}

/// Builds the warehouse `SELECT` for one batch's fetch (§4.4 `Reconcile -> Fetch`).
/// Filter is strict `>` on the incremental column unless the job opted into
/// `OnDateTie::Reprocess` for a DATE-typed column, in which case `>=` is used
/// (§9 open question, resolved per-job). A carried cursor ANDs in the
/// compound tie-break predicate on top of the plain filter.
pub fn build_select(
    job: &Job,
    last_sync_value: Option<&Value>,
    carried_cursor: Option<&CursorTuple>,
) -> String {
    let (inc_col, tie_col) = inc_tie_columns(job);
    let table_ref = format!("`{}.{}.{}`", job.source.project, job.source.dataset, job.source.table);

    let mut clauses = Vec::new();
    if let Some(incremental_column) = &job.incremental_column {
        if let Some(last_value) = last_sync_value {
            let op = if job.on_date_tie == OnDateTie::Reprocess && matches!(last_value, Value::Date(_)) {
                ">="
            } else {
                ">"
            };
            clauses.push(format!("{incremental_column} {op} {}", sql_literal(last_value)));
        }
    }
    if let Some(cursor) = carried_cursor {
        clauses.push(format!(
            "(({inc_col} > {cv}) OR ({inc_col} = {cv} AND {tie_col} > {tv}))",
            cv = sql_literal(&cursor.inc),
            tv = sql_literal(&cursor.tie),
        ));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    format!("SELECT * FROM {table_ref}{where_clause} ORDER BY {inc_col} ASC, {tie_col} ASC LIMIT {FETCH_LIMIT}")
}

/// Builds the key-only projection used by the delete-detection sub-procedure's
/// source-side scan (§4.4): no incremental filter, every upsert column.
pub fn build_key_scan(job: &Job) -> String {
    let table_ref = format!("`{}.{}.{}`", job.source.project, job.source.dataset, job.source.table);
    let columns = job.upsert_columns.join(", ");
    format!("SELECT {columns} FROM {table_ref}")
}

/// Renders a `Value` as a warehouse standard-SQL literal. Source queries have
/// no parameter-binding seam (unlike the sink's delete path, §9), so string
/// and JSON values are single-quote escaped inline.
pub fn sql_literal(value: &Value) -> String {
    match value {
        Value::Int(n) => n.to_string(),
        Value::BigIntString(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Float(f) => f.to_string(),
        Value::Decimal(d) => d.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Boolean(b) => b.to_string().to_uppercase(),
        Value::Date(d) => format!("DATE '{d}'"),
        Value::DateTime(dt) => format!("DATETIME '{}'", dt.format("%Y-%m-%d %H:%M:%S%.f")),
        Value::Timestamp(ts) => format!("TIMESTAMP '{}'", ts.to_rfc3339()),
        Value::Json(j) => format!("'{}'", j.to_string().replace('\'', "''")),
        Value::Null => "NULL".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::job::{JobVariant, SinkLocator, SourceLocator};

    fn job_with_incremental() -> Job {
        Job {
            id: "job-1".into(),
            name: "orders".into(),
            enabled: true,
            variant: JobVariant::WarehouseToSink,
            source: SourceLocator { project: "p".into(), dataset: "d".into(), table: "orders".into() },
            sink: SinkLocator { table: "orders".into(), project: None, dataset: None },
            incremental_column: Some("updated_at".into()),
            force_string_fields: vec![],
            upsert_columns: vec!["id".into()],
            sheets_append: false,
            cron_schedule: None,
            on_date_tie: OnDateTie::Skip,
            last_run: None,
        }
    }

    #[test]
    fn filter_uses_strict_greater_than_by_default() {
        let job = job_with_incremental();
        let sql = build_select(&job, Some(&Value::Int(5)), None);
        assert!(sql.contains("updated_at > 5"));
        assert!(!sql.contains(">="));
    }

    #[test]
    fn carried_cursor_ands_in_compound_predicate() {
        let job = job_with_incremental();
        let cursor = CursorTuple::new(Value::String("2024-01-03".into()), Value::Int(2));
        let sql = build_select(&job, Some(&Value::String("2024-01-03".into())), Some(&cursor));
        assert!(sql.contains("(updated_at > '2024-01-03' AND id > 2)"));
    }

    #[test]
    fn no_incremental_column_falls_back_to_upsert_key_order() {
        let mut job = job_with_incremental();
        job.incremental_column = None;
        job.upsert_columns = vec!["account_id".into(), "period".into()];
        let sql = build_select(&job, None, None);
        assert!(sql.contains("ORDER BY account_id ASC, period ASC"));
        assert!(!sql.contains("WHERE"));
    }
}
