mod decode;
mod wire;

use crate::auth::TokenCache;
use crate::error::SourceError;
use crate::retry::{is_retryable_status, RetryError, RetryPolicy};
use decode::decode_cell;
use model::field::{FieldClass, Schema, SchemaField};
use model::row::Row;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wire::{JobReference, JobStatus, QueryResultsResponse, TableFieldSchema, TableSchema, TablesGetResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    Append,
    Truncate,
}

impl LoadMode {
    fn as_write_disposition(&self) -> &'static str {
        match self {
            LoadMode::Append => "WRITE_APPEND",
            LoadMode::Truncate => "WRITE_TRUNCATE",
        }
    }
}

#[derive(Debug, Default)]
pub struct LoadJobResult {
    pub rows_loaded: u64,
    pub error_rows: Vec<String>,
}

/// Reads metadata and paginated rows from the warehouse; performs multipart load
/// jobs for spreadsheet ingest (§4.1). Talks the warehouse's REST surface directly
/// since no official SDK is available to build on. Also reads spreadsheet rows
/// for the sheet->warehouse variant, under an independent auth scope.
pub struct SourceClient {
    http: reqwest::Client,
    base_url: String,
    auth: Arc<TokenCache>,
    sheets_base_url: String,
    sheets_auth: Arc<TokenCache>,
    retry: RetryPolicy,
    retries_observed: AtomicU64,
}

impl SourceClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        auth: Arc<TokenCache>,
        sheets_base_url: impl Into<String>,
        sheets_auth: Arc<TokenCache>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            auth,
            sheets_base_url: sheets_base_url.into(),
            sheets_auth,
            retry: RetryPolicy::default(),
            retries_observed: AtomicU64::new(0),
        }
    }

    /// Drains the retry count accumulated since the last call (§11 supplemented
    /// metrics counter: retries). Only the spreadsheet read/schema-update paths
    /// retry; warehouse reads fail fast.
    pub fn take_retries(&self) -> u64 {
        self.retries_observed.swap(0, Ordering::Relaxed)
    }

    /// Reads rows `[start_row..=end_row]` (1-indexed, inclusive A1 notation
    /// range) from a sheet, using the §4.1 retry policy: 429/5xx are retried
    /// with jittered exponential backoff, everything else fails immediately.
    pub async fn read_sheet_rows(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        start_row: u64,
        end_row: u64,
    ) -> Result<Vec<Vec<String>>, SourceError> {
        let range = format!("{sheet_name}!A{start_row}:ZZ{end_row}");
        let url = format!(
            "{}/v4/spreadsheets/{spreadsheet_id}/values/{range}",
            self.sheets_base_url
        );

        let result = self
            .retry
            .run(
                || async {
                    let token = self
                        .sheets_auth
                        .access_token()
                        .await
                        .map_err(|e| e.to_string())?;
                    let response = self
                        .http
                        .get(&url)
                        .bearer_auth(token)
                        .send()
                        .await
                        .map_err(|e| e.to_string())?;
                    let status = response.status();
                    if status.is_success() {
                        Ok(response)
                    } else {
                        Err(format!("HTTP {status}"))
                    }
                },
                |err: &String| {
                    let retryable = err
                        .strip_prefix("HTTP ")
                        .and_then(|s| s.parse::<u16>().ok())
                        .map(is_retryable_status)
                        .unwrap_or(false);
                    if retryable {
                        self.retries_observed.fetch_add(1, Ordering::Relaxed);
                        crate::retry::RetryDisposition::Retry
                    } else {
                        crate::retry::RetryDisposition::Stop
                    }
                },
            )
            .await;

        let response = match result {
            Ok(response) => response,
            Err(RetryError::Fatal(e)) | Err(RetryError::AttemptsExceeded(e)) => {
                return Err(SourceError::SourceUnavailable(e))
            }
        };

        #[derive(serde::Deserialize)]
        struct ValuesResponse {
            #[serde(default)]
            values: Vec<Vec<serde_json::Value>>,
        }
        let body: ValuesResponse = response
            .json()
            .await
            .map_err(|e| SourceError::SourceUnavailable(e.to_string()))?;

        Ok(body
            .values
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| match cell {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect())
    }

    async fn bearer(&self) -> Result<String, SourceError> {
        self.auth.access_token().await
    }

    pub async fn get_metadata(&self, project: &str, dataset: &str, table: &str) -> Result<Schema, SourceError> {
        let url = format!(
            "{}/bigquery/v2/projects/{project}/datasets/{dataset}/tables/{table}",
            self.base_url
        );
        let token = self.bearer().await?;
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SourceError::SourceUnavailable(e.to_string()))?;

        match response.status().as_u16() {
            404 => return Err(SourceError::NotFound(format!("{project}.{dataset}.{table}"))),
            403 => return Err(SourceError::PermissionDenied(format!("{project}.{dataset}.{table}"))),
            s if s >= 400 => {
                return Err(SourceError::SourceUnavailable(format!(
                    "get_metadata failed: HTTP {s}"
                )))
            }
            _ => {}
        }

        let body: TablesGetResponse = response
            .json()
            .await
            .map_err(|e| SourceError::SourceUnavailable(e.to_string()))?;
        Ok(table_schema_to_schema(&body.schema))
    }

    /// Submits a query, follows continuation tokens, yields every row. Internally
    /// buffers pages rather than exposing a true async stream - the caller always
    /// bounds the result with a SQL `LIMIT`, so there is no unbounded-memory risk.
    pub async fn query_paginated(
        &self,
        project: &str,
        sql: &str,
        force_string_set: &HashSet<String>,
    ) -> Result<Vec<Row>, SourceError> {
        let token = self.bearer().await?;
        let query_url = format!("{}/bigquery/v2/projects/{project}/queries", self.base_url);
        let response = self
            .http
            .post(&query_url)
            .bearer_auth(token.clone())
            .json(&serde_json::json!({ "query": sql, "useLegacySql": false }))
            .send()
            .await
            .map_err(|e| SourceError::SourceUnavailable(e.to_string()))?;

        match response.status().as_u16() {
            400 => return Err(SourceError::QueryRejected(read_error_body(response).await)),
            403 => return Err(SourceError::PermissionDenied(read_error_body(response).await)),
            s if s >= 400 => return Err(SourceError::SourceUnavailable(format!("query failed: HTTP {s}"))),
            _ => {}
        }

        let mut page: QueryResultsResponse = response
            .json()
            .await
            .map_err(|e| SourceError::SourceUnavailable(e.to_string()))?;

        if !page.job_complete {
            return Err(SourceError::QueryIncomplete(
                "query did not finish within the synchronous window".into(),
            ));
        }

        let schema = page
            .schema
            .clone()
            .ok_or_else(|| SourceError::PaginationFailed("missing schema on first page".into()))?;
        let fields = table_schema_to_schema(&schema).fields;

        let mut rows = Vec::new();
        append_rows(&mut rows, &page, &fields, force_string_set)?;

        while let Some(page_token) = page.page_token.take() {
            let job_ref = page
                .job_reference
                .clone()
                .ok_or_else(|| SourceError::PaginationFailed("missing job reference".into()))?;
            page = self.fetch_results_page(&job_ref, &page_token).await?;
            append_rows(&mut rows, &page, &fields, force_string_set)?;
        }

        Ok(rows)
    }

    async fn fetch_results_page(
        &self,
        job_ref: &JobReference,
        page_token: &str,
    ) -> Result<QueryResultsResponse, SourceError> {
        let token = self.bearer().await?;
        let url = format!(
            "{}/bigquery/v2/projects/{}/queries/{}",
            self.base_url, job_ref.project_id, job_ref.job_id
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("pageToken", page_token), ("location", job_ref.location.as_deref().unwrap_or(""))])
            .send()
            .await
            .map_err(|e| SourceError::PaginationFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::PaginationFailed(format!(
                "page fetch failed: HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::PaginationFailed(e.to_string()))
    }

    /// Submits a multipart load, polling until the job reaches a terminal state.
    /// `schema` is supplied only for table creation (§4.1); otherwise the
    /// warehouse is left to evolve schema on its own.
    pub async fn load_ndjson(
        &self,
        project: &str,
        dataset: &str,
        table: &str,
        ndjson: &str,
        mode: LoadMode,
        schema: Option<&Schema>,
    ) -> Result<LoadJobResult, SourceError> {
        let token = self.bearer().await?;
        let url = format!("{}/upload/bigquery/v2/projects/{project}/jobs?uploadType=multipart", self.base_url);

        let mut config = serde_json::json!({
            "configuration": {
                "load": {
                    "destinationTable": { "projectId": project, "datasetId": dataset, "tableId": table },
                    "sourceFormat": "NEWLINE_DELIMITED_JSON",
                    "writeDisposition": mode.as_write_disposition(),
                    "createDisposition": "CREATE_IF_NEEDED",
                }
            }
        });
        if let Some(schema) = schema {
            config["configuration"]["load"]["schema"] = serde_json::json!({
                "fields": schema
                    .fields
                    .iter()
                    .map(|f| serde_json::json!({ "name": f.name, "type": field_class_to_bq_type(f.class), "mode": if f.nullable { "NULLABLE" } else { "REQUIRED" } }))
                    .collect::<Vec<_>>()
            });
        }

        let metadata_part = reqwest::multipart::Part::text(config.to_string())
            .mime_str("application/json")
            .map_err(|e| SourceError::LoadJobFailed(e.to_string()))?;
        let data_part = reqwest::multipart::Part::text(ndjson.to_string())
            .mime_str("application/json")
            .map_err(|e| SourceError::LoadJobFailed(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("metadata", metadata_part)
            .part("file", data_part);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| SourceError::LoadJobFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::LoadJobFailed(format!(
                "load job submission failed: HTTP {}",
                response.status()
            )));
        }

        let submitted: JobStatus = response
            .json()
            .await
            .map_err(|e| SourceError::LoadJobFailed(e.to_string()))?;
        self.poll_load_job(&submitted.job_reference).await
    }

    async fn poll_load_job(&self, job_ref: &JobReference) -> Result<LoadJobResult, SourceError> {
        let url = format!(
            "{}/bigquery/v2/projects/{}/jobs/{}",
            self.base_url, job_ref.project_id, job_ref.job_id
        );
        for _ in 0..60 {
            let token = self.bearer().await?;
            let response = self
                .http
                .get(&url)
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| SourceError::LoadJobFailed(e.to_string()))?;
            let status: JobStatus = response
                .json()
                .await
                .map_err(|e| SourceError::LoadJobFailed(e.to_string()))?;

            if status.status.state == "DONE" {
                if let Some(err) = status.status.error_result {
                    return Err(SourceError::LoadJobFailed(err));
                }
                return Ok(LoadJobResult {
                    rows_loaded: status.statistics.and_then(|s| s.load_output_rows()).unwrap_or(0),
                    error_rows: status.status.errors.unwrap_or_default(),
                });
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        Err(SourceError::LoadJobFailed("load job did not finish in time".into()))
    }

    /// Adds nullable string columns, preserving existing ones. Used by the
    /// spreadsheet variant when new headers appear in an existing table.
    pub async fn update_schema(
        &self,
        project: &str,
        dataset: &str,
        table: &str,
        new_columns: &[String],
    ) -> Result<(), SourceError> {
        let existing = self.get_metadata(project, dataset, table).await?;
        let mut fields: Vec<TableFieldSchema> = existing
            .fields
            .iter()
            .map(|f| TableFieldSchema {
                name: f.name.clone(),
                field_type: field_class_to_bq_type(f.class).to_string(),
                mode: Some(if f.nullable { "NULLABLE".into() } else { "REQUIRED".into() }),
            })
            .collect();
        for name in new_columns {
            if !existing.contains(name) {
                fields.push(TableFieldSchema {
                    name: name.clone(),
                    field_type: "STRING".into(),
                    mode: Some("NULLABLE".into()),
                });
            }
        }

        let url = format!(
            "{}/bigquery/v2/projects/{project}/datasets/{dataset}/tables/{table}",
            self.base_url
        );
        let token = self.bearer().await?;
        let result = self
            .retry
            .run(
                || async {
                    self.http
                        .patch(&url)
                        .bearer_auth(token.clone())
                        .json(&serde_json::json!({ "schema": { "fields": fields } }))
                        .send()
                        .await
                },
                |err| {
                    if err
                        .status()
                        .map(|s| is_retryable_status(s.as_u16()))
                        .unwrap_or(false)
                    {
                        self.retries_observed.fetch_add(1, Ordering::Relaxed);
                        crate::retry::RetryDisposition::Retry
                    } else {
                        crate::retry::RetryDisposition::Stop
                    }
                },
            )
            .await;

        match result {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(SourceError::SourceUnavailable(format!(
                "update_schema failed: HTTP {}",
                response.status()
            ))),
            Err(RetryError::Fatal(e)) | Err(RetryError::AttemptsExceeded(e)) => {
                Err(SourceError::SourceUnavailable(e.to_string()))
            }
        }
    }
}

fn append_rows(
    rows: &mut Vec<Row>,
    page: &QueryResultsResponse,
    fields: &[SchemaField],
    force_string_set: &HashSet<String>,
) -> Result<(), SourceError> {
    let Some(raw_rows) = &page.rows else { return Ok(()) };
    for raw_row in raw_rows {
        if raw_row.f.len() != fields.len() {
            return Err(SourceError::PaginationFailed(
                "row cell count does not match schema field count".into(),
            ));
        }
        let mut row = Row::new();
        for (field, cell) in fields.iter().zip(raw_row.f.iter()) {
            let force = force_string_set.contains(&field.name);
            row.insert(field.name.clone(), decode_cell(field, &cell.v, force));
        }
        rows.push(row);
    }
    Ok(())
}

fn table_schema_to_schema(schema: &TableSchema) -> Schema {
    Schema::new(
        schema
            .fields
            .iter()
            .map(|f| {
                let nullable = f.mode.as_deref() != Some("REQUIRED");
                SchemaField::new(f.name.clone(), bq_type_to_field_class(&f.field_type), nullable)
            })
            .collect(),
    )
}

fn bq_type_to_field_class(field_type: &str) -> FieldClass {
    match field_type.to_ascii_uppercase().as_str() {
        "INTEGER" | "INT64" => FieldClass::Int,
        "FLOAT" | "FLOAT64" => FieldClass::Float,
        "BOOLEAN" | "BOOL" => FieldClass::Bool,
        "DATE" => FieldClass::Date,
        "DATETIME" => FieldClass::DateTime,
        "TIMESTAMP" => FieldClass::Timestamp,
        "NUMERIC" | "BIGNUMERIC" => FieldClass::Numeric,
        _ => FieldClass::String,
    }
}

fn field_class_to_bq_type(class: FieldClass) -> &'static str {
    match class {
        FieldClass::String => "STRING",
        FieldClass::Int => "INTEGER",
        FieldClass::Float => "FLOAT",
        FieldClass::Bool => "BOOLEAN",
        FieldClass::Date => "DATE",
        FieldClass::DateTime => "DATETIME",
        FieldClass::Timestamp => "TIMESTAMP",
        FieldClass::Numeric => "NUMERIC",
    }
}

async fn read_error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable error body>".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::value::Value;

    #[test]
    fn bq_type_round_trips_through_field_class() {
        for t in ["INTEGER", "FLOAT", "BOOLEAN", "DATE", "DATETIME", "TIMESTAMP", "NUMERIC", "STRING"] {
            let class = bq_type_to_field_class(t);
            assert_eq!(field_class_to_bq_type(class), t);
        }
    }

    #[test]
    fn force_string_column_preserves_digits_as_big_int_string() {
        let field = SchemaField::new("external_id", FieldClass::Int, true);
        let raw = serde_json::Value::String("9007199254740993".into());
        let mut forced = HashSet::new();
        forced.insert("external_id".to_string());
        let value = decode_cell(&field, &raw, forced.contains(&field.name));
        assert_eq!(value, Value::BigIntString("9007199254740993".into()));
    }
}
