mod decode;

use crate::error::SinkError;
use decode::json_to_value;
use model::field::{FieldClass, SchemaField};
use model::row::Row;
use model::value::Value;
use serde_json::json;

const DELETE_CHUNK_SIZE: usize = 200;

/// Executes upserts, deletes, arbitrary DDL, and column-introspection queries
/// against the relational sink (§4.2). Modeled as a PostgREST-style REST/RPC
/// client since the sink is reachable only through privileged stored
/// procedures, not a direct wire-protocol connection.
pub struct SinkClient {
    http: reqwest::Client,
    base_url: String,
    service_role_key: String,
}

impl SinkClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, service_role_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            service_role_key: service_role_key.into(),
        }
    }

    fn rest_request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .header("apikey", self.service_role_key.as_str())
            .bearer_auth(&self.service_role_key)
    }

    /// Atomic upsert against a unique constraint over `conflict_columns`. No-op
    /// for empty `rows`.
    pub async fn upsert(&self, table: &str, rows: &[Row], conflict_columns: &[String]) -> Result<(), SinkError> {
        if rows.is_empty() {
            return Ok(());
        }
        let body: Vec<serde_json::Map<String, serde_json::Value>> = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|(col, val)| (col.to_string(), val.to_canonical_json()))
                    .collect()
            })
            .collect();

        let response = self
            .rest_request(reqwest::Method::POST, &format!("/rest/v1/{table}"))
            .query(&[("on_conflict", conflict_columns.join(","))])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&body)
            .send()
            .await
            .map_err(|e| SinkError::SinkUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SinkError::SinkUpsertFailed(message));
        }
        Ok(())
    }

    /// Executes arbitrary DDL via the sink's privileged stored procedure, then
    /// signals a schema-cache reload so PostgREST picks up the new shape
    /// immediately rather than on its next poll interval.
    pub async fn exec_ddl(&self, statement: &str) -> Result<(), SinkError> {
        let response = self
            .rest_request(reqwest::Method::POST, "/rest/v1/rpc/exec_ddl")
            .json(&json!({ "statement": statement }))
            .send()
            .await
            .map_err(|e| SinkError::SinkUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SinkError::SinkDDLFailed(message));
        }

        let _ = self
            .rest_request(reqwest::Method::POST, "/rest/v1/rpc/reload_schema_cache")
            .send()
            .await;
        Ok(())
    }

    /// Executes a dynamic SELECT via the sink's privileged stored procedure.
    /// A "relation does not exist" error is coerced to an empty result so a
    /// first-ever run against a not-yet-created table proceeds (§7).
    pub async fn exec_query(&self, sql: &str) -> Result<Vec<Row>, SinkError> {
        self.exec_query_params(sql, &[]).await
    }

    async fn exec_query_params(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SinkError> {
        let response = self
            .rest_request(reqwest::Method::POST, "/rest/v1/rpc/exec_query")
            .json(&json!({
                "query": sql,
                "params": params.iter().map(Value::to_canonical_json).collect::<Vec<_>>(),
            }))
            .send()
            .await
            .map_err(|e| SinkError::SinkUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            if message.to_lowercase().contains("relation") && message.to_lowercase().contains("does not exist") {
                return Ok(Vec::new());
            }
            return Err(SinkError::SinkUnavailable(message));
        }

        let raw: Vec<serde_json::Map<String, serde_json::Value>> = response
            .json()
            .await
            .map_err(|e| SinkError::SinkUnavailable(e.to_string()))?;

        Ok(raw
            .into_iter()
            .map(|obj| {
                obj.into_iter()
                    .map(|(k, v)| (k, json_to_value(&v)))
                    .collect::<Row>()
            })
            .collect())
    }

    /// Returns the maximum value of `column`, or `None` if the table is empty
    /// or absent.
    pub async fn last_value(&self, table: &str, column: &str) -> Result<Option<Value>, SinkError> {
        let sql = format!("SELECT MAX(\"{column}\") AS v FROM \"{table}\"");
        let rows = self.exec_query(&sql).await?;
        Ok(rows.first().and_then(|r| r.get("v")).cloned().filter(|v| !v.is_null()))
    }

    /// Returns the sink's existing columns, mapped back to source-equivalent
    /// type classes, excluding the engine-owned `synced_at` (I5).
    pub async fn describe(&self, table: &str) -> Result<Vec<SchemaField>, SinkError> {
        let sql = format!(
            "SELECT column_name, data_type, is_nullable FROM information_schema.columns WHERE table_name = '{table}' ORDER BY ordinal_position"
        );
        let rows = self.exec_query(&sql).await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let name = row.get("column_name")?.as_str()?.to_string();
                if name.eq_ignore_ascii_case("synced_at") {
                    return None;
                }
                let data_type = row.get("data_type")?.as_str()?.to_string();
                let nullable = row
                    .get("is_nullable")
                    .and_then(|v| v.as_str())
                    .map(|s| s.eq_ignore_ascii_case("YES"))
                    .unwrap_or(true);
                Some(SchemaField::new(name, FieldClass::from_sink_type(&data_type), nullable))
            })
            .collect())
    }

    /// Bulk delete by unique-key tuples. Processes in chunks of 200 to stay
    /// under URL/payload limits (§4.2); uses parameter binding rather than
    /// string interpolation (§9 open question, resolved).
    pub async fn delete(&self, table: &str, key_columns: &[String], key_tuples: &[Vec<Value>]) -> Result<u64, SinkError> {
        let mut deleted = 0u64;
        for chunk in key_tuples.chunks(DELETE_CHUNK_SIZE) {
            if chunk.is_empty() {
                continue;
            }
            let (predicate, params) = build_delete_predicate(key_columns, chunk);
            let sql = format!("DELETE FROM \"{table}\" WHERE {predicate} RETURNING 1");
            let rows = self
                .exec_query_params(&sql, &params)
                .await
                .map_err(|e| match e {
                    SinkError::SinkUnavailable(msg) => SinkError::SinkDeleteFailed(msg),
                    other => other,
                })?;
            deleted += rows.len() as u64;
        }
        Ok(deleted)
    }
}

/// Single-column keys use an `IN` filter (`= ANY($1)`); composite keys use a
/// disjunction of conjoined equalities, each column bound to its own
/// parameter placeholder.
fn build_delete_predicate(key_columns: &[String], tuples: &[Vec<Value>]) -> (String, Vec<Value>) {
    if key_columns.len() == 1 {
        let column = &key_columns[0];
        let values: Vec<Value> = tuples.iter().map(|t| t[0].clone()).collect();
        return (format!("\"{column}\" = ANY($1)"), vec![Value::Json(serde_json::Value::Array(
            values.iter().map(Value::to_canonical_json).collect(),
        ))]);
    }

    let mut params = Vec::new();
    let mut clauses = Vec::new();
    for tuple in tuples {
        let mut conjuncts = Vec::new();
        for (column, value) in key_columns.iter().zip(tuple.iter()) {
            params.push(value.clone());
            conjuncts.push(format!("\"{column}\" = ${}", params.len()));
        }
        clauses.push(format!("({})", conjuncts.join(" AND ")));
    }
    (clauses.join(" OR "), params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_column_key_uses_any_filter() {
        let tuples = vec![vec![Value::Int(1)], vec![Value::Int(2)]];
        let (predicate, params) = build_delete_predicate(&["id".to_string()], &tuples);
        assert_eq!(predicate, "\"id\" = ANY($1)");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn composite_key_uses_disjunction_of_conjunctions() {
        let tuples = vec![
            vec![Value::Int(1), Value::String("a".into())],
            vec![Value::Int(2), Value::String("b".into())],
        ];
        let (predicate, params) = build_delete_predicate(
            &["account_id".to_string(), "period".to_string()],
            &tuples,
        );
        assert_eq!(
            predicate,
            "(\"account_id\" = $1 AND \"period\" = $2) OR (\"account_id\" = $3 AND \"period\" = $4)"
        );
        assert_eq!(params.len(), 4);
    }
}
