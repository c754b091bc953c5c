use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableFieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TablesGetResponse {
    pub schema: TableSchema,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobReference {
    #[serde(rename = "projectId")]
    pub project_id: String,
    #[serde(rename = "jobId")]
    pub job_id: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultCell {
    pub v: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultRow {
    pub f: Vec<ResultCell>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResultsResponse {
    #[serde(rename = "jobComplete", default)]
    pub job_complete: bool,
    #[serde(default)]
    pub rows: Option<Vec<ResultRow>>,
    #[serde(rename = "pageToken", default)]
    pub page_token: Option<String>,
    #[serde(default)]
    pub schema: Option<TableSchema>,
    #[serde(rename = "jobReference", default)]
    pub job_reference: Option<JobReference>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusDetail {
    pub state: String,
    #[serde(rename = "errorResult", default)]
    pub error_result: Option<String>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobStatistics {
    #[serde(rename = "load", default)]
    pub load: Option<LoadStatistics>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadStatistics {
    #[serde(rename = "outputRows", default)]
    pub output_rows: Option<String>,
}

impl JobStatistics {
    pub fn load_output_rows(&self) -> Option<u64> {
        self.load.as_ref()?.output_rows.as_ref()?.parse().ok()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobStatus {
    #[serde(rename = "jobReference")]
    pub job_reference: JobReference,
    pub status: JobStatusDetail,
    #[serde(default)]
    pub statistics: Option<JobStatistics>,
}
