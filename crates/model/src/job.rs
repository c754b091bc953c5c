use serde::{Deserialize, Serialize};

/// A configured synchronization (§3 Data Model: Job).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub variant: JobVariant,
    pub source: SourceLocator,
    pub sink: SinkLocator,
    #[serde(default)]
    pub incremental_column: Option<String>,
    #[serde(default)]
    pub force_string_fields: Vec<String>,
    pub upsert_columns: Vec<String>,
    /// Sheet-to-warehouse only: true => always APPEND, false/absent => TRUNCATE on
    /// batch 1 only (§4.4 spreadsheet variant).
    #[serde(default)]
    pub sheets_append: bool,
    #[serde(default)]
    pub cron_schedule: Option<String>,
    /// Resolves the §9 open question on strict `>` vs `>=` for DATE-typed
    /// incremental columns, as a per-job policy rather than a hard-coded rule.
    #[serde(default)]
    pub on_date_tie: OnDateTie,
    #[serde(default)]
    pub last_run: Option<LastRunSummary>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobVariant {
    /// `bq-to-supabase` in the job-config option table.
    WarehouseToSink,
    /// `sheets-to-bq`.
    SheetToWarehouse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnDateTie {
    /// Strict `>`: a DATE value recorded after a mid-run batch may cause that
    /// day's later-arriving rows to be skipped until the next run. Default,
    /// matching spec.md's documented current behavior.
    #[default]
    Skip,
    /// `>=` for DATE-typed incremental columns only: reprocesses same-day rows,
    /// relying on upsert idempotence to make the reprocessing harmless.
    Reprocess,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceLocator {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

/// For the warehouse-to-sink variant only `table` is meaningful. The
/// sheet-to-warehouse variant targets the warehouse itself (reached through
/// the Source Client's BigQuery-style surface, §4.1) and needs the
/// project/dataset pair to address it, since `SourceLocator` above is
/// already repurposed to carry the spreadsheet id and sheet name for that
/// variant.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SinkLocator {
    pub table: String,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub dataset: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LastStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastRunSummary {
    pub status: LastStatus,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl Job {
    pub fn mark_success(&mut self, summary: String) {
        self.last_run = Some(LastRunSummary {
            status: LastStatus::Success,
            error: None,
            summary: Some(summary),
        });
    }

    pub fn mark_error(&mut self, error: String) {
        let prior_summary = self
            .last_run
            .as_ref()
            .and_then(|r| r.summary.clone());
        self.last_run = Some(LastRunSummary {
            status: LastStatus::Error,
            error: Some(error),
            summary: prior_summary,
        });
    }
}
