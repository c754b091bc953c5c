use super::validated::ValidatedJob;
use crate::error::ConfigError;
use model::field::Schema;
use model::job::{Job, JobVariant, OnDateTie};
use std::str::FromStr;

/// `cron_schedule` is documented (§6, job-config option table) as a standard
/// 5-field expression (minute hour day-of-month month day-of-week), but the
/// `cron` crate only parses 6-7 field expressions with a leading seconds
/// field. Prepend `"0 "` when the caller supplied the 5-field form so a
/// spec-valid value doesn't get rejected as invalid.
fn normalize_cron(expr: &str) -> String {
    if expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    }
}

/// Pre-flight validation for a `Job` before it is handed to `run_batch`,
/// mirroring the teacher's `SettingsValidator`: accumulate every violation
/// found, then fail once with the complete list rather than stopping at the
/// first problem.
pub struct JobValidator {
    source_schema: Option<Schema>,
}

impl JobValidator {
    pub fn new() -> Self {
        Self { source_schema: None }
    }

    /// Cross-checks `upsert_columns` (and `force_string_fields`) against the
    /// source schema when one is already known, e.g. from a prior run's
    /// `RunState` or a warm-up `get_metadata` call.
    pub fn with_source_schema(schema: Schema) -> Self {
        Self { source_schema: Some(schema) }
    }

    pub fn validate(&self, job: Job) -> Result<ValidatedJob, ConfigError> {
        let mut errors = Vec::new();

        self.validate_identity(&job, &mut errors);
        self.validate_upsert_columns(&job, &mut errors);
        self.validate_cron_schedule(&job, &mut errors);
        self.check_conflicts(&job, &mut errors);

        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors.join("; ")));
        }

        tracing::info!(job_id = %job.id, variant = ?job.variant, "job configuration validated");
        Ok(ValidatedJob { job })
    }

    fn validate_identity(&self, job: &Job, errors: &mut Vec<String>) {
        if job.id.trim().is_empty() {
            errors.push("job id must not be empty".to_string());
        }
        if job.name.trim().is_empty() {
            errors.push("job name must not be empty".to_string());
        }
        if job.source.project.trim().is_empty()
            || job.source.dataset.trim().is_empty()
            || job.source.table.trim().is_empty()
        {
            errors.push("source project/dataset/table must all be set".to_string());
        }
        if job.sink.table.trim().is_empty() {
            errors.push("sink table must not be empty".to_string());
        }
    }

    fn validate_upsert_columns(&self, job: &Job, errors: &mut Vec<String>) {
        if job.upsert_columns.is_empty() {
            errors.push("upsert_columns must name at least one column".to_string());
            return;
        }
        if let Some(schema) = &self.source_schema {
            if let Err(e) = schema_reconcile::validate_upsert_keys(&job.upsert_columns, schema) {
                errors.push(e.to_string());
            }
            for field in &job.force_string_fields {
                if !schema.contains(field) {
                    errors.push(format!("force_string_fields names unknown column: {field}"));
                }
            }
        }
    }

    fn validate_cron_schedule(&self, job: &Job, errors: &mut Vec<String>) {
        if let Some(expr) = &job.cron_schedule {
            if cron::Schedule::from_str(&normalize_cron(expr)).is_err() {
                errors.push(format!("cron_schedule is not a valid cron expression: {expr}"));
            }
        }
    }

    /// Options that are meaningful for one job variant only, or that silently
    /// do nothing without a prerequisite being set, are reported rather than
    /// ignored - a misconfigured job should fail fast, not run with a subset
    /// of the operator's intended behavior.
    fn check_conflicts(&self, job: &Job, errors: &mut Vec<String>) {
        match job.variant {
            JobVariant::WarehouseToSink if job.sheets_append => {
                errors.push("sheets_append only applies to the sheet-to-warehouse variant".to_string());
            }
            JobVariant::SheetToWarehouse if job.incremental_column.is_some() => {
                errors.push(
                    "incremental_column has no effect on the sheet-to-warehouse variant, which tracks a row offset instead"
                        .to_string(),
                );
            }
            _ => {}
        }

        if job.on_date_tie == OnDateTie::Reprocess && job.incremental_column.is_none() {
            tracing::warn!(
                job_id = %job.id,
                "on_date_tie=reprocess has no effect without an incremental_column"
            );
        }
    }
}

impl Default for JobValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::job::{SinkLocator, SourceLocator};

    fn base_job() -> Job {
        Job {
            id: "job-1".into(),
            name: "orders".into(),
            enabled: true,
            variant: JobVariant::WarehouseToSink,
            source: SourceLocator {
                project: "p".into(),
                dataset: "d".into(),
                table: "orders".into(),
            },
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
    fn rejects_empty_upsert_columns() {
        let mut job = base_job();
        job.upsert_columns.clear();
        let err = JobValidator::new().validate(job).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("upsert_columns")));
    }

    #[test]
    fn rejects_sheets_append_on_warehouse_variant() {
        let mut job = base_job();
        job.sheets_append = true;
        let err = JobValidator::new().validate(job).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("sheets_append")));
    }

    #[test]
    fn rejects_malformed_cron_expression() {
        let mut job = base_job();
        job.cron_schedule = Some("not a cron expression".to_string());
        let err = JobValidator::new().validate(job).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("cron_schedule")));
    }

    #[test]
    fn accepts_valid_cron_expression() {
        let mut job = base_job();
        job.cron_schedule = Some("0 0 * * * *".to_string());
        assert!(JobValidator::new().validate(job).is_ok());
    }

    #[test]
    fn accepts_standard_five_field_cron_expression() {
        let mut job = base_job();
        job.cron_schedule = Some("0 9 * * 1-5".to_string());
        assert!(JobValidator::new().validate(job).is_ok());
    }

    #[test]
    fn cross_checks_upsert_columns_against_known_source_schema() {
        use model::field::{FieldClass, SchemaField};
        let schema = Schema::new(vec![SchemaField::new("id", FieldClass::Int, false)]);
        let mut job = base_job();
        job.upsert_columns = vec!["ghost_column".to_string()];
        let err = JobValidator::with_source_schema(schema).validate(job).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("ghost_column")));
    }
}
