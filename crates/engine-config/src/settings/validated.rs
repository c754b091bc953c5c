use model::job::{Job, JobVariant};

/// A `Job` that has passed `JobValidator::validate` (§10.3). Carries no data
/// `Job` itself doesn't, but the type alone proves at the call site that
/// pre-flight checks ran before `run_batch` was invoked.
#[derive(Debug, Clone)]
pub struct ValidatedJob {
    pub(crate) job: Job,
}

impl ValidatedJob {
    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn into_inner(self) -> Job {
        self.job
    }

    /// True when the incremental column is actually consulted during a run -
    /// only the warehouse variant uses it (§4.4); the spreadsheet variant
    /// tracks a row offset instead.
    pub fn uses_incremental_column(&self) -> bool {
        matches!(self.job.variant, JobVariant::WarehouseToSink) && self.job.incremental_column.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::job::{OnDateTie, SinkLocator, SourceLocator};

    fn sample_job() -> Job {
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
    fn warehouse_job_with_incremental_column_uses_it() {
        let validated = ValidatedJob { job: sample_job() };
        assert!(validated.uses_incremental_column());
    }

    #[test]
    fn sheet_variant_never_uses_incremental_column() {
        let mut job = sample_job();
        job.variant = JobVariant::SheetToWarehouse;
        let validated = ValidatedJob { job };
        assert!(!validated.uses_incremental_column());
    }
}
