use super::results::{NamedOutput, collect_outputs};
use super::{DateSummary, SkippedDate, WorkflowOutcome};
use super::collect::CollectOutcome;
use super::inversion::InversionOutcome;
use crate::domain::{FlexpartError, FlexpartResult, JobRecord};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// JSON summary of a finished workflow.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub workflow: &'static str,
    pub outputs: Vec<NamedOutput>,
    pub calculations: Vec<JobRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub staging: Vec<JobRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dates: Vec<DateSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedDate>,
}

impl RunReport {
    pub fn from_multi_dates(outcome: WorkflowOutcome) -> FlexpartResult<Self> {
        Ok(Self {
            workflow: "multi_dates",
            outputs: collect_outputs(&outcome.calculations)?,
            calculations: outcome.calculations,
            staging: outcome.staging,
            dates: outcome.dates,
            skipped: outcome.skipped,
        })
    }

    pub fn from_inversion(outcome: InversionOutcome) -> FlexpartResult<Self> {
        Ok(Self {
            workflow: "inversion",
            outputs: collect_outputs(&outcome.calculations)?,
            calculations: outcome.calculations,
            staging: Vec::new(),
            dates: Vec::new(),
            skipped: Vec::new(),
        })
    }

    pub fn from_collect(outcome: CollectOutcome) -> FlexpartResult<Self> {
        Ok(Self {
            workflow: "collect_sensitivities",
            outputs: collect_outputs(&outcome.calculations)?,
            calculations: outcome.calculations,
            staging: Vec::new(),
            dates: Vec::new(),
            skipped: Vec::new(),
        })
    }
}

pub fn write_report(path: &Path, report: &RunReport) -> FlexpartResult<()> {
    let document = serde_json::to_string_pretty(report).map_err(|source| {
        FlexpartError::internal(
            "SYS.REPORT_SERIALIZE",
            format!("failed to serialize run report: {source}"),
        )
    })?;
    fs::write(path, document).map_err(|source| {
        FlexpartError::io_system(
            "IO.REPORT_WRITE",
            format!("failed to write report '{}': {source}", path.display()),
        )
    })?;
    info!("report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{RunReport, write_report};
    use crate::domain::{JobId, JobKind, JobRecord, JobStatus, RemoteFolder};
    use crate::workflow::{DateSummary, WorkflowOutcome};
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn report_lists_named_outputs_and_job_states() {
        let outcome = WorkflowOutcome {
            calculations: vec![JobRecord {
                id: JobId(2),
                label: "flexpart-cosmo-2021010200".to_string(),
                kind: JobKind::Simulation,
                status: JobStatus::Finished { exit_code: 0 },
                remote_folder: Some(RemoteFolder::new("/scratch/0002")),
                retrieved: vec![PathBuf::from("aiida.out")],
                output_file: Some(PathBuf::from("/scratch/0002/aiida.out")),
            }],
            dates: vec![DateSummary {
                date: "2021-01-02 00:00:00".to_string(),
                simulations: vec!["flexpart-cosmo-2021010200".to_string()],
                post_processing: "post-2021010200".to_string(),
            }],
            ..WorkflowOutcome::default()
        };
        let report = RunReport::from_multi_dates(outcome).expect("report");

        let directory = tempfile::tempdir().expect("tempdir");
        let path = directory.path().join("report.json");
        write_report(&path, &report).expect("report written");

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read report")).expect("json");
        assert_eq!(value["workflow"], "multi_dates");
        assert_eq!(value["outputs"][0]["name"], "calculation_0_output_file");
        assert_eq!(value["calculations"][0]["status"]["state"], "finished");
        assert_eq!(value["calculations"][0]["status"]["exit_code"], 0);
        assert_eq!(value["calculations"][0]["id"], 2);
        assert!(value.get("skipped").is_none());
    }
}
