use crate::domain::{FlexpartError, FlexpartResult, JobId, JobRecord};
use serde::Serialize;
use std::path::PathBuf;

/// Output file of one calculation, exposed as `calculation_<i>_output_file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedOutput {
    pub name: String,
    pub job: JobId,
    pub label: String,
    pub path: PathBuf,
}

pub fn output_name(index: usize) -> String {
    format!("calculation_{index}_output_file")
}

/// Names the output file of every calculation in submission order.
///
/// A finished calculation without a retrieved output file is an error: the
/// collector runs after every job reported success.
pub fn collect_outputs(calculations: &[JobRecord]) -> FlexpartResult<Vec<NamedOutput>> {
    calculations
        .iter()
        .enumerate()
        .map(|(index, record)| -> FlexpartResult<NamedOutput> {
            let path = record.output_file.clone().ok_or_else(|| {
                FlexpartError::io_system(
                    "IO.OUTPUT_MISSING",
                    format!("calculation '{}' has no retrieved output file", record.label),
                )
            })?;
            Ok(NamedOutput {
                name: output_name(index),
                job: record.id,
                label: record.label.clone(),
                path,
            })
        })
        .collect()
}
