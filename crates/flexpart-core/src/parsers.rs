//! Pass/fail decision for finished calculations, read from their stdout log.

use crate::domain::{FlexpartError, FlexpartResult, WorkflowExitCode};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const FLEXPART_SUCCESS_MARKER: &str = "CONGRATULATIONS";
pub const COLLECT_SENSITIVITIES_MARKER: &str = "Writing";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputParser {
    /// The stdout log must be retrieved and contain `marker`.
    Marker { marker: String },
    /// The stdout log must be retrieved.
    Presence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub exit_code: WorkflowExitCode,
    /// Retrieved stdout log; set whenever it was found, even on marker failure.
    pub output_file: Option<PathBuf>,
}

impl OutputParser {
    pub fn flexpart() -> Self {
        Self::Marker {
            marker: FLEXPART_SUCCESS_MARKER.to_string(),
        }
    }

    pub fn collect_sensitivities() -> Self {
        Self::Marker {
            marker: COLLECT_SENSITIVITIES_MARKER.to_string(),
        }
    }

    /// `retrieved` holds file names relative to `folder`.
    pub fn parse(
        &self,
        folder: &Path,
        output_filename: &str,
        retrieved: &[PathBuf],
    ) -> FlexpartResult<ParseOutcome> {
        if !retrieved.iter().any(|name| name == Path::new(output_filename)) {
            error!(
                "found files {:?}, expected to find '{}'",
                retrieved, output_filename
            );
            return Ok(ParseOutcome {
                exit_code: WorkflowExitCode::MissingOutputFiles,
                output_file: None,
            });
        }

        let output_file = folder.join(output_filename);
        let Self::Marker { marker } = self else {
            return Ok(ParseOutcome {
                exit_code: WorkflowExitCode::Ok,
                output_file: Some(output_file),
            });
        };

        info!("parsing '{}'", output_file.display());
        let content = fs::read_to_string(&output_file).map_err(|source| {
            FlexpartError::io_system(
                "IO.OUTPUT_READ",
                format!("failed to read '{}': {}", output_file.display(), source),
            )
        })?;

        let exit_code = if content.contains(marker.as_str()) {
            WorkflowExitCode::Ok
        } else {
            WorkflowExitCode::MarkerMissing
        };
        Ok(ParseOutcome {
            exit_code,
            output_file: Some(output_file),
        })
    }
}
