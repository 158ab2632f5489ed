//! Meteorological input staging: one shell job per model for a date window.

use crate::domain::{FlexpartResult, JobKind, JobRecord};
use crate::jobs::{Code, JobBackend, JobSpec};
use crate::time_window::MeteoWindow;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct StagingRequest<'a> {
    pub window: MeteoWindow,
    pub gribdir: &'a str,
    pub models: &'a [String],
    pub code: Code,
}

#[derive(Debug, Clone, Default)]
pub struct StagingOutcome {
    pub records: Vec<JobRecord>,
}

impl StagingOutcome {
    /// True iff every staging job finished ok; vacuously true with no models.
    pub fn is_ok(&self) -> bool {
        self.records.iter().all(JobRecord::is_finished_ok)
    }

    pub fn failed_labels(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|record| !record.is_finished_ok())
            .map(|record| record.label.as_str())
            .collect()
    }
}

pub fn staging_arguments(window: &MeteoWindow, gribdir: &str, model: &str) -> Vec<String> {
    [
        "-s",
        window.start.as_str(),
        "-e",
        window.end.as_str(),
        "-g",
        gribdir,
        "-m",
        model,
        "-a",
    ]
    .into_iter()
    .map(ToString::to_string)
    .collect()
}

/// Submits every staging job before waiting on any of them.
pub fn stage_meteo<B: JobBackend>(
    backend: &mut B,
    request: &StagingRequest<'_>,
) -> FlexpartResult<StagingOutcome> {
    info!(
        "preparing meteo from {} to {}",
        request.window.start, request.window.end
    );

    let mut submitted = Vec::with_capacity(request.models.len());
    for model in request.models {
        info!("transfering {model} meteo");
        let submission = backend.submit(JobSpec::Shell {
            label: format!("meteo-{model}"),
            kind: JobKind::MeteoStaging,
            code: request.code.clone(),
            arguments: staging_arguments(&request.window, request.gribdir, model),
        });
        match submission {
            Ok(id) => submitted.push(id),
            Err(error) => {
                // Jobs already started are reaped before giving up.
                for id in submitted {
                    if let Err(drained) = backend.wait(id) {
                        warn!("staging job {id} could not be reaped: {drained}");
                    }
                }
                return Err(error);
            }
        }
    }

    let mut outcome = StagingOutcome::default();
    let mut first_error = None;
    for id in submitted {
        match backend.wait(id) {
            Ok(record) => outcome.records.push(record),
            Err(error) => {
                warn!("waiting on staging job {id} failed: {error}");
                first_error.get_or_insert(error);
            }
        }
    }
    if let Some(error) = first_error {
        return Err(error);
    }

    if outcome.is_ok() {
        info!("ALL meteo OK");
    } else {
        warn!("meteo staging failed for {:?}", outcome.failed_labels());
    }
    Ok(outcome)
}
