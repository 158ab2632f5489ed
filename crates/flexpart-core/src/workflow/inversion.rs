use crate::calculations::{Calculation, InversionCalculation};
use crate::dates::{DAY_FORMAT, chunk_ranges, parse_date_range, widened_chunk};
use crate::domain::{FlexpartError, JobRecord, WorkflowResult};
use crate::jobs::{Code, JobBackend, JobSpec};
use crate::settings::InversionConfig;
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Clone, Default, Serialize)]
pub struct InversionOutcome {
    /// One record per chunk, in chronological order.
    pub calculations: Vec<JobRecord>,
}

pub fn inversion_calculations(config: &InversionConfig) -> WorkflowResult<Vec<InversionCalculation>> {
    let (start, end) = parse_date_range(&config.date_range)?;
    chunk_ranges(start, end, config.chunk, config.chunk.as_str())?
        .into_iter()
        .map(|range| -> WorkflowResult<InversionCalculation> {
            Ok(InversionCalculation {
                label: format!("inversion-{}", range.start.format(DAY_FORMAT)),
                chunk_range: range,
                data_window: widened_chunk(range.start, config.chunk, &config.chunk_w)?,
                chunk: config.chunk,
                chunk_w: config.chunk_w.clone(),
                inv_params: config.inv_params.clone(),
                remotes: config.remotes.clone(),
                options: config.options.clone(),
            })
        })
        .collect()
}

/// Submits one inversion per chunk, then waits for all of them.
pub fn run_inversion<B: JobBackend>(
    config: &InversionConfig,
    backend: &mut B,
) -> WorkflowResult<InversionOutcome> {
    let calculations = inversion_calculations(config)?;
    info!(
        "submitting {} inversion chunks over {}",
        calculations.len(),
        config.date_range
    );

    let code = Code::new("inversion", config.inversion_code.clone());
    let mut submitted = Vec::with_capacity(calculations.len());
    for calculation in &calculations {
        let info = calculation.prepare()?;
        submitted.push(backend.submit(JobSpec::Calculation {
            code: code.clone(),
            info,
        })?);
    }

    let mut outcome = InversionOutcome::default();
    for id in submitted {
        outcome.calculations.push(backend.wait(id)?);
    }

    if let Some(failed) = outcome.calculations.iter().find(|record| !record.is_finished_ok()) {
        error!("ERROR calculation did not finish ok: {}", failed.label);
        return Err(FlexpartError::calculation_failed(
            &failed.label,
            failed.status.workflow_exit_code(),
        ));
    }
    Ok(outcome)
}
