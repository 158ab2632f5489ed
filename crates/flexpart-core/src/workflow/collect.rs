use crate::calculations::{Calculation, CollectSensCalculation};
use crate::domain::{FlexpartError, JobRecord, WorkflowResult};
use crate::jobs::{Code, JobBackend, JobSpec};
use crate::settings::CollectConfig;
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectOutcome {
    pub calculations: Vec<JobRecord>,
}

pub fn run_collect_sensitivities<B: JobBackend>(
    config: &CollectConfig,
    backend: &mut B,
) -> WorkflowResult<CollectOutcome> {
    let calculation = CollectSensCalculation {
        label: "collect-sens".to_string(),
        params: config.params.clone(),
        remotes: config.remotes.clone(),
        options: config.options.clone(),
    };
    info!("collecting sensitivities from {} remotes", config.remotes.len());

    let info = calculation.prepare()?;
    let code = Code::new("collect-sens", config.collect_code.clone());
    let record = backend.run(JobSpec::Calculation { code, info })?;

    if !record.is_finished_ok() {
        error!("ERROR calculation did not finish ok: {}", record.label);
        return Err(FlexpartError::calculation_failed(
            &record.label,
            record.status.workflow_exit_code(),
        ));
    }
    Ok(CollectOutcome {
        calculations: vec![record],
    })
}
