//! Multi-date orchestration: staging, simulations, continuations, post-processing.
//!
//! The orchestrator owns the per-date bookkeeping and delegates every
//! decision about what comes next to [`state::transition`].

pub mod collect;
pub mod inversion;
pub mod report;
pub mod results;
pub mod state;

pub use collect::{CollectOutcome, run_collect_sensitivities};
pub use inversion::{InversionOutcome, run_inversion};
pub use report::{RunReport, write_report};
pub use results::{NamedOutput, collect_outputs, output_name};
pub use state::{StepContext, StepEvent, Transition, WorkflowState, transition};

use crate::calculations::{Calculation, FlexpartCalculation, PostCalculation};
use crate::domain::{
    FlexpartError, JobKind, JobRecord, ModelFamily, SimulationDate, WorkflowResult,
};
use crate::jobs::{Code, JobBackend, JobSpec};
use crate::meteo::{StagingRequest, stage_meteo};
use crate::models::{DispatchGates, stager_family};
use crate::settings::{CodeTable, RunConfig, reformat_locations};
use crate::time_window::MeteoWindow;
use serde::Serialize;
use tracing::{debug, error, info, warn};

const DATE_TAG_FORMAT: &str = "%Y%m%d%H";

/// Jobs run for one date that reached post-processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateSummary {
    pub date: String,
    pub simulations: Vec<String>,
    pub post_processing: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDate {
    pub date: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowOutcome {
    /// Simulations and post-processing jobs in submission order.
    pub calculations: Vec<JobRecord>,
    pub staging: Vec<JobRecord>,
    pub dates: Vec<DateSummary>,
    pub skipped: Vec<SkippedDate>,
}

impl WorkflowOutcome {
    pub fn simulations(&self) -> impl Iterator<Item = &JobRecord> {
        self.calculations
            .iter()
            .filter(|record| record.kind == JobKind::Simulation)
    }
}

pub struct Orchestrator<'a, B: JobBackend> {
    config: &'a RunConfig,
    backend: &'a mut B,
    dates: Vec<SimulationDate>,
    gates: DispatchGates,
    index: usize,
    state: WorkflowState,
    primary_done: bool,
    /// Simulations of the current date, primary first.
    date_runs: Vec<JobRecord>,
    outcome: WorkflowOutcome,
}

impl<'a, B: JobBackend> Orchestrator<'a, B> {
    pub fn new(config: &'a RunConfig, backend: &'a mut B) -> WorkflowResult<Self> {
        let dates = config.simulation_dates()?;
        let gates = DispatchGates::compute(
            &config.model_families,
            &config.model,
            &config.model_offline,
            config.offline_integration_time,
        );
        debug!(?gates, dates = dates.len(), "multi-date workflow configured");
        if gates.is_noop() {
            warn!("no model family matches {:?}; every date will be skipped", config.model);
        }

        Ok(Self {
            config,
            backend,
            dates,
            gates,
            index: 0,
            state: WorkflowState::AwaitDate,
            primary_done: false,
            date_runs: Vec::new(),
            outcome: WorkflowOutcome::default(),
        })
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn gates(&self) -> DispatchGates {
        self.gates
    }

    /// Executes the current state and moves to the next one.
    pub fn step(&mut self) -> WorkflowResult<WorkflowState> {
        let event = match self.state {
            WorkflowState::Done => return Ok(WorkflowState::Done),
            WorkflowState::AwaitDate => self.await_date(),
            WorkflowState::StageMeteoRegional => self.stage(false)?,
            WorkflowState::StageMeteoGlobal => {
                let continuation = self.context().continuation_pending();
                self.stage(continuation)?
            }
            WorkflowState::RunRegional => self.simulate(ModelFamily::Regional, false)?,
            WorkflowState::RunGlobal => self.simulate(ModelFamily::Global, false)?,
            WorkflowState::RunOfflineContinuation => self.simulate(ModelFamily::Global, true)?,
            WorkflowState::PostProcess => self.post_process()?,
        };

        let step = transition(self.state, self.context(), event)?;
        if step.advance_index {
            if self.state == WorkflowState::AwaitDate {
                self.skip_current("no model family selected for this date");
            }
            self.index += 1;
        }
        debug!(from = %self.state, to = %step.next, index = self.index, "workflow transition");
        self.state = step.next;
        Ok(self.state)
    }

    pub fn run(mut self) -> WorkflowResult<WorkflowOutcome> {
        while !self.state.is_terminal() {
            self.step()?;
        }
        info!(
            calculations = self.outcome.calculations.len(),
            skipped = self.outcome.skipped.len(),
            "multi-date workflow finished"
        );
        Ok(self.outcome)
    }

    fn context(&self) -> StepContext {
        StepContext {
            gates: self.gates,
            primary_done: self.primary_done,
        }
    }

    fn current_date(&self) -> WorkflowResult<SimulationDate> {
        self.dates.get(self.index).copied().ok_or_else(|| {
            FlexpartError::internal(
                "SYS.WORKFLOW_INDEX",
                format!("date index {} is past the {} dates", self.index, self.dates.len()),
            )
        })
    }

    fn await_date(&mut self) -> StepEvent {
        self.primary_done = false;
        self.date_runs.clear();
        if self.index < self.dates.len() {
            StepEvent::DatesRemaining
        } else {
            StepEvent::DatesExhausted
        }
    }

    fn skip_current(&mut self, reason: &str) {
        let date = self
            .dates
            .get(self.index)
            .map(ToString::to_string)
            .unwrap_or_default();
        warn!("skipping {date}: {reason}");
        self.outcome.skipped.push(SkippedDate {
            date,
            reason: reason.to_string(),
        });
    }

    fn stage(&mut self, continuation: bool) -> WorkflowResult<StepEvent> {
        let config = self.config;
        let date = self.current_date()?;
        let (models, age) = if continuation {
            (&config.model_offline, config.offline_age_class_seconds())
        } else {
            (&config.model, config.age_class_seconds())
        };
        let command = config.base_command()?;
        let window = MeteoWindow::compute(date, age, command.release_duration, command.direction())?;

        let family = stager_family(&config.model_families, &config.model, continuation);
        let code = match family {
            ModelFamily::Regional => Code::new(
                "check-meteo-cosmo",
                CodeTable::require(&config.codes.check_meteo_cosmo, "check_meteo_cosmo")?,
            ),
            ModelFamily::Global => Code::new(
                "check-meteo-ifs",
                CodeTable::require(&config.codes.check_meteo_ifs, "check_meteo_ifs")?,
            ),
        };

        let request = StagingRequest {
            window,
            gribdir: &config.gribdir,
            models,
            code,
        };
        let staging = stage_meteo(&mut *self.backend, &request)?;
        let ok = staging.is_ok();
        let failed = staging.failed_labels().join(", ");
        self.outcome.staging.extend(staging.records);

        if ok {
            Ok(StepEvent::StagingSucceeded)
        } else {
            self.skip_current(&format!("meteo staging failed ({failed})"));
            Ok(StepEvent::StagingFailed)
        }
    }

    fn simulate(&mut self, family: ModelFamily, continuation: bool) -> WorkflowResult<StepEvent> {
        let calculation = self.flexpart_calculation(family, continuation)?;
        match family {
            ModelFamily::Regional => info!("starting flexpart cosmo {}", calculation.start),
            ModelFamily::Global => info!("running flexpart ifs for {}", calculation.start),
        }
        if let Some(parent) = &calculation.parent_folder {
            info!("starting from: {}", parent.display_path());
        }

        let code = match family {
            ModelFamily::Regional => Code::new(
                "flexpart-cosmo",
                CodeTable::require(&self.config.codes.flexpart_cosmo, "flexpart_cosmo")?,
            ),
            ModelFamily::Global => Code::new(
                "flexpart-ifs",
                CodeTable::require(&self.config.codes.flexpart_ifs, "flexpart_ifs")?,
            ),
        };
        let record = self.submit(code, &calculation)?;
        if !continuation {
            self.primary_done = true;
        }
        self.date_runs.push(record);
        Ok(StepEvent::JobFinished)
    }

    fn flexpart_calculation(
        &self,
        family: ModelFamily,
        continuation: bool,
    ) -> WorkflowResult<FlexpartCalculation> {
        let config = self.config;
        let start = self.current_date()?;

        let (command, age, meteo_paths) = if continuation {
            (
                config.offline_command()?,
                config.offline_age_class_seconds(),
                config.meteo_path_offline.clone(),
            )
        } else {
            (
                config.primary_command()?,
                config.age_class_seconds(),
                config.meteo_path.clone(),
            )
        };

        let models = if continuation {
            &config.model_offline
        } else {
            &config.model
        };
        let site_model = models
            .first()
            .or_else(|| config.model_offline.first())
            .ok_or_else(|| {
                FlexpartError::input_validation(
                    "INPUT.MODEL_LIST",
                    "no model is configured to resolve release levels for",
                )
            })?;
        let sites = reformat_locations(&config.locations, site_model)?;

        let parent_folder = if continuation {
            let parent = self.date_runs.last().and_then(|run| run.remote_folder.clone());
            Some(parent.ok_or_else(|| {
                FlexpartError::internal(
                    "SYS.CONTINUATION_PARENT",
                    format!("offline continuation of {start} has no finished primary run"),
                )
            })?)
        } else {
            None
        };

        let (tag, land_use, options) = match family {
            ModelFamily::Regional => ("cosmo", &config.land_use, &config.options.flexpart_cosmo),
            ModelFamily::Global => ("ifs", &config.land_use_ifs, &config.options.flexpart_ifs),
        };
        let mut label = format!("flexpart-{tag}-{}", start.format(DATE_TAG_FORMAT));
        if continuation {
            label.push_str("-offline");
        }

        Ok(FlexpartCalculation {
            family,
            label,
            start,
            age_class_seconds: age,
            command,
            sites,
            release_settings: config.release_settings.clone(),
            input_phy: config.input_phy.clone(),
            outgrid: config.outgrid.clone(),
            outgrid_nest: config.outgrid_nest.clone(),
            species: config.species.clone(),
            land_use: land_use.values().cloned().collect(),
            meteo_paths,
            parent_folder,
            options: options.clone(),
        })
    }

    fn post_process(&mut self) -> WorkflowResult<StepEvent> {
        info!("starting post-processsing");
        let date = self.current_date()?;
        let continued = self.primary_done && self.gates.offline_continuation && self.date_runs.len() >= 2;
        let (input, offline) = match self.date_runs.as_slice() {
            [.., primary, continuation] if continued => (primary, Some(continuation)),
            [.., last] => (last, None),
            [] => {
                return Err(FlexpartError::internal(
                    "SYS.POST_INPUT",
                    format!("post-processing of {date} has no simulation to read"),
                ));
            }
        };

        let folder = |record: &JobRecord| {
            record.remote_folder.clone().ok_or_else(|| {
                FlexpartError::internal(
                    "SYS.POST_INPUT",
                    format!("simulation '{}' left no working folder", record.label),
                )
            })
        };
        let post = PostCalculation {
            label: format!("post-{}", date.format(DATE_TAG_FORMAT)),
            input_dir: folder(input)?,
            input_offline_dir: offline.map(folder).transpose()?,
            options: self.config.options.post_processing.clone(),
        };
        let simulations = self.date_runs.iter().map(|run| run.label.clone()).collect();

        let code = Code::new("post-processing", self.config.codes.post_processing.clone());
        let record = self.submit(code, &post)?;
        self.outcome.dates.push(DateSummary {
            date: date.to_string(),
            simulations,
            post_processing: record.label,
        });
        Ok(StepEvent::JobFinished)
    }

    /// Runs one calculation to completion; any non-ok status is fatal.
    fn submit(&mut self, code: Code, calculation: &impl Calculation) -> WorkflowResult<JobRecord> {
        let info = calculation.prepare()?;
        let record = self.backend.run(JobSpec::Calculation { code, info })?;
        self.outcome.calculations.push(record.clone());

        if !record.is_finished_ok() {
            error!(
                job = %record.id,
                status = ?record.status,
                "ERROR calculation did not finish ok: {}",
                record.label
            );
            return Err(FlexpartError::calculation_failed(
                &record.label,
                record.status.workflow_exit_code(),
            ));
        }
        Ok(record)
    }
}

/// Runs every date of `config` against `backend`.
pub fn run_multi_dates<B: JobBackend>(
    config: &RunConfig,
    backend: &mut B,
) -> WorkflowResult<WorkflowOutcome> {
    Orchestrator::new(config, backend)?.run()
}

#[cfg(test)]
mod tests {
    use super::{Orchestrator, WorkflowState, run_multi_dates};
    use crate::domain::{FlexpartErrorCategory, JobKind, JobStatus};
    use crate::jobs::JobSpec;
    use crate::jobs::testing::ScriptedBackend;
    use crate::settings::RunConfig;

    const CONFIG: &str = r#"
codes:
  flexpart_cosmo: /opt/flexpart/cosmo
  flexpart_ifs: /opt/flexpart/ifs
  post_processing: /opt/flexpart/post
  check_meteo_cosmo: /opt/meteo/cosmo.sh
  check_meteo_ifs: /opt/meteo/ifs.sh
simulation_dates: ["2021-01-02--2021-01-03"]
gribdir: /scratch/grib
model: [cosmo7]
model_offline: [IFS_GL_05]
integration_time: 24
offline_integration_time: 48
release_settings:
  particles_per_release: 1000
  mass_per_release: [1.0]
  list_of_species: [1]
locations:
  JFJ:
    longitude: 7.985
    latitude: 46.548
    level: {default: 5.0}
    level_type: {cosmo7: 1, IFS_GL_05: 1}
outgrid:
  longitude_of_output_grid: -10.0
  latitude_of_output_grid: 35.0
  number_of_grid_points_x: 20
  number_of_grid_points_y: 15
  grid_distance_x: 0.5
  grid_distance_y: 0.5
  heights_of_levels: [100.0]
species: /store/SPECIES
meteo_path: [/store/meteo/cosmo7]
meteo_path_offline: [/store/meteo/ifs]
"#;

    fn config(patch: impl FnOnce(&mut RunConfig)) -> RunConfig {
        let mut config: RunConfig = serde_yaml::from_str(CONFIG).expect("config parses");
        patch(&mut config);
        config
    }

    fn regional_only(config: &mut RunConfig) {
        config.model_offline = Vec::new();
        config.offline_integration_time = 0;
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn arguments(spec: &JobSpec) -> Vec<String> {
        match spec {
            JobSpec::Calculation { info, .. } => info.cmdline_params.clone(),
            JobSpec::Shell { arguments, .. } => arguments.clone(),
        }
    }

    #[test]
    fn regional_dates_run_stage_simulate_post_in_order() {
        let config = config(regional_only);
        let mut backend = ScriptedBackend::succeeding();
        let outcome = run_multi_dates(&config, &mut backend).expect("workflow succeeds");

        assert_eq!(
            backend.labels(),
            vec![
                "meteo-cosmo7",
                "flexpart-cosmo-2021010200",
                "post-2021010200",
                "meteo-cosmo7",
                "flexpart-cosmo-2021010300",
                "post-2021010300",
            ]
        );
        assert_eq!(outcome.simulations().count(), 2);
        assert_eq!(outcome.dates.len(), 2);
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.calculations.len(), 4);
    }

    #[test]
    fn global_offline_list_without_continuation_runs_both_primaries() {
        let config = config(|config| config.offline_integration_time = 0);
        let mut backend = ScriptedBackend::succeeding();
        let outcome = run_multi_dates(&config, &mut backend).expect("workflow succeeds");

        assert_eq!(
            &backend.labels()[..5],
            [
                "meteo-cosmo7",
                "flexpart-cosmo-2021010200",
                "meteo-cosmo7",
                "flexpart-ifs-2021010200",
                "post-2021010200",
            ]
        );
        assert_eq!(backend.submitted.len(), 10);
        assert_eq!(outcome.simulations().count(), 4);
        assert_eq!(
            outcome.dates[0].simulations,
            strings(&["flexpart-cosmo-2021010200", "flexpart-ifs-2021010200"])
        );
        // post reads the most recent primary and no offline folder
        assert_eq!(
            arguments(&backend.submitted[4]),
            strings(&["-m", "/scratch/0004-flexpart-ifs-2021010200", "-r", "./"])
        );
    }

    #[test]
    fn offline_continuation_follows_its_primary_and_feeds_post() {
        let config = config(|_| {});
        let mut backend = ScriptedBackend::succeeding();
        let outcome = run_multi_dates(&config, &mut backend).expect("workflow succeeds");

        let first_day = &backend.labels()[..5];
        assert_eq!(
            first_day,
            [
                "meteo-cosmo7",
                "flexpart-cosmo-2021010200",
                "meteo-IFS_GL_05",
                "flexpart-ifs-2021010200-offline",
                "post-2021010200",
            ]
        );
        assert_eq!(outcome.simulations().count(), 4);

        // ids: 1 meteo, 2 cosmo, 3 meteo, 4 ifs, 5 post
        let continuation = &backend.submitted[3];
        let JobSpec::Calculation { info, .. } = continuation else {
            panic!("continuation should be a calculation");
        };
        let header = info
            .symlinks
            .iter()
            .find(|link| link.link_name == "header_previous")
            .expect("parent header linked");
        assert_eq!(
            header.source,
            std::path::PathBuf::from("/scratch/0002-flexpart-cosmo-2021010200/header")
        );
        assert_eq!(
            arguments(&backend.submitted[4]),
            strings(&[
                "-m",
                "/scratch/0002-flexpart-cosmo-2021010200",
                "-r",
                "./",
                "-n",
                "/scratch/0004-flexpart-ifs-2021010200-offline",
            ])
        );
        assert_eq!(
            outcome.dates[0].simulations,
            strings(&["flexpart-cosmo-2021010200", "flexpart-ifs-2021010200-offline"])
        );
    }

    #[test]
    fn continuation_stages_with_global_script_and_offline_age() {
        let config = config(|_| {});
        let mut backend = ScriptedBackend::succeeding();
        run_multi_dates(&config, &mut backend).expect("workflow succeeds");

        let JobSpec::Shell { code, arguments, .. } = &backend.submitted[2] else {
            panic!("staging is a shell job");
        };
        assert_eq!(code.executable, std::path::PathBuf::from("/opt/meteo/ifs.sh"));
        // 24h release, 48h offline age and a one hour pad before 2021-01-02 00
        assert_eq!(arguments[1], "2020122923");
        assert_eq!(arguments[3], "2021010200");
        assert_eq!(arguments[7], "IFS_GL_05");
    }

    #[test]
    fn staging_failure_skips_date_and_moves_on() {
        let config = config(regional_only);
        let counter = std::cell::Cell::new(0usize);
        let mut backend = ScriptedBackend::with_policy(move |spec: &JobSpec| {
            if spec.kind() == JobKind::MeteoStaging {
                counter.set(counter.get() + 1);
                if counter.get() == 1 {
                    return JobStatus::Finished { exit_code: 2 };
                }
            }
            JobStatus::Finished { exit_code: 0 }
        });
        let outcome = run_multi_dates(&config, &mut backend).expect("workflow continues");

        assert_eq!(backend.submitted.len(), 4);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].date, "2021-01-02 00:00:00");
        assert!(outcome.skipped[0].reason.contains("meteo-cosmo7"));
        assert_eq!(outcome.dates.len(), 1);
        assert_eq!(outcome.dates[0].date, "2021-01-03 00:00:00");
    }

    #[test]
    fn failed_simulation_aborts_with_calculation_failed() {
        let config = config(|_| {});
        let mut backend = ScriptedBackend::with_policy(|spec: &JobSpec| {
            if spec.label() == "flexpart-cosmo-2021010200" {
                JobStatus::Finished { exit_code: 300 }
            } else {
                JobStatus::Finished { exit_code: 0 }
            }
        });
        let error = run_multi_dates(&config, &mut backend).expect_err("simulation failed");

        assert_eq!(error.category(), FlexpartErrorCategory::ComputationError);
        assert_eq!(error.placeholder(), "RUN.CALCULATION_FAILED");
        assert!(error.message().contains("workflow exit code 400"));
        assert!(error.message().contains("flexpart-cosmo-2021010200"));
        assert_eq!(backend.labels().last().map(String::as_str), Some("flexpart-cosmo-2021010200"));
    }

    #[test]
    fn global_main_models_use_global_stager_and_ifs_code() {
        let config = config(|config| {
            config.model = strings(&["IFS_GL_05"]);
            config.model_offline = Vec::new();
            config.offline_integration_time = 0;
        });
        let mut backend = ScriptedBackend::succeeding();
        run_multi_dates(&config, &mut backend).expect("workflow succeeds");

        assert_eq!(
            &backend.labels()[..3],
            ["meteo-IFS_GL_05", "flexpart-ifs-2021010200", "post-2021010200"]
        );
        assert_eq!(backend.submitted[0].code().label, "check-meteo-ifs");
        assert_eq!(backend.submitted[1].code().label, "flexpart-ifs");
    }

    #[test]
    fn mixed_main_models_are_skipped() {
        let config = config(|config| {
            config.model = strings(&["cosmo7", "IFS_GL_05"]);
            config.model_offline = Vec::new();
        });
        let mut backend = ScriptedBackend::succeeding();
        let outcome = run_multi_dates(&config, &mut backend).expect("nothing dispatched");

        assert!(backend.submitted.is_empty());
        assert_eq!(outcome.skipped.len(), 2);
    }

    #[test]
    fn step_walks_one_state_at_a_time() {
        let config = config(|config| {
            regional_only(config);
            config.simulation_dates = strings(&["2021-01-02"]);
        });
        let mut backend = ScriptedBackend::succeeding();
        let mut orchestrator = Orchestrator::new(&config, &mut backend).expect("orchestrator");

        let mut visited = vec![orchestrator.state()];
        while !orchestrator.state().is_terminal() {
            visited.push(orchestrator.step().expect("step"));
        }
        assert_eq!(
            visited,
            vec![
                WorkflowState::AwaitDate,
                WorkflowState::StageMeteoRegional,
                WorkflowState::RunRegional,
                WorkflowState::PostProcess,
                WorkflowState::AwaitDate,
                WorkflowState::Done,
            ]
        );
        assert_eq!(orchestrator.index(), 1);
    }
}
