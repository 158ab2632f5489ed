use super::CliError;
use super::helpers::*;
use flexpart_core::dates::expand_simulation_dates;
use flexpart_core::domain::{Direction, SimulationDate};
use flexpart_core::jobs::LocalBackend;
use flexpart_core::models::{DispatchGates, ModelFamilies};
use flexpart_core::settings::{CollectConfig, InversionConfig, RunConfig};
use flexpart_core::time_window::{MeteoWindow, SimulationPeriod};
use flexpart_core::workflow::{RunReport, run_collect_sensitivities, run_inversion, run_multi_dates};
use std::path::PathBuf;
use tracing::debug;

#[derive(clap::Args)]
pub(super) struct RunArgs {
    /// Run description (YAML, or JSON with a .json extension)
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Scratch root for job folders; overrides `scratch_root`
    #[arg(long)]
    scratch: Option<PathBuf>,

    /// JSON report output path; overrides `report`
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct InversionArgs {
    /// Inversion description (YAML, or JSON with a .json extension)
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Scratch root for job folders; overrides `scratch_root`
    #[arg(long)]
    scratch: Option<PathBuf>,

    /// JSON report output path; overrides `report`
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct CollectArgs {
    /// Collection description (YAML, or JSON with a .json extension)
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    #[arg(long)]
    scratch: Option<PathBuf>,

    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct WindowArgs {
    /// Start date, `YYYY-MM-DD HH:MM:SS`
    #[arg(long)]
    date: String,

    /// Age class in seconds
    #[arg(long, default_value_t = 86_400)]
    age_class: i64,

    /// Release duration in seconds
    #[arg(long, default_value_t = 86_400)]
    release_duration: i64,

    /// Simulation direction: 1 forward, -1 backward
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    direction: i64,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
pub(super) struct DatesArgs {
    /// `YYYY-MM-DD`, `YYYY-MM-DD--YYYY-MM-DD` or comma-separated days
    #[arg(value_name = "EXPR", required = true)]
    expressions: Vec<String>,
}

#[derive(clap::Args)]
pub(super) struct GatesArgs {
    /// Main model list
    #[arg(long, value_delimiter = ',')]
    model: Vec<String>,

    /// Offline continuation model list
    #[arg(long, value_delimiter = ',')]
    model_offline: Vec<String>,

    /// Offline integration time in hours
    #[arg(long, default_value_t = 0)]
    offline_integration_time: i64,
}

pub(super) fn run_workflow_command(args: RunArgs) -> Result<i32, CliError> {
    let config = RunConfig::from_path(&args.config)?;
    let scratch = args.scratch.unwrap_or_else(|| config.scratch_root.clone());
    debug!(
        config = %args.config.display(),
        scratch = %scratch.display(),
        "run description loaded"
    );
    let mut backend = LocalBackend::new(scratch)?;

    let outcome = run_multi_dates(&config, &mut backend)?;
    let report = RunReport::from_multi_dates(outcome)?;
    println!("{}", render_run_summary(&report));
    emit_report(args.report.or_else(|| config.report.clone()), &report)?;
    Ok(0)
}

pub(super) fn run_inversion_command(args: InversionArgs) -> Result<i32, CliError> {
    let config = InversionConfig::from_path(&args.config)?;
    let scratch = args.scratch.unwrap_or_else(|| config.scratch_root.clone());
    debug!(
        config = %args.config.display(),
        scratch = %scratch.display(),
        "inversion description loaded"
    );
    let mut backend = LocalBackend::new(scratch)?;

    let outcome = run_inversion(&config, &mut backend)?;
    let report = RunReport::from_inversion(outcome)?;
    println!("{}", render_run_summary(&report));
    emit_report(args.report.or_else(|| config.report.clone()), &report)?;
    Ok(0)
}

pub(super) fn run_collect_command(args: CollectArgs) -> Result<i32, CliError> {
    let config = CollectConfig::from_path(&args.config)?;
    let scratch = args.scratch.unwrap_or_else(|| config.scratch_root.clone());
    let mut backend = LocalBackend::new(scratch)?;

    let outcome = run_collect_sensitivities(&config, &mut backend)?;
    let report = RunReport::from_collect(outcome)?;
    println!("{}", render_run_summary(&report));
    emit_report(args.report.or_else(|| config.report.clone()), &report)?;
    Ok(0)
}

pub(super) fn run_window_command(args: WindowArgs) -> Result<i32, CliError> {
    let start = SimulationDate::parse(&args.date)?;
    if args.release_duration < 0 {
        return Err(CliError::Usage(format!(
            "--release-duration must not be negative, got {}",
            args.release_duration
        )));
    }
    let direction = Direction::from_sign(args.direction);
    let period = SimulationPeriod::compute(start, args.age_class, args.release_duration, direction)?;
    let meteo = MeteoWindow::compute(start, args.age_class, args.release_duration, direction)?;

    if args.json {
        println!("{}", render_json(&window_document(&period, &meteo))?);
    } else {
        println!("{}", render_window_summary(&period, &meteo));
    }
    Ok(0)
}

pub(super) fn run_dates_command(args: DatesArgs) -> Result<i32, CliError> {
    for date in expand_simulation_dates(&args.expressions)? {
        println!("{date}");
    }
    Ok(0)
}

pub(super) fn run_gates_command(args: GatesArgs) -> Result<i32, CliError> {
    let gates = DispatchGates::compute(
        &ModelFamilies::default(),
        &args.model,
        &args.model_offline,
        args.offline_integration_time,
    );
    println!("{}", render_json(&gates)?);
    Ok(0)
}
