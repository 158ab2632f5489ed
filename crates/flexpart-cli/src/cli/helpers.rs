use super::CliError;
use anyhow::Context;
use flexpart_core::time_window::{MeteoWindow, SimulationPeriod, TimeWindow};
use flexpart_core::workflow::{RunReport, write_report};
use serde::Serialize;
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";
const VERBOSE_FILTER: &str = "debug";

/// Logs go to stderr so stdout stays machine readable.
pub(super) fn init_tracing(verbose: bool) {
    let fallback = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub(super) fn render_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .context("failed to render JSON output")
        .map_err(CliError::from)
}

pub(super) fn emit_report(path: Option<PathBuf>, report: &RunReport) -> Result<(), CliError> {
    let Some(path) = path else {
        return Ok(());
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report directory '{}'", parent.display()))?;
    }
    write_report(&path, report)?;
    println!("JSON report: {}", path.display());
    Ok(())
}

pub(super) fn render_run_summary(report: &RunReport) -> String {
    let mut lines = vec![format!(
        "Workflow {}: {} calculations, {} skipped dates",
        report.workflow,
        report.calculations.len(),
        report.skipped.len()
    )];
    for skipped in &report.skipped {
        lines.push(format!("  skipped {}: {}", skipped.date, skipped.reason));
    }
    for output in &report.outputs {
        lines.push(format!(
            "  {} = {} ({})",
            output.name,
            output.path.display(),
            output.label
        ));
    }
    lines.join("\n")
}

fn window_value(window: &TimeWindow) -> Value {
    let [beginning_date, beginning_time] = window.beginning_pair();
    let [ending_date, ending_time] = window.ending_pair();
    json!({
        "beginning": window.beginning.to_string(),
        "ending": window.ending.to_string(),
        "beginning_date": beginning_date,
        "beginning_time": beginning_time,
        "ending_date": ending_date,
        "ending_time": ending_time,
    })
}

pub(super) fn window_document(period: &SimulationPeriod, meteo: &MeteoWindow) -> Value {
    json!({
        "simulation": window_value(&period.simulation),
        "release": window_value(&period.release),
        "age_class_seconds": period.age_class_seconds,
        "meteo": { "start": meteo.start, "end": meteo.end },
    })
}

pub(super) fn render_window_summary(period: &SimulationPeriod, meteo: &MeteoWindow) -> String {
    let [ibdate, ibtime] = period.simulation.beginning_pair();
    let [iedate, ietime] = period.simulation.ending_pair();
    [
        format!(
            "simulation: {} -> {}",
            period.simulation.beginning, period.simulation.ending
        ),
        format!(
            "release:    {} -> {}",
            period.release.beginning, period.release.ending
        ),
        format!("IBDATE {ibdate} IBTIME {ibtime}"),
        format!("IEDATE {iedate} IETIME {ietime}"),
        format!("meteo:      {} -> {}", meteo.start, meteo.end),
    ]
    .join("\n")
}
