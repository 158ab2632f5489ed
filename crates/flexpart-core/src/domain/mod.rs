pub mod errors;

pub use errors::{
    FlexpartError, FlexpartErrorCategory, FlexpartResult, SettingsResult,
    WorkflowExitCode, WorkflowResult,
};

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const SIMULATION_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Start timestamp of one simulation instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimulationDate(NaiveDateTime);

impl SimulationDate {
    pub fn parse(value: &str) -> FlexpartResult<Self> {
        NaiveDateTime::parse_from_str(value.trim(), SIMULATION_DATE_FORMAT)
            .map(Self)
            .map_err(|source| {
                FlexpartError::input_validation(
                    "INPUT.DATE_FORMAT",
                    format!(
                        "invalid simulation date '{}': expected '{}' ({})",
                        value, SIMULATION_DATE_FORMAT, source
                    ),
                )
            })
    }

    pub const fn from_datetime(value: NaiveDateTime) -> Self {
        Self(value)
    }

    pub const fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    pub fn shifted(&self, seconds: i64) -> Self {
        Self(self.0 + Duration::seconds(seconds))
    }

    pub fn format(&self, pattern: &str) -> String {
        self.0.format(pattern).to_string()
    }
}

impl Display for SimulationDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(SIMULATION_DATE_FORMAT))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub const fn from_sign(sign: i64) -> Self {
        if sign > 0 {
            Self::Forward
        } else {
            Self::Backward
        }
    }

    pub const fn sign(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Regional,
    Global,
}

impl ModelFamily {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Regional => "regional",
            Self::Global => "global",
        }
    }
}

impl Display for ModelFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct JobId(pub u64);

impl Display for JobId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    MeteoStaging,
    Simulation,
    PostProcessing,
    Inversion,
    CollectSensitivities,
}

impl JobKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MeteoStaging => "meteo",
            Self::Simulation => "simulation",
            Self::PostProcessing => "post",
            Self::Inversion => "inversion",
            Self::CollectSensitivities => "collect",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Finished { exit_code: i32 },
    Excepted { message: String },
}

impl JobStatus {
    pub fn is_finished_ok(&self) -> bool {
        matches!(self, Self::Finished { exit_code: 0 })
    }

    pub fn workflow_exit_code(&self) -> WorkflowExitCode {
        match self {
            Self::Finished { exit_code: 0 } => WorkflowExitCode::Ok,
            Self::Finished { exit_code: 1 } => WorkflowExitCode::MarkerMissing,
            Self::Finished { exit_code: 300 } => WorkflowExitCode::MissingOutputFiles,
            _ => WorkflowExitCode::CalculationFailed,
        }
    }
}

/// Working directory of a finished job, borrowed read-only by dependent jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RemoteFolder(PathBuf);

impl RemoteFolder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.0.join(name)
    }

    pub fn display_path(&self) -> String {
        self.0.to_string_lossy().into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub label: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub remote_folder: Option<RemoteFolder>,
    pub retrieved: Vec<PathBuf>,
    pub output_file: Option<PathBuf>,
}

impl JobRecord {
    pub fn is_finished_ok(&self) -> bool {
        self.status.is_finished_ok()
    }
}
