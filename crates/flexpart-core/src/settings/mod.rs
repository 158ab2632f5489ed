//! Run descriptions loaded from YAML (or JSON) documents.
//!
//! Every struct here is immutable once loaded; per-calculation variations
//! such as model-specific COMMAND overlays are derived into fresh values.

pub mod command;
pub mod grid;
pub mod release;

pub use command::CommandSettings;
pub use grid::{OutgridNestSettings, OutgridSettings};
pub use release::{Location, Locations, ReleaseSettings, ReleaseSite, reformat_locations};

use crate::dates::{Chunk, expand_simulation_dates, parse_date_range};
use crate::domain::{FlexpartError, SettingsResult, SimulationDate};
use crate::models::ModelFamilies;
use crate::namelist::{NamelistValue, yaml_key};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_OUTPUT_FILENAME: &str = "aiida.out";
pub const DEFAULT_SCRATCH_ROOT: &str = "flexpart-scratch";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse '{}' as YAML: {source}", path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("failed to parse '{}' as JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid '{section}' settings: {source}")]
    Section {
        section: &'static str,
        source: serde_yaml::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

impl From<SettingsError> for FlexpartError {
    fn from(error: SettingsError) -> Self {
        let message = error.to_string();
        match error {
            SettingsError::Read { .. } => FlexpartError::io_system("IO.SETTINGS_READ", message),
            SettingsError::Yaml { .. }
            | SettingsError::Json { .. }
            | SettingsError::Section { .. } => {
                FlexpartError::input_validation("INPUT.SETTINGS_PARSE", message)
            }
            SettingsError::Invalid(_) => FlexpartError::input_validation("INPUT.SETTINGS", message),
        }
    }
}

/// Reads `path` as JSON when it carries a `.json` extension and as YAML otherwise.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> SettingsResult<T> {
    let source = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));

    let document = if is_json {
        serde_json::from_str(&source).map_err(|source| SettingsError::Json {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        serde_yaml::from_str(&source).map_err(|source| SettingsError::Yaml {
            path: path.to_path_buf(),
            source,
        })?
    };
    Ok(document)
}

/// `&parphy` entries in document order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "serde_yaml::Mapping")]
pub struct InputPhy(Vec<(String, NamelistValue)>);

impl InputPhy {
    pub fn new(entries: Vec<(String, NamelistValue)>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[(String, NamelistValue)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<serde_yaml::Mapping> for InputPhy {
    type Error = FlexpartError;

    fn try_from(mapping: serde_yaml::Mapping) -> Result<Self, Self::Error> {
        let mut entries = Vec::with_capacity(mapping.len());
        for (key, value) in &mapping {
            entries.push((yaml_key(key)?, NamelistValue::from_yaml(value)?));
        }
        Ok(Self(entries))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashOptions {
    pub source_list: Vec<String>,
    pub target_base: PathBuf,
}

/// Scheduler-facing options of one calculation type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    #[serde(default = "default_output_filename")]
    pub output_filename: String,
    #[serde(default)]
    pub stash: Option<StashOptions>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            output_filename: default_output_filename(),
            stash: None,
        }
    }
}

fn default_output_filename() -> String {
    DEFAULT_OUTPUT_FILENAME.to_string()
}

fn default_scratch_root() -> PathBuf {
    PathBuf::from(DEFAULT_SCRATCH_ROOT)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct JobOptionsTable {
    pub flexpart_cosmo: JobOptions,
    pub flexpart_ifs: JobOptions,
    pub post_processing: JobOptions,
}

/// Executables used by a multi-date run. FLEXPART and stager binaries are
/// only required for the model family a run actually dispatches to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CodeTable {
    #[serde(default)]
    pub flexpart_cosmo: Option<PathBuf>,
    #[serde(default)]
    pub flexpart_ifs: Option<PathBuf>,
    pub post_processing: PathBuf,
    #[serde(default)]
    pub check_meteo_cosmo: Option<PathBuf>,
    #[serde(default)]
    pub check_meteo_ifs: Option<PathBuf>,
}

impl CodeTable {
    pub fn require<'a>(code: &'a Option<PathBuf>, name: &str) -> SettingsResult<&'a Path> {
        code.as_deref().ok_or_else(|| {
            SettingsError::Invalid(format!("codes.{name} is required by the selected models")).into()
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_scratch_root")]
    pub scratch_root: PathBuf,
    #[serde(default)]
    pub report: Option<PathBuf>,
    pub codes: CodeTable,
    pub simulation_dates: Vec<String>,
    pub gribdir: String,
    #[serde(default)]
    pub model: Vec<String>,
    #[serde(default)]
    pub model_offline: Vec<String>,
    #[serde(default)]
    pub model_families: ModelFamilies,
    /// Hours.
    pub integration_time: i64,
    /// Hours; zero disables the offline continuation.
    #[serde(default)]
    pub offline_integration_time: i64,
    #[serde(default)]
    pub command: serde_yaml::Mapping,
    #[serde(default)]
    pub input_phy: InputPhy,
    pub release_settings: ReleaseSettings,
    pub locations: Locations,
    pub outgrid: OutgridSettings,
    #[serde(default)]
    pub outgrid_nest: Option<OutgridNestSettings>,
    pub species: PathBuf,
    #[serde(default)]
    pub land_use: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub land_use_ifs: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub meteo_path: Vec<PathBuf>,
    #[serde(default)]
    pub meteo_path_offline: Vec<PathBuf>,
    #[serde(default)]
    pub meteo_inputs: serde_yaml::Mapping,
    #[serde(default)]
    pub meteo_inputs_offline: serde_yaml::Mapping,
    #[serde(default)]
    pub options: JobOptionsTable,
}

impl RunConfig {
    pub fn from_path(path: &Path) -> SettingsResult<Self> {
        let config: Self = load_document(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SettingsResult<()> {
        self.simulation_dates()?;
        if self.integration_time <= 0 {
            return Err(SettingsError::Invalid(format!(
                "integration_time must be a positive number of hours, got {}",
                self.integration_time
            ))
            .into());
        }
        if self.offline_integration_time < 0 {
            return Err(SettingsError::Invalid(format!(
                "offline_integration_time must not be negative, got {}",
                self.offline_integration_time
            ))
            .into());
        }
        self.primary_command()?;
        self.offline_command()?;
        self.release_settings.validate()?;
        if self.locations.is_empty() {
            return Err(SettingsError::Invalid("at least one location is required".to_string()).into());
        }
        Ok(())
    }

    pub fn simulation_dates(&self) -> SettingsResult<Vec<SimulationDate>> {
        expand_simulation_dates(&self.simulation_dates)
    }

    pub fn base_command(&self) -> SettingsResult<CommandSettings> {
        CommandSettings::from_layers(&self.command, &[])
    }

    /// COMMAND settings of a primary simulation: base overlaid with `meteo_inputs`.
    pub fn primary_command(&self) -> SettingsResult<CommandSettings> {
        CommandSettings::from_layers(&self.command, &[&self.meteo_inputs])
    }

    /// COMMAND settings of an offline continuation: base overlaid with
    /// `meteo_inputs_offline`, always dumping particle data.
    pub fn offline_command(&self) -> SettingsResult<CommandSettings> {
        let mut command = CommandSettings::from_layers(&self.command, &[&self.meteo_inputs_offline])?;
        command.dumped_particle_data = true;
        Ok(command)
    }

    pub fn age_class_seconds(&self) -> i64 {
        self.integration_time * 3600
    }

    pub fn offline_age_class_seconds(&self) -> i64 {
        self.offline_integration_time * 3600
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InversionConfig {
    #[serde(default = "default_scratch_root")]
    pub scratch_root: PathBuf,
    #[serde(default)]
    pub report: Option<PathBuf>,
    pub inversion_code: PathBuf,
    /// `YYYY-MM-DD--YYYY-MM-DD`
    pub date_range: String,
    pub chunk: Chunk,
    pub chunk_w: String,
    #[serde(default)]
    pub inv_params: serde_yaml::Mapping,
    /// Footprint file name to the folder holding it, e.g. `JFJ-5magl: /store/jfj`.
    #[serde(default)]
    pub remotes: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub options: JobOptions,
}

impl InversionConfig {
    pub fn from_path(path: &Path) -> SettingsResult<Self> {
        let config: Self = load_document(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SettingsResult<()> {
        let (start, end) = parse_date_range(&self.date_range)?;
        if end <= start {
            return Err(SettingsError::Invalid(format!(
                "date_range '{}' must end after it starts",
                self.date_range
            ))
            .into());
        }
        self.chunk.validate_width(&self.chunk_w)?;
        Ok(())
    }
}

/// Collection of boundary sensitivities over stashed post-processing outputs.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectConfig {
    #[serde(default = "default_scratch_root")]
    pub scratch_root: PathBuf,
    #[serde(default)]
    pub report: Option<PathBuf>,
    pub collect_code: PathBuf,
    #[serde(default)]
    pub params: serde_yaml::Mapping,
    /// `YYYY_MM_DD<release>` to the stash folder of that post-processing run.
    pub remotes: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub options: JobOptions,
}

impl CollectConfig {
    pub fn from_path(path: &Path) -> SettingsResult<Self> {
        let config: Self = load_document(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SettingsResult<()> {
        if self.remotes.is_empty() {
            return Err(SettingsError::Invalid(
                "remotes must list at least one stashed post-processing folder".to_string(),
            )
            .into());
        }
        Ok(())
    }
}
