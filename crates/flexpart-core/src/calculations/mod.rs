//! Calculations turn typed inputs into a [`CalcInfo`]: everything a job
//! backend needs to stage, run, retrieve and judge one executable invocation.

pub mod collect;
pub mod flexpart;
pub mod inversion;
pub mod post;

pub use collect::{COLLECT_PARAMS_FILE, CollectSensCalculation};
pub use flexpart::{FlexpartCalculation, HEADER_PREVIOUS, PARTPOSIT_PREVIOUS};
pub use inversion::{INVERSION_SETTINGS_FILE, InversionCalculation};
pub use post::PostCalculation;

use crate::domain::{FlexpartResult, JobKind};
use crate::inputs::InputFile;
use crate::parsers::OutputParser;
use crate::settings::StashOptions;
use std::path::PathBuf;

pub const GRID_TIME_GLOB: &str = "grid_time_*.nc";
pub const BOUNDARY_SENSITIVITY_GLOB: &str = "boundary_sensitivity_*.nc";

/// A link created in the working folder, pointing at a read-only source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symlink {
    pub source: PathBuf,
    pub link_name: String,
}

impl Symlink {
    pub fn new(source: impl Into<PathBuf>, link_name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            link_name: link_name.into(),
        }
    }

    /// Links `source` under its own file name.
    pub fn by_file_name(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let link_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.to_string_lossy().into_owned());
        Self { source, link_name }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalcInfo {
    pub label: String,
    pub kind: JobKind,
    pub input_files: Vec<InputFile>,
    pub cmdline_params: Vec<String>,
    pub stdout_name: String,
    pub symlinks: Vec<Symlink>,
    pub retrieve: Vec<String>,
    pub parser: OutputParser,
    pub stash: Option<StashOptions>,
}

impl CalcInfo {
    pub fn input_file(&self, name: &str) -> Option<&InputFile> {
        self.input_files.iter().find(|file| file.name == name)
    }
}

pub trait Calculation {
    fn prepare(&self) -> FlexpartResult<CalcInfo>;
}
