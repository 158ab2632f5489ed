use super::{BOUNDARY_SENSITIVITY_GLOB, CalcInfo, Calculation, GRID_TIME_GLOB};
use crate::domain::{FlexpartResult, JobKind, RemoteFolder};
use crate::parsers::OutputParser;
use crate::settings::JobOptions;

/// Post-processing over a finished run, optionally merged with its offline continuation.
#[derive(Debug, Clone)]
pub struct PostCalculation {
    pub label: String,
    pub input_dir: RemoteFolder,
    pub input_offline_dir: Option<RemoteFolder>,
    pub options: JobOptions,
}

impl Calculation for PostCalculation {
    fn prepare(&self) -> FlexpartResult<CalcInfo> {
        let mut cmdline_params = vec![
            "-m".to_string(),
            self.input_dir.display_path(),
            "-r".to_string(),
            "./".to_string(),
        ];
        if let Some(offline) = &self.input_offline_dir {
            cmdline_params.push("-n".to_string());
            cmdline_params.push(offline.display_path());
        }

        Ok(CalcInfo {
            label: self.label.clone(),
            kind: JobKind::PostProcessing,
            input_files: Vec::new(),
            cmdline_params,
            stdout_name: self.options.output_filename.clone(),
            symlinks: Vec::new(),
            retrieve: vec![
                GRID_TIME_GLOB.to_string(),
                BOUNDARY_SENSITIVITY_GLOB.to_string(),
                self.options.output_filename.clone(),
            ],
            parser: OutputParser::Presence,
            stash: self.options.stash.clone(),
        })
    }
}
