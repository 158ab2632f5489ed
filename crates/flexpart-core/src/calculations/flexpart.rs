use super::{CalcInfo, Calculation, GRID_TIME_GLOB, Symlink};
use crate::domain::{FlexpartError, FlexpartResult, JobKind, ModelFamily, RemoteFolder, SimulationDate};
use crate::inputs::{
    AGECLASSES_FILE, COMMAND_FILE, Dialect, INPUT_PHY_FILE, InputFile, OUTGRID_FILE,
    OUTGRID_NEST_FILE, RELEASES_FILE, render_ageclasses, render_command, render_input_phy,
    render_outgrid, render_outgrid_nest, render_releases,
};
use crate::parsers::OutputParser;
use crate::settings::{
    CommandSettings, InputPhy, JobOptions, OutgridNestSettings, OutgridSettings, ReleaseSettings,
    ReleaseSite,
};
use crate::time_window::SimulationPeriod;
use std::path::PathBuf;

pub const SPECIES_LINK: &str = "SPECIES";
pub const HEADER_PREVIOUS: &str = "header_previous";
pub const PARTPOSIT_PREVIOUS: &str = "partposit_previous";

/// One FLEXPART run, regional (COSMO) or global (IFS).
#[derive(Debug, Clone)]
pub struct FlexpartCalculation {
    pub family: ModelFamily,
    pub label: String,
    pub start: SimulationDate,
    pub age_class_seconds: i64,
    pub command: CommandSettings,
    pub sites: Vec<ReleaseSite>,
    pub release_settings: ReleaseSettings,
    /// Only written for regional runs.
    pub input_phy: InputPhy,
    pub outgrid: OutgridSettings,
    pub outgrid_nest: Option<OutgridNestSettings>,
    pub species: PathBuf,
    pub land_use: Vec<PathBuf>,
    pub meteo_paths: Vec<PathBuf>,
    /// Finished run whose particle dump this run continues from.
    pub parent_folder: Option<RemoteFolder>,
    pub options: JobOptions,
}

impl FlexpartCalculation {
    pub fn period(&self) -> FlexpartResult<SimulationPeriod> {
        SimulationPeriod::compute(
            self.start,
            self.age_class_seconds,
            self.command.release_duration,
            self.command.direction(),
        )
    }

    fn effective_command(&self) -> CommandSettings {
        let mut command = self.command.clone();
        if self.family == ModelFamily::Global {
            command.nested_output = self.outgrid_nest.is_some();
        }
        command
    }

    fn cmdline_params(&self) -> Vec<String> {
        let mut params = vec!["./".to_string(), "./".to_string()];
        for path in &self.meteo_paths {
            let path = path.to_string_lossy();
            params.push(format!("{path}/"));
            params.push(format!("{path}/AVAILABLE"));
        }
        params
    }

    fn symlinks(&self) -> FlexpartResult<Vec<Symlink>> {
        let mut symlinks = vec![Symlink::new(&self.species, SPECIES_LINK)];
        symlinks.extend(self.land_use.iter().map(Symlink::by_file_name));

        if let Some(parent) = &self.parent_folder {
            if self.family != ModelFamily::Global {
                return Err(FlexpartError::input_validation(
                    "INPUT.PARENT_FOLDER",
                    format!(
                        "'{}' is a regional run; only global runs continue from a parent folder",
                        self.label
                    ),
                ));
            }
            symlinks.push(Symlink::new(parent.join("header"), HEADER_PREVIOUS));
            symlinks.push(Symlink::new(parent.join("partposit_inst"), PARTPOSIT_PREVIOUS));
        }
        Ok(symlinks)
    }
}

impl Calculation for FlexpartCalculation {
    fn prepare(&self) -> FlexpartResult<CalcInfo> {
        let dialect = Dialect::from(self.family);
        let command = self.effective_command();
        let period = self.period()?;

        let mut input_files = vec![
            InputFile::new(COMMAND_FILE, render_command(&command, &period, dialect)),
            InputFile::new(
                RELEASES_FILE,
                render_releases(
                    &period.release,
                    command.release_chunk,
                    &self.sites,
                    &self.release_settings,
                )?,
            ),
            InputFile::new(AGECLASSES_FILE, render_ageclasses(period.age_class_seconds)),
            InputFile::new(OUTGRID_FILE, render_outgrid(&self.outgrid, dialect)),
        ];
        if let Some(nest) = &self.outgrid_nest {
            input_files.push(InputFile::new(
                OUTGRID_NEST_FILE,
                render_outgrid_nest(nest, dialect),
            ));
        }
        if self.family == ModelFamily::Regional {
            input_files.push(InputFile::new(INPUT_PHY_FILE, render_input_phy(&self.input_phy)?));
        }

        Ok(CalcInfo {
            label: self.label.clone(),
            kind: JobKind::Simulation,
            input_files,
            cmdline_params: self.cmdline_params(),
            stdout_name: self.options.output_filename.clone(),
            symlinks: self.symlinks()?,
            retrieve: vec![GRID_TIME_GLOB.to_string(), self.options.output_filename.clone()],
            parser: OutputParser::flexpart(),
            stash: self.options.stash.clone(),
        })
    }
}
