use super::{CalcInfo, Calculation};
use crate::dates::{Chunk, ChunkRange, DAY_FORMAT};
use crate::domain::{FlexpartError, FlexpartResult, JobKind};
use crate::inputs::InputFile;
use crate::parsers::OutputParser;
use crate::settings::JobOptions;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const INVERSION_SETTINGS_FILE: &str = "inversion_settings.yaml";
const FOOTPRINT_LIST_KEY: &str = "ft.fls";

/// One inversion over a chunk of the requested date range.
#[derive(Debug, Clone)]
pub struct InversionCalculation {
    pub label: String,
    pub chunk_range: ChunkRange,
    /// Window the inversion reads footprints for; wider than `chunk_range`
    /// when the chunk width spans several chunks.
    pub data_window: ChunkRange,
    pub chunk: Chunk,
    pub chunk_w: String,
    pub inv_params: Mapping,
    pub remotes: BTreeMap<String, PathBuf>,
    pub options: JobOptions,
}

impl InversionCalculation {
    /// Parameters written to the settings file: footprints grouped by site
    /// under `sites.<site>.ft.fls`, then top-level `_` replaced by `.`.
    pub fn settings_document(&self) -> FlexpartResult<Mapping> {
        let mut params = self.inv_params.clone();
        params.insert(
            Value::from("dtm_start"),
            Value::from(self.data_window.start.format(DAY_FORMAT).to_string()),
        );
        params.insert(
            Value::from("dtm_end"),
            Value::from(self.data_window.end.format(DAY_FORMAT).to_string()),
        );

        let mut footprints: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for (name, folder) in &self.remotes {
            let site = name.split('-').next().unwrap_or(name.as_str());
            footprints
                .entry(site)
                .or_default()
                .push(format!("{}/{}", folder.to_string_lossy(), name));
        }

        if !footprints.is_empty() {
            let sites = params
                .get_mut("sites")
                .and_then(Value::as_mapping_mut)
                .ok_or_else(|| {
                    FlexpartError::input_validation(
                        "INPUT.INVERSION_SITES",
                        "inv_params must define a 'sites' mapping when remotes are given",
                    )
                })?;
            for (site, files) in footprints {
                let entry = sites
                    .get_mut(site)
                    .and_then(Value::as_mapping_mut)
                    .ok_or_else(|| {
                        FlexpartError::input_validation(
                            "INPUT.INVERSION_SITES",
                            format!("inv_params.sites has no entry for site '{site}'"),
                        )
                    })?;
                entry.insert(
                    Value::from(FOOTPRINT_LIST_KEY),
                    Value::Sequence(files.into_iter().map(Value::from).collect()),
                );
            }
        }

        let mut document = Mapping::with_capacity(params.len());
        for (key, value) in params {
            let key = match key {
                Value::String(text) => Value::String(text.replace('_', ".")),
                other => other,
            };
            document.insert(key, value);
        }
        Ok(document)
    }
}

impl Calculation for InversionCalculation {
    fn prepare(&self) -> FlexpartResult<CalcInfo> {
        let document = serde_yaml::to_string(&Value::Mapping(self.settings_document()?)).map_err(
            |source| {
                FlexpartError::internal(
                    "SYS.INVERSION_SETTINGS",
                    format!("failed to serialize inversion settings: {source}"),
                )
            },
        )?;

        Ok(CalcInfo {
            label: self.label.clone(),
            kind: JobKind::Inversion,
            input_files: vec![InputFile::new(INVERSION_SETTINGS_FILE, document)],
            cmdline_params: vec![
                "-f".to_string(),
                INVERSION_SETTINGS_FILE.to_string(),
                "-s".to_string(),
                self.chunk_range.start.format(DAY_FORMAT).to_string(),
                "-e".to_string(),
                self.chunk_range.end.format(DAY_FORMAT).to_string(),
                "-c".to_string(),
                self.chunk.as_str().to_string(),
                "-w".to_string(),
                self.chunk_w.clone(),
            ],
            stdout_name: self.options.output_filename.clone(),
            symlinks: Vec::new(),
            retrieve: vec![self.options.output_filename.clone()],
            parser: OutputParser::Presence,
            stash: self.options.stash.clone(),
        })
    }
}
