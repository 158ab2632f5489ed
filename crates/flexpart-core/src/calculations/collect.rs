use super::{CalcInfo, Calculation};
use crate::domain::{FlexpartError, FlexpartResult, JobKind};
use crate::inputs::InputFile;
use crate::parsers::OutputParser;
use crate::settings::JobOptions;
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

pub const COLLECT_PARAMS_FILE: &str = "params.yaml";
pub const NETCDF_GLOB: &str = "*.nc";

/// Length of the `YYYY_MM_DD` prefix of a stashed remote's name.
const DAY_PREFIX_LEN: usize = 10;

/// Gathers boundary sensitivities from stashed post-processing outputs.
#[derive(Debug, Clone)]
pub struct CollectSensCalculation {
    pub label: String,
    pub params: Mapping,
    /// `YYYY_MM_DD<release>` to the stash folder holding that day's outputs.
    pub remotes: BTreeMap<String, PathBuf>,
    pub options: JobOptions,
}

impl CollectSensCalculation {
    pub fn params_document(&self) -> FlexpartResult<Mapping> {
        let mut releases = BTreeSet::new();
        let mut paths = Vec::with_capacity(self.remotes.len());
        let mut days = Vec::with_capacity(self.remotes.len());

        for (name, folder) in &self.remotes {
            let (day, release) = name
                .is_char_boundary(DAY_PREFIX_LEN)
                .then(|| name.split_at(DAY_PREFIX_LEN))
                .filter(|(_, release)| !release.is_empty())
                .ok_or_else(|| {
                    FlexpartError::input_validation(
                        "INPUT.COLLECT_REMOTE",
                        format!("remote '{name}' is not named YYYY_MM_DD<release>"),
                    )
                })?;
            releases.insert(release.to_string());
            paths.push(Value::from(folder.to_string_lossy().into_owned()));
            days.push(Value::from(day.replace('_', "-")));
        }

        let mut document = self.params.clone();
        document.insert(
            Value::from("rel.com"),
            Value::Sequence(releases.into_iter().map(Value::from).collect()),
        );
        document.insert(Value::from("path"), Value::Sequence(paths.clone()));
        document.insert(Value::from("days"), Value::Sequence(days));
        document.insert(Value::from("bs.path"), Value::Sequence(paths));
        Ok(document)
    }
}

impl Calculation for CollectSensCalculation {
    fn prepare(&self) -> FlexpartResult<CalcInfo> {
        let document = serde_yaml::to_string(&Value::Mapping(self.params_document()?)).map_err(
            |source| {
                FlexpartError::internal(
                    "SYS.COLLECT_PARAMS",
                    format!("failed to serialize collection parameters: {source}"),
                )
            },
        )?;

        Ok(CalcInfo {
            label: self.label.clone(),
            kind: JobKind::CollectSensitivities,
            input_files: vec![InputFile::new(COLLECT_PARAMS_FILE, document)],
            cmdline_params: vec!["-p".to_string(), COLLECT_PARAMS_FILE.to_string()],
            stdout_name: self.options.output_filename.clone(),
            symlinks: Vec::new(),
            retrieve: vec![self.options.output_filename.clone(), NETCDF_GLOB.to_string()],
            parser: OutputParser::collect_sensitivities(),
            stash: self.options.stash.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{COLLECT_PARAMS_FILE, CollectSensCalculation};
    use crate::calculations::Calculation;
    use crate::domain::JobKind;
    use crate::parsers::OutputParser;
    use crate::settings::JobOptions;
    use serde_yaml::{Mapping, Value};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn calculation(remotes: &[(&str, &str)]) -> CollectSensCalculation {
        CollectSensCalculation {
            label: "collect-sens".to_string(),
            params: serde_yaml::from_str::<Mapping>("domain: europe\nresolution: 0.5\n")
                .expect("params"),
            remotes: remotes
                .iter()
                .map(|(name, folder)| (name.to_string(), PathBuf::from(folder)))
                .collect::<BTreeMap<_, _>>(),
            options: JobOptions::default(),
        }
    }

    #[test]
    fn remotes_split_into_days_releases_and_paths() {
        let document = calculation(&[
            ("2021_01_02JFJ_5magl", "/store/stash/0005"),
            ("2021_01_03JFJ_5magl", "/store/stash/0010"),
            ("2021_01_03BEO_32magl", "/store/stash/0012"),
        ])
        .params_document()
        .expect("document");

        assert_eq!(
            document["rel.com"],
            Value::Sequence(vec![Value::from("BEO_32magl"), Value::from("JFJ_5magl")])
        );
        assert_eq!(
            document["days"],
            Value::Sequence(vec![
                Value::from("2021-01-02"),
                Value::from("2021-01-03"),
                Value::from("2021-01-03"),
            ])
        );
        assert_eq!(document["path"][1], Value::from("/store/stash/0012"));
        assert_eq!(document["bs.path"], document["path"]);
        assert_eq!(document["domain"], Value::from("europe"));
    }

    #[test]
    fn short_remote_name_is_rejected() {
        let error = calculation(&[("2021_01_02", "/store/stash/0005")])
            .params_document()
            .expect_err("release part missing");
        assert_eq!(error.placeholder(), "INPUT.COLLECT_REMOTE");
    }

    #[test]
    fn prepare_writes_params_and_retrieves_netcdf() {
        let info = calculation(&[("2021_01_02JFJ_5magl", "/store/stash/0005")])
            .prepare()
            .expect("prepare");
        assert_eq!(info.kind, JobKind::CollectSensitivities);
        assert_eq!(info.cmdline_params, vec!["-p", COLLECT_PARAMS_FILE]);
        assert_eq!(info.retrieve, vec!["aiida.out", "*.nc"]);
        assert_eq!(info.parser, OutputParser::collect_sensitivities());
        let params = info.input_file(COLLECT_PARAMS_FILE).expect("params written");
        assert!(params.contents.contains("rel.com"));
    }
}
