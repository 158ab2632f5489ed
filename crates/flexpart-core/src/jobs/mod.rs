//! Job submission seam between the workflows and whatever runs executables.
//!
//! `submit` must not block on completion: workflows submit every job of a
//! step before awaiting any of them.

pub mod local;

pub use local::LocalBackend;

use crate::calculations::CalcInfo;
use crate::domain::{FlexpartResult, JobId, JobKind, JobRecord};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    pub label: String,
    pub executable: PathBuf,
}

impl Code {
    pub fn new(label: impl Into<String>, executable: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            executable: executable.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobSpec {
    /// Plain executable invocation judged solely by its exit status.
    Shell {
        label: String,
        kind: JobKind,
        code: Code,
        arguments: Vec<String>,
    },
    Calculation { code: Code, info: CalcInfo },
}

impl JobSpec {
    pub fn label(&self) -> &str {
        match self {
            Self::Shell { label, .. } => label,
            Self::Calculation { info, .. } => &info.label,
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            Self::Shell { kind, .. } => *kind,
            Self::Calculation { info, .. } => info.kind,
        }
    }

    pub fn code(&self) -> &Code {
        match self {
            Self::Shell { code, .. } | Self::Calculation { code, .. } => code,
        }
    }
}

pub trait JobBackend {
    fn submit(&mut self, spec: JobSpec) -> FlexpartResult<JobId>;

    /// Blocks until `id` reaches a terminal state.
    fn wait(&mut self, id: JobId) -> FlexpartResult<JobRecord>;

    fn run(&mut self, spec: JobSpec) -> FlexpartResult<JobRecord> {
        let id = self.submit(spec)?;
        self.wait(id)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{JobBackend, JobSpec};
    use crate::domain::{FlexpartError, FlexpartResult, JobId, JobRecord, JobStatus, RemoteFolder};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    type Policy = Box<dyn Fn(&JobSpec) -> JobStatus>;

    /// In-memory backend: records submissions and finishes each job with the
    /// status its policy assigns.
    pub(crate) struct ScriptedBackend {
        policy: Policy,
        pub(crate) submitted: Vec<JobSpec>,
        pending: BTreeMap<JobId, JobSpec>,
        refused: Option<String>,
    }

    impl ScriptedBackend {
        pub(crate) fn succeeding() -> Self {
            Self::with_policy(|_| JobStatus::Finished { exit_code: 0 })
        }

        pub(crate) fn with_policy(policy: impl Fn(&JobSpec) -> JobStatus + 'static) -> Self {
            Self {
                policy: Box::new(policy),
                submitted: Vec::new(),
                pending: BTreeMap::new(),
                refused: None,
            }
        }

        /// Fails the submission of the job labelled `label`.
        pub(crate) fn refusing(mut self, label: &str) -> Self {
            self.refused = Some(label.to_string());
            self
        }

        pub(crate) fn pending_jobs(&self) -> usize {
            self.pending.len()
        }

        pub(crate) fn labels(&self) -> Vec<String> {
            self.submitted
                .iter()
                .map(|spec| spec.label().to_string())
                .collect()
        }
    }

    impl JobBackend for ScriptedBackend {
        fn submit(&mut self, spec: JobSpec) -> FlexpartResult<JobId> {
            if self.refused.as_deref() == Some(spec.label()) {
                return Err(FlexpartError::io_system(
                    "IO.JOB_SUBMIT",
                    format!("cannot start '{}'", spec.label()),
                ));
            }
            let id = JobId(self.submitted.len() as u64 + 1);
            self.submitted.push(spec.clone());
            self.pending.insert(id, spec);
            Ok(id)
        }

        fn wait(&mut self, id: JobId) -> FlexpartResult<JobRecord> {
            let spec = self.pending.remove(&id).ok_or_else(|| {
                FlexpartError::internal("SYS.UNKNOWN_JOB", format!("job {id} was never submitted"))
            })?;
            let status = (self.policy)(&spec);
            let folder = RemoteFolder::new(format!("/scratch/{}-{}", id, spec.label()));
            let output_file = matches!(spec, JobSpec::Calculation { .. })
                .then(|| folder.join("aiida.out"));
            Ok(JobRecord {
                id,
                label: spec.label().to_string(),
                kind: spec.kind(),
                status,
                remote_folder: Some(folder),
                retrieved: vec![PathBuf::from("aiida.out")],
                output_file,
            })
        }
    }
}
