use super::{JobBackend, JobSpec};
use crate::calculations::{CalcInfo, Symlink};
use crate::domain::{
    FlexpartError, FlexpartResult, JobId, JobKind, JobRecord, JobStatus, RemoteFolder,
};
use crate::parsers::OutputParser;
use crate::settings::StashOptions;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tracing::{debug, info, warn};

pub const SHELL_STDOUT_FILE: &str = "stdout";
pub const STDERR_FILE: &str = "stderr";

struct Retrieval {
    stdout_name: String,
    retrieve: Vec<String>,
    parser: OutputParser,
    stash: Option<StashOptions>,
}

struct PendingJob {
    label: String,
    kind: JobKind,
    folder: PathBuf,
    process: Result<Child, String>,
    retrieval: Option<Retrieval>,
}

/// Runs every job as a child process in its own folder under a scratch root.
pub struct LocalBackend {
    scratch_root: PathBuf,
    next_id: u64,
    pending: BTreeMap<JobId, PendingJob>,
}

impl LocalBackend {
    pub fn new(scratch_root: impl Into<PathBuf>) -> FlexpartResult<Self> {
        let scratch_root = scratch_root.into();
        fs::create_dir_all(&scratch_root)
            .map_err(|source| io_error("IO.SCRATCH_ROOT", &scratch_root, source))?;
        // Job folders are handed to dependent jobs as arguments and link targets.
        let scratch_root = fs::canonicalize(&scratch_root)
            .map_err(|source| io_error("IO.SCRATCH_ROOT", &scratch_root, source))?;
        Ok(Self {
            scratch_root,
            next_id: 1,
            pending: BTreeMap::new(),
        })
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    fn job_folder(&self, id: JobId, label: &str) -> PathBuf {
        let label = label
            .chars()
            .map(|character| {
                if character.is_ascii_alphanumeric() || matches!(character, '-' | '_' | '.') {
                    character
                } else {
                    '_'
                }
            })
            .collect::<String>();
        self.scratch_root.join(format!("{id}-{label}"))
    }
}

fn io_error(placeholder: &'static str, path: &Path, source: std::io::Error) -> FlexpartError {
    FlexpartError::io_system(placeholder, format!("'{}': {}", path.display(), source))
}

fn stage_calculation(folder: &Path, info: &CalcInfo) -> FlexpartResult<()> {
    for file in &info.input_files {
        let path = folder.join(&file.name);
        fs::write(&path, &file.contents).map_err(|source| io_error("IO.INPUT_WRITE", &path, source))?;
    }
    for symlink in &info.symlinks {
        create_symlink(folder, symlink)?;
    }
    Ok(())
}

#[cfg(unix)]
fn create_symlink(folder: &Path, symlink: &Symlink) -> FlexpartResult<()> {
    let link = folder.join(&symlink.link_name);
    std::os::unix::fs::symlink(&symlink.source, &link)
        .map_err(|source| io_error("IO.SYMLINK", &link, source))
}

#[cfg(not(unix))]
fn create_symlink(folder: &Path, symlink: &Symlink) -> FlexpartResult<()> {
    Err(FlexpartError::io_system(
        "IO.SYMLINK",
        format!(
            "cannot link '{}' into '{}': symlinks require a unix host",
            symlink.source.display(),
            folder.display()
        ),
    ))
}

fn spawn(
    executable: &Path,
    arguments: &[String],
    folder: &Path,
    stdout_name: &str,
) -> FlexpartResult<Result<Child, String>> {
    let stdout_path = folder.join(stdout_name);
    let stdout = File::create(&stdout_path)
        .map_err(|source| io_error("IO.STDOUT_CREATE", &stdout_path, source))?;
    let stderr_path = folder.join(STDERR_FILE);
    let stderr = File::create(&stderr_path)
        .map_err(|source| io_error("IO.STDERR_CREATE", &stderr_path, source))?;

    let spawned = Command::new(executable)
        .args(arguments)
        .current_dir(folder)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .spawn()
        .map_err(|source| format!("failed to start '{}': {}", executable.display(), source));
    Ok(spawned)
}

pub(crate) fn build_globset(patterns: &[String]) -> FlexpartResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| {
            FlexpartError::input_validation(
                "INPUT.RETRIEVE_GLOB",
                format!("invalid glob '{pattern}': {source}"),
            )
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| {
        FlexpartError::input_validation("INPUT.RETRIEVE_GLOB", format!("invalid glob set: {source}"))
    })
}

/// Names of regular files directly inside `folder` matching any pattern, sorted.
fn matching_files(folder: &Path, patterns: &GlobSet) -> FlexpartResult<Vec<PathBuf>> {
    let entries = fs::read_dir(folder).map_err(|source| io_error("IO.RETRIEVE", folder, source))?;
    let mut matched = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| io_error("IO.RETRIEVE", folder, source))?;
        let name = PathBuf::from(entry.file_name());
        if entry.path().is_file() && patterns.is_match(&name) {
            matched.push(name);
        }
    }
    matched.sort();
    Ok(matched)
}

fn stash_outputs(folder: &Path, stash: &StashOptions) -> FlexpartResult<Vec<PathBuf>> {
    let patterns = build_globset(&stash.source_list)?;
    let Some(folder_name) = folder.file_name() else {
        return Err(FlexpartError::internal(
            "SYS.STASH_TARGET",
            format!("job folder '{}' has no name", folder.display()),
        ));
    };
    let target = stash.target_base.join(folder_name);
    fs::create_dir_all(&target).map_err(|source| io_error("IO.STASH", &target, source))?;

    let mut copied = Vec::new();
    for name in matching_files(folder, &patterns)? {
        let destination = target.join(&name);
        fs::copy(folder.join(&name), &destination)
            .map_err(|source| io_error("IO.STASH", &destination, source))?;
        copied.push(destination);
    }
    Ok(copied)
}

impl JobBackend for LocalBackend {
    fn submit(&mut self, spec: JobSpec) -> FlexpartResult<JobId> {
        let id = JobId(self.next_id);
        self.next_id += 1;

        let label = spec.label().to_string();
        let kind = spec.kind();
        let folder = self.job_folder(id, &label);
        fs::create_dir_all(&folder).map_err(|source| io_error("IO.JOB_FOLDER", &folder, source))?;

        let (process, retrieval) = match spec {
            JobSpec::Shell {
                code, arguments, ..
            } => (
                spawn(&code.executable, &arguments, &folder, SHELL_STDOUT_FILE)?,
                None,
            ),
            JobSpec::Calculation { code, info } => {
                stage_calculation(&folder, &info)?;
                let process = spawn(&code.executable, &info.cmdline_params, &folder, &info.stdout_name)?;
                (
                    process,
                    Some(Retrieval {
                        stdout_name: info.stdout_name,
                        retrieve: info.retrieve,
                        parser: info.parser,
                        stash: info.stash,
                    }),
                )
            }
        };

        debug!("submitted job {} '{}' in '{}'", id, label, folder.display());
        self.pending.insert(
            id,
            PendingJob {
                label,
                kind,
                folder,
                process,
                retrieval,
            },
        );
        Ok(id)
    }

    fn wait(&mut self, id: JobId) -> FlexpartResult<JobRecord> {
        let PendingJob {
            label,
            kind,
            folder,
            process,
            retrieval,
        } = self.pending.remove(&id).ok_or_else(|| {
            FlexpartError::internal("SYS.UNKNOWN_JOB", format!("job {id} is not pending"))
        })?;

        let mut record = JobRecord {
            id,
            label,
            kind,
            status: JobStatus::Finished { exit_code: 0 },
            remote_folder: Some(RemoteFolder::new(&folder)),
            retrieved: Vec::new(),
            output_file: None,
        };

        let mut child = match process {
            Ok(child) => child,
            Err(message) => {
                warn!("job {} '{}' excepted: {}", id, record.label, message);
                record.status = JobStatus::Excepted { message };
                return Ok(record);
            }
        };

        let exit_status = child.wait().map_err(|source| {
            FlexpartError::io_system("IO.JOB_WAIT", format!("failed to wait for job {id}: {source}"))
        })?;
        let Some(process_code) = exit_status.code() else {
            record.status = JobStatus::Excepted {
                message: format!("job {id} was terminated by a signal"),
            };
            return Ok(record);
        };

        let Some(retrieval) = retrieval else {
            record.status = JobStatus::Finished {
                exit_code: process_code,
            };
            return Ok(record);
        };

        record.retrieved = matching_files(&folder, &build_globset(&retrieval.retrieve)?)?;
        let outcome = retrieval
            .parser
            .parse(&folder, &retrieval.stdout_name, &record.retrieved)?;
        record.output_file = outcome.output_file;

        let exit_code = if !outcome.exit_code.is_ok() {
            outcome.exit_code.code()
        } else {
            process_code
        };
        record.status = JobStatus::Finished { exit_code };

        if let Some(stash) = retrieval.stash.as_ref().filter(|_| record.is_finished_ok()) {
            let copied = stash_outputs(&folder, stash)?;
            info!("stashed {} files of job {} '{}'", copied.len(), id, record.label);
        }
        Ok(record)
    }
}
