use std::error::Error;
use std::fmt::{Display, Formatter};

pub type FlexpartResult<T> = Result<T, FlexpartError>;
pub type SettingsResult<T> = FlexpartResult<T>;
pub type WorkflowResult<T> = FlexpartResult<T>;

/// Failure classes; each maps to the process exit code of a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlexpartErrorCategory {
    InputValidationError,
    IoSystemError,
    ComputationError,
    InternalError,
}

impl FlexpartErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::ComputationError => "ComputationError",
            Self::InternalError => "InternalError",
        }
    }
}

/// Workflow-level status codes attached to finished jobs and workflow runs.
///
/// These are distinct from the process exit codes of [`FlexpartErrorCategory`]:
/// a calculation can exit 0 as a process and still report
/// [`WorkflowExitCode::MissingOutputFiles`] once its outputs are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowExitCode {
    Ok,
    MarkerMissing,
    MissingOutputFiles,
    CalculationFailed,
}

impl WorkflowExitCode {
    pub const fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::MarkerMissing => 1,
            Self::MissingOutputFiles => 300,
            Self::CalculationFailed => 400,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::MarkerMissing => "ERROR_SUCCESS_MARKER_MISSING",
            Self::MissingOutputFiles => "ERROR_MISSING_OUTPUT_FILES",
            Self::CalculationFailed => "ERROR_CALCULATION_FAILED",
        }
    }

    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl Display for WorkflowExitCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label(), self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlexpartError {
    category: FlexpartErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl FlexpartError {
    pub fn new(
        category: FlexpartErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(
            FlexpartErrorCategory::InputValidationError,
            placeholder,
            message,
        )
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(FlexpartErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(FlexpartErrorCategory::ComputationError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(FlexpartErrorCategory::InternalError, placeholder, message)
    }

    pub fn calculation_failed(label: &str, status: WorkflowExitCode) -> Self {
        Self::computation(
            "RUN.CALCULATION_FAILED",
            format!(
                "calculation '{}' did not finish successfully (status {}); workflow exit code {}",
                label,
                status,
                WorkflowExitCode::CalculationFailed.code()
            ),
        )
    }

    pub const fn category(&self) -> FlexpartErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for FlexpartError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.name(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for FlexpartError {}
