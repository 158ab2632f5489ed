mod commands;
mod helpers;

use clap::Parser;
use flexpart_core::domain::FlexpartError;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let error = error.as_flexpart_error();
            eprintln!("{}", error.diagnostic_line());
            eprintln!("{}", error.fatal_exit_line());
            error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("flexpart-rs".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            helpers::init_tracing(cli.verbose);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(name = "flexpart-rs", version, about = "FLEXPART multi-stage simulation scheduler")]
struct Cli {
    /// Log at debug level unless RUST_LOG overrides it
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Run every simulation date of a run description
    Run(commands::RunArgs),
    /// Run chunked inversions over footprint files
    Inversion(commands::InversionArgs),
    /// Collect boundary sensitivities from stashed post-processing outputs
    Collect(commands::CollectArgs),
    /// Print the simulation, release and meteo windows of one start date
    Window(commands::WindowArgs),
    /// Expand simulation date expressions
    Dates(commands::DatesArgs),
    /// Print the model family gates selected for a model list
    Gates(commands::GatesArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Run(args) => commands::run_workflow_command(args),
        CliCommand::Inversion(args) => commands::run_inversion_command(args),
        CliCommand::Collect(args) => commands::run_collect_command(args),
        CliCommand::Window(args) => commands::run_window_command(args),
        CliCommand::Dates(args) => commands::run_dates_command(args),
        CliCommand::Gates(args) => commands::run_gates_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Workflow(FlexpartError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<FlexpartError> for CliError {
    fn from(error: FlexpartError) -> Self {
        Self::Workflow(error)
    }
}

impl CliError {
    fn as_flexpart_error(&self) -> FlexpartError {
        match self {
            Self::Usage(message) => {
                FlexpartError::input_validation("INPUT.CLI_USAGE", message.clone())
            }
            Self::Workflow(error) => error.clone(),
            Self::Internal(error) => FlexpartError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
