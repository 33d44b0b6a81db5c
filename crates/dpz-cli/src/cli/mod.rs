mod commands;
mod helpers;

use clap::Parser;
use dpz_core::domain::{DpzError, GroupingAttribute};
use std::path::PathBuf;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().collect();

    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let diagnostic = error.as_dpz_error();
            eprintln!("{}", diagnostic.diagnostic_line());
            eprintln!("{}", diagnostic.fatal_exit_line());
            diagnostic.exit_code()
        }
    }
}

#[cfg(test)]
pub(crate) fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("debundle-dpz".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            helpers::init_logging(cli.verbose);
            dispatch_parsed(cli)
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
#[command(
    name = "debundle-dpz",
    version,
    about = "Split a DEEPSOIL profile bundle into profiles with PWP generation parameters"
)]
struct Cli {
    /// Profile bundle (.dpz); searched for in the current directory when omitted
    #[arg(value_name = "ARCHIVE")]
    archive: Option<PathBuf>,

    /// Parameter table (default: <archive-stem>_model-inputs.csv next to the archive)
    #[arg(long, value_name = "PATH")]
    parameters: Option<PathBuf>,

    /// Output directory (default: <archive-stem>/ next to the archive)
    #[arg(long, value_name = "PATH")]
    output_dir: Option<PathBuf>,

    /// Layer attribute used to link randomized sublayers to baseline layers
    #[arg(long, value_enum, default_value_t = GroupBy::Weight)]
    group_by: GroupBy,

    /// Write a JSON conversion report
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// List bundle records and layer counts without converting
    #[arg(long)]
    list: bool,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum GroupBy {
    Weight,
    Strength,
}

impl From<GroupBy> for GroupingAttribute {
    fn from(value: GroupBy) -> Self {
        match value {
            GroupBy::Weight => Self::UnitWeight,
            GroupBy::Strength => Self::Strength,
        }
    }
}

fn dispatch_parsed(cli: Cli) -> Result<i32, CliError> {
    let archive = helpers::resolve_archive(cli.archive)?;
    if cli.list {
        return commands::run_list_command(&archive);
    }

    commands::run_convert_command(commands::ConvertArgs {
        archive,
        parameters: cli.parameters,
        output_dir: cli.output_dir,
        grouping: cli.group_by.into(),
        report: cli.report,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Convert(DpzError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_dpz_error(&self) -> DpzError {
        match self {
            Self::Usage(message) => DpzError::usage("USAGE.CLI", message.clone()),
            Self::Convert(error) => error.clone(),
            Self::Internal(error) => DpzError::io("IO.CLI", format!("{error:#}")),
        }
    }
}

impl From<DpzError> for CliError {
    fn from(error: DpzError) -> Self {
        Self::Convert(error)
    }
}
