use super::CliError;
use anyhow::Context;
use dpz_core::convert::has_archive_extension;
use dpz_core::domain::{ARCHIVE_EXTENSION, DpzError};
use globset::{GlobBuilder, GlobMatcher};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

pub(super) fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbosity {
            0 => "warn",
            1 => "info",
            _ => "debug",
        })
    });

    // A second initialization (tests drive `run` repeatedly) keeps the first.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Explicit archive path, or one discovered in the current directory.
pub(super) fn resolve_archive(explicit: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = explicit {
        if !has_archive_extension(&path) {
            return Err(CliError::Usage(format!(
                "'{}' is not a .{} profile bundle",
                path.display(),
                ARCHIVE_EXTENSION
            )));
        }
        return Ok(path);
    }

    let working_dir = std::env::current_dir().context("failed to read current working directory")?;
    let candidates = discover_archives(&working_dir)?;
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    select_archive(&working_dir, candidates, &mut stdin.lock(), &mut stdout.lock())
}

fn archive_matcher() -> Result<GlobMatcher, CliError> {
    let glob = GlobBuilder::new(&format!("*.{}", ARCHIVE_EXTENSION))
        .case_insensitive(true)
        .build()
        .context("failed to build archive glob")?;
    Ok(glob.compile_matcher())
}

pub(super) fn discover_archives(dir: &Path) -> Result<Vec<PathBuf>, CliError> {
    let matcher = archive_matcher()?;
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to list directory '{}'", dir.display()))?;

    let mut archives = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in '{}'", dir.display()))?;
        let path = entry.path();
        if path.is_file() && matcher.is_match(entry.file_name()) {
            archives.push(path);
        }
    }
    archives.sort();
    Ok(archives)
}

pub(super) fn select_archive(
    dir: &Path,
    mut candidates: Vec<PathBuf>,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<PathBuf, CliError> {
    match candidates.len() {
        0 => Err(CliError::Convert(DpzError::not_found(
            "NOTFOUND.NO_ARCHIVE",
            format!(
                "no .{} profile bundle found in '{}'",
                ARCHIVE_EXTENSION,
                dir.display()
            ),
        ))),
        1 => Ok(candidates.remove(0)),
        _ => prompt_for_archive(candidates, input, output),
    }
}

/// Lists candidates and reads a file name or 1-based index.
fn prompt_for_archive(
    candidates: Vec<PathBuf>,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<PathBuf, CliError> {
    for (index, candidate) in candidates.iter().enumerate() {
        let name = candidate
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        writeln!(output, "{:>3}  {}", index + 1, name).context("failed to write prompt")?;
    }
    write!(output, "Choose dpz file from list: ").context("failed to write prompt")?;
    output.flush().context("failed to flush prompt")?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("failed to read archive choice")?;
    let answer = answer.trim();

    let chosen = answer
        .parse::<usize>()
        .ok()
        .and_then(|number| number.checked_sub(1))
        .and_then(|index| candidates.get(index))
        .or_else(|| {
            candidates.iter().find(|candidate| {
                candidate
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy() == answer)
            })
        });

    chosen
        .cloned()
        .ok_or_else(|| CliError::Usage(format!("'{}' is not one of the listed bundles", answer)))
}
