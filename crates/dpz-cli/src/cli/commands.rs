use super::CliError;
use anyhow::Context;
use dpz_core::convert::{ConversionRequest, convert, summarize_archive};
use dpz_core::domain::GroupingAttribute;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub(super) struct ConvertArgs {
    pub(super) archive: PathBuf,
    pub(super) parameters: Option<PathBuf>,
    pub(super) output_dir: Option<PathBuf>,
    pub(super) grouping: GroupingAttribute,
    pub(super) report: Option<PathBuf>,
}

impl ConvertArgs {
    fn into_request(self) -> Result<(ConversionRequest, Option<PathBuf>), CliError> {
        let mut request = ConversionRequest::for_archive(self.archive)?.with_grouping(self.grouping);
        if let Some(parameters) = self.parameters {
            request.parameter_path = parameters;
        }
        if let Some(output_dir) = self.output_dir {
            request.output_dir = output_dir;
        }
        Ok((request, self.report))
    }
}

pub(super) fn run_convert_command(args: ConvertArgs) -> Result<i32, CliError> {
    let (request, report_path) = args.into_request()?;
    info!(
        archive = %request.archive_path.display(),
        parameters = %request.parameter_path.display(),
        grouping = %request.grouping,
        "converting profile bundle"
    );

    let report = convert(&request)?;
    for profile in &report.profiles {
        println!("{} -> {}", profile.record, profile.output.display());
    }
    println!(
        "Converted {} profiles into '{}'.",
        report.profiles.len(),
        report.output_dir.display()
    );

    if let Some(path) = report_path {
        let json = report.to_json()?;
        write_report(&path, &json)?;
        println!("JSON report: {}", path.display());
    }

    Ok(0)
}

fn write_report(path: &Path, json: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report directory '{}'", parent.display()))?;
    }
    fs::write(path, json).with_context(|| format!("failed to write report '{}'", path.display()))?;
    Ok(())
}

pub(super) fn run_list_command(archive: &Path) -> Result<i32, CliError> {
    let summary = summarize_archive(archive)?;
    println!("{}", archive.display());
    for record in &summary {
        println!(
            "  {:<12} {:<8} {:>3} layers  {:>8.2} total thickness",
            record.record,
            format!("{:?}", record.kind).to_lowercase(),
            record.layers,
            record.total_thickness
        );
    }
    Ok(0)
}
