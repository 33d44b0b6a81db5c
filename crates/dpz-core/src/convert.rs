use crate::archive::ProfileArchive;
use crate::domain::{
    ARCHIVE_EXTENSION, DpzError, DpzErrorCategory, DpzResult, GroupingAttribute, RecordKind,
    RecordName,
};
use crate::linker::link_layers;
use crate::parameters::{LayerParameters, PARAMETER_TABLE_SUFFIX, ParameterTable, resolve_table};
use crate::profile::{ParsedProfile, parse_profile};
use crate::writer::{render_profile, write_profile};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub archive_path: PathBuf,
    pub parameter_path: PathBuf,
    pub output_dir: PathBuf,
    pub grouping: GroupingAttribute,
}

impl ConversionRequest {
    pub fn new(
        archive_path: impl Into<PathBuf>,
        parameter_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            archive_path: archive_path.into(),
            parameter_path: parameter_path.into(),
            output_dir: output_dir.into(),
            grouping: GroupingAttribute::default(),
        }
    }

    /// Request with the companion parameter table and output directory
    /// derived from the archive's location and stem.
    pub fn for_archive(archive_path: impl Into<PathBuf>) -> DpzResult<Self> {
        let archive_path = archive_path.into();
        let parameter_path = companion_parameter_path(&archive_path)?;
        let output_dir = default_output_dir(&archive_path)?;
        Ok(Self::new(archive_path, parameter_path, output_dir))
    }

    pub fn with_grouping(mut self, grouping: GroupingAttribute) -> Self {
        self.grouping = grouping;
        self
    }
}

fn archive_stem(archive_path: &Path) -> DpzResult<&str> {
    archive_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| {
            DpzError::usage(
                "USAGE.ARCHIVE_NAME",
                format!(
                    "cannot derive a name from archive path '{}'",
                    archive_path.display()
                ),
            )
        })
}

pub fn has_archive_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

/// `<dir>/<stem>_model-inputs.csv` next to the archive.
pub fn companion_parameter_path(archive_path: &Path) -> DpzResult<PathBuf> {
    let stem = archive_stem(archive_path)?;
    Ok(archive_path.with_file_name(format!("{}{}", stem, PARAMETER_TABLE_SUFFIX)))
}

/// `<dir>/<stem>/` next to the archive.
pub fn default_output_dir(archive_path: &Path) -> DpzResult<PathBuf> {
    let stem = archive_stem(archive_path)?;
    Ok(archive_path.with_file_name(stem))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionReport {
    pub archive: PathBuf,
    pub parameter_table: PathBuf,
    pub output_dir: PathBuf,
    pub grouping: GroupingAttribute,
    pub profiles: Vec<ConvertedProfile>,
}

impl ConversionReport {
    pub fn to_json(&self) -> DpzResult<String> {
        serde_json::to_string_pretty(self).map_err(|source| {
            DpzError::io(
                "IO.REPORT_SERIALIZE",
                format!("failed to serialize conversion report: {}", source),
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertedProfile {
    pub record: String,
    pub kind: RecordKind,
    pub output: PathBuf,
    pub layers: Vec<LinkedLayer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedLayer {
    pub position: usize,
    pub baseline_layer: u32,
    pub model: &'static str,
}

/// Output directory that is removed again unless the run commits it.
struct OutputDirGuard {
    path: PathBuf,
    committed: bool,
}

impl OutputDirGuard {
    fn create(path: &Path) -> DpzResult<Self> {
        if path.exists() {
            return Err(DpzError::io(
                "IO.OUTPUT_EXISTS",
                format!("output directory '{}' already exists", path.display()),
            ));
        }
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| {
                DpzError::io(
                    "IO.OUTPUT_DIRECTORY",
                    format!(
                        "failed to create parent directory '{}': {}",
                        parent.display(),
                        source
                    ),
                )
            })?;
        }
        fs::create_dir(path).map_err(|source| {
            DpzError::io(
                "IO.OUTPUT_DIRECTORY",
                format!(
                    "failed to create output directory '{}': {}",
                    path.display(),
                    source
                ),
            )
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            committed: false,
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for OutputDirGuard {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match fs::remove_dir_all(&self.path) {
            Ok(()) => warn!(path = %self.path.display(), "removed partial output directory"),
            Err(source) => warn!(
                path = %self.path.display(),
                error = %source,
                "failed to remove partial output directory"
            ),
        }
    }
}

pub fn convert(request: &ConversionRequest) -> DpzResult<ConversionReport> {
    let mut archive = ProfileArchive::open(&request.archive_path)?;
    let baseline_name = archive.baseline().clone();
    let baseline = parse_profile(archive.read_record(&baseline_name)?)?;

    let table = ParameterTable::read(&request.parameter_path)?;
    let resolved = resolve_table(&table)?;
    let baseline_ids = baseline.layer_ids();
    let baseline_parameters = parameters_for(&baseline, &baseline_ids, &resolved)?;

    let output = OutputDirGuard::create(&request.output_dir)?;
    let profiles = match emit_all(
        &mut archive,
        output.path(),
        &baseline,
        &baseline_parameters,
        &resolved,
        request.grouping,
    ) {
        Ok(profiles) => profiles,
        // Only a linking failure discards the directory; other failures keep
        // what was already written.
        Err(error) if error.category() == DpzErrorCategory::Grouping => return Err(error),
        Err(error) => {
            output.commit();
            return Err(error);
        }
    };

    output.commit();
    info!(
        archive = %request.archive_path.display(),
        output = %request.output_dir.display(),
        profiles = profiles.len(),
        "converted profile bundle"
    );

    Ok(ConversionReport {
        archive: request.archive_path.clone(),
        parameter_table: request.parameter_path.clone(),
        output_dir: request.output_dir.clone(),
        grouping: request.grouping,
        profiles,
    })
}

fn emit_all(
    archive: &mut ProfileArchive,
    output_dir: &Path,
    baseline: &ParsedProfile,
    baseline_parameters: &[&LayerParameters],
    resolved: &BTreeMap<u32, LayerParameters>,
    grouping: GroupingAttribute,
) -> DpzResult<Vec<ConvertedProfile>> {
    let mut profiles = vec![emit(
        output_dir,
        baseline,
        &baseline.layer_ids(),
        baseline_parameters,
    )?];

    let variants: Vec<RecordName> = archive.variants().cloned().collect();
    for name in variants {
        let variant = parse_profile(archive.read_record(&name)?)?;
        let linked = link_layers(&variant, &baseline.layer_ids(), grouping)?;
        let parameters = parameters_for(&variant, &linked, resolved)?;
        profiles.push(emit(output_dir, &variant, &linked, &parameters)?);
    }

    Ok(profiles)
}

fn parameters_for<'a>(
    profile: &ParsedProfile,
    layer_ids: &[u32],
    resolved: &'a BTreeMap<u32, LayerParameters>,
) -> DpzResult<Vec<&'a LayerParameters>> {
    layer_ids
        .iter()
        .map(|id| {
            resolved.get(id).ok_or_else(|| {
                DpzError::parse(
                    "PARSE.MISSING_LAYER_PARAMETERS",
                    format!(
                        "parameter table has no row for baseline layer {} used by '{}'",
                        id,
                        profile.name()
                    ),
                )
            })
        })
        .collect()
}

fn emit(
    output_dir: &Path,
    profile: &ParsedProfile,
    layer_ids: &[u32],
    parameters: &[&LayerParameters],
) -> DpzResult<ConvertedProfile> {
    let content = render_profile(profile, parameters)?;
    let output = write_profile(output_dir, &profile.name().output_file_name(), &content)?;
    info!(
        record = %profile.name(),
        output = %output.display(),
        layers = profile.layer_count(),
        "wrote profile"
    );

    let layers = layer_ids
        .iter()
        .zip(parameters)
        .enumerate()
        .map(|(index, (id, parameters))| LinkedLayer {
            position: index + 1,
            baseline_layer: *id,
            model: parameters.model.code(),
        })
        .collect();

    Ok(ConvertedProfile {
        record: profile.name().to_string(),
        kind: profile.kind(),
        output,
        layers,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSummary {
    pub record: String,
    pub kind: RecordKind,
    pub layers: usize,
    pub total_thickness: f64,
}

/// Parses every record without writing anything.
pub fn summarize_archive(archive_path: &Path) -> DpzResult<Vec<RecordSummary>> {
    let mut archive = ProfileArchive::open(archive_path)?;
    let names = archive.records().to_vec();
    names
        .iter()
        .map(|name| -> DpzResult<RecordSummary> {
            let profile = parse_profile(archive.read_record(name)?)?;
            Ok(RecordSummary {
                record: name.to_string(),
                kind: profile.kind(),
                layers: profile.layer_count(),
                total_thickness: profile.total_thickness(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        ConversionRequest, companion_parameter_path, convert, default_output_dir,
        has_archive_extension, summarize_archive,
    };
    use crate::domain::{DpzErrorCategory, GroupingAttribute, RecordKind};
    use crate::models::DISSIPATION_PARAMETERS;
    use crate::models::PwpModel;
    use crate::profile::token::tokenize;
    use crate::test_fixtures::{PARAMETER_TABLE, ROCK_BLOCK, layer, profile_text};
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn baseline_text() -> String {
        profile_text(&[
            layer(2.0, 18.0, 40.0),
            layer(3.0, 19.0, 50.0),
            layer(4.0, 20.0, 60.0),
        ])
    }

    fn variant_text(weights: &[f64]) -> String {
        let layers: Vec<_> = weights.iter().map(|weight| layer(1.0, *weight, 45.0)).collect();
        profile_text(&layers)
    }

    fn stage(temp: &TempDir, records: &[(&str, String)], table: &str) -> PathBuf {
        let archive_path = temp.path().join("site.dpz");
        let file = fs::File::create(&archive_path).expect("archive should be created");
        let mut writer = ZipWriter::new(file);
        for (name, content) in records {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("entry should start");
            writer
                .write_all(content.as_bytes())
                .expect("entry should be written");
        }
        writer.finish().expect("archive should finish");
        fs::write(temp.path().join("site_model-inputs.csv"), table).expect("table written");
        archive_path
    }

    fn output_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .expect("output dir should be readable")
            .map(|entry| {
                entry
                    .expect("entry should be readable")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }

    #[test]
    fn default_paths_follow_archive_stem() {
        let archive = Path::new("/data/runs/site-A.dpz");
        assert_eq!(
            companion_parameter_path(archive).expect("parameter path"),
            Path::new("/data/runs/site-A_model-inputs.csv")
        );
        assert_eq!(
            default_output_dir(archive).expect("output dir"),
            Path::new("/data/runs/site-A")
        );
        assert!(has_archive_extension(Path::new("X.DPZ")));
        assert!(!has_archive_extension(Path::new("X.zip")));
    }

    #[test]
    fn converts_baseline_and_variants_into_renumbered_files() {
        let temp = TempDir::new().expect("tempdir should be created");
        let archive = stage(
            &temp,
            &[
                ("Profile1", baseline_text()),
                ("Profile2", variant_text(&[18.0, 18.0, 18.0, 19.0, 19.0, 20.0])),
                ("Profile3", variant_text(&[18.0, 19.0, 19.0, 19.0, 20.0])),
            ],
            PARAMETER_TABLE,
        );
        let request = ConversionRequest::for_archive(&archive).expect("request should build");
        let report = convert(&request).expect("conversion should succeed");

        assert_eq!(
            output_files(&request.output_dir),
            vec!["Profile1.dp", "Profile2.dp", "Profile_Reference.dp"]
        );
        assert_eq!(report.profiles.len(), 3);
        assert_eq!(report.profiles[0].kind, RecordKind::Baseline);

        let first_variant: Vec<u32> = report.profiles[1]
            .layers
            .iter()
            .map(|layer| layer.baseline_layer)
            .collect();
        assert_eq!(first_variant, vec![1, 1, 1, 2, 2, 3]);
        assert_eq!(report.profiles[2].layers[0].model, PwpModel::VuceticDobry.code());
        assert_eq!(report.profiles[2].layers[1].model, PwpModel::BerrillDavis.code());

        let json = report.to_json().expect("report should serialize");
        assert!(json.contains("\"grouping\": \"unit_weight\""));
    }

    #[test]
    fn baseline_parameter_keys_match_model_groups() {
        let temp = TempDir::new().expect("tempdir should be created");
        let archive = stage(&temp, &[("Profile1", baseline_text())], PARAMETER_TABLE);
        let request = ConversionRequest::for_archive(&archive).expect("request should build");
        convert(&request).expect("conversion should succeed");

        let written = fs::read_to_string(request.output_dir.join("Profile_Reference.dp"))
            .expect("reference profile should exist");
        let parameter_lines: Vec<&str> = written
            .lines()
            .filter(|line| line.starts_with("\t[RU]:"))
            .collect();
        let models = [
            PwpModel::VuceticDobry,
            PwpModel::BerrillDavis,
            PwpModel::Matasovic,
        ];
        assert_eq!(parameter_lines.len(), models.len());

        for (line, model) in parameter_lines.iter().zip(models) {
            let keys: Vec<String> = tokenize([*line]).into_iter().map(|token| token.key).collect();
            let expected: Vec<&str> = DISSIPATION_PARAMETERS
                .iter()
                .copied()
                .chain(model.required_parameters().iter().copied())
                .collect();
            assert_eq!(keys, expected);
        }
    }

    #[test]
    fn baseline_only_archive_keeps_rock_block_untouched() {
        let temp = TempDir::new().expect("tempdir should be created");
        let archive = stage(&temp, &[("Profile1", baseline_text())], PARAMETER_TABLE);
        let request = ConversionRequest::for_archive(&archive).expect("request should build");
        convert(&request).expect("conversion should succeed");

        assert_eq!(output_files(&request.output_dir), vec!["Profile_Reference.dp"]);
        let written = fs::read_to_string(request.output_dir.join("Profile_Reference.dp"))
            .expect("reference profile should exist");
        assert!(written.ends_with(ROCK_BLOCK));
        assert!(written.contains("[LAYER]:[TOP_OF_ROCK]\n\t[OUTPUT]:[TRUE]\n[HALFSPACE]"));
    }

    #[test]
    fn unknown_model_writes_nothing() {
        let temp = TempDir::new().expect("tempdir should be created");
        let table = PARAMETER_TABLE.replace("S_BD", "A_G");
        let archive = stage(&temp, &[("Profile1", baseline_text())], &table);
        let request = ConversionRequest::for_archive(&archive).expect("request should build");

        let error = convert(&request).expect_err("unknown model should fail");
        assert_eq!(error.category(), DpzErrorCategory::UnknownModel);
        assert!(!request.output_dir.exists());
    }

    #[test]
    fn grouping_failure_removes_output_directory() {
        let temp = TempDir::new().expect("tempdir should be created");
        let archive = stage(
            &temp,
            &[
                ("Profile1", baseline_text()),
                ("Profile2", variant_text(&[18.0, 19.0, 20.0, 21.0])),
            ],
            PARAMETER_TABLE,
        );
        let request = ConversionRequest::for_archive(&archive).expect("request should build");

        let error = convert(&request).expect_err("four groups cannot map onto three layers");
        assert_eq!(error.category(), DpzErrorCategory::Grouping);
        assert!(!request.output_dir.exists(), "partial output must be removed");
    }

    #[test]
    fn variant_parse_failure_keeps_written_baseline() {
        let temp = TempDir::new().expect("tempdir should be created");
        let broken_variant = variant_text(&[18.0, 19.0]).replacen("[WEIGHT]:[18] ", "", 1);
        let archive = stage(
            &temp,
            &[("Profile1", baseline_text()), ("Profile2", broken_variant)],
            PARAMETER_TABLE,
        );
        let request = ConversionRequest::for_archive(&archive).expect("request should build");

        let error = convert(&request).expect_err("variant without WEIGHT should fail");
        assert_eq!(error.placeholder(), "PARSE.MISSING_TOKEN");
        assert!(
            request.output_dir.join("Profile_Reference.dp").is_file(),
            "baseline written before the failure must remain"
        );
        assert!(!request.output_dir.join("Profile1.dp").exists());
    }

    #[test]
    fn crlf_records_are_written_back_with_crlf() {
        let temp = TempDir::new().expect("tempdir should be created");
        let archive = stage(
            &temp,
            &[("Profile1", baseline_text().replace('\n', "\r\n"))],
            PARAMETER_TABLE,
        );
        let request = ConversionRequest::for_archive(&archive).expect("request should build");
        convert(&request).expect("conversion should succeed");

        let written = fs::read(request.output_dir.join("Profile_Reference.dp"))
            .expect("reference profile should exist");
        let line_feeds = written.iter().filter(|byte| **byte == b'\n').count();
        let crlf_pairs = written.windows(2).filter(|pair| *pair == b"\r\n").count();
        assert!(line_feeds > 0);
        assert_eq!(crlf_pairs, line_feeds, "every line should end in CRLF");
    }

    #[test]
    fn strength_grouping_is_selectable() {
        let temp = TempDir::new().expect("tempdir should be created");
        let archive = stage(
            &temp,
            &[
                ("Profile1", baseline_text()),
                ("Profile2", variant_text(&[18.0, 19.0, 20.0, 21.0])),
            ],
            PARAMETER_TABLE,
        );
        let request = ConversionRequest::for_archive(&archive)
            .expect("request should build")
            .with_grouping(GroupingAttribute::Strength);

        let report = convert(&request).expect("equal strengths form one group");
        assert!(
            report.profiles[1]
                .layers
                .iter()
                .all(|layer| layer.baseline_layer == 1)
        );
    }

    #[test]
    fn existing_output_directory_is_not_clobbered() {
        let temp = TempDir::new().expect("tempdir should be created");
        let archive = stage(&temp, &[("Profile1", baseline_text())], PARAMETER_TABLE);
        let request = ConversionRequest::for_archive(&archive).expect("request should build");
        fs::create_dir(&request.output_dir).expect("pre-existing dir");
        fs::write(request.output_dir.join("keep.txt"), "mine").expect("marker written");

        let error = convert(&request).expect_err("existing output should fail");
        assert_eq!(error.placeholder(), "IO.OUTPUT_EXISTS");
        assert!(request.output_dir.join("keep.txt").is_file());
    }

    #[test]
    fn missing_parameter_table_is_not_found() {
        let temp = TempDir::new().expect("tempdir should be created");
        let archive = stage(&temp, &[("Profile1", baseline_text())], PARAMETER_TABLE);
        fs::remove_file(temp.path().join("site_model-inputs.csv")).expect("table removed");
        let request = ConversionRequest::for_archive(&archive).expect("request should build");

        let error = convert(&request).expect_err("missing table should fail");
        assert_eq!(error.category(), DpzErrorCategory::NotFound);
        assert!(!request.output_dir.exists());
    }

    #[test]
    fn summary_lists_every_record() {
        let temp = TempDir::new().expect("tempdir should be created");
        let archive = stage(
            &temp,
            &[
                ("Profile1", baseline_text()),
                ("Profile2", variant_text(&[18.0, 19.0])),
            ],
            PARAMETER_TABLE,
        );

        let summary = summarize_archive(&archive).expect("summary should build");
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].layers, 3);
        assert_eq!(summary[0].total_thickness, 9.0);
        assert_eq!(summary[1].kind, RecordKind::Variant);
        assert_eq!(summary[1].layers, 2);
    }
}
