use crate::domain::{
    BASELINE_RECORD_INDEX, DpzError, DpzResult, LineEnding, ProfileRecord, RecordKind,
    RecordName,
};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::ZipArchive;

/// Read-only view of a `.dpz` profile bundle.
pub struct ProfileArchive {
    path: PathBuf,
    archive: ZipArchive<File>,
    records: Vec<RecordName>,
}

impl ProfileArchive {
    pub fn open(path: impl AsRef<Path>) -> DpzResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DpzError::not_found(
                "NOTFOUND.ARCHIVE",
                format!("profile bundle '{}' does not exist", path.display()),
            ));
        }

        let file = File::open(path).map_err(|source| {
            DpzError::io(
                "IO.ARCHIVE_OPEN",
                format!(
                    "failed to open profile bundle '{}': {}",
                    path.display(),
                    source
                ),
            )
        })?;
        let archive = ZipArchive::new(file).map_err(|source| {
            DpzError::format(
                "FORMAT.BAD_ARCHIVE",
                format!(
                    "'{}' is not a valid profile bundle: {}",
                    path.display(),
                    source
                ),
            )
        })?;

        let records = collect_record_names(path, archive.file_names())?;
        debug!(
            archive = %path.display(),
            records = records.len(),
            "opened profile bundle"
        );

        Ok(Self {
            path: path.to_path_buf(),
            archive,
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record names ordered by numeric index, baseline first.
    pub fn records(&self) -> &[RecordName] {
        &self.records
    }

    pub fn baseline(&self) -> &RecordName {
        &self.records[0]
    }

    pub fn variants(&self) -> impl Iterator<Item = &RecordName> {
        self.records
            .iter()
            .filter(|name| name.kind() == RecordKind::Variant)
    }

    pub fn read_record(&mut self, name: &RecordName) -> DpzResult<ProfileRecord> {
        let mut entry = self.archive.by_name(&name.entry).map_err(|source| {
            DpzError::format(
                "FORMAT.RECORD_READ",
                format!(
                    "failed to locate record '{}' in '{}': {}",
                    name,
                    self.path.display(),
                    source
                ),
            )
        })?;

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes).map_err(|source| {
            DpzError::format(
                "FORMAT.RECORD_READ",
                format!(
                    "record '{}' in '{}' is corrupt: {}",
                    name,
                    self.path.display(),
                    source
                ),
            )
        })?;

        let (lines, line_ending) = decode_lines(&bytes);
        Ok(ProfileRecord::new(name.clone(), lines).with_line_ending(line_ending))
    }
}

fn collect_record_names<'a>(
    path: &Path,
    entries: impl Iterator<Item = &'a str>,
) -> DpzResult<Vec<RecordName>> {
    let mut by_index: BTreeMap<usize, RecordName> = BTreeMap::new();
    for entry in entries {
        let Some(name) = RecordName::parse(entry) else {
            warn!(entry, archive = %path.display(), "ignoring non-profile archive entry");
            continue;
        };

        if let Some(previous) = by_index.get(&name.index) {
            return Err(DpzError::format(
                "FORMAT.DUPLICATE_RECORD",
                format!(
                    "bundle '{}' holds two entries for {}: '{}' and '{}'",
                    path.display(),
                    name,
                    previous.entry,
                    name.entry
                ),
            ));
        }
        by_index.insert(name.index, name);
    }

    if !by_index.contains_key(&BASELINE_RECORD_INDEX) {
        return Err(DpzError::format(
            "FORMAT.MISSING_BASELINE",
            format!(
                "bundle '{}' has no baseline record 'Profile{}'",
                path.display(),
                BASELINE_RECORD_INDEX
            ),
        ));
    }

    Ok(by_index.into_values().collect())
}

/// Decodes record bytes as text and splits on normalized line endings.
/// A record with any CRLF pair is reported as CRLF.
pub fn decode_lines(bytes: &[u8]) -> (Vec<String>, LineEnding) {
    let text = String::from_utf8_lossy(bytes);
    let line_ending = LineEnding::detect(&text);
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    (normalized.lines().map(str::to_string).collect(), line_ending)
}
