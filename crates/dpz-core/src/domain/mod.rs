pub mod errors;

pub use errors::{DpzError, DpzErrorCategory, DpzResult, ParserResult};

use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub const RECORD_PREFIX: &str = "Profile";
pub const BASELINE_RECORD_INDEX: usize = 1;
pub const REFERENCE_OUTPUT_NAME: &str = "Profile_Reference.dp";
pub const PROFILE_EXTENSION: &str = "dp";
pub const ARCHIVE_EXTENSION: &str = "dpz";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Baseline,
    Variant,
}

/// Name of one record inside a bundle, e.g. `Profile3`.
///
/// `entry` keeps the archive entry name as stored so the record can be read
/// back even when the bundle writer added a directory or an extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordName {
    pub entry: String,
    pub index: usize,
}

impl RecordName {
    pub fn parse(entry: &str) -> Option<Self> {
        let file_name = Path::new(entry).file_name()?.to_str()?;
        let stem = file_name
            .rsplit_once('.')
            .map_or(file_name, |(stem, _)| stem);
        let digits = stem.strip_prefix(RECORD_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        let index = digits.parse::<usize>().ok()?;
        if index == 0 {
            return None;
        }

        Some(Self {
            entry: entry.to_string(),
            index,
        })
    }

    pub fn kind(&self) -> RecordKind {
        if self.index == BASELINE_RECORD_INDEX {
            RecordKind::Baseline
        } else {
            RecordKind::Variant
        }
    }

    /// Baseline becomes the reference profile; variants shift down by one so
    /// the first randomized profile is `Profile1.dp`.
    pub fn output_file_name(&self) -> String {
        match self.kind() {
            RecordKind::Baseline => REFERENCE_OUTPUT_NAME.to_string(),
            RecordKind::Variant => {
                format!("{}{}.{}", RECORD_PREFIX, self.index - 1, PROFILE_EXTENSION)
            }
        }
    }
}

impl Display for RecordName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", RECORD_PREFIX, self.index)
    }
}

/// Line terminator of a source record, reused when the record is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            Self::CrLf
        } else {
            Self::Lf
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub name: RecordName,
    pub lines: Vec<String>,
    pub line_ending: LineEnding,
}

impl ProfileRecord {
    pub fn new(name: RecordName, lines: Vec<String>) -> Self {
        Self {
            name,
            lines,
            line_ending: LineEnding::default(),
        }
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn kind(&self) -> RecordKind {
        self.name.kind()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Position among the record's soil layers, 0-based.
    pub index: usize,
    /// Layer id written after `[LAYER]:`; only baseline records carry one.
    pub id: Option<u32>,
    pub thickness: f64,
    pub unit_weight: Option<f64>,
    pub strength: Option<f64>,
    pub soil_model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingAttribute {
    #[default]
    UnitWeight,
    Strength,
}

impl GroupingAttribute {
    pub const fn token(self) -> &'static str {
        match self {
            Self::UnitWeight => "WEIGHT",
            Self::Strength => "STRENGTH",
        }
    }

    pub fn value_of(self, layer: &Layer) -> Option<f64> {
        match self {
            Self::UnitWeight => layer.unit_weight,
            Self::Strength => layer.strength,
        }
    }
}

impl Display for GroupingAttribute {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}
