use crate::domain::{DpzError, DpzResult, ParserResult};
use crate::models::{MODEL_KEY, PwpModel};
use crate::profile::token::Token;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

pub const PARAMETER_TABLE_SUFFIX: &str = "_model-inputs.csv";
pub const HEADER_SKIP_ROWS: usize = 5;
const MODEL_COLUMN_ALIASES: [&str; 2] = [MODEL_KEY, "MODEL"];

static UNNAMED_COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^unnamed").expect("unnamed column pattern should compile")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterRow {
    pub layer_id: u32,
    pub model_code: String,
    /// Non-blank cells keyed by normalized column header.
    pub values: BTreeMap<String, String>,
}

impl ParameterRow {
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterTable {
    columns: Vec<String>,
    rows: BTreeMap<u32, ParameterRow>,
}

impl ParameterTable {
    pub fn read(path: impl AsRef<Path>) -> DpzResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DpzError::not_found(
                "NOTFOUND.PARAMETER_TABLE",
                format!("parameter table '{}' does not exist", path.display()),
            ));
        }

        let file = File::open(path).map_err(|source| {
            DpzError::io(
                "IO.PARAMETER_TABLE_OPEN",
                format!(
                    "failed to open parameter table '{}': {}",
                    path.display(),
                    source
                ),
            )
        })?;
        let table = Self::from_reader(file, &path.display().to_string())?;
        debug!(
            table = %path.display(),
            rows = table.len(),
            columns = table.columns.len(),
            "read parameter table"
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R, source: &str) -> ParserResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = csv_reader.records().skip(HEADER_SKIP_ROWS);
        let header = match records.next() {
            Some(record) => record.map_err(|error| csv_error(source, error))?,
            None => {
                return Err(DpzError::parse(
                    "PARSE.TABLE_HEADER",
                    format!(
                        "parameter table '{}' ends before its header row (expected {} documentation rows first)",
                        source, HEADER_SKIP_ROWS
                    ),
                ));
            }
        };

        let layout = ColumnLayout::from_header(&header, source)?;
        let mut rows = BTreeMap::new();
        for record in records {
            let record = record.map_err(|error| csv_error(source, error))?;
            let Some(row) = layout.row(&record, source)? else {
                continue;
            };
            if rows.contains_key(&row.layer_id) {
                return Err(DpzError::parse(
                    "PARSE.DUPLICATE_LAYER_ID",
                    format!(
                        "parameter table '{}' lists layer {} more than once",
                        source, row.layer_id
                    ),
                ));
            }
            rows.insert(row.layer_id, row);
        }

        Ok(Self {
            columns: layout.names(),
            rows,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, layer_id: u32) -> Option<&ParameterRow> {
        self.rows.get(&layer_id)
    }

    pub fn rows(&self) -> impl Iterator<Item = &ParameterRow> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

struct ColumnLayout {
    /// Kept data columns as (field position, normalized header).
    columns: Vec<(usize, String)>,
    model_position: usize,
}

impl ColumnLayout {
    fn from_header(header: &csv::StringRecord, source: &str) -> ParserResult<Self> {
        let columns: Vec<(usize, String)> = header
            .iter()
            .enumerate()
            .skip(1)
            .map(|(position, raw)| (position, normalize_header(raw)))
            .filter(|(_, name)| !name.is_empty() && !UNNAMED_COLUMN_RE.is_match(name))
            .collect();

        let model_position = columns
            .iter()
            .find(|(_, name)| {
                MODEL_COLUMN_ALIASES
                    .iter()
                    .any(|alias| name.eq_ignore_ascii_case(alias))
            })
            .or_else(|| columns.first())
            .map(|(position, _)| *position)
            .ok_or_else(|| {
                DpzError::parse(
                    "PARSE.TABLE_HEADER",
                    format!("parameter table '{}' has no model column", source),
                )
            })?;

        Ok(Self {
            columns,
            model_position,
        })
    }

    fn names(&self) -> Vec<String> {
        self.columns.iter().map(|(_, name)| name.clone()).collect()
    }

    fn row(&self, record: &csv::StringRecord, source: &str) -> ParserResult<Option<ParameterRow>> {
        let raw_id = record.get(0).unwrap_or_default();
        if raw_id.is_empty() {
            return Ok(None);
        }
        let layer_id = coerce_layer_id(raw_id).ok_or_else(|| {
            DpzError::parse(
                "PARSE.TABLE_LAYER_ID",
                format!(
                    "parameter table '{}' has non-integer layer id '{}'",
                    source, raw_id
                ),
            )
        })?;

        let model_code = record
            .get(self.model_position)
            .unwrap_or_default()
            .to_string();

        let values = self
            .columns
            .iter()
            .filter(|(position, _)| *position != self.model_position)
            .filter_map(|(position, name)| {
                record
                    .get(*position)
                    .filter(|cell| !cell.is_empty())
                    .map(|cell| (name.clone(), cell.to_string()))
            })
            .collect();

        Ok(Some(ParameterRow {
            layer_id,
            model_code,
            values,
        }))
    }
}

/// Collapses a possibly multi-line header into one line.
pub fn normalize_header(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn coerce_layer_id(raw: &str) -> Option<u32> {
    if let Ok(id) = raw.parse::<u32>() {
        return Some(id);
    }
    let value = raw.parse::<f64>().ok()?;
    (value.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&value)).then_some(value as u32)
}

fn csv_error(source: &str, error: csv::Error) -> DpzError {
    DpzError::parse(
        "PARSE.TABLE_CSV",
        format!("failed to read parameter table '{}': {}", source, error),
    )
}

/// Parameter line content for one baseline layer, resolved against the
/// model registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerParameters {
    pub layer_id: u32,
    pub model: PwpModel,
    pub tokens: Vec<Token>,
}

impl LayerParameters {
    pub fn resolve(row: &ParameterRow) -> DpzResult<Self> {
        let model = PwpModel::from_code(&row.model_code).map_err(|error| {
            DpzError::unknown_model(
                error.placeholder(),
                format!("layer {}: {}", row.layer_id, error.message()),
            )
        })?;

        let tokens = model
            .parameter_keys()
            .map(|key| {
                if key == MODEL_KEY {
                    return Token::new(key, model.tag());
                }
                let value = row.value(key).unwrap_or_else(|| {
                    warn!(
                        layer = row.layer_id,
                        model = %model,
                        parameter = key,
                        "parameter table has no value; writing it empty"
                    );
                    ""
                });
                Token::new(key, value)
            })
            .collect();

        Ok(Self {
            layer_id: row.layer_id,
            model,
            tokens,
        })
    }
}

/// Resolves every row up front so an unknown model aborts before any output
/// is written.
pub fn resolve_table(table: &ParameterTable) -> DpzResult<BTreeMap<u32, LayerParameters>> {
    table
        .rows()
        .map(|row| LayerParameters::resolve(row).map(|resolved| (row.layer_id, resolved)))
        .collect()
}
