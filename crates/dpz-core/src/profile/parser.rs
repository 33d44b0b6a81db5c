use super::token::{Token, find_value, tokenize};
use super::{LayerBlock, ParsedProfile};
use crate::domain::{DpzError, Layer, ParserResult, ProfileRecord, RecordKind};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

pub const LAYER_MARKER: &str = "[LAYER]:";
pub const ANALYSIS_TYPE_MARKER: &str = "[ANALYSIS_TYPE]:";

static LAYER_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[LAYER\]:\[").expect("layer marker pattern should compile")
});

pub fn parse_profile(record: ProfileRecord) -> ParserResult<ParsedProfile> {
    let markers: Vec<usize> = record
        .lines
        .iter()
        .enumerate()
        .filter(|(_, line)| LAYER_MARKER_RE.is_match(line))
        .map(|(index, _)| index)
        .collect();

    let Some(&rock_start) = markers.last() else {
        return Err(DpzError::parse(
            "PARSE.NO_LAYERS",
            format!("record '{}' has no '{}' marker", record.name, LAYER_MARKER),
        ));
    };

    let analysis_line = locate_analysis_line(&record)?;
    let kind = record.kind();

    let mut layers = Vec::with_capacity(markers.len() - 1);
    for (index, window) in markers.windows(2).enumerate() {
        let (start, end) = (window[0], window[1]);
        let block_lines = &record.lines[start..end];
        let tokens = tokenize(block_lines.iter().map(String::as_str));
        let layer = parse_layer(&record, kind, index, &tokens)?;
        let terminator = block_terminator(block_lines).map_or(end - 1, |offset| start + offset);

        debug!(
            record = %record.name,
            layer = index + 1,
            id = ?layer.id,
            thickness = layer.thickness,
            weight = ?layer.unit_weight,
            "parsed layer block"
        );
        layers.push(LayerBlock {
            lines: start..end,
            terminator,
            layer,
        });
    }

    let rock = rock_start..record.lines.len();
    Ok(ParsedProfile {
        record,
        layers,
        rock,
        analysis_line,
    })
}

fn locate_analysis_line(record: &ProfileRecord) -> ParserResult<usize> {
    let mut matches = record
        .lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.contains(ANALYSIS_TYPE_MARKER))
        .map(|(index, _)| index);

    let Some(first) = matches.next() else {
        return Err(DpzError::parse(
            "PARSE.NO_ANALYSIS_TYPE",
            format!(
                "record '{}' has no '{}' line",
                record.name, ANALYSIS_TYPE_MARKER
            ),
        ));
    };

    if let Some(second) = matches.next() {
        return Err(DpzError::parse(
            "PARSE.DUPLICATE_ANALYSIS_TYPE",
            format!(
                "record '{}' has '{}' on lines {} and {}",
                record.name,
                ANALYSIS_TYPE_MARKER,
                first + 1,
                second + 1
            ),
        ));
    }

    Ok(first)
}

/// Offset of the last non-blank line in a block.
fn block_terminator(block_lines: &[String]) -> Option<usize> {
    block_lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
}

fn parse_layer(
    record: &ProfileRecord,
    kind: RecordKind,
    index: usize,
    tokens: &[Token],
) -> ParserResult<Layer> {
    let id = match kind {
        RecordKind::Baseline => {
            let raw = required_token(record, index, tokens, "LAYER")?;
            Some(raw.trim().parse::<u32>().map_err(|_| {
                DpzError::parse(
                    "PARSE.INVALID_LAYER_ID",
                    format!(
                        "layer {} of '{}' has non-integer id '{}'",
                        index + 1,
                        record.name,
                        raw
                    ),
                )
            })?)
        }
        RecordKind::Variant => None,
    };

    let thickness = number(
        record,
        index,
        "THICKNESS",
        required_token(record, index, tokens, "THICKNESS")?,
    )?;

    let (unit_weight, soil_model) = match kind {
        RecordKind::Variant => {
            let weight = required_token(record, index, tokens, "WEIGHT")?;
            let model = required_token(record, index, tokens, "MODEL")?;
            (
                Some(number(record, index, "WEIGHT", weight)?),
                Some(model.to_string()),
            )
        }
        RecordKind::Baseline => (
            optional_number(record, index, tokens, "WEIGHT")?,
            find_value(tokens, "MODEL").map(str::to_string),
        ),
    };
    let strength = optional_number(record, index, tokens, "STRENGTH")?;

    Ok(Layer {
        index,
        id,
        thickness,
        unit_weight,
        strength,
        soil_model,
    })
}

fn required_token<'a>(
    record: &ProfileRecord,
    index: usize,
    tokens: &'a [Token],
    key: &str,
) -> ParserResult<&'a str> {
    find_value(tokens, key).ok_or_else(|| {
        DpzError::parse(
            "PARSE.MISSING_TOKEN",
            format!(
                "layer {} of '{}' has no {} token",
                index + 1,
                record.name,
                key
            ),
        )
    })
}

fn optional_number(
    record: &ProfileRecord,
    index: usize,
    tokens: &[Token],
    key: &str,
) -> ParserResult<Option<f64>> {
    find_value(tokens, key)
        .map(|raw| number(record, index, key, raw))
        .transpose()
}

fn number(record: &ProfileRecord, index: usize, key: &str, raw: &str) -> ParserResult<f64> {
    raw.trim().parse::<f64>().map_err(|_| {
        DpzError::parse(
            "PARSE.INVALID_NUMBER",
            format!(
                "layer {} of '{}' has non-numeric {} value '{}'",
                index + 1,
                record.name,
                key,
                raw
            ),
        )
    })
}
