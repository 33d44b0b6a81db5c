mod parser;
pub mod token;

pub use parser::{ANALYSIS_TYPE_MARKER, LAYER_MARKER, parse_profile};

use crate::domain::{Layer, ProfileRecord, RecordKind, RecordName};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub struct LayerBlock {
    /// Lines from the `[LAYER]:` marker up to the next marker.
    pub lines: Range<usize>,
    /// Line the parameter line is inserted in front of.
    pub terminator: usize,
    pub layer: Layer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedProfile {
    pub record: ProfileRecord,
    pub layers: Vec<LayerBlock>,
    /// Rock/boundary block: last marker to end of record, never modified.
    pub rock: Range<usize>,
    pub analysis_line: usize,
}

impl ParsedProfile {
    pub fn name(&self) -> &RecordName {
        &self.record.name
    }

    pub fn kind(&self) -> RecordKind {
        self.record.kind()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn total_thickness(&self) -> f64 {
        self.layers.iter().map(|block| block.layer.thickness).sum()
    }

    /// Baseline layer ids in file order.
    pub fn layer_ids(&self) -> Vec<u32> {
        self.layers
            .iter()
            .filter_map(|block| block.layer.id)
            .collect()
    }
}
