//! Links randomized sublayers back to the baseline layers they were drawn
//! from.
//!
//! Randomization splits each baseline layer into sublayers that keep the
//! baseline's grouping attribute, so runs of equal values mark the original
//! layer boundaries. Values are tallied per distinct rounded value, not per
//! run: two non-adjacent layers sharing a value fold into one group and the
//! walk drifts. The tally is kept as is; a tally with more groups than
//! baseline layers is reported instead of guessed at.

use crate::domain::{DpzError, DpzResult, GroupingAttribute};
use crate::profile::ParsedProfile;
use tracing::debug;

const ROUNDING_SCALE: f64 = 1.0e6;

/// Baseline layer id for every sublayer of `variant`, in file order.
pub fn link_layers(
    variant: &ParsedProfile,
    baseline_ids: &[u32],
    attribute: GroupingAttribute,
) -> DpzResult<Vec<u32>> {
    let values = variant
        .layers
        .iter()
        .map(|block| {
            attribute.value_of(&block.layer).ok_or_else(|| {
                DpzError::parse(
                    "PARSE.MISSING_TOKEN",
                    format!(
                        "layer {} of '{}' has no {} token for grouping",
                        block.layer.index + 1,
                        variant.name(),
                        attribute
                    ),
                )
            })
        })
        .collect::<DpzResult<Vec<f64>>>()?;

    let boundaries = group_boundaries(&tally(&values));
    debug!(
        record = %variant.name(),
        groups = boundaries.len(),
        baseline_layers = baseline_ids.len(),
        "tallied sublayer groups"
    );

    assign_groups(values.len(), &boundaries, baseline_ids).map_err(|group| {
        DpzError::grouping(
            "GROUPING.NON_UNIQUE",
            format!(
                "non-unique grouping attribute in '{}': {} yields {} groups for {} baseline layers (exhausted at group {})",
                variant.name(),
                attribute,
                boundaries.len(),
                baseline_ids.len(),
                group + 1
            ),
        )
    })
}

fn round_key(value: f64) -> i64 {
    (value * ROUNDING_SCALE).round() as i64
}

/// Occurrence count per distinct rounded value, in order of first appearance.
pub(crate) fn tally(values: &[f64]) -> Vec<usize> {
    let mut keys: Vec<i64> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    for value in values {
        let key = round_key(*value);
        match keys.iter().position(|existing| *existing == key) {
            Some(position) => counts[position] += 1,
            None => {
                keys.push(key);
                counts.push(1);
            }
        }
    }
    counts
}

/// Cumulative end index of each group.
pub(crate) fn group_boundaries(counts: &[usize]) -> Vec<usize> {
    counts
        .iter()
        .scan(0, |total, count| {
            *total += count;
            Some(*total)
        })
        .collect()
}

/// Walks sublayers, moving to the next baseline id each time a boundary is
/// crossed. On exhaustion returns the group index that had no baseline id.
fn assign_groups(
    sublayer_count: usize,
    boundaries: &[usize],
    baseline_ids: &[u32],
) -> Result<Vec<u32>, usize> {
    let mut ids = baseline_ids.iter().copied();
    let mut group = 0;
    let mut current = ids.next();
    let mut assigned = Vec::with_capacity(sublayer_count);

    for sublayer in 0..sublayer_count {
        while boundaries.get(group).is_some_and(|end| sublayer >= *end) {
            group += 1;
            current = ids.next();
        }
        match current {
            Some(id) => assigned.push(id),
            None => return Err(group),
        }
    }

    Ok(assigned)
}
