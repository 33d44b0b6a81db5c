use crate::domain::{DpzError, DpzResult};
use crate::parameters::LayerParameters;
use crate::profile::ParsedProfile;
use crate::profile::token::render_line;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Replaces the analysis-type line: nonlinear analysis with PWP generation,
/// dissipation, and both column boundaries permeable.
pub const PWP_HEADER_BLOCK: [&str; 3] = [
    "[ANALYSIS_TYPE]:[NONLINEAR]",
    "\t[PWP_GENERATION]:[TRUE] [PWP_DISSIPATION]:[TRUE]",
    "\t[TOP_PERMEABLE]:[TRUE] [BOTTOM_PERMEABLE]:[TRUE]",
];

const PARAMETER_LINE_INDENT: &str = "\t";

/// Renders `profile` with one parameter line per soil layer.
///
/// `parameters[i]` belongs to `profile.layers[i]`. Rendering reads the parsed
/// record only, so repeated calls give identical text.
pub fn render_profile(profile: &ParsedProfile, parameters: &[&LayerParameters]) -> DpzResult<String> {
    if parameters.len() != profile.layers.len() {
        return Err(DpzError::parse(
            "PARSE.PARAMETER_COUNT",
            format!(
                "record '{}' has {} layers but {} parameter sets were linked",
                profile.name(),
                profile.layers.len(),
                parameters.len()
            ),
        ));
    }

    let mut insertions = profile
        .layers
        .iter()
        .zip(parameters)
        .map(|(block, parameters)| (block.terminator, render_parameter_line(parameters)))
        .peekable();

    let ending = profile.record.line_ending.as_str();
    let mut output = String::new();
    for (index, line) in profile.record.lines.iter().enumerate() {
        while let Some((_, parameter_line)) =
            insertions.next_if(|(terminator, _)| *terminator == index)
        {
            push_line(&mut output, &parameter_line, ending);
        }

        if index == profile.analysis_line {
            for header_line in PWP_HEADER_BLOCK {
                push_line(&mut output, header_line, ending);
            }
        } else {
            push_line(&mut output, line, ending);
        }
    }

    Ok(output)
}

pub fn render_parameter_line(parameters: &LayerParameters) -> String {
    format!("{}{}", PARAMETER_LINE_INDENT, render_line(&parameters.tokens))
}

fn push_line(output: &mut String, line: &str, ending: &str) {
    output.push_str(line);
    output.push_str(ending);
}

/// Writes `content` to `output_dir/file_name` through a sibling temp file so
/// the target either holds the whole profile or does not exist.
pub fn write_profile(output_dir: &Path, file_name: &str, content: &str) -> DpzResult<PathBuf> {
    let target = output_dir.join(file_name);
    let io_error = |action: &str, source: &dyn std::fmt::Display| {
        DpzError::io(
            "IO.PROFILE_WRITE",
            format!("failed to {} '{}': {}", action, target.display(), source),
        )
    };

    let mut staged = NamedTempFile::new_in(output_dir)
        .map_err(|source| io_error("stage", &source))?;
    staged
        .write_all(content.as_bytes())
        .and_then(|()| staged.flush())
        .map_err(|source| io_error("write", &source))?;
    staged
        .persist(&target)
        .map_err(|source| io_error("persist", &source.error))?;

    Ok(target)
}
