//! Marker document rendering and the post-render guard

use crate::pipeline::AggregatedMarker;
use megamap_common::output::to_pretty_json;
use megamap_common::{Error, Result};

/// Marker document file name
pub const MARKERS_FILE: &str = "markers.json";

/// Line prefix of a known malformed injection in generated map documents
const MALFORMED_PREFIX: &str = ".{";

/// Serialize markers and check the result before anything is written
pub fn render_markers(markers: &[AggregatedMarker]) -> Result<String> {
    let text = to_pretty_json(markers)?;
    check_document(&text)?;
    Ok(text)
}

/// Reject documents containing a line that starts with `.{`
pub fn check_document(text: &str) -> Result<()> {
    match text
        .lines()
        .enumerate()
        .find(|(_, line)| line.trim_start().starts_with(MALFORMED_PREFIX))
    {
        Some((idx, line)) => {
            let excerpt: String = line.trim().chars().take(60).collect();
            Err(Error::MalformedOutput(format!(
                "line {} starts with '{}': {}",
                idx + 1,
                MALFORMED_PREFIX,
                excerpt
            )))
        }
        None => Ok(()),
    }
}
