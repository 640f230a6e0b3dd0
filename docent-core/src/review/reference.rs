//! Guidance in lightweight markup via reference-link comments
//!
//! Markdown has no comment syntax; the conventional workaround is an unused
//! reference link: `[//]: # (@guidance: text)`.

use std::path::Path;

use crate::guidance::relative_path;
use crate::Result;

use super::{format_file_block, read_source, GuidanceBlock, Reviewer, GUIDANCE_MARKER};

/// Reviewer for Markdown reference-link guidance
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceReviewer;

impl ReferenceReviewer {
    /// Extensions handled by this reviewer
    pub const EXTENSIONS: &'static [&'static str] = &["md", "markdown"];

    pub fn new() -> Self {
        Self
    }
}

impl Reviewer for ReferenceReviewer {
    fn name(&self) -> &'static str {
        "markdown-reference"
    }

    fn review(&self, root: &Path, file: &Path) -> Result<Option<GuidanceBlock>> {
        let content = read_source(file)?;
        let pieces: Vec<&str> = content.lines().filter_map(parse_reference_comment).collect();
        if pieces.is_empty() {
            return Ok(None);
        }

        let rel = relative_path(root, file);
        Ok(Some(GuidanceBlock::file(
            file,
            format_file_block(&rel, &pieces.join("\n"), "markdown", &content),
        )))
    }
}

/// Parse `[//]: # (@guidance: text)` (also `[//]: <> (...)`)
fn parse_reference_comment(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("[//]:")?.trim_start();
    let rest = rest
        .strip_prefix('#')
        .or_else(|| rest.strip_prefix("<>"))?
        .trim_start();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?.trim();
    let text = inner.strip_prefix(GUIDANCE_MARKER)?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
