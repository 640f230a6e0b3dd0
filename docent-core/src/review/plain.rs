//! Dedicated directory guidance files

use std::path::Path;

use crate::Result;

use super::{read_source, GuidanceBlock, Reviewer};

/// Reviewer for the canonical guidance file (`guidance.txt` by default)
///
/// Its whole content is the guidance of the containing directory.
#[derive(Debug, Clone)]
pub struct PlainGuidanceReviewer {
    file_name: String,
}

impl PlainGuidanceReviewer {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl Reviewer for PlainGuidanceReviewer {
    fn name(&self) -> &'static str {
        "plain-guidance"
    }

    fn review(&self, _root: &Path, file: &Path) -> Result<Option<GuidanceBlock>> {
        let matches = file
            .file_name()
            .map(|n| n.to_string_lossy() == self.file_name.as_str())
            .unwrap_or(false);
        if !matches {
            return Ok(None);
        }

        let content = read_source(file)?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(GuidanceBlock::seed(file, content)))
    }
}
