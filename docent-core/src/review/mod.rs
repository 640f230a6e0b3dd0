//! Guidance reviewers
//!
//! A reviewer inspects one file and either extracts the guidance embedded in
//! it or reports that there is none. Reviewers are looked up by file
//! extension through the [`ReviewerRegistry`].

mod plain;
mod reference;
mod reviewer;
mod source;

use std::path::{Path, PathBuf};

use crate::{Error, Result};

pub use plain::PlainGuidanceReviewer;
pub use reference::ReferenceReviewer;
pub use reviewer::{Reviewer, ReviewerRegistry};
pub use source::{CommentSyntax, SourceCommentReviewer, SourceLanguage, LANGUAGES};

/// Token that introduces guidance inside a comment
pub const GUIDANCE_MARKER: &str = "@guidance:";

/// What a guidance block talks about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockScope {
    /// Documentation of a single file
    File,
    /// Documentation of the folder the file describes
    Directory,
}

/// Guidance extracted from one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuidanceBlock {
    /// Formatted guidance text
    pub text: String,
    /// The file the guidance came from
    pub file: PathBuf,
    /// Whether the block documents the file or its folder
    pub scope: BlockScope,
    /// Dedicated directory guidance: seeds the guidance store for the
    /// folder before its own generation request runs
    pub directory_seed: bool,
}

impl GuidanceBlock {
    /// Block documenting a single file
    pub fn file(file: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            file: file.into(),
            scope: BlockScope::File,
            directory_seed: false,
        }
    }

    /// Block documenting the folder of a descriptor file
    pub fn directory(file: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            file: file.into(),
            scope: BlockScope::Directory,
            directory_seed: false,
        }
    }

    /// Dedicated directory guidance
    pub fn seed(file: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            file: file.into(),
            scope: BlockScope::Directory,
            directory_seed: true,
        }
    }
}

/// Read a file as UTF-8, mapping failures to [`Error::Extraction`]
pub(crate) fn read_source(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).map_err(|e| Error::Extraction {
        path: file.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Format a file-scoped block: relative path, guidance and the full source
pub(crate) fn format_file_block(rel_path: &str, guidance: &str, fence: &str, content: &str) -> String {
    let mut text = String::new();
    text.push_str(&format!("File: `{}`\n\n", rel_path));
    text.push_str("Guidance:\n");
    text.push_str(guidance.trim());
    text.push_str("\n\n");
    text.push_str("Current content:\n");
    text.push_str(&format!("```{}\n", fence));
    text.push_str(content);
    if !content.ends_with('\n') {
        text.push('\n');
    }
    text.push_str("```\n");
    text
}

/// Format a directory-scoped note: folder path and cleaned guidance
pub(crate) fn format_directory_note(folder_key: &str, guidance: &str) -> String {
    format!("Folder: `{}`\n\nGuidance:\n{}\n", folder_key, guidance.trim())
}
