//! Reviewer trait and extension registry

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::trace;

use crate::Result;

use super::{GuidanceBlock, PlainGuidanceReviewer, ReferenceReviewer, SourceCommentReviewer, LANGUAGES};

/// Trait for guidance extractors
pub trait Reviewer: Send + Sync {
    /// Get the name of this reviewer
    fn name(&self) -> &'static str;

    /// Extract guidance from `file`, located under project `root`
    ///
    /// Returns `Ok(None)` when the file carries no guidance.
    fn review(&self, root: &Path, file: &Path) -> Result<Option<GuidanceBlock>>;
}

/// Registry mapping normalized file extensions to reviewers
///
/// Several reviewers may share an extension; they are tried in
/// registration order and the first one that finds guidance wins.
#[derive(Default)]
pub struct ReviewerRegistry {
    reviewers: HashMap<String, Vec<Arc<dyn Reviewer>>>,
}

impl ReviewerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the bundled reviewers
    ///
    /// `guidance_file` is the canonical name of dedicated directory guidance files.
    pub fn with_defaults(guidance_file: &str) -> Self {
        let mut registry = Self::new();

        let plain: Arc<dyn Reviewer> = Arc::new(PlainGuidanceReviewer::new(guidance_file));
        let plain_ext = Path::new(guidance_file)
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        registry.register(&plain_ext, plain);

        for language in LANGUAGES {
            let reviewer: Arc<dyn Reviewer> = Arc::new(SourceCommentReviewer::new(language));
            for ext in language.extensions {
                registry.register(ext, reviewer.clone());
            }
        }

        let reference: Arc<dyn Reviewer> = Arc::new(ReferenceReviewer::new());
        for ext in ReferenceReviewer::EXTENSIONS {
            registry.register(ext, reference.clone());
        }

        registry
    }

    /// Register a reviewer for an extension (with or without leading dot, any case)
    pub fn register(&mut self, extension: &str, reviewer: Arc<dyn Reviewer>) {
        self.reviewers
            .entry(normalize_extension(extension))
            .or_default()
            .push(reviewer);
    }

    /// Reviewers registered for an extension
    pub fn get(&self, extension: &str) -> &[Arc<dyn Reviewer>] {
        self.reviewers
            .get(&normalize_extension(extension))
            .map(|r| r.as_slice())
            .unwrap_or(&[])
    }

    /// All registered extensions, sorted
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.reviewers.keys().map(|s| s.as_str()).collect();
        exts.sort();
        exts
    }

    /// Run the reviewers registered for the file's extension
    ///
    /// Unregistered extensions yield `Ok(None)`.
    pub fn dispatch(&self, root: &Path, file: &Path) -> Result<Option<GuidanceBlock>> {
        let extension = file
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        for reviewer in self.get(&extension) {
            trace!(reviewer = reviewer.name(), file = %file.display(), "Reviewing file");
            if let Some(block) = reviewer.review(root, file)? {
                return Ok(Some(block));
            }
        }
        Ok(None)
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::BlockScope;
    use std::fs;
    use tempfile::TempDir;

    struct Fixed;

    impl Reviewer for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn review(&self, _root: &Path, file: &Path) -> Result<Option<GuidanceBlock>> {
            Ok(Some(GuidanceBlock::file(file, "fixed")))
        }
    }

    #[test]
    fn test_registry_register() {
        let mut registry = ReviewerRegistry::new();
        assert!(registry.get("foo").is_empty());

        registry.register(".FOO", Arc::new(Fixed));
        assert_eq!(registry.get("foo").len(), 1);
        assert_eq!(registry.extensions(), vec!["foo"]);
    }

    #[test]
    fn test_dispatch_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("Main.FOO");
        fs::write(&file, "").unwrap();

        let mut registry = ReviewerRegistry::new();
        registry.register("foo", Arc::new(Fixed));

        let block = registry.dispatch(dir.path(), &file).unwrap().unwrap();
        assert_eq!(block.text, "fixed");
    }

    #[test]
    fn test_dispatch_unmatched_extension() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("image.png");
        fs::write(&file, [0u8, 159, 146, 150]).unwrap();

        let registry = ReviewerRegistry::with_defaults("guidance.txt");
        assert!(registry.dispatch(dir.path(), &file).unwrap().is_none());
    }

    #[test]
    fn test_defaults_cover_languages() {
        let registry = ReviewerRegistry::with_defaults("guidance.txt");
        for ext in ["txt", "rs", "java", "py", "ts", "go", "md", "html"] {
            assert!(!registry.get(ext).is_empty(), "missing reviewer for {}", ext);
        }
    }

    #[test]
    fn test_guidance_md_shares_extension_with_markdown() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("guidance.md"), "Keep it short.").unwrap();
        fs::write(
            dir.path().join("README.md"),
            "[//]: # (@guidance: describe installation)\n# Readme\n",
        )
        .unwrap();

        let registry = ReviewerRegistry::with_defaults("guidance.md");

        let seed = registry
            .dispatch(dir.path(), &dir.path().join("guidance.md"))
            .unwrap()
            .unwrap();
        assert!(seed.directory_seed);

        let readme = registry
            .dispatch(dir.path(), &dir.path().join("README.md"))
            .unwrap()
            .unwrap();
        assert_eq!(readme.scope, BlockScope::File);
        assert!(readme.text.contains("describe installation"));
    }
}
