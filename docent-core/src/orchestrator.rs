//! Generation orchestrator
//!
//! Builds the layered prompt for one guidance block and runs the
//! clear/accumulate/perform/clear cycle on a collaborator.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::collaborator::Collaborator;
use crate::guidance::{relative_path, GuidanceStore};
use crate::layout::ProjectNode;
use crate::review::{BlockScope, GuidanceBlock};
use crate::Result;

/// Embedded prompt texts
const SYSTEM_PROMPT: &str = include_str!("prompts/system.md");
const PROCESSING_PROMPT: &str = include_str!("prompts/processing.md");
const OUTPUT_FORMAT_PROMPT: &str = include_str!("prompts/output_format.md");

/// Hidden per-project directory holding prompt logs
pub const TEMP_DIR: &str = ".docent/temp";

/// Suffix appended to the mirrored file path of a prompt log
pub const LOG_SUFFIX: &str = ".txt";

/// Location of the prompt log for `file`: `<root>/.docent/temp/<relative path>.txt`
pub fn log_path(root: &Path, file: &Path) -> PathBuf {
    let rel = relative_path(root, file);
    let mut path = root.to_path_buf();
    for part in TEMP_DIR.split('/') {
        path.push(part);
    }
    for part in rel.split('/') {
        path.push(part);
    }
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(LOG_SUFFIX);
    path.set_file_name(name);
    path
}

/// Ordered prompt fragments for one generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptLayers {
    /// System instructions, sent separately from the fragments
    pub instructions: String,
    /// Processing instructions, inherited guidance (root to leaf), project
    /// structure, file guidance and output format, in that order
    pub fragments: Vec<String>,
}

impl PromptLayers {
    /// Number of inherited directory guidance layers
    pub fn inherited_count(&self) -> usize {
        // processing + structure + guidance + output format are always present
        self.fragments.len().saturating_sub(4)
    }
}

/// Builder for [`PromptLayers`]
#[derive(Debug, Default)]
pub struct PromptLayersBuilder {
    inherited: Vec<String>,
    structure: String,
    guidance: String,
}

impl PromptLayersBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one inherited directory guidance layer
    pub fn inherited(mut self, text: impl Into<String>) -> Self {
        self.inherited.push(format!("## Folder Guidance\n\n{}", text.into().trim()));
        self
    }

    /// Set the project structure description
    pub fn structure(mut self, text: impl Into<String>) -> Self {
        self.structure = format!("## Project Structure\n\n{}", text.into().trim());
        self
    }

    /// Set the file's own guidance block
    pub fn guidance(mut self, text: impl Into<String>) -> Self {
        self.guidance = format!("## Task\n\n{}", text.into().trim_end());
        self
    }

    pub fn build(self) -> PromptLayers {
        let mut fragments = Vec::with_capacity(self.inherited.len() + 4);
        fragments.push(PROCESSING_PROMPT.trim().to_string());
        fragments.extend(self.inherited);
        fragments.push(self.structure);
        fragments.push(self.guidance);
        fragments.push(OUTPUT_FORMAT_PROMPT.trim().to_string());

        PromptLayers {
            instructions: SYSTEM_PROMPT.trim().to_string(),
            fragments,
        }
    }
}

/// Turns guidance blocks into generation requests
#[derive(Debug, Clone)]
pub struct Orchestrator {
    root: PathBuf,
    store: Arc<GuidanceStore>,
    use_parent_guidance: bool,
    cross_module: bool,
}

impl Orchestrator {
    /// Create an orchestrator for the run rooted at `root`
    pub fn new(root: impl Into<PathBuf>, store: Arc<GuidanceStore>) -> Self {
        Self {
            root: root.into(),
            store,
            use_parent_guidance: true,
            cross_module: false,
        }
    }

    pub fn with_parent_guidance(mut self, enabled: bool) -> Self {
        self.use_parent_guidance = enabled;
        self
    }

    pub fn with_cross_module(mut self, enabled: bool) -> Self {
        self.cross_module = enabled;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Assemble the prompt for `block`, found in `project` at module depth `module_depth`
    pub fn layers(&self, project: &ProjectNode, module_depth: usize, block: &GuidanceBlock) -> PromptLayers {
        let mut builder = PromptLayersBuilder::new();

        if self.use_parent_guidance {
            let rel = relative_path(&self.root, &block.file);
            let skip_own_dir = block.scope == BlockScope::Directory;
            for text in self
                .store
                .ancestor_chain(&rel, module_depth, self.cross_module, skip_own_dir)
            {
                builder = builder.inherited(text);
            }
        }

        builder
            .structure(project.structure_description())
            .guidance(&block.text)
            .build()
    }

    /// Run one generation request for `block`
    ///
    /// The collaborator is cleared before accumulating and again afterwards,
    /// whatever the outcome. Returns the prompt log path.
    pub async fn process(
        &self,
        project: &ProjectNode,
        module_depth: usize,
        block: &GuidanceBlock,
        collaborator: &mut dyn Collaborator,
    ) -> Result<PathBuf> {
        let layers = self.layers(project, module_depth, block);
        let log = log_path(&self.root, &block.file);

        collaborator.clear();
        collaborator.set_instructions(&layers.instructions);
        for fragment in &layers.fragments {
            collaborator.add_prompt(fragment);
        }
        collaborator.set_output_log(&log);

        debug!(
            file = %block.file.display(),
            inherited = layers.inherited_count(),
            collaborator = collaborator.name(),
            "Performing generation request"
        );
        let result = collaborator.perform().await;
        collaborator.clear();

        let output = result?;
        info!(
            file = %block.file.display(),
            log = %log.display(),
            output_chars = output.as_ref().map(|o| o.len()).unwrap_or(0),
            "Generated documentation"
        );
        Ok(log)
    }
}
