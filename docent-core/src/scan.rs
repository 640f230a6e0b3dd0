//! Collection pass
//!
//! Walks the project tree once, module by module, and produces a
//! [`ScanPlan`]: the tree of detected projects with the guidance blocks
//! found in each, plus the directory guidance store. No generation request
//! is made here.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::ScanConfig;
use crate::guidance::{dir_key, path_depth, relative_path, GuidanceStore};
use crate::layout::ProjectNode;
use crate::review::{GuidanceBlock, ReviewerRegistry};
use crate::summary::SkippedFile;
use crate::{Error, Result};

/// Entry names that are never scanned
pub const ALWAYS_EXCLUDED: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    ".idea",
    ".vscode",
    "target",
    "node_modules",
    "build",
    "dist",
    "out",
    "__pycache__",
    ".venv",
    ".gradle",
    ".docent",
];

/// Exclusion rules for scanned entries
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    tokens: Vec<String>,
}

impl ExclusionSet {
    /// Build from user tokens; tokens are trimmed and lowercased, blanks ignored
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { tokens }
    }

    /// Configured tokens after normalization
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Whether `path` is skipped: its name is always excluded, or the path
    /// contains one of the configured tokens (case-insensitive)
    pub fn excludes(&self, path: &Path) -> bool {
        let always = path
            .file_name()
            .map(|n| {
                let name = n.to_string_lossy();
                ALWAYS_EXCLUDED.iter().any(|x| name == *x)
            })
            .unwrap_or(false);
        always || self.matches_token(path)
    }

    /// Whether the absolute `path` contains a configured token
    pub fn matches_token(&self, path: &Path) -> bool {
        if self.tokens.is_empty() {
            return false;
        }
        let lowered = path.to_string_lossy().to_lowercase();
        self.tokens.iter().any(|t| lowered.contains(t.as_str()))
    }
}

/// One detected project and what was collected from it
#[derive(Debug, Clone)]
pub struct ScanNode {
    pub project: ProjectNode,
    /// Depth of the project root below the run root
    pub depth: usize,
    /// Blocks that produce generation requests, in file-name order
    pub blocks: Vec<GuidanceBlock>,
    /// Child modules, in declaration order
    pub modules: Vec<Arc<ScanNode>>,
}

impl ScanNode {
    /// Number of blocks in this node and all its modules
    pub fn total_blocks(&self) -> usize {
        self.blocks.len() + self.modules.iter().map(|m| m.total_blocks()).sum::<usize>()
    }

    /// Number of projects in this subtree, this one included
    pub fn project_count(&self) -> usize {
        1 + self.modules.iter().map(|m| m.project_count()).sum::<usize>()
    }
}

/// Result of the collection pass
#[derive(Debug, Clone)]
pub struct ScanPlan {
    /// Absolute run root
    pub root_dir: PathBuf,
    pub root: Arc<ScanNode>,
    pub skipped: Vec<SkippedFile>,
    pub store: GuidanceStore,
}

/// Builds [`ScanPlan`]s
#[derive(Clone)]
pub struct Scanner {
    registry: Arc<ReviewerRegistry>,
    exclusions: ExclusionSet,
}

impl Scanner {
    pub fn new(registry: Arc<ReviewerRegistry>, exclusions: ExclusionSet) -> Self {
        Self {
            registry,
            exclusions,
        }
    }

    /// Scanner with the bundled reviewers and the configured exclusions
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(
            Arc::new(ReviewerRegistry::with_defaults(&config.guidance_file)),
            ExclusionSet::new(&config.excludes),
        )
    }

    /// Run the collection pass from `root`
    ///
    /// Fails with [`Error::NotFound`] when `root` is not a directory. A
    /// missing module directory only drops that module.
    pub fn collect(&self, root: &Path) -> Result<ScanPlan> {
        let root_dir = std::path::absolute(root)?;
        if self.exclusions.matches_token(&root_dir) {
            warn!(
                root = %root_dir.display(),
                tokens = ?self.exclusions.tokens(),
                "An exclude token matches the root path itself, every entry will be skipped"
            );
        }
        let mut state = Collection {
            root: &root_dir,
            store: GuidanceStore::new(),
            skipped: Vec::new(),
            visited: HashSet::new(),
        };

        let node = self.collect_project(&root_dir, &mut state)?;
        info!(
            root = %root_dir.display(),
            projects = node.project_count(),
            blocks = node.total_blocks(),
            guidance_records = state.store.len(),
            skipped = state.skipped.len(),
            "Collection complete"
        );

        Ok(ScanPlan {
            root: Arc::new(node),
            skipped: state.skipped,
            store: state.store,
            root_dir,
        })
    }

    fn collect_project(&self, dir: &Path, state: &mut Collection<'_>) -> Result<ScanNode> {
        let project = ProjectNode::detect(dir)?;
        let depth = path_depth(Some(&relative_path(state.root, dir)));
        state.visited.insert(identity(dir));
        debug!(dir = %dir.display(), variant = %project.variant(), depth, "Detected project");

        let module_dirs: Vec<PathBuf> = project
            .modules()
            .iter()
            .filter(|m| {
                let inside = is_strict_subpath(m);
                if !inside {
                    warn!(dir = %dir.display(), module = %m, "Ignoring module outside its project");
                }
                inside
            })
            .map(|m| dir.join(m))
            .collect();

        let mut blocks = Vec::new();
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 {
                    return true;
                }
                if e.file_type().is_dir() && module_dirs.iter().any(|m| m == e.path()) {
                    return false;
                }
                !self.exclusions.excludes(e.path())
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let file = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
                    warn!(path = %file.display(), error = %e, "Skipping unreadable entry");
                    state.skipped.push(SkippedFile {
                        file,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let file = entry.path();
            match self.registry.dispatch(state.root, file) {
                Ok(Some(block)) if block.directory_seed => {
                    let folder = file.parent().unwrap_or(dir);
                    let key = dir_key(state.root, folder);
                    debug!(key = %key, file = %file.display(), "Recorded folder guidance");
                    state.store.put(key, block.text.trim());
                    blocks.push(block);
                }
                Ok(Some(block)) => {
                    debug!(file = %file.display(), scope = ?block.scope, "Found guidance");
                    blocks.push(block);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "Skipping file");
                    state.skipped.push(SkippedFile {
                        file: file.to_path_buf(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let mut modules = Vec::new();
        for module_dir in module_dirs {
            if state.visited.contains(&identity(&module_dir)) {
                warn!(module = %module_dir.display(), "Module already scanned, skipping");
                continue;
            }
            match self.collect_project(&module_dir, state) {
                Ok(node) => modules.push(Arc::new(node)),
                Err(Error::NotFound(missing)) => {
                    warn!(module = %missing.display(), "Module directory not found, skipping");
                    state.skipped.push(SkippedFile {
                        file: missing,
                        reason: "declared module directory not found".to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok(ScanNode {
            project,
            depth,
            blocks,
            modules,
        })
    }
}

/// Mutable state threaded through one collection pass
struct Collection<'a> {
    root: &'a Path,
    store: GuidanceStore,
    skipped: Vec<SkippedFile>,
    visited: HashSet<PathBuf>,
}

/// Symlink-resolved identity of a directory, used to break module cycles
fn identity(dir: &Path) -> PathBuf {
    dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf())
}

/// True for relative paths made only of normal components
fn is_strict_subpath(module: &str) -> bool {
    let path = Path::new(module);
    path.components().next().is_some()
        && path.components().all(|c| matches!(c, Component::Normal(_)))
}
