//! Directory guidance store
//!
//! Maps root-relative directory keys (`/`, `/app`, `/app/src`, ...) to the
//! guidance text found in that directory. The store is filled by the
//! collection pass and only read during generation.

use std::collections::BTreeMap;
use std::path::{Component, Path};

/// Key of the project root directory
pub const ROOT_KEY: &str = "/";

/// Number of non-empty segments in a path, independent of separator style
///
/// `None` and blank input have depth 0.
pub fn path_depth(path: Option<&str>) -> usize {
    path.map(|p| segments(p).count()).unwrap_or(0)
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\']).filter(|s| !s.trim().is_empty())
}

/// Path of `path` relative to `root`, always with `/` separators
///
/// Paths outside `root` are returned as given.
pub fn relative_path(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.to_string_lossy().replace('\\', "/"),
    }
}

/// Store key of a directory: `/` followed by its root-relative path
pub fn dir_key(root: &Path, dir: &Path) -> String {
    format!("/{}", relative_path(root, dir))
}

/// A single directory guidance entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuidanceRecord {
    pub key: String,
    pub text: String,
}

/// Mapping from directory key to guidance text
#[derive(Debug, Clone, Default)]
pub struct GuidanceStore {
    records: BTreeMap<String, String>,
}

impl GuidanceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert guidance for a directory, replacing any previous text
    ///
    /// Returns the replaced text, if any.
    pub fn put(&mut self, key: impl Into<String>, text: impl Into<String>) -> Option<String> {
        self.records.insert(normalize_key(&key.into()), text.into())
    }

    /// Guidance recorded for a directory
    pub fn get(&self, key: &str) -> Option<&str> {
        self.records.get(&normalize_key(key)).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop all records; used between independent runs
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Records ordered by key
    pub fn records(&self) -> impl Iterator<Item = GuidanceRecord> + '_ {
        self.records.iter().map(|(key, text)| GuidanceRecord {
            key: key.clone(),
            text: text.clone(),
        })
    }

    /// Guidance inherited by a file, ordered from the root down
    ///
    /// Walks the directories from `/` to the file's parent. A directory at
    /// depth `d` is consulted when `d >= module_root_depth` or `cross_module`
    /// is set. With `skip_own_dir`, the file's parent directory is left out.
    pub fn ancestor_chain(
        &self,
        file_rel: &str,
        module_root_depth: usize,
        cross_module: bool,
        skip_own_dir: bool,
    ) -> Vec<&str> {
        let parts: Vec<&str> = segments(file_rel).collect();
        let parent_len = parts.len().saturating_sub(1);

        let mut chain = Vec::new();
        for depth in 0..=parent_len {
            if depth < module_root_depth && !cross_module {
                continue;
            }
            if skip_own_dir && depth == parent_len {
                continue;
            }

            let key = if depth == 0 {
                ROOT_KEY.to_string()
            } else {
                format!("/{}", parts[..depth].join("/"))
            };

            if let Some(text) = self.records.get(&key) {
                if !text.trim().is_empty() {
                    chain.push(text.as_str());
                }
            }
        }
        chain
    }
}

fn normalize_key(key: &str) -> String {
    format!("/{}", segments(key).collect::<Vec<_>>().join("/"))
}
