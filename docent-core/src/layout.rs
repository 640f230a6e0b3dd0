//! Project layout detection
//!
//! Classifies a directory by the marker files it contains and resolves the
//! declared modules plus the conventional source, test and documentation paths
//! for that kind of project.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Recognized project classifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectVariant {
    /// Build-tool descriptor (Maven `pom.xml`)
    BuildTool,
    /// Package manifest (`package.json`)
    PackageManifest,
    /// Language project descriptor (`Cargo.toml`, `pyproject.toml`, `setup.py`, `go.mod`)
    LanguageDescriptor,
    /// Plain directory without a recognized marker
    Generic,
}

impl ProjectVariant {
    /// Get a human-readable description of the variant
    pub fn description(&self) -> &'static str {
        match self {
            ProjectVariant::BuildTool => "build-tool project",
            ProjectVariant::PackageManifest => "package-manifest project",
            ProjectVariant::LanguageDescriptor => "language-descriptor project",
            ProjectVariant::Generic => "generic project",
        }
    }
}

impl fmt::Display for ProjectVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Marker files of language-descriptor projects, checked in order
const LANGUAGE_DESCRIPTORS: &[&str] = &["Cargo.toml", "pyproject.toml", "setup.py", "go.mod"];

/// Read-only snapshot of one project directory
#[derive(Debug, Clone, Serialize)]
pub struct ProjectNode {
    root: PathBuf,
    variant: ProjectVariant,
    descriptor: Option<String>,
    modules: Vec<String>,
    sources: Vec<String>,
    tests: Vec<String>,
    docs: Vec<String>,
}

impl ProjectNode {
    /// Detect the layout of `dir`
    ///
    /// Fails with [`Error::NotFound`] when the directory does not exist.
    pub fn detect(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::NotFound(dir.to_path_buf()));
        }

        // Check for Maven
        if dir.join("pom.xml").is_file() {
            let modules = match fs::read_to_string(dir.join("pom.xml")) {
                Ok(pom) => parse_maven_modules(&pom),
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Unreadable pom.xml, assuming no modules");
                    Vec::new()
                }
            };
            return Ok(Self::new(dir, ProjectVariant::BuildTool, Some("pom.xml"), modules)
                .with_paths(
                    &["src/main/java", "src/main/resources"],
                    &["src/test/java", "src/test/resources"],
                    &["src/site"],
                ));
        }

        // Check for npm / yarn / pnpm workspaces
        if dir.join("package.json").is_file() {
            let entries = fs::read_to_string(dir.join("package.json"))
                .map_err(Error::from)
                .and_then(|s| parse_package_workspaces(&s));
            let modules = match entries {
                Ok(entries) => expand_module_entries(dir, &entries),
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Unusable package.json, assuming no modules");
                    Vec::new()
                }
            };
            return Ok(
                Self::new(dir, ProjectVariant::PackageManifest, Some("package.json"), modules)
                    .with_paths(&["src", "lib"], &["test", "tests", "__tests__"], &["docs"]),
            );
        }

        for &descriptor in LANGUAGE_DESCRIPTORS {
            if !dir.join(descriptor).is_file() {
                continue;
            }

            let node = match descriptor {
                "Cargo.toml" => {
                    let entries = fs::read_to_string(dir.join(descriptor))
                        .map_err(Error::from)
                        .and_then(|s| parse_cargo_members(&s));
                    let modules = match entries {
                        Ok(entries) => expand_module_entries(dir, &entries),
                        Err(e) => {
                            warn!(dir = %dir.display(), error = %e, "Unusable Cargo.toml, assuming no members");
                            Vec::new()
                        }
                    };
                    Self::new(dir, ProjectVariant::LanguageDescriptor, Some(descriptor), modules)
                        .with_paths(&["src"], &["tests", "benches"], &["docs"])
                }
                "go.mod" => Self::new(dir, ProjectVariant::LanguageDescriptor, Some(descriptor), Vec::new())
                    .with_paths(&["cmd", "internal", "pkg"], &[], &["docs"]),
                _ => Self::new(dir, ProjectVariant::LanguageDescriptor, Some(descriptor), Vec::new())
                    .with_paths(&["src"], &["tests", "test"], &["docs"]),
            };
            return Ok(node);
        }

        Ok(Self::new(dir, ProjectVariant::Generic, None, Vec::new())
            .with_paths(&["src"], &["test", "tests"], &["docs"]))
    }

    fn new(
        root: &Path,
        variant: ProjectVariant,
        descriptor: Option<&str>,
        modules: Vec<String>,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            variant,
            descriptor: descriptor.map(|d| d.to_string()),
            modules,
            sources: Vec::new(),
            tests: Vec::new(),
            docs: Vec::new(),
        }
    }

    fn with_paths(mut self, sources: &[&str], tests: &[&str], docs: &[&str]) -> Self {
        fn owned(paths: &[&str]) -> Vec<String> {
            paths.iter().map(|p| p.to_string()).collect()
        }
        self.sources = owned(sources);
        self.tests = owned(tests);
        self.docs = owned(docs);
        self
    }

    /// Root directory of this project
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Detected variant
    pub fn variant(&self) -> ProjectVariant {
        self.variant
    }

    /// Marker file the variant was detected from
    pub fn descriptor(&self) -> Option<&str> {
        self.descriptor.as_deref()
    }

    /// Declared module names, relative to the root
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    /// Conventional source paths
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Conventional test paths
    pub fn tests(&self) -> &[String] {
        &self.tests
    }

    /// Conventional documentation paths
    pub fn docs(&self) -> &[String] {
        &self.docs
    }

    /// Filter relative paths to the ones present under the root
    pub fn existing(&self, paths: &[String]) -> Vec<String> {
        paths
            .iter()
            .filter(|p| self.root.join(p).exists())
            .cloned()
            .collect()
    }

    /// Describe the project layout for a prompt
    pub fn structure_description(&self) -> String {
        let render = |paths: &[String]| {
            let found = self.existing(paths);
            if found.is_empty() {
                "not defined".to_string()
            } else {
                found.join(", ")
            }
        };

        let mut text = String::new();
        text.push_str(&format!("Project layout ({}):\n", self.variant));
        text.push_str(&format!("- Source paths: {}\n", render(&self.sources)));
        text.push_str(&format!("- Test paths: {}\n", render(&self.tests)));
        text.push_str(&format!("- Documentation paths: {}\n", render(&self.docs)));
        text
    }
}

/// Extract `<module>` entries from a Maven POM
fn parse_maven_modules(pom: &str) -> Vec<String> {
    let pom = strip_xml_comments(pom);
    let Some(start) = pom.find("<modules>") else {
        return Vec::new();
    };
    let section_start = start + "<modules>".len();
    let section_end = pom[section_start..]
        .find("</modules>")
        .map(|e| section_start + e)
        .unwrap_or(pom.len());

    let mut modules = Vec::new();
    let mut rest = &pom[section_start..section_end];
    while let Some(open) = rest.find("<module>") {
        let after = &rest[open + "<module>".len()..];
        let Some(close) = after.find("</module>") else {
            break;
        };
        let name = after[..close].trim();
        if !name.is_empty() {
            modules.push(name.to_string());
        }
        rest = &after[close + "</module>".len()..];
    }
    modules
}

fn strip_xml_comments(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;
    while let Some(start) = rest.find("<!--") {
        out.push_str(&rest[..start]);
        match rest[start..].find("-->") {
            Some(end) => rest = &rest[start + end + 3..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Read the `workspaces` field of a package.json (array or `{ packages: [...] }`)
fn parse_package_workspaces(manifest: &str) -> Result<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(manifest)?;
    let workspaces = match value.get("workspaces") {
        Some(serde_json::Value::Array(items)) => items.clone(),
        Some(serde_json::Value::Object(obj)) => obj
            .get("packages")
            .and_then(|p| p.as_array())
            .cloned()
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    Ok(workspaces
        .iter()
        .filter_map(|w| w.as_str().map(|s| s.to_string()))
        .collect())
}

/// Read `[workspace] members` from a Cargo manifest
fn parse_cargo_members(manifest: &str) -> Result<Vec<String>> {
    let value: toml::Value = toml::from_str(manifest)?;
    Ok(value
        .get("workspace")
        .and_then(|w| w.get("members"))
        .and_then(|m| m.as_array())
        .map(|members| {
            members
                .iter()
                .filter_map(|m| m.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default())
}

/// Resolve module entries to existing directories
///
/// Entries with glob characters expand to the matching directories, sorted.
/// A module nested inside another declared module is folded into the outer one.
fn expand_module_entries(root: &Path, entries: &[String]) -> Vec<String> {
    let mut modules: Vec<String> = Vec::new();

    for entry in entries {
        let entry = entry.trim().trim_start_matches("./").trim_end_matches('/');
        if entry.is_empty() || entry == "." || entry.split('/').any(|part| part == "..") {
            debug!(entry, "Skipping module entry outside the project");
            continue;
        }

        let names = if entry.contains(['*', '?', '[']) {
            glob_directories(root, entry)
        } else if root.join(entry).is_dir() {
            vec![entry.to_string()]
        } else {
            warn!(root = %root.display(), module = entry, "Declared module directory does not exist");
            Vec::new()
        };
        for name in names {
            if !modules.contains(&name) {
                modules.push(name);
            }
        }
    }

    modules
        .iter()
        .filter(|m| !modules.iter().any(|other| is_nested(m, other)))
        .cloned()
        .collect()
}

/// Directories under `root` matching `pattern`, relative and sorted
fn glob_directories(root: &Path, pattern: &str) -> Vec<String> {
    let full = format!("{}/{}", glob::Pattern::escape(&root.to_string_lossy()), pattern);
    let options = glob::MatchOptions {
        require_literal_leading_dot: true,
        ..glob::MatchOptions::new()
    };
    let paths = match glob::glob_with(&full, options) {
        Ok(paths) => paths,
        Err(e) => {
            warn!(root = %root.display(), entry = pattern, error = %e, "Invalid module pattern");
            return Vec::new();
        }
    };

    let mut names: Vec<String> = paths
        .filter_map(|p| p.ok())
        .filter(|p| p.is_dir())
        .filter_map(|p| p.strip_prefix(root).ok().map(slash_path))
        .filter(|name| !name.is_empty())
        .collect();
    names.sort();
    if names.is_empty() {
        warn!(root = %root.display(), entry = pattern, "Module pattern matches no directory");
    }
    names
}

/// Whether module `inner` lies below module `outer`
fn is_nested(inner: &str, outer: &str) -> bool {
    inner.len() > outer.len() && inner.starts_with(outer) && inner[outer.len()..].starts_with('/')
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
