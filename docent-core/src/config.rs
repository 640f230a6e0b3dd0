//! Configuration management for Docent
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (DOCENT_*)
//! 3. Project config file (`<root>/docent.toml`), or the user config file
//!    (`~/.config/docent/config.toml`) when the project has none
//! 4. Default values

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Name of the per-project config file
pub const PROJECT_CONFIG_FILE: &str = "docent.toml";

/// Default name of the dedicated directory guidance file
pub const DEFAULT_GUIDANCE_FILE: &str = "guidance.txt";

/// Generation backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Claude Code in print mode
    #[default]
    Claude,
    /// Cursor agent in print mode
    Cursor,
    /// Write prompt logs without calling any model
    DryRun,
}

impl Backend {
    /// Registry name of this backend
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Claude => "claude",
            Backend::Cursor => "cursor",
            Backend::DryRun => "dry-run",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" => Ok(Backend::Claude),
            "cursor" => Ok(Backend::Cursor),
            "dry-run" | "dryrun" | "none" => Ok(Backend::DryRun),
            other => Err(format!(
                "Unknown backend '{}'. Valid backends: claude, cursor, dry-run",
                other
            )),
        }
    }
}

/// Order in which a directory's own files and its declared modules are generated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalOrder {
    /// Own content first, then declared modules
    Forward,
    /// Declared modules completed first, then own content
    #[default]
    Reverse,
}

impl fmt::Display for TraversalOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraversalOrder::Forward => write!(f, "forward"),
            TraversalOrder::Reverse => write!(f, "reverse"),
        }
    }
}

impl FromStr for TraversalOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "forward" => Ok(TraversalOrder::Forward),
            "reverse" => Ok(TraversalOrder::Reverse),
            other => Err(format!(
                "Unknown traversal order '{}'. Valid orders: forward, reverse",
                other
            )),
        }
    }
}

/// Agent-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Which backend generates documentation
    pub backend: Backend,

    /// Path to the claude executable
    pub claude_path: String,

    /// Path to the cursor-agent executable
    pub cursor_path: String,

    /// Model to use
    pub model: Option<String>,

    /// Upper bound for a single generation request
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            claude_path: "claude".to_string(),
            cursor_path: "cursor-agent".to_string(),
            model: None, // Let the backend use its default
            timeout: Duration::from_secs(600),
        }
    }
}

/// Traversal-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Path tokens; any path containing one of them is skipped
    pub excludes: Vec<String>,

    /// Layer inherited directory guidance into each prompt
    pub use_parent_guidance: bool,

    /// Allow guidance from directories above the current module
    pub cross_module_inheritance: bool,

    /// Module vs. own-content generation order
    pub order: TraversalOrder,

    /// Process sibling modules concurrently when the backend allows it
    pub module_concurrency: bool,

    /// Maximum number of modules generated at once
    pub module_threads: usize,

    /// File name of the dedicated directory guidance file
    pub guidance_file: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            excludes: Vec::new(),
            use_parent_guidance: true,
            cross_module_inheritance: false,
            order: TraversalOrder::default(),
            module_concurrency: false,
            module_threads: 4,
            guidance_file: DEFAULT_GUIDANCE_FILE.to_string(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Agent configuration
    pub agent: AgentConfig,

    /// Scan configuration
    pub scan: ScanConfig,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub backend: Option<Backend>,
    pub claude_path: Option<String>,
    pub cursor_path: Option<String>,
    pub model: Option<String>,
    pub excludes: Vec<String>,
    pub order: Option<TraversalOrder>,
    pub no_parent_guidance: bool,
    pub cross_module: bool,
    pub module_concurrency: bool,
    pub module_threads: Option<usize>,
}

impl Config {
    /// Load configuration for a project
    ///
    /// Uses `<root>/docent.toml` when present, otherwise the user config file.
    /// Returns default config if neither exists.
    pub fn load(project_root: Option<&Path>) -> Result<Self> {
        if let Some(root) = project_root {
            let path = root.join(PROJECT_CONFIG_FILE);
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let config: Config = toml::from_str(&contents).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/docent/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("docent").join("config.toml"))
    }

    /// Reject values that cannot drive a run
    pub fn validate(&self) -> Result<()> {
        if self.scan.module_threads == 0 {
            return Err(Error::Config("scan.module_threads must be at least 1".into()));
        }
        if self.scan.guidance_file.trim().is_empty() {
            return Err(Error::Config("scan.guidance_file must not be empty".into()));
        }
        Ok(())
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - DOCENT_BACKEND: claude, cursor or dry-run
    /// - DOCENT_CLAUDE_PATH: Path to claude executable
    /// - DOCENT_CURSOR_PATH: Path to cursor-agent executable
    /// - DOCENT_MODEL: Model to use
    /// - DOCENT_EXCLUDES: Comma-separated exclude tokens, appended to the list
    /// - DOCENT_ORDER: forward or reverse
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(backend) = std::env::var("DOCENT_BACKEND") {
            match backend.parse() {
                Ok(b) => self.agent.backend = b,
                Err(e) => tracing::warn!(error = %e, "Ignoring DOCENT_BACKEND"),
            }
        }

        if let Ok(claude_path) = std::env::var("DOCENT_CLAUDE_PATH") {
            self.agent.claude_path = claude_path;
        }

        if let Ok(cursor_path) = std::env::var("DOCENT_CURSOR_PATH") {
            self.agent.cursor_path = cursor_path;
        }

        if let Ok(model) = std::env::var("DOCENT_MODEL") {
            self.agent.model = Some(model);
        }

        if let Ok(excludes) = std::env::var("DOCENT_EXCLUDES") {
            self.scan
                .excludes
                .extend(excludes.split(',').map(|s| s.to_string()));
        }

        if let Ok(order) = std::env::var("DOCENT_ORDER") {
            match order.parse() {
                Ok(o) => self.scan.order = o,
                Err(e) => tracing::warn!(error = %e, "Ignoring DOCENT_ORDER"),
            }
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(backend) = overrides.backend {
            self.agent.backend = backend;
        }
        if let Some(path) = overrides.claude_path {
            self.agent.claude_path = path;
        }
        if let Some(path) = overrides.cursor_path {
            self.agent.cursor_path = path;
        }
        if let Some(m) = overrides.model {
            self.agent.model = Some(m);
        }

        self.scan.excludes.extend(overrides.excludes);

        if let Some(order) = overrides.order {
            self.scan.order = order;
        }
        if overrides.no_parent_guidance {
            self.scan.use_parent_guidance = false;
        }
        if overrides.cross_module {
            self.scan.cross_module_inheritance = true;
        }
        if overrides.module_concurrency {
            self.scan.module_concurrency = true;
        }
        if let Some(threads) = overrides.module_threads {
            self.scan.module_threads = threads;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(
        project_root: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self> {
        let config = Self::load(project_root)?
            .with_env_overrides()
            .with_cli_overrides(overrides);
        config.validate()?;
        Ok(config)
    }
}
