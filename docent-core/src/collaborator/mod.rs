//! Generation collaborators
//!
//! A collaborator accumulates prompt fragments for one file, performs a single
//! generation request and is cleared before the next file. The engine never
//! interleaves that accumulate/perform/clear cycle across files on one
//! collaborator instance.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::config::{AgentConfig, Backend};
use crate::{Error, Result};

mod claude;
mod cursor;
mod dry_run;
mod process;
mod session;

pub use claude::ClaudeCollaborator;
pub use cursor::CursorCollaborator;
pub use dry_run::DryRunCollaborator;
pub use session::{SessionInfo, SharedSession};

/// Trait for text-generation backends
#[async_trait]
pub trait Collaborator: Send {
    /// Get the name of this collaborator
    fn name(&self) -> &'static str;

    /// Accumulated state for the current file
    fn session(&self) -> &PromptSession;

    /// Mutable accumulated state for the current file
    fn session_mut(&mut self) -> &mut PromptSession;

    /// Set the system instructions
    fn set_instructions(&mut self, text: &str) {
        self.session_mut().set_instructions(text);
    }

    /// Append a prompt fragment
    fn add_prompt(&mut self, text: &str) {
        self.session_mut().add_prompt(text);
    }

    /// Where the inputs of the next request are persisted
    fn set_output_log(&mut self, path: &Path) {
        self.session_mut().set_output_log(path);
    }

    /// Run the accumulated request
    async fn perform(&mut self) -> Result<Option<String>>;

    /// Forget everything accumulated since the last clear
    fn clear(&mut self) {
        self.session_mut().clear();
    }

    /// Whether independent instances may run concurrently
    fn is_thread_safe(&self) -> bool {
        false
    }

    /// A fresh instance with the same backend settings, for concurrent use
    fn fork(&self) -> Option<Box<dyn Collaborator>> {
        None
    }

    /// Check if the backend is usable on this system
    fn is_available(&self) -> bool {
        true
    }
}

/// Prompt state accumulated for one generation request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptSession {
    instructions: Option<String>,
    prompts: Vec<String>,
    output_log: Option<PathBuf>,
}

impl PromptSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_instructions(&mut self, text: &str) {
        self.instructions = Some(text.to_string());
    }

    pub fn add_prompt(&mut self, text: &str) {
        self.prompts.push(text.to_string());
    }

    pub fn set_output_log(&mut self, path: &Path) {
        self.output_log = Some(path.to_path_buf());
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn output_log(&self) -> Option<&Path> {
        self.output_log.as_deref()
    }

    /// True when nothing has been accumulated
    pub fn is_empty(&self) -> bool {
        self.instructions.is_none() && self.prompts.is_empty() && self.output_log.is_none()
    }

    pub fn clear(&mut self) {
        self.instructions = None;
        self.prompts.clear();
        self.output_log = None;
    }

    /// Prompt fragments joined into one request body
    pub fn prompt_text(&self) -> String {
        self.prompts.join("\n\n")
    }

    /// Instructions followed by the prompt, for backends without a system prompt
    pub fn full_text(&self) -> String {
        match &self.instructions {
            Some(instructions) => format!("{}\n\n{}", instructions, self.prompt_text()),
            None => self.prompt_text(),
        }
    }

    /// Write the request inputs to the output log, if one is set
    ///
    /// The log is written to a temporary sibling and renamed into place, so a
    /// log is either complete or absent.
    pub fn persist(&self) -> Result<Option<PathBuf>> {
        let Some(path) = &self.output_log else {
            return Ok(None);
        };

        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut tmp: OsString = path.as_os_str().to_owned();
            tmp.push(".tmp");
            let tmp = PathBuf::from(tmp);
            std::fs::write(&tmp, self.full_text())?;
            std::fs::rename(&tmp, path)
        };

        write().map_err(|e| {
            Error::Generation(format!("Failed to write prompt log {}: {}", path.display(), e))
        })?;
        debug!(log = %path.display(), "Prompt log written");
        Ok(Some(path.clone()))
    }
}

/// Create the collaborator selected in the configuration
///
/// `workdir` is the directory the backend runs in (the project root).
pub fn create_collaborator(config: &AgentConfig, workdir: &Path) -> Result<Box<dyn Collaborator>> {
    let collaborator: Box<dyn Collaborator> = match config.backend {
        Backend::Claude => Box::new(ClaudeCollaborator::from_config(config, workdir)),
        Backend::Cursor => Box::new(CursorCollaborator::from_config(config, workdir)?),
        Backend::DryRun => Box::new(DryRunCollaborator::new()),
    };
    Ok(collaborator)
}
