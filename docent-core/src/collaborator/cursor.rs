//! Cursor agent collaborator

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::config::AgentConfig;
use crate::{Error, Result};

use super::process::run_request;
use super::{Collaborator, PromptSession, SharedSession};

/// Cursor agent in print mode
///
/// cursor-agent works against one shared session per process, so this
/// collaborator joins the [`SharedSession`] and is not safe for concurrent use.
#[derive(Debug)]
pub struct CursorCollaborator {
    pub cursor_path: String,
    pub model: Option<String>,
    pub timeout: Duration,
    workdir: PathBuf,
    session: PromptSession,
}

impl CursorCollaborator {
    /// Create a Cursor collaborator, joining the process-wide session
    pub fn new(cursor_path: impl Into<String>, workdir: impl Into<PathBuf>) -> Result<Self> {
        let cursor_path = cursor_path.into();
        SharedSession::global().init("cursor", &cursor_path)?;
        Ok(Self {
            cursor_path,
            model: None,
            timeout: AgentConfig::default().timeout,
            workdir: workdir.into(),
            session: PromptSession::new(),
        })
    }

    /// Create a Cursor collaborator from agent configuration
    pub fn from_config(config: &AgentConfig, workdir: &Path) -> Result<Self> {
        let mut collaborator = Self::new(&config.cursor_path, workdir)?.with_timeout(config.timeout);
        if let Some(model) = &config.model {
            collaborator = collaborator.with_model(model);
        }
        Ok(collaborator)
    }

    /// Create a Cursor collaborator with a specific model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the command for the accumulated request
    pub fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.cursor_path);
        cmd.arg("--print").arg("--output-format").arg("text");

        if let Some(ref model) = self.model {
            cmd.arg("--model").arg(model);
        }

        // No separate system prompt; instructions lead the prompt text
        cmd.arg("-p").arg(self.session.full_text());
        cmd.current_dir(&self.workdir);
        cmd
    }
}

#[async_trait]
impl Collaborator for CursorCollaborator {
    fn name(&self) -> &'static str {
        "cursor"
    }

    fn session(&self) -> &PromptSession {
        &self.session
    }

    fn session_mut(&mut self) -> &mut PromptSession {
        &mut self.session
    }

    async fn perform(&mut self) -> Result<Option<String>> {
        if !self.workdir.exists() {
            return Err(Error::CollaboratorFatal(format!(
                "Working directory does not exist: {}",
                self.workdir.display()
            )));
        }

        self.session.persist()?;
        info!(
            prompts = self.session.prompts().len(),
            model = ?self.model,
            "Sending request to Cursor agent"
        );

        run_request(self.build_command(), None, self.timeout, &self.cursor_path).await
    }

    fn is_available(&self) -> bool {
        std::process::Command::new(&self.cursor_path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // All tests share the process-wide session, so they use the same executable
    const CURSOR: &str = "cursor-agent";

    #[test]
    fn test_cursor_collaborator_is_not_thread_safe() {
        let collaborator = CursorCollaborator::new(CURSOR, ".").unwrap();
        assert_eq!(collaborator.name(), "cursor");
        assert!(!collaborator.is_thread_safe());
        assert!(collaborator.fork().is_none());
    }

    #[test]
    fn test_cursor_collaborator_builder() {
        let collaborator = CursorCollaborator::new(CURSOR, ".")
            .unwrap()
            .with_model("gpt-5")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(collaborator.cursor_path, CURSOR);
        assert_eq!(collaborator.model, Some("gpt-5".to_string()));
        assert_eq!(collaborator.timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_perform_invalid_workdir() {
        let mut collaborator = CursorCollaborator::new(CURSOR, "/nonexistent/path/12345").unwrap();
        collaborator.add_prompt("test");
        assert!(collaborator.perform().await.is_err());
    }
}
