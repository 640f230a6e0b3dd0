//! Claude Code collaborator

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::config::AgentConfig;
use crate::{Error, Result};

use super::process::run_request;
use super::{Collaborator, PromptSession};

/// Claude Code in print mode; the prompt is sent on stdin
///
/// Every request is an independent process, so forks may run concurrently.
#[derive(Debug, Clone)]
pub struct ClaudeCollaborator {
    pub claude_path: String,
    pub model: Option<String>,
    pub env_vars: HashMap<String, String>,
    pub timeout: Duration,
    workdir: PathBuf,
    session: PromptSession,
}

impl ClaudeCollaborator {
    /// Create a new Claude collaborator with default settings
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            claude_path: "claude".to_string(),
            model: None,
            env_vars: HashMap::new(),
            timeout: AgentConfig::default().timeout,
            workdir: workdir.into(),
            session: PromptSession::new(),
        }
    }

    /// Create a Claude collaborator from agent configuration
    pub fn from_config(config: &AgentConfig, workdir: &Path) -> Self {
        let mut collaborator = Self::new(workdir)
            .with_path(&config.claude_path)
            .with_timeout(config.timeout);
        if let Some(model) = &config.model {
            collaborator = collaborator.with_model(model);
        }
        collaborator
    }

    /// Create a Claude collaborator with custom path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.claude_path = path.into();
        self
    }

    /// Create a Claude collaborator with a specific model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Build the command for the accumulated request
    pub fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.claude_path);
        cmd.arg("--print")
            .arg("--output-format")
            .arg("text")
            .arg("--dangerously-skip-permissions");

        if let Some(ref model) = self.model {
            cmd.arg("--model").arg(model);
        }

        if let Some(instructions) = self.session.instructions() {
            cmd.arg("--append-system-prompt").arg(instructions);
        }

        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }

        cmd.current_dir(&self.workdir);
        cmd
    }
}

#[async_trait]
impl Collaborator for ClaudeCollaborator {
    fn name(&self) -> &'static str {
        "claude"
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
            "Sending request to Claude Code"
        );

        let cmd = self.build_command();
        run_request(
            cmd,
            Some(self.session.prompt_text()),
            self.timeout,
            &self.claude_path,
        )
        .await
    }

    fn is_thread_safe(&self) -> bool {
        true
    }

    fn fork(&self) -> Option<Box<dyn Collaborator>> {
        Some(Box::new(Self {
            session: PromptSession::new(),
            ..self.clone()
        }))
    }

    fn is_available(&self) -> bool {
        std::process::Command::new(&self.claude_path)
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

    #[test]
    fn test_claude_collaborator_name() {
        let collaborator = ClaudeCollaborator::new(".");
        assert_eq!(collaborator.name(), "claude");
        assert!(collaborator.is_thread_safe());
    }

    #[test]
    fn test_claude_collaborator_builder() {
        let collaborator = ClaudeCollaborator::new("/tmp")
            .with_path("/custom/claude")
            .with_model("opus")
            .with_env("FOO", "bar");

        assert_eq!(collaborator.claude_path, "/custom/claude");
        assert_eq!(collaborator.model, Some("opus".to_string()));
        assert_eq!(collaborator.env_vars.get("FOO"), Some(&"bar".to_string()));
    }

    #[test]
    fn test_from_config() {
        let config = AgentConfig {
            claude_path: "/opt/claude".to_string(),
            model: Some("sonnet".to_string()),
            timeout: Duration::from_secs(30),
            ..Default::default()
        };
        let collaborator = ClaudeCollaborator::from_config(&config, Path::new("/work"));
        assert_eq!(collaborator.claude_path, "/opt/claude");
        assert_eq!(collaborator.model.as_deref(), Some("sonnet"));
        assert_eq!(collaborator.timeout, Duration::from_secs(30));
        assert_eq!(collaborator.workdir(), Path::new("/work"));
    }

    #[test]
    fn test_fork_starts_with_empty_session() {
        let mut collaborator = ClaudeCollaborator::new(".").with_model("opus");
        collaborator.add_prompt("pending");

        let fork = collaborator.fork().unwrap();
        assert!(fork.session().is_empty());
        assert_eq!(collaborator.session().prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_perform_invalid_workdir() {
        let mut collaborator = ClaudeCollaborator::new("/nonexistent/path/12345");
        collaborator.add_prompt("test");
        let result = collaborator.perform().await;
        assert!(matches!(result, Err(Error::CollaboratorFatal(_))));
    }
}
