//! Collaborator that only persists prompt logs

use async_trait::async_trait;
use tracing::info;

use crate::Result;

use super::{Collaborator, PromptSession};

/// Writes each request's prompt log and generates nothing
#[derive(Debug, Clone, Default)]
pub struct DryRunCollaborator {
    session: PromptSession,
}

impl DryRunCollaborator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Collaborator for DryRunCollaborator {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    fn session(&self) -> &PromptSession {
        &self.session
    }

    fn session_mut(&mut self) -> &mut PromptSession {
        &mut self.session
    }

    async fn perform(&mut self) -> Result<Option<String>> {
        if let Some(log) = self.session.persist()? {
            info!(log = %log.display(), "[Dry run] Request logged, not sent");
        }
        Ok(None)
    }

    fn is_thread_safe(&self) -> bool {
        true
    }

    fn fork(&self) -> Option<Box<dyn Collaborator>> {
        Some(Box::new(Self::new()))
    }
}
