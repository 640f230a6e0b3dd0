//! Process-wide shared backend session
//!
//! Some backends drive a single automation session per process. That session
//! is initialized once, a second initialization for a different backend or
//! executable fails fast, and it is released with an explicit `close`.

use std::sync::{Mutex, OnceLock};

use tracing::{debug, info};

use crate::{Error, Result};

/// Identity of the active shared session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub backend: &'static str,
    pub executable: String,
}

/// Holder of at most one active session
#[derive(Debug, Default)]
pub struct SharedSession {
    active: Mutex<Option<SessionInfo>>,
}

impl SharedSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide instance
    pub fn global() -> &'static SharedSession {
        static GLOBAL: OnceLock<SharedSession> = OnceLock::new();
        GLOBAL.get_or_init(SharedSession::new)
    }

    /// Initialize the session, or join it if it was initialized identically
    pub fn init(&self, backend: &'static str, executable: &str) -> Result<SessionInfo> {
        let requested = SessionInfo {
            backend,
            executable: executable.to_string(),
        };
        let mut active = self
            .active
            .lock()
            .map_err(|_| Error::Other("Shared session lock poisoned".to_string()))?;

        match active.as_ref() {
            Some(current) if *current == requested => {
                debug!(backend, executable, "Joining existing shared session");
                Ok(current.clone())
            }
            Some(current) => Err(Error::SessionConflict(format!(
                "session already initialized for {} ('{}'), refusing {} ('{}')",
                current.backend, current.executable, backend, executable
            ))),
            None => {
                info!(backend, executable, "Shared session initialized");
                *active = Some(requested.clone());
                Ok(requested)
            }
        }
    }

    /// The active session, if any
    pub fn current(&self) -> Option<SessionInfo> {
        self.active.lock().ok().and_then(|a| a.clone())
    }

    /// Release the session; returns the closed session, if one was active
    pub fn close(&self) -> Option<SessionInfo> {
        let closed = self.active.lock().ok().and_then(|mut a| a.take());
        if let Some(ref info) = closed {
            info!(backend = info.backend, "Shared session closed");
        }
        closed
    }
}
