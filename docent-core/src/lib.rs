//! Docent Core - guided documentation generation for source trees
//!
//! Maintainers embed `@guidance:` comments and `guidance.txt` files in a
//! project. This crate detects the project layout, collects that guidance,
//! and drives a text-generation collaborator one file at a time with a
//! layered prompt.

pub mod collaborator;
pub mod config;
pub mod engine;
pub mod error;
pub mod guidance;
pub mod layout;
pub mod orchestrator;
pub mod review;
pub mod scan;
pub mod summary;

pub use collaborator::{create_collaborator, Collaborator, PromptSession, SharedSession};
pub use config::{Backend, Config, ConfigOverrides, ScanConfig, TraversalOrder};
pub use engine::{AbortHandle, Engine};
pub use error::{Error, Result};
pub use guidance::GuidanceStore;
pub use layout::{ProjectNode, ProjectVariant};
pub use orchestrator::Orchestrator;
pub use review::{BlockScope, GuidanceBlock, Reviewer, ReviewerRegistry};
pub use scan::{ExclusionSet, ScanNode, ScanPlan, Scanner};
pub use summary::RunSummary;
