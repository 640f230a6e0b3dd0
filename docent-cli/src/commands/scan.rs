//! Scan command - collect guidance and generate documentation

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use docent_core::{create_collaborator, Backend, Config, ConfigOverrides, Engine, SharedSession, TraversalOrder};

/// Arguments for the scan command
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Project directory to scan (defaults to current directory)
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Traversal order: forward (own files first) or reverse (modules first)
    #[arg(long)]
    pub order: Option<TraversalOrder>,

    /// Skip paths containing this token (repeatable, case-insensitive)
    #[arg(short = 'x', long = "exclude")]
    pub excludes: Vec<String>,

    /// Do not add guidance inherited from parent folders
    #[arg(long)]
    pub no_parent_guidance: bool,

    /// Let modules inherit guidance from folders above their root
    #[arg(long)]
    pub cross_module: bool,

    /// Process sibling modules concurrently when the backend allows it
    #[arg(long)]
    pub parallel: bool,

    /// Maximum number of concurrent requests with --parallel
    #[arg(long)]
    pub threads: Option<usize>,

    /// Write prompt logs only, without calling any backend
    #[arg(long)]
    pub dry_run: bool,
}

impl ScanArgs {
    /// Configuration overrides implied by these flags
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            backend: self.dry_run.then_some(Backend::DryRun),
            excludes: self.excludes.clone(),
            order: self.order,
            no_parent_guidance: self.no_parent_guidance,
            cross_module: self.cross_module,
            module_concurrency: self.parallel,
            module_threads: self.threads,
            ..Default::default()
        }
    }

    /// Execute the scan command
    pub async fn execute(&self, verbose: bool, config: &Config) -> anyhow::Result<()> {
        // Resolve to absolute path
        let dir = if self.dir.is_absolute() {
            self.dir.clone()
        } else {
            std::env::current_dir()?.join(&self.dir)
        };

        if verbose {
            tracing::info!(
                dir = %dir.display(),
                backend = %config.agent.backend,
                order = %config.scan.order,
                "Starting docent scan"
            );
        }

        println!("Docent Scan");
        println!("===========");
        println!();
        println!("Directory: {}", dir.display());
        println!("Backend: {}", config.agent.backend);
        println!("Order: {}", config.scan.order);
        println!();

        let mut collaborator = create_collaborator(&config.agent, &dir)
            .with_context(|| format!("Failed to set up the {} backend", config.agent.backend))?;
        if !collaborator.is_available() {
            SharedSession::global().close();
            anyhow::bail!(
                "The {} backend is not available. Check the executable path or use --dry-run.",
                config.agent.backend
            );
        }

        let engine = Engine::new(config.scan.clone());
        let abort = engine.abort_handle();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping after the current file");
                abort.abort();
            }
        });

        let result = engine.run(&dir, collaborator.as_mut()).await;

        interrupt.abort();
        SharedSession::global().close();

        let summary = result.with_context(|| format!("Scan of {} stopped", dir.display()))?;

        println!();
        print!("{}", summary);
        if let Some(cause) = &summary.aborted {
            anyhow::bail!("Scan of {} aborted: {}", dir.display(), cause);
        }
        if !summary.is_clean() {
            println!();
            println!("Some files failed; see the messages above.");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ScanArgs {
        ScanArgs {
            dir: PathBuf::from("."),
            order: None,
            excludes: Vec::new(),
            no_parent_guidance: false,
            cross_module: false,
            parallel: false,
            threads: None,
            dry_run: false,
        }
    }

    #[test]
    fn test_overrides_from_flags() {
        let overrides = ScanArgs {
            order: Some(TraversalOrder::Forward),
            excludes: vec!["generated".to_string()],
            parallel: true,
            threads: Some(2),
            dry_run: true,
            ..args()
        }
        .overrides();

        assert_eq!(overrides.backend, Some(Backend::DryRun));
        assert_eq!(overrides.order, Some(TraversalOrder::Forward));
        assert_eq!(overrides.excludes, vec!["generated".to_string()]);
        assert!(overrides.module_concurrency);
        assert_eq!(overrides.module_threads, Some(2));
    }

    #[test]
    fn test_default_flags_override_nothing() {
        let overrides = args().overrides();
        assert!(overrides.backend.is_none());
        assert!(overrides.order.is_none());
        assert!(!overrides.no_parent_guidance);
    }

    #[tokio::test]
    async fn test_dry_run_scan() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.py"), "# @guidance: Describe main.\n").unwrap();

        let args = ScanArgs {
            dir: dir.path().to_path_buf(),
            dry_run: true,
            ..args()
        };
        let config = Config::default().with_cli_overrides(args.overrides());
        args.execute(false, &config).await.unwrap();

        assert!(dir.path().join(".docent/temp/main.py.txt").exists());
    }
}
