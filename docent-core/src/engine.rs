//! Traversal engine
//!
//! Runs the two phases of a documentation run: collection through the
//! [`Scanner`], then generation over the resulting [`ScanPlan`] in the
//! configured [`TraversalOrder`].
//!
//! Generation is sequential unless module concurrency is enabled and the
//! collaborator is thread-safe and can fork. In that case every sibling
//! module runs as its own tokio task with a forked collaborator, and a
//! semaphore bounds the number of in-flight requests.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::collaborator::Collaborator;
use crate::config::{ScanConfig, TraversalOrder};
use crate::orchestrator::Orchestrator;
use crate::review::{GuidanceBlock, ReviewerRegistry};
use crate::scan::{ExclusionSet, ScanNode, ScanPlan, Scanner};
use crate::summary::{FailedFile, ProcessedFile, RunSummary};
use crate::{Error, Result};

/// Shared flag that stops a run at the next file or module boundary
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag before a new run
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs collection and generation for a project tree
pub struct Engine {
    config: ScanConfig,
    scanner: Scanner,
    abort: AbortHandle,
}

impl Engine {
    /// Create an engine with the bundled reviewers
    pub fn new(config: ScanConfig) -> Self {
        let scanner = Scanner::from_config(&config);
        Self {
            config,
            scanner,
            abort: AbortHandle::new(),
        }
    }

    /// Replace the reviewer registry
    pub fn with_registry(mut self, registry: ReviewerRegistry) -> Self {
        self.scanner = Scanner::new(Arc::new(registry), ExclusionSet::new(&self.config.excludes));
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Handle that stops this engine's runs
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Collection pass only
    pub fn collect(&self, root: &Path) -> Result<ScanPlan> {
        self.scanner.collect(root)
    }

    /// Collect `root` and generate documentation for every guidance block
    ///
    /// Clears a previous abort first. Only collection failures are returned
    /// as errors; a run-fatal error during generation ends the run and is
    /// reported in [`RunSummary::aborted`].
    pub async fn run(&self, root: &Path, collaborator: &mut dyn Collaborator) -> Result<RunSummary> {
        self.abort.reset();
        info!(
            root = %root.display(),
            order = %self.config.order,
            collaborator = collaborator.name(),
            "Starting documentation run"
        );
        let plan = self.collect(root)?;
        Ok(self.generate(plan, collaborator).await)
    }

    /// Generation pass over a collected plan
    ///
    /// The guidance store is frozen for the whole pass. Files processed
    /// before a run-fatal error stay in the returned summary.
    pub async fn generate(&self, plan: ScanPlan, collaborator: &mut dyn Collaborator) -> RunSummary {
        let ScanPlan {
            root_dir,
            root,
            skipped,
            store,
        } = plan;
        let guidance_records = store.len();

        let orchestrator = Orchestrator::new(&root_dir, Arc::new(store))
            .with_parent_guidance(self.config.use_parent_guidance)
            .with_cross_module(self.config.cross_module_inheritance);

        let limit = if self.concurrency_available(collaborator) {
            let threads = self.config.module_threads.max(1);
            info!(threads, "Processing modules concurrently");
            Some(Arc::new(Semaphore::new(threads)))
        } else {
            None
        };

        let visit = Visit {
            orchestrator: Arc::new(orchestrator),
            order: self.config.order,
            limit,
            abort: self.abort.clone(),
        };

        let mut summary = RunSummary {
            skipped,
            guidance_records,
            ..Default::default()
        };
        if let Err(e) = visit.node(root, collaborator, &mut summary).await {
            error!(error = %e, processed = summary.processed.len(), "Documentation run aborted");
            summary.aborted = Some(e.to_string());
            return summary;
        }

        info!(
            processed = summary.processed.len(),
            skipped = summary.skipped.len(),
            failed = summary.failed.len(),
            "Documentation run complete"
        );
        summary
    }

    fn concurrency_available(&self, collaborator: &dyn Collaborator) -> bool {
        if !self.config.module_concurrency {
            return false;
        }
        if !collaborator.is_thread_safe() {
            warn!(
                collaborator = collaborator.name(),
                "Collaborator is not thread-safe, processing modules sequentially"
            );
            return false;
        }
        if collaborator.fork().is_none() {
            warn!(
                collaborator = collaborator.name(),
                "Collaborator cannot fork, processing modules sequentially"
            );
            return false;
        }
        true
    }
}

type VisitFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Per-run generation context, cloned into module tasks
///
/// Results are appended to the summary passed in, so whatever completed
/// before an error is kept.
#[derive(Clone)]
struct Visit {
    orchestrator: Arc<Orchestrator>,
    order: TraversalOrder,
    /// Request limit; present only when modules run concurrently
    limit: Option<Arc<Semaphore>>,
    abort: AbortHandle,
}

impl Visit {
    fn node<'a>(
        &'a self,
        node: Arc<ScanNode>,
        collaborator: &'a mut dyn Collaborator,
        summary: &'a mut RunSummary,
    ) -> VisitFuture<'a> {
        Box::pin(async move {
            debug!(dir = %node.project.root().display(), order = %self.order, "Visiting project");
            match self.order {
                TraversalOrder::Forward => {
                    self.own_blocks(&node, collaborator, summary).await?;
                    self.modules(&node, collaborator, summary).await
                }
                TraversalOrder::Reverse => {
                    self.modules(&node, collaborator, summary).await?;
                    self.own_blocks(&node, collaborator, summary).await
                }
            }
        })
    }

    async fn own_blocks(
        &self,
        node: &ScanNode,
        collaborator: &mut dyn Collaborator,
        summary: &mut RunSummary,
    ) -> Result<()> {
        for block in &node.blocks {
            self.check_abort()?;

            let permit = match &self.limit {
                Some(limit) => Some(
                    limit
                        .acquire()
                        .await
                        .map_err(|_| Error::Aborted("request limiter closed".to_string()))?,
                ),
                None => None,
            };
            let result = self
                .orchestrator
                .process(&node.project, node.depth, block, collaborator)
                .await;
            drop(permit);

            match result {
                Ok(log) => summary.processed.push(ProcessedFile {
                    file: block.file.clone(),
                    log,
                }),
                Err(e) if e.is_run_fatal() => {
                    error!(file = %block.file.display(), error = %e, "Stopping run");
                    self.abort.abort();
                    return Err(with_location(e, node.project.root(), block));
                }
                Err(e) => {
                    warn!(file = %block.file.display(), error = %e, "Generation failed");
                    summary.failed.push(FailedFile {
                        file: block.file.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    async fn modules(
        &self,
        node: &ScanNode,
        collaborator: &mut dyn Collaborator,
        summary: &mut RunSummary,
    ) -> Result<()> {
        if self.limit.is_some() && !node.modules.is_empty() {
            return self.modules_concurrent(node, collaborator, summary).await;
        }

        for module in &node.modules {
            self.check_abort()?;
            self.node(module.clone(), collaborator, summary).await?;
        }
        Ok(())
    }

    async fn modules_concurrent(
        &self,
        node: &ScanNode,
        collaborator: &mut dyn Collaborator,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let mut handles: Vec<(PathBuf, JoinHandle<(RunSummary, Result<()>)>)> = Vec::new();
        let mut sequential = Vec::new();

        for module in &node.modules {
            match collaborator.fork() {
                Some(mut fork) => {
                    let visit = self.clone();
                    let module = module.clone();
                    let dir = module.project.root().to_path_buf();
                    handles.push((
                        dir,
                        tokio::spawn(async move {
                            let mut partial = RunSummary::new();
                            let outcome = visit.node(module, fork.as_mut(), &mut partial).await;
                            (partial, outcome)
                        }),
                    ));
                }
                None => sequential.push(module.clone()),
            }
        }

        let mut first_error: Option<Error> = None;

        // Join in declaration order so the summary order is deterministic
        for (dir, handle) in handles {
            let outcome = match handle.await {
                Ok((partial, outcome)) => {
                    summary.merge(partial);
                    outcome
                }
                Err(e) => Err(Error::Other(format!(
                    "Module task for {} failed: {}",
                    dir.display(),
                    e
                ))),
            };
            if let Err(e) = outcome {
                self.abort.abort();
                first_error = Some(match first_error {
                    // Siblings stopped by the flag report Aborted; keep the cause
                    Some(Error::Aborted(_)) if !matches!(e, Error::Aborted(_)) => e,
                    Some(existing) => existing,
                    None => e,
                });
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        for module in sequential {
            self.check_abort()?;
            self.node(module, collaborator, summary).await?;
        }
        Ok(())
    }

    fn check_abort(&self) -> Result<()> {
        if self.abort.is_aborted() {
            return Err(Error::Aborted("run cancelled".to_string()));
        }
        Ok(())
    }
}

/// Attach the failing location to a run-fatal error, once
fn with_location(e: Error, dir: &Path, block: &GuidanceBlock) -> Error {
    match e {
        Error::RunAborted { .. } => e,
        source => Error::RunAborted {
            dir: dir.to_path_buf(),
            file: block.file.clone(),
            source: Box::new(source),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::{DryRunCollaborator, PromptSession};
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Thread-safe collaborator that records every request it performs
    #[derive(Clone, Default)]
    struct Recorder {
        session: PromptSession,
        calls: Arc<Mutex<Vec<PromptSession>>>,
        /// Fails with a run-fatal error for files whose log path contains this
        fatal_on: Option<String>,
        /// Fails for a single file when its log path contains this
        fail_on: Option<String>,
        /// Aborted after the first request, like an interrupt would
        interrupt: Option<AbortHandle>,
        forkable: bool,
    }

    impl Recorder {
        fn calls(&self) -> Vec<PromptSession> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Collaborator for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn session(&self) -> &PromptSession {
            &self.session
        }

        fn session_mut(&mut self) -> &mut PromptSession {
            &mut self.session
        }

        async fn perform(&mut self) -> crate::Result<Option<String>> {
            self.calls.lock().unwrap().push(self.session.clone());
            let log = self
                .session
                .output_log()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();

            if self.fatal_on.as_ref().is_some_and(|f| log.contains(f.as_str())) {
                return Err(Error::CollaboratorFatal("authentication failed".to_string()));
            }
            if self.fail_on.as_ref().is_some_and(|f| log.contains(f.as_str())) {
                return Err(Error::Generation("exit code 1".to_string()));
            }
            self.session.persist()?;
            if let Some(handle) = &self.interrupt {
                handle.abort();
            }
            Ok(Some("updated".to_string()))
        }

        fn is_thread_safe(&self) -> bool {
            self.forkable
        }

        fn fork(&self) -> Option<Box<dyn Collaborator>> {
            if !self.forkable {
                return None;
            }
            Some(Box::new(Self {
                session: PromptSession::new(),
                ..self.clone()
            }))
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn workspace(root: &Path, members: &[&str]) {
        let list: Vec<String> = members.iter().map(|m| format!("\"{}\"", m)).collect();
        write(
            root,
            "Cargo.toml",
            &format!("[workspace]\nmembers = [{}]\n", list.join(", ")),
        );
    }

    /// Prompt sent for the file whose relative path is `rel`
    fn prompt_for(root: &Path, calls: &[PromptSession], rel: &str) -> String {
        let log = crate::orchestrator::log_path(root, &root.join(rel));
        calls
            .iter()
            .find(|c| c.output_log() == Some(log.as_path()))
            .map(|c| c.prompt_text())
            .unwrap()
    }

    fn rel_files(root: &Path, summary: &RunSummary) -> Vec<String> {
        summary
            .processed
            .iter()
            .map(|p| crate::guidance::relative_path(root, &p.file))
            .collect()
    }

    #[tokio::test]
    async fn test_no_guidance_means_no_requests() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.py", "print('hello')\n");

        let mut recorder = Recorder::default();
        let summary = Engine::new(ScanConfig::default())
            .run(dir.path(), &mut recorder)
            .await
            .unwrap();

        assert!(recorder.calls().is_empty());
        assert!(summary.processed.is_empty());
        assert_eq!(summary.guidance_records, 0);
    }

    #[tokio::test]
    async fn test_folder_guidance_file_gets_its_own_request() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "guidance.txt", "Use snake_case.");

        let engine = Engine::new(ScanConfig::default());
        let plan = engine.collect(dir.path()).unwrap();
        assert_eq!(plan.store.get("/"), Some("Use snake_case."));

        let mut recorder = Recorder::default();
        let summary = engine.generate(plan, &mut recorder).await;
        assert_eq!(summary.guidance_records, 1);
        assert_eq!(rel_files(dir.path(), &summary), vec!["guidance.txt"]);

        let calls = recorder.calls();
        assert_eq!(calls.len(), 1);
        let prompt = calls[0].prompt_text();
        assert_eq!(prompt.matches("Use snake_case.").count(), 1);
        assert!(!prompt.contains("## Folder Guidance"));
    }

    #[tokio::test]
    async fn test_end_to_end_single_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "guidance.txt", "Use snake_case.");
        write(
            dir.path(),
            "main.py",
            "# @guidance: Document the entry point.\ndef main():\n    pass\n",
        );

        let mut recorder = Recorder::default();
        let summary = Engine::new(ScanConfig::default())
            .run(dir.path(), &mut recorder)
            .await
            .unwrap();

        let log = dir.path().join(".docent/temp/main.py.txt");
        assert_eq!(rel_files(dir.path(), &summary), vec!["guidance.txt", "main.py"]);
        assert_eq!(summary.processed[1].log, log);

        let calls = recorder.calls();
        assert_eq!(calls.len(), 2);
        let prompt = prompt_for(dir.path(), &calls, "main.py");
        assert!(prompt.contains("Use snake_case."));
        assert!(prompt.contains("Document the entry point."));
        assert!(prompt.contains("def main():"));

        let logged = fs::read_to_string(&log).unwrap();
        assert!(logged.contains("Document the entry point."));
        assert!(recorder.session().is_empty());
    }

    #[tokio::test]
    async fn test_runs_are_idempotent() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "guidance.txt", "Be brief.");
        write(dir.path(), "a.py", "# @guidance: one\n");
        write(dir.path(), "pkg/b.py", "# @guidance: two\n");

        let engine = Engine::new(ScanConfig::default());
        let mut first = Recorder::default();
        let summary_one = engine.run(dir.path(), &mut first).await.unwrap();
        let log_one = fs::read_to_string(dir.path().join(".docent/temp/pkg/b.py.txt")).unwrap();

        let mut second = Recorder::default();
        let summary_two = engine.run(dir.path(), &mut second).await.unwrap();
        let log_two = fs::read_to_string(dir.path().join(".docent/temp/pkg/b.py.txt")).unwrap();

        assert_eq!(summary_one, summary_two);
        assert_eq!(log_one, log_two);
        assert_eq!(first.calls(), second.calls());

        let records = |plan: ScanPlan| plan.store.records().collect::<Vec<_>>();
        assert_eq!(
            records(engine.collect(dir.path()).unwrap()),
            records(engine.collect(dir.path()).unwrap())
        );
    }

    #[tokio::test]
    async fn test_reverse_order_processes_modules_first() {
        let dir = TempDir::new().unwrap();
        workspace(dir.path(), &["app"]);
        write(dir.path(), "build.rs", "// @guidance: root file\nfn main() {}\n");
        write(dir.path(), "app/src/util.rs", "// @guidance: module file\n");

        let mut recorder = Recorder::default();
        let summary = Engine::new(ScanConfig::default())
            .run(dir.path(), &mut recorder)
            .await
            .unwrap();
        assert_eq!(rel_files(dir.path(), &summary), vec!["app/src/util.rs", "build.rs"]);
    }

    #[tokio::test]
    async fn test_forward_order_processes_own_files_first() {
        let dir = TempDir::new().unwrap();
        workspace(dir.path(), &["app"]);
        write(dir.path(), "build.rs", "// @guidance: root file\nfn main() {}\n");
        write(dir.path(), "app/src/util.rs", "// @guidance: module file\n");

        let config = ScanConfig {
            order: TraversalOrder::Forward,
            ..Default::default()
        };
        let mut recorder = Recorder::default();
        let summary = Engine::new(config).run(dir.path(), &mut recorder).await.unwrap();
        assert_eq!(rel_files(dir.path(), &summary), vec!["build.rs", "app/src/util.rs"]);
    }

    #[tokio::test]
    async fn test_inheritance_stops_at_module_root() {
        let dir = TempDir::new().unwrap();
        workspace(dir.path(), &["app"]);
        write(dir.path(), "guidance.txt", "ROOT RULE");
        write(dir.path(), "app/guidance.txt", "APP RULE");
        write(dir.path(), "app/src/util.rs", "// @guidance: module file\n");

        let mut scoped = Recorder::default();
        Engine::new(ScanConfig::default())
            .run(dir.path(), &mut scoped)
            .await
            .unwrap();
        let prompt = prompt_for(dir.path(), &scoped.calls(), "app/src/util.rs");
        assert!(prompt.contains("APP RULE"));
        assert!(!prompt.contains("ROOT RULE"));

        let config = ScanConfig {
            cross_module_inheritance: true,
            ..Default::default()
        };
        let mut crossing = Recorder::default();
        Engine::new(config).run(dir.path(), &mut crossing).await.unwrap();
        let prompt = prompt_for(dir.path(), &crossing.calls(), "app/src/util.rs");
        let root_at = prompt.find("ROOT RULE").unwrap();
        let app_at = prompt.find("APP RULE").unwrap();
        assert!(root_at < app_at);
    }

    #[tokio::test]
    async fn test_glob_workspace_members_are_modules() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "package.json", r#"{ "workspaces": ["packages/**"] }"#);
        write(dir.path(), "guidance.txt", "ROOT RULE");
        write(
            dir.path(),
            "packages/a/src/x.ts",
            "// @guidance: explain x\nexport const x = 1;\n",
        );

        let engine = Engine::new(ScanConfig::default());
        let plan = engine.collect(dir.path()).unwrap();
        assert_eq!(plan.root.modules.len(), 1);
        assert_eq!(plan.root.blocks.len(), 1);

        let mut recorder = Recorder::default();
        let summary = engine.generate(plan, &mut recorder).await;
        assert_eq!(summary.processed.len(), 2);
        let prompt = prompt_for(dir.path(), &recorder.calls(), "packages/a/src/x.ts");
        assert!(prompt.contains("explain x"));
        assert!(!prompt.contains("ROOT RULE"));
    }

    #[tokio::test]
    async fn test_parent_guidance_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "guidance.txt", "ROOT RULE");
        write(dir.path(), "main.py", "# @guidance: entry\n");

        let config = ScanConfig {
            use_parent_guidance: false,
            ..Default::default()
        };
        let mut recorder = Recorder::default();
        Engine::new(config).run(dir.path(), &mut recorder).await.unwrap();
        assert!(!prompt_for(dir.path(), &recorder.calls(), "main.py").contains("ROOT RULE"));
    }

    #[tokio::test]
    async fn test_generation_failure_is_per_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "# @guidance: one\n");
        write(dir.path(), "b.py", "# @guidance: two\n");

        let mut recorder = Recorder {
            fail_on: Some("a.py".to_string()),
            ..Default::default()
        };
        let summary = Engine::new(ScanConfig::default())
            .run(dir.path(), &mut recorder)
            .await
            .unwrap();

        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].file, dir.path().join("a.py"));
        assert_eq!(rel_files(dir.path(), &summary), vec!["b.py"]);
        assert!(recorder.session().is_empty());
    }

    #[tokio::test]
    async fn test_fatal_error_keeps_partial_summary() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "# @guidance: one\n");
        write(dir.path(), "b.py", "# @guidance: two\n");
        write(dir.path(), "c.py", "# @guidance: three\n");
        fs::write(dir.path().join("bad.py"), [0xff, 0xfe, 0x00]).unwrap();

        let config = ScanConfig {
            order: TraversalOrder::Forward,
            ..Default::default()
        };
        let engine = Engine::new(config);
        let mut recorder = Recorder {
            fatal_on: Some("b.py".to_string()),
            ..Default::default()
        };
        let summary = engine.run(dir.path(), &mut recorder).await.unwrap();

        assert_eq!(rel_files(dir.path(), &summary), vec!["a.py"]);
        assert_eq!(summary.skipped.len(), 1);
        let cause = summary.aborted.as_deref().unwrap();
        assert!(cause.contains(&dir.path().join("b.py").display().to_string()));
        assert!(cause.contains("authentication failed"));
        assert!(!summary.is_clean());

        assert!(engine.abort_handle().is_aborted());
        assert_eq!(recorder.calls().len(), 2);
        assert!(dir.path().join(".docent/temp/a.py.txt").exists());
        assert!(!dir.path().join(".docent/temp/c.py.txt").exists());
    }

    #[tokio::test]
    async fn test_interrupt_stops_after_current_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "# @guidance: one\n");
        write(dir.path(), "b.py", "# @guidance: two\n");

        let engine = Engine::new(ScanConfig::default());
        let mut recorder = Recorder {
            interrupt: Some(engine.abort_handle()),
            ..Default::default()
        };
        let summary = engine.run(dir.path(), &mut recorder).await.unwrap();

        assert_eq!(rel_files(dir.path(), &summary), vec!["a.py"]);
        assert!(summary.aborted.as_deref().unwrap().contains("run cancelled"));
        assert_eq!(recorder.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_engine_runs_again_after_abort() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "# @guidance: one\n");

        let engine = Engine::new(ScanConfig::default());
        engine.abort_handle().abort();

        let mut recorder = Recorder::default();
        let summary = engine.run(dir.path(), &mut recorder).await.unwrap();
        assert!(!summary.is_aborted());
        assert_eq!(rel_files(dir.path(), &summary), vec!["a.py"]);
        assert!(!engine.abort_handle().is_aborted());
    }

    #[tokio::test]
    async fn test_concurrent_modules_keep_declaration_order() {
        let dir = TempDir::new().unwrap();
        workspace(dir.path(), &["m1", "m2", "m3"]);
        write(dir.path(), "build.rs", "// @guidance: root\n");
        for m in ["m1", "m2", "m3"] {
            write(dir.path(), &format!("{m}/src/util.rs"), "// @guidance: module\n");
        }

        let config = ScanConfig {
            module_concurrency: true,
            module_threads: 2,
            ..Default::default()
        };
        let mut recorder = Recorder {
            forkable: true,
            ..Default::default()
        };
        let summary = Engine::new(config).run(dir.path(), &mut recorder).await.unwrap();

        assert_eq!(
            rel_files(dir.path(), &summary),
            vec!["m1/src/util.rs", "m2/src/util.rs", "m3/src/util.rs", "build.rs"]
        );
        assert_eq!(recorder.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_concurrency_falls_back_without_fork() {
        let dir = TempDir::new().unwrap();
        workspace(dir.path(), &["m1", "m2"]);
        write(dir.path(), "m1/src/util.rs", "// @guidance: one\n");
        write(dir.path(), "m2/src/util.rs", "// @guidance: two\n");

        let config = ScanConfig {
            module_concurrency: true,
            ..Default::default()
        };
        let mut recorder = Recorder::default();
        let summary = Engine::new(config).run(dir.path(), &mut recorder).await.unwrap();
        assert_eq!(
            rel_files(dir.path(), &summary),
            vec!["m1/src/util.rs", "m2/src/util.rs"]
        );
    }

    #[tokio::test]
    async fn test_concurrent_fatal_error_aborts_siblings() {
        let dir = TempDir::new().unwrap();
        workspace(dir.path(), &["m1", "m2"]);
        write(dir.path(), "build.rs", "// @guidance: root\n");
        write(dir.path(), "m1/src/util.rs", "// @guidance: one\n");
        write(dir.path(), "m2/src/util.rs", "// @guidance: two\n");

        let config = ScanConfig {
            module_concurrency: true,
            ..Default::default()
        };
        let engine = Engine::new(config);
        let mut recorder = Recorder {
            forkable: true,
            fatal_on: Some("m1/src".to_string()),
            ..Default::default()
        };
        let summary = engine.run(dir.path(), &mut recorder).await.unwrap();

        assert!(summary.aborted.as_deref().unwrap().contains("authentication failed"));
        assert!(engine.abort_handle().is_aborted());
        assert!(!dir.path().join(".docent/temp/build.rs.txt").exists());
    }

    #[tokio::test]
    async fn test_dry_run_writes_logs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "lib/util.ts", "// @guidance: explain exports\n");

        let config = ScanConfig {
            module_concurrency: true,
            ..Default::default()
        };
        let mut collaborator = DryRunCollaborator::new();
        let summary = Engine::new(config).run(dir.path(), &mut collaborator).await.unwrap();

        assert_eq!(summary.processed.len(), 1);
        assert!(dir.path().join(".docent/temp/lib/util.ts.txt").exists());
    }
}
