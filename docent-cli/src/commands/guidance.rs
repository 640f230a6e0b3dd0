//! Guidance command - list collected guidance without generating anything

use std::path::{Path, PathBuf};

use clap::Args;
use docent_core::guidance::relative_path;
use docent_core::{BlockScope, Config, Engine, ScanNode};

/// Arguments for the guidance command
#[derive(Args, Debug)]
pub struct GuidanceArgs {
    /// Project directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Also print the guidance text of each folder record
    #[arg(long)]
    pub full: bool,
}

impl GuidanceArgs {
    /// Execute the guidance command
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let engine = Engine::new(config.scan.clone());
        let plan = engine.collect(&self.dir)?;

        println!("Folder guidance ({} record(s)):", plan.store.len());
        for record in plan.store.records() {
            if self.full {
                println!("  {}:", record.key);
                for line in record.text.lines() {
                    println!("    {}", line);
                }
            } else {
                let first = record.text.lines().next().unwrap_or_default();
                println!("  {}: {}", record.key, first);
            }
        }
        println!();

        println!("Files with guidance ({}):", plan.root.total_blocks());
        print_node(&plan.root_dir, &plan.root);

        if !plan.skipped.is_empty() {
            println!();
            println!("Skipped ({}):", plan.skipped.len());
            for skipped in &plan.skipped {
                println!("  {}: {}", skipped.file.display(), skipped.reason);
            }
        }

        Ok(())
    }
}

fn print_node(root: &Path, node: &ScanNode) {
    let indent = "  ".repeat(node.depth + 1);
    let dir = relative_path(root, node.project.root());
    let dir = if dir.is_empty() { ".".to_string() } else { dir };
    println!("{}[{}] {}", indent, node.project.variant(), dir);
    for block in &node.blocks {
        let scope = match block.scope {
            BlockScope::File => "file",
            BlockScope::Directory => "folder",
        };
        println!("{}  {} ({})", indent, relative_path(root, &block.file), scope);
    }
    for module in &node.modules {
        print_node(root, module);
    }
}
