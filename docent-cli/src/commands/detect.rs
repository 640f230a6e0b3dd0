//! Detect command - show the detected project layout

use std::path::PathBuf;

use clap::Args;
use docent_core::ProjectNode;

/// Arguments for the detect command
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Project directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

impl DetectArgs {
    /// Execute the detect command
    pub fn execute(&self) -> anyhow::Result<()> {
        let node = ProjectNode::detect(&self.dir)?;

        println!("Project: {}", node.root().display());
        println!("Variant: {}", node.variant());
        println!("Descriptor: {}", node.descriptor().unwrap_or("(none)"));
        if node.modules().is_empty() {
            println!("Modules: (none)");
        } else {
            println!("Modules:");
            for module in node.modules() {
                let marker = if node.root().join(module).is_dir() { "" } else { " (missing)" };
                println!("  - {}{}", module, marker);
            }
        }
        println!();
        print!("{}", node.structure_description());

        Ok(())
    }
}
