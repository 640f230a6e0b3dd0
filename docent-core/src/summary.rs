//! Run summary reporting

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// A file that produced a generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedFile {
    pub file: PathBuf,
    /// Prompt log written for the request
    pub log: PathBuf,
}

/// A file that was left out of the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub file: PathBuf,
    pub reason: String,
}

/// A file whose generation request failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub file: PathBuf,
    pub reason: String,
}

/// Outcome of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Files processed, in processing order
    pub processed: Vec<ProcessedFile>,
    /// Files skipped during collection
    pub skipped: Vec<SkippedFile>,
    /// Files whose request failed without stopping the run
    pub failed: Vec<FailedFile>,
    /// Number of directory guidance records in the store
    pub guidance_records: usize,
    /// Cause of a run-fatal error that ended the run early
    pub aborted: Option<String>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append another summary, keeping the order of both
    pub fn merge(&mut self, other: RunSummary) {
        self.processed.extend(other.processed);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
        self.guidance_records = self.guidance_records.max(other.guidance_records);
        if self.aborted.is_none() {
            self.aborted = other.aborted;
        }
    }

    /// Processed files in order
    pub fn processed_files(&self) -> Vec<&PathBuf> {
        self.processed.iter().map(|p| &p.file).collect()
    }

    /// Whether a run-fatal error ended the run
    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    /// True when no file failed and the run was not aborted
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.aborted.is_none()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} processed, {} skipped, {} failed, {} folder guidance record(s)",
            self.processed.len(),
            self.skipped.len(),
            self.failed.len(),
            self.guidance_records
        )?;
        for p in &self.processed {
            writeln!(f, "  ok    {} -> {}", p.file.display(), p.log.display())?;
        }
        for s in &self.skipped {
            writeln!(f, "  skip  {}: {}", s.file.display(), s.reason)?;
        }
        for failure in &self.failed {
            writeln!(f, "  fail  {}: {}", failure.file.display(), failure.reason)?;
        }
        if let Some(cause) = &self.aborted {
            writeln!(f, "  abort {}", cause)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_order() {
        let mut first = RunSummary::new();
        first.processed.push(ProcessedFile {
            file: PathBuf::from("a.rs"),
            log: PathBuf::from(".docent/temp/a.rs.txt"),
        });
        first.guidance_records = 2;

        let mut second = RunSummary::new();
        second.processed.push(ProcessedFile {
            file: PathBuf::from("b.rs"),
            log: PathBuf::from(".docent/temp/b.rs.txt"),
        });
        second.failed.push(FailedFile {
            file: PathBuf::from("c.rs"),
            reason: "timeout".to_string(),
        });

        first.merge(second);
        assert_eq!(
            first.processed_files(),
            vec![&PathBuf::from("a.rs"), &PathBuf::from("b.rs")]
        );
        assert_eq!(first.guidance_records, 2);
        assert!(!first.is_clean());
    }

    #[test]
    fn test_display() {
        let mut summary = RunSummary::new();
        summary.skipped.push(SkippedFile {
            file: PathBuf::from("bad.py"),
            reason: "invalid UTF-8".to_string(),
        });

        let text = summary.to_string();
        assert!(text.starts_with("0 processed, 1 skipped, 0 failed"));
        assert!(text.contains("skip  bad.py: invalid UTF-8"));
        assert!(!text.contains("abort"));
    }

    #[test]
    fn test_aborted_run_is_not_clean() {
        let mut summary = RunSummary::new();
        summary.processed.push(ProcessedFile {
            file: PathBuf::from("a.py"),
            log: PathBuf::from(".docent/temp/a.py.txt"),
        });
        summary.aborted = Some("Collaborator unusable: authentication failed".to_string());

        assert!(summary.is_aborted());
        assert!(!summary.is_clean());
        let text = summary.to_string();
        assert!(text.starts_with("1 processed, 0 skipped, 0 failed"));
        assert!(text.contains("  abort Collaborator unusable: authentication failed"));
    }
}
