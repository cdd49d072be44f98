use std::error::Error;
use std::fmt::Write;

use crate::Job;

const DETAIL_INDENT: &str = "    ";

pub const REASON_FETCH: &str = "Failed to fetch URL";
pub const REASON_TRANSFORMER: &str = "Failed to import transformer";
pub const REASON_CONVERSION: &str = "Failed to transform html2docx";
pub const REASON_WRITE: &str = "Failed writing the resulting document to the filesystem";

/// A job that did not produce its document, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFailure {
    pub job: Job,
    pub reason: String,
}

impl ImportFailure {
    pub fn new(job: Job, reason: impl Into<String>) -> Self {
        Self {
            job,
            reason: reason.into(),
        }
    }

    /// Appends `cause` and every error in its source chain, one per indented line.
    pub fn with_cause(job: Job, headline: &str, cause: &(dyn Error + 'static)) -> Self {
        let mut reason = headline.to_string();
        let mut current: Option<&(dyn Error + 'static)> = Some(cause);
        while let Some(err) = current {
            reason.push('\n');
            reason.push_str(&indent(&err.to_string()));
            current = err.source();
        }
        Self { job, reason }
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("{DETAIL_INDENT}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Human-readable report for the error console, or `None` when nothing failed.
pub fn format_failure_report(failures: &[ImportFailure]) -> Option<String> {
    if failures.is_empty() {
        return None;
    }
    let mut report = String::new();
    let noun = if failures.len() == 1 { "import" } else { "imports" };
    let _ = writeln!(report, "{} {noun} failed:", failures.len());
    for failure in failures {
        let _ = writeln!(report, "  - {}", failure.job);
        let _ = writeln!(report, "{}", indent(&failure.reason));
    }
    Some(report)
}

/// Report for job arguments that never became jobs, or `None` when all parsed.
pub fn format_rejected_report(rejected: &[String]) -> Option<String> {
    if rejected.is_empty() {
        return None;
    }
    let mut report = String::new();
    let noun = if rejected.len() == 1 { "argument" } else { "arguments" };
    let _ = writeln!(
        report,
        "{} job {noun} rejected (expected url|outputPath|transformerPath):",
        rejected.len()
    );
    for token in rejected {
        let _ = writeln!(report, "  - {token}");
    }
    Some(report)
}
