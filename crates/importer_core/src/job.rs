use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

/// Position of a job inside its batch, starting at 1.
pub type JobId = usize;

/// One unit of work: where to fetch, where to write, and which transformer to apply.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Job {
    pub url: String,
    pub output_path: String,
    pub transformer_path: String,
}

impl Job {
    pub fn new(
        url: impl Into<String>,
        output_path: impl Into<String>,
        transformer_path: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            output_path: output_path.into(),
            transformer_path: transformer_path.into(),
        }
    }
}

/// Renders the job the way it is written on the command line.
impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.url, self.output_path, self.transformer_path
        )
    }
}

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryOptions {
    /// Total number of fetch attempts, including the first.
    pub max_retries: u32,
    /// Fixed pause after every failed attempt.
    pub delay: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub jobs: Vec<Job>,
    pub parallel: bool,
    /// Upper bound on jobs in flight when running in parallel; `None` means unbounded.
    pub concurrency: Option<NonZeroUsize>,
    pub retry: RetryOptions,
    /// Base for relative transformer paths; the working directory when `None`.
    pub transformer_dir: Option<PathBuf>,
    /// Raw job tokens that did not split into three non-empty fields.
    pub rejected: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            jobs: Vec::new(),
            parallel: true,
            concurrency: None,
            retry: RetryOptions::default(),
            transformer_dir: None,
            rejected: Vec::new(),
        }
    }
}

impl BatchConfig {
    /// Jobs paired with their 1-based batch position.
    pub fn numbered_jobs(&self) -> impl Iterator<Item = (JobId, &Job)> {
        self.jobs.iter().enumerate().map(|(idx, job)| (idx + 1, job))
    }
}
