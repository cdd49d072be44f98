//! Importer core: batch data model, argument parsing and job lifecycle tracking.
mod args;
mod failure;
mod job;
mod progress;
mod stage;

pub use args::parse_args;
pub use failure::{
    format_failure_report, format_rejected_report, ImportFailure, REASON_CONVERSION, REASON_FETCH,
    REASON_TRANSFORMER, REASON_WRITE,
};
pub use job::{
    BatchConfig, Job, JobId, RetryOptions, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY,
};
pub use progress::{BatchProgress, ProgressView};
pub use stage::Stage;
