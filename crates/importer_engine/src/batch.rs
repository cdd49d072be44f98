use std::num::NonZeroUsize;
use std::sync::Arc;

use futures_util::stream::{self, FuturesUnordered, StreamExt};
use importer_core::{BatchConfig, ImportFailure, Job};
use importer_logging::importer_info;

use crate::pipeline::JobPipeline;
use crate::ImportResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One job at a time, in batch order.
    Sequential,
    /// Jobs overlap; `limit` caps how many are in flight (`None` = all of them).
    Parallel { limit: Option<NonZeroUsize> },
}

impl ExecutionMode {
    pub fn from_config(config: &BatchConfig) -> Self {
        if config.parallel {
            ExecutionMode::Parallel {
                limit: config.concurrency,
            }
        } else {
            ExecutionMode::Sequential
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchReport {
    pub succeeded: usize,
    /// Every document path written, in settlement order.
    pub written: Vec<String>,
    /// Failures in settlement order.
    pub failures: Vec<ImportFailure>,
}

impl BatchReport {
    fn record(&mut self, outcome: Result<Vec<ImportResult>, ImportFailure>) {
        match outcome {
            Ok(results) => {
                self.succeeded += 1;
                self.written.extend(results.into_iter().map(|r| r.path));
            }
            Err(failure) => self.failures.push(failure),
        }
    }
}

/// Runs a [`JobPipeline`] over every job of a batch and collects the outcome.
///
/// A failing job never stops the batch.
#[derive(Clone)]
pub struct BatchRunner {
    pipeline: Arc<JobPipeline>,
}

impl BatchRunner {
    pub fn new(pipeline: Arc<JobPipeline>) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self, jobs: &[Job], mode: ExecutionMode) -> BatchReport {
        importer_info!("Running {} job(s) ({:?})", jobs.len(), mode);
        let mut report = BatchReport::default();
        let numbered = jobs.iter().enumerate().map(|(idx, job)| (idx + 1, job));

        match mode {
            ExecutionMode::Sequential => {
                for (job_id, job) in numbered {
                    report.record(self.pipeline.run(job_id, job).await);
                }
            }
            ExecutionMode::Parallel { limit: None } => {
                let mut in_flight: FuturesUnordered<_> = numbered
                    .map(|(job_id, job)| self.pipeline.run(job_id, job))
                    .collect();
                while let Some(outcome) = in_flight.next().await {
                    report.record(outcome);
                }
            }
            ExecutionMode::Parallel { limit: Some(limit) } => {
                let mut settled = stream::iter(numbered)
                    .map(|(job_id, job)| self.pipeline.run(job_id, job))
                    .buffer_unordered(limit.get());
                while let Some(outcome) = settled.next().await {
                    report.record(outcome);
                }
            }
        }

        importer_info!(
            "Batch finished: {} succeeded, {} failed",
            report.succeeded,
            report.failures.len()
        );
        report
    }
}
