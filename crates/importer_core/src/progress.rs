use std::collections::BTreeMap;

use importer_logging::importer_debug;

use crate::{Job, JobId, Stage};

/// Counts of jobs per lifecycle bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressView {
    pub total: usize,
    pub pending: usize,
    pub in_flight: usize,
    pub done: usize,
    pub failed: usize,
}

impl ProgressView {
    pub fn settled(&self) -> usize {
        self.done + self.failed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct JobRow {
    url: String,
    stage: Stage,
}

/// Tracks the stage of every job in a batch from reported transitions.
///
/// Transitions that the job lifecycle does not allow are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchProgress {
    jobs: BTreeMap<JobId, JobRow>,
    dirty: bool,
}

impl BatchProgress {
    pub fn new<'a>(jobs: impl IntoIterator<Item = (JobId, &'a Job)>) -> Self {
        let jobs = jobs
            .into_iter()
            .map(|(id, job)| {
                (
                    id,
                    JobRow {
                        url: job.url.clone(),
                        stage: Stage::Pending,
                    },
                )
            })
            .collect();
        Self { jobs, dirty: false }
    }

    /// Returns whether the transition was accepted.
    pub fn apply_stage(&mut self, job_id: JobId, stage: Stage) -> bool {
        let Some(row) = self.jobs.get_mut(&job_id) else {
            importer_debug!("Stage {:?} for unknown job {}", stage, job_id);
            return false;
        };
        if row.stage == stage {
            return false;
        }
        if !row.stage.can_advance_to(stage) {
            importer_debug!(
                "Ignoring transition {:?} -> {:?} for job {} ({})",
                row.stage,
                stage,
                job_id,
                row.url
            );
            return false;
        }
        row.stage = stage;
        self.dirty = true;
        true
    }

    pub fn stage(&self, job_id: JobId) -> Option<Stage> {
        self.jobs.get(&job_id).map(|row| row.stage)
    }

    pub fn view(&self) -> ProgressView {
        let mut view = ProgressView {
            total: self.jobs.len(),
            ..ProgressView::default()
        };
        for row in self.jobs.values() {
            match row.stage {
                Stage::Pending => view.pending += 1,
                Stage::Done => view.done += 1,
                Stage::Failed => view.failed += 1,
                _ => view.in_flight += 1,
            }
        }
        view
    }

    pub fn is_finished(&self) -> bool {
        self.jobs.values().all(|row| row.stage.is_terminal())
    }

    /// Returns and clears the changed-since-last-call flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
