use std::sync::Mutex;

use importer_core::{BatchConfig, BatchProgress, JobId, Stage};
use importer_engine::{EngineEvent, ProgressSink};
use importer_logging::{importer_debug, importer_info, importer_warn};

/// Folds engine events into a [`BatchProgress`] and logs the batch totals
/// whenever a job settles.
pub struct ProgressReporter {
    progress: Mutex<BatchProgress>,
}

impl ProgressReporter {
    pub fn new(config: &BatchConfig) -> Self {
        Self {
            progress: Mutex::new(BatchProgress::new(config.numbered_jobs())),
        }
    }

    pub fn finish(&self) {
        let Ok(progress) = self.progress.lock() else {
            return;
        };
        let view = progress.view();
        if !progress.is_finished() {
            importer_warn!(
                "Batch ended with {} job(s) unsettled",
                view.total - view.settled()
            );
        }
        importer_info!(
            "Imported {}/{} document job(s), {} failed",
            view.done,
            view.total,
            view.failed
        );
    }

    fn apply(&self, job_id: JobId, stage: Stage) {
        let Ok(mut progress) = self.progress.lock() else {
            return;
        };
        progress.apply_stage(job_id, stage);
        if progress.consume_dirty() && stage.is_terminal() {
            let view = progress.view();
            importer_info!(
                "Progress: {}/{} settled ({} in flight, {} failed)",
                view.settled(),
                view.total,
                view.in_flight,
                view.failed
            );
        }
    }
}

impl ProgressSink for ProgressReporter {
    fn emit(&self, event: EngineEvent) {
        match event {
            EngineEvent::Progress { job_id, stage } => {
                importer_debug!("job_id={} stage={}", job_id, stage.label());
                self.apply(job_id, stage);
            }
            EngineEvent::JobCompleted { job_id, result } => match result {
                Ok(paths) => importer_info!("Job {} wrote {}", job_id, paths.join(", ")),
                Err(failure) => importer_warn!("Job {} failed: {}", job_id, failure.job),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use importer_core::{parse_args, ImportFailure, REASON_FETCH};

    use super::*;

    #[test]
    fn reporter_tracks_stages_from_events() {
        let config = parse_args(["https://a|a.docx|t.json", "https://b|b.docx|t.json"]);
        let reporter = ProgressReporter::new(&config);

        for stage in [Stage::Fetching, Stage::Transforming, Stage::Converting] {
            reporter.emit(EngineEvent::Progress { job_id: 1, stage });
        }
        reporter.emit(EngineEvent::Progress {
            job_id: 2,
            stage: Stage::Fetching,
        });
        reporter.emit(EngineEvent::Progress {
            job_id: 2,
            stage: Stage::Failed,
        });
        reporter.emit(EngineEvent::JobCompleted {
            job_id: 2,
            result: Err(ImportFailure::new(config.jobs[1].clone(), REASON_FETCH)),
        });

        let progress = reporter.progress.lock().unwrap();
        assert_eq!(progress.stage(1), Some(Stage::Converting));
        assert_eq!(progress.stage(2), Some(Stage::Failed));
        let view = progress.view();
        assert_eq!((view.in_flight, view.failed), (1, 1));
        assert!(!progress.is_finished());
    }

    #[test]
    fn out_of_order_stages_are_ignored() {
        let config = parse_args(["https://a|a.docx|t.json"]);
        let reporter = ProgressReporter::new(&config);

        reporter.emit(EngineEvent::Progress {
            job_id: 1,
            stage: Stage::Writing,
        });

        let progress = reporter.progress.lock().unwrap();
        assert_eq!(progress.stage(1), Some(Stage::Pending));
    }
}
