use importer_core::{BatchProgress, Job, ProgressView, Stage};
use pretty_assertions::assert_eq;

fn jobs() -> Vec<Job> {
    vec![
        Job::new("https://a.example", "out/a.docx", "t.json"),
        Job::new("https://b.example", "out/b.docx", "t.json"),
    ]
}

fn progress_for(jobs: &[Job]) -> BatchProgress {
    BatchProgress::new(jobs.iter().enumerate().map(|(idx, job)| (idx + 1, job)))
}

#[test]
fn new_batch_is_all_pending() {
    let jobs = jobs();
    let progress = progress_for(&jobs);
    assert_eq!(
        progress.view(),
        ProgressView {
            total: 2,
            pending: 2,
            ..ProgressView::default()
        }
    );
    assert!(!progress.is_finished());
}

#[test]
fn transitions_are_counted_per_bucket() {
    let jobs = jobs();
    let mut progress = progress_for(&jobs);

    assert!(progress.apply_stage(1, Stage::Fetching));
    assert!(progress.consume_dirty());
    assert_eq!(progress.view().in_flight, 1);

    assert!(progress.apply_stage(2, Stage::Fetching));
    assert!(progress.apply_stage(2, Stage::Failed));
    for stage in [
        Stage::Transforming,
        Stage::Converting,
        Stage::Writing,
        Stage::Done,
    ] {
        assert!(progress.apply_stage(1, stage));
    }

    let view = progress.view();
    assert_eq!(view.done, 1);
    assert_eq!(view.failed, 1);
    assert_eq!(view.settled(), 2);
    assert!(progress.is_finished());
}

#[test]
fn illegal_transitions_are_ignored() {
    let jobs = jobs();
    let mut progress = progress_for(&jobs);

    assert!(!progress.apply_stage(1, Stage::Writing));
    assert_eq!(progress.stage(1), Some(Stage::Pending));
    assert!(!progress.consume_dirty());

    assert!(progress.apply_stage(1, Stage::Failed));
    assert!(!progress.apply_stage(1, Stage::Fetching));
    assert_eq!(progress.stage(1), Some(Stage::Failed));

    assert!(!progress.apply_stage(99, Stage::Fetching));
    assert_eq!(progress.stage(99), None);
}
