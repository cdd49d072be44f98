use std::io;
use std::path::Path;
use std::sync::Arc;

use importer_core::{
    ImportFailure, Job, JobId, Stage, REASON_CONVERSION, REASON_FETCH, REASON_TRANSFORMER,
    REASON_WRITE,
};
use importer_logging::{importer_debug, importer_info, importer_warn};

use crate::convert::DocumentConverter;
use crate::dom::DocumentFactory;
use crate::error::ImportError;
use crate::fetch::RetryingFetcher;
use crate::persist::{write_document, PersistError};
use crate::transformer::{load_transform, TransformerLoader};
use crate::{EngineEvent, ImportResult};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn emit(&self, _event: EngineEvent) {}
}

/// Collaborators of a [`JobPipeline`].
#[derive(Clone)]
pub struct PipelineDeps {
    pub fetcher: RetryingFetcher,
    pub loader: Arc<dyn TransformerLoader>,
    pub converter: Arc<dyn DocumentConverter>,
    pub documents: Arc<dyn DocumentFactory>,
    pub sink: Arc<dyn ProgressSink>,
}

/// Fetch → load transformer → convert → write, for one job at a time.
///
/// Every error is turned into an [`ImportFailure`]; nothing escapes `run`.
pub struct JobPipeline {
    deps: PipelineDeps,
}

impl JobPipeline {
    pub fn new(deps: PipelineDeps) -> Self {
        Self { deps }
    }

    pub async fn run(&self, job_id: JobId, job: &Job) -> Result<Vec<ImportResult>, ImportFailure> {
        match self.execute(job_id, job).await {
            Ok(results) => {
                let paths: Vec<String> = results.iter().map(|r| r.path.clone()).collect();
                importer_info!("Job {} done: {} -> {}", job_id, job.url, paths.join(", "));
                self.enter(job_id, Stage::Done);
                self.deps.sink.emit(EngineEvent::JobCompleted {
                    job_id,
                    result: Ok(paths),
                });
                Ok(results)
            }
            Err(err) => {
                let failure = into_failure(job, &err);
                importer_warn!("Job {} failed: {}", job_id, err);
                self.enter(job_id, Stage::Failed);
                self.deps.sink.emit(EngineEvent::JobCompleted {
                    job_id,
                    result: Err(failure.clone()),
                });
                Err(failure)
            }
        }
    }

    async fn execute(&self, job_id: JobId, job: &Job) -> Result<Vec<ImportResult>, ImportError> {
        self.enter(job_id, Stage::Fetching);
        let html = self.deps.fetcher.fetch_text(&job.url).await.ok_or_else(|| {
            ImportError::FetchFailure {
                url: job.url.clone(),
                attempts: self.deps.fetcher.options().max_retries,
            }
        })?;

        self.enter(job_id, Stage::Transforming);
        let contract = load_transform(
            self.deps.loader.as_ref(),
            &job.transformer_path,
            &job.output_path,
        )?;

        self.enter(job_id, Stage::Converting);
        let results = self.deps.converter.convert(
            &job.url,
            &html,
            &contract,
            self.deps.documents.as_ref(),
        )?;

        self.enter(job_id, Stage::Writing);
        let output_path = job.output_path.clone();
        tokio::task::spawn_blocking(move || write_all(results))
            .await
            .map_err(|join| ImportError::Write {
                path: output_path,
                source: PersistError::Io(io::Error::other(join.to_string())),
            })?
    }

    fn enter(&self, job_id: JobId, stage: Stage) {
        importer_debug!("Job {} -> {}", job_id, stage.label());
        self.deps.sink.emit(EngineEvent::Progress { job_id, stage });
    }
}

fn write_all(results: Vec<ImportResult>) -> Result<Vec<ImportResult>, ImportError> {
    for result in &results {
        write_document(Path::new(&result.path), &result.docx).map_err(|source| {
            ImportError::Write {
                path: result.path.clone(),
                source,
            }
        })?;
    }
    Ok(results)
}

fn into_failure(job: &Job, err: &ImportError) -> ImportFailure {
    let job = job.clone();
    match err {
        ImportError::FetchFailure { .. } => ImportFailure::new(job, REASON_FETCH),
        ImportError::TransformLoad(_) | ImportError::InvalidTransformer { .. } => {
            ImportFailure::with_cause(job, REASON_TRANSFORMER, err)
        }
        ImportError::Conversion(_) => ImportFailure::with_cause(job, REASON_CONVERSION, err),
        ImportError::Write { .. } => ImportFailure::with_cause(job, REASON_WRITE, err),
    }
}
