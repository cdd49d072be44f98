use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use importer_core::{
    ImportFailure, Job, JobId, RetryOptions, Stage, REASON_CONVERSION, REASON_FETCH,
    REASON_TRANSFORMER, REASON_WRITE,
};
use importer_engine::{
    BatchRunner, ConversionError, DocumentConverter, DocumentFactory, DomTransform, EngineEvent,
    ExecutionMode, FailureKind, FetchError, FetchMetadata, FetchOutput, Fetcher, ImportResult,
    JobPipeline, PipelineDeps, ProgressSink, RetryingFetcher, ScraperDocumentFactory,
    TransformContract, TransformFnError, TransformInput, TransformLoadError, TransformerLoader,
    TransformerModule,
};
use pretty_assertions::assert_eq;

/// Serves canned pages; unknown URLs fail. URLs containing `slow` take longer
/// to answer. Tracks the peak number of concurrent fetches.
#[derive(Default)]
struct FakeFetcher {
    pages: HashMap<String, String>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeFetcher {
    fn with_pages(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, body)| (url.to_string(), body.to_string()))
                .collect(),
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let pause = if url.contains("slow") { 80 } else { 10 };
        tokio::time::sleep(Duration::from_millis(pause)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.pages.get(url) {
            Some(body) => Ok(FetchOutput {
                bytes: body.as_bytes().to_vec(),
                metadata: FetchMetadata {
                    original_url: url.to_string(),
                    final_url: url.to_string(),
                    status: 200,
                    content_type: Some("text/html; charset=utf-8".to_string()),
                    byte_len: body.len() as u64,
                },
            }),
            None => Err(FetchError {
                kind: FailureKind::HttpStatus(404),
                message: "404 Not Found".to_string(),
            }),
        }
    }
}

struct Identity;

impl DomTransform for Identity {
    fn transform_dom(&self, input: &TransformInput<'_>) -> Result<String, TransformFnError> {
        if input.html.contains("explode") {
            return Err(TransformFnError::new("cannot handle this page"));
        }
        Ok(input.html.to_string())
    }
}

/// `good.json` is a DOM transformer; `empty.json` exposes nothing; anything
/// else is missing.
struct FakeLoader;

impl TransformerLoader for FakeLoader {
    fn load(&self, path: &str) -> Result<TransformerModule, TransformLoadError> {
        match path {
            "good.json" => Ok(TransformerModule::with_dom(Identity)),
            "empty.json" => Ok(TransformerModule::default()),
            other => Err(TransformLoadError::NotFound(other.into())),
        }
    }
}

/// Emits the transformed HTML as the document bytes.
struct BytesConverter;

impl DocumentConverter for BytesConverter {
    fn convert(
        &self,
        url: &str,
        html: &str,
        contract: &TransformContract,
        _documents: &dyn DocumentFactory,
    ) -> Result<Vec<ImportResult>, ConversionError> {
        let TransformContract::Dom { transform, .. } = contract else {
            return Err(ConversionError::NoDocuments {
                url: url.to_string(),
            });
        };
        let document = ScraperDocumentFactory.create_document_from_string(html);
        let params = serde_json::Map::new();
        let out = transform
            .transform_dom(&TransformInput {
                url,
                document: &document,
                html,
                params: &params,
            })
            .map_err(|source| ConversionError::Transform {
                url: url.to_string(),
                source,
            })?;
        Ok(vec![ImportResult {
            docx: out.clone().into_bytes(),
            html: out.clone(),
            md: out,
            path: contract.generate_document_path(""),
        }])
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingSink {
    fn stages_for(&self, job_id: JobId) -> Vec<Stage> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::Progress { job_id: id, stage } if *id == job_id => Some(*stage),
                _ => None,
            })
            .collect()
    }

    fn completions(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| matches!(event, EngineEvent::JobCompleted { .. }))
            .count()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

struct Harness {
    fetcher: Arc<FakeFetcher>,
    sink: Arc<RecordingSink>,
    pipeline: Arc<JobPipeline>,
    dir: tempfile::TempDir,
}

fn harness(pages: &[(&str, &str)]) -> Harness {
    let fetcher = Arc::new(FakeFetcher::with_pages(pages));
    let sink = Arc::new(RecordingSink::default());
    let pipeline = JobPipeline::new(PipelineDeps {
        fetcher: RetryingFetcher::new(
            fetcher.clone(),
            RetryOptions {
                max_retries: 2,
                delay: Duration::from_millis(1),
            },
        ),
        loader: Arc::new(FakeLoader),
        converter: Arc::new(BytesConverter),
        documents: Arc::new(ScraperDocumentFactory),
        sink: sink.clone(),
    });
    Harness {
        fetcher,
        sink,
        pipeline: Arc::new(pipeline),
        dir: tempfile::tempdir().unwrap(),
    }
}

impl Harness {
    fn job(&self, url: &str, out: &str, transformer: &str) -> Job {
        let path = self.dir.path().join(out);
        Job::new(url, path.to_string_lossy(), transformer)
    }
}

fn reason_headline(failure: &ImportFailure) -> &str {
    failure.reason.lines().next().unwrap_or_default()
}

#[tokio::test]
async fn successful_job_walks_every_stage_and_writes_output() {
    let h = harness(&[("https://a.test/", "<p>hello</p>")]);
    let job = h.job("https://a.test/", "out/a.docx", "good.json");

    let results = h.pipeline.run(1, &job).await.expect("job succeeds");

    assert_eq!(results.len(), 1);
    let written = std::fs::read_to_string(&job.output_path).unwrap();
    assert!(written.contains("<p>hello</p>"));
    assert_eq!(
        h.sink.stages_for(1),
        vec![
            Stage::Fetching,
            Stage::Transforming,
            Stage::Converting,
            Stage::Writing,
            Stage::Done
        ]
    );
    assert_eq!(h.sink.completions(), 1);
}

#[tokio::test]
async fn fetch_failure_reason() {
    let h = harness(&[]);
    let job = h.job("https://missing.test/", "a.docx", "good.json");

    let failure = h.pipeline.run(1, &job).await.unwrap_err();

    assert_eq!(failure.job, job);
    assert_eq!(failure.reason, REASON_FETCH);
    assert_eq!(h.sink.stages_for(1), vec![Stage::Fetching, Stage::Failed]);
    assert!(!std::path::Path::new(&job.output_path).exists());
}

#[tokio::test]
async fn transformer_failure_reasons() {
    let h = harness(&[("https://a.test/", "<p>x</p>")]);

    let missing = h.job("https://a.test/", "a.docx", "nope.json");
    let failure = h.pipeline.run(1, &missing).await.unwrap_err();
    assert_eq!(reason_headline(&failure), REASON_TRANSFORMER);
    assert!(failure.reason.contains("nope.json"));

    let empty = h.job("https://a.test/", "b.docx", "empty.json");
    let failure = h.pipeline.run(2, &empty).await.unwrap_err();
    assert_eq!(reason_headline(&failure), REASON_TRANSFORMER);
    assert!(failure.reason.contains("neither"));
}

#[tokio::test]
async fn conversion_failure_reason_includes_transform_message() {
    let h = harness(&[("https://a.test/", "<p>explode</p>")]);
    let job = h.job("https://a.test/", "a.docx", "good.json");

    let failure = h.pipeline.run(1, &job).await.unwrap_err();

    assert_eq!(reason_headline(&failure), REASON_CONVERSION);
    assert!(failure.reason.contains("cannot handle this page"));
}

#[tokio::test]
async fn write_failure_reason() {
    let h = harness(&[("https://a.test/", "<p>x</p>")]);
    std::fs::write(h.dir.path().join("blocker"), b"file").unwrap();
    let job = h.job("https://a.test/", "blocker/a.docx", "good.json");

    let failure = h.pipeline.run(1, &job).await.unwrap_err();

    assert_eq!(reason_headline(&failure), REASON_WRITE);
    assert_eq!(
        h.sink.stages_for(1).last().copied(),
        Some(Stage::Failed)
    );
}

#[tokio::test]
async fn sequential_batch_continues_after_failure() {
    let h = harness(&[("https://b.test/", "<p>b</p>")]);
    let jobs = vec![
        h.job("https://a.test/", "a.docx", "good.json"),
        h.job("https://b.test/", "b.docx", "good.json"),
    ];

    let report = BatchRunner::new(h.pipeline.clone())
        .run(&jobs, ExecutionMode::Sequential)
        .await;

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].job, jobs[0]);
    assert!(std::path::Path::new(&jobs[1].output_path).exists());
    assert_eq!(h.fetcher.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn sequential_failures_keep_job_order() {
    let h = harness(&[]);
    let jobs = vec![
        h.job("https://slow.test/", "a.docx", "good.json"),
        h.job("https://fast.test/", "b.docx", "good.json"),
    ];

    let report = BatchRunner::new(h.pipeline.clone())
        .run(&jobs, ExecutionMode::Sequential)
        .await;

    let failed: Vec<&Job> = report.failures.iter().map(|f| &f.job).collect();
    assert_eq!(failed, vec![&jobs[0], &jobs[1]]);
}

#[tokio::test]
async fn parallel_failures_follow_settlement_order() {
    let h = harness(&[("https://ok.test/", "<p>ok</p>")]);
    let jobs = vec![
        h.job("https://slow.test/", "a.docx", "good.json"),
        h.job("https://fast.test/", "b.docx", "good.json"),
        h.job("https://ok.test/", "c.docx", "good.json"),
    ];

    let report = BatchRunner::new(h.pipeline.clone())
        .run(&jobs, ExecutionMode::Parallel { limit: None })
        .await;

    assert_eq!(report.succeeded, 1);
    let failed: Vec<&Job> = report.failures.iter().map(|f| &f.job).collect();
    assert_eq!(failed, vec![&jobs[1], &jobs[0]]);
}

#[tokio::test]
async fn parallel_batch_attempts_every_job() {
    let h = harness(&[
        ("https://a.test/", "<p>a</p>"),
        ("https://c.test/", "<p>c</p>"),
    ]);
    let jobs = vec![
        h.job("https://a.test/", "a.docx", "good.json"),
        h.job("https://b.test/", "b.docx", "good.json"),
        h.job("https://c.test/", "c.docx", "good.json"),
        h.job("https://c.test/", "d.docx", "missing.json"),
    ];

    let report = BatchRunner::new(h.pipeline.clone())
        .run(&jobs, ExecutionMode::Parallel { limit: None })
        .await;

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.written.len(), 2);
    assert_eq!(h.sink.completions(), 4);
    assert!(h.fetcher.peak.load(Ordering::SeqCst) > 1);
}

#[tokio::test]
async fn bounded_parallel_batch_respects_limit() {
    let pages: Vec<(String, String)> = (0..6)
        .map(|i| (format!("https://p{i}.test/"), format!("<p>{i}</p>")))
        .collect();
    let page_refs: Vec<(&str, &str)> = pages
        .iter()
        .map(|(url, body)| (url.as_str(), body.as_str()))
        .collect();
    let h = harness(&page_refs);
    let jobs: Vec<Job> = (0..6)
        .map(|i| h.job(&format!("https://p{i}.test/"), &format!("{i}.docx"), "good.json"))
        .collect();

    let report = BatchRunner::new(h.pipeline.clone())
        .run(
            &jobs,
            ExecutionMode::Parallel {
                limit: NonZeroUsize::new(2),
            },
        )
        .await;

    assert_eq!(report.succeeded, 6);
    assert!(report.failures.is_empty());
    assert!(h.fetcher.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn empty_batch_reports_nothing() {
    let h = harness(&[]);
    let report = BatchRunner::new(h.pipeline.clone())
        .run(&[], ExecutionMode::Parallel { limit: None })
        .await;
    assert_eq!(report, Default::default());
}
