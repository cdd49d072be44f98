use std::path::PathBuf;
use std::sync::Arc;

use importer_core::RetryOptions;

use crate::convert::Html2DocxConverter;
use crate::dom::ScraperDocumentFactory;
use crate::fetch::{FetchSettings, ReqwestFetcher, RetryingFetcher};
use crate::pipeline::{JobPipeline, PipelineDeps, ProgressSink};
use crate::rules::RuleFileLoader;
use crate::FetchError;

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub fetch: FetchSettings,
    pub retry: RetryOptions,
    /// Base for relative transformer paths; the working directory when `None`.
    pub transformer_base_dir: Option<PathBuf>,
}

impl EngineConfig {
    pub fn with_retry(retry: RetryOptions) -> Self {
        Self {
            retry,
            ..Self::default()
        }
    }
}

/// Wires the bundled collaborators: reqwest fetching, JSON rule transformers,
/// scraper documents and the docx converter.
pub fn default_pipeline(
    config: &EngineConfig,
    sink: Arc<dyn ProgressSink>,
) -> Result<JobPipeline, FetchError> {
    let fetcher = ReqwestFetcher::new(config.fetch.clone())?;
    let loader = match &config.transformer_base_dir {
        Some(base) => RuleFileLoader::with_base_dir(base.clone()),
        None => RuleFileLoader::new(),
    };
    Ok(JobPipeline::new(PipelineDeps {
        fetcher: RetryingFetcher::new(Arc::new(fetcher), config.retry),
        loader: Arc::new(loader),
        converter: Arc::new(Html2DocxConverter::new()),
        documents: Arc::new(ScraperDocumentFactory),
        sink,
    }))
}
