//! Importer engine: fetching, transformer dispatch, docx conversion and batch execution.
mod batch;
mod convert;
mod decode;
mod docx;
mod dom;
mod engine;
mod error;
mod fetch;
mod persist;
mod pipeline;
mod rules;
mod transformer;
mod types;

pub use batch::{BatchReport, BatchRunner, ExecutionMode};
pub use convert::{DocumentConverter, Html2DocxConverter, Html2MdRenderer, MarkdownRenderer};
pub use decode::{decode_body, decode_body_lossy, DecodeError, DecodedBody};
pub use docx::build_docx;
pub use dom::{serialize_node, DocumentFactory, ScraperDocumentFactory};
pub use engine::{default_pipeline, EngineConfig};
pub use error::{ConversionError, ImportError, TransformFnError, TransformLoadError};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher, RetryingFetcher};
pub use persist::{ensure_output_dir, write_document, PersistError};
pub use pipeline::{JobPipeline, NoopProgressSink, PipelineDeps, ProgressSink};
pub use rules::RuleFileLoader;
pub use transformer::{
    load_transform, rebase_fragment_path, DomTransform, Fragment, FragmentTransform,
    TransformContract, TransformInput, TransformerLoader, TransformerModule,
};
pub use types::{EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput, ImportResult};
