use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::persist::PersistError;

/// Errors a job pipeline can run into, one variant per stage.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("no successful response for {url} after {attempts} attempts")]
    FetchFailure { url: String, attempts: u32 },
    #[error(transparent)]
    TransformLoad(#[from] TransformLoadError),
    #[error("transformer {path} is not usable: {reason}")]
    InvalidTransformer { path: String, reason: String },
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("failed to write {path}")]
    Write {
        path: String,
        #[source]
        source: PersistError,
    },
}

#[derive(Debug, Error)]
pub enum TransformLoadError {
    #[error("transformer file {0} not found")]
    NotFound(PathBuf),
    #[error("could not read transformer {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("transformer {path} is malformed")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("transformer {path} has an invalid selector {selector:?}: {message}")]
    InvalidSelector {
        path: PathBuf,
        selector: String,
        message: String,
    },
}

/// Error returned by user-supplied transform functions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransformFnError(pub String);

impl TransformFnError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("transform failed for {url}")]
    Transform {
        url: String,
        #[source]
        source: TransformFnError,
    },
    #[error("transform produced no documents for {url}")]
    NoDocuments { url: String },
    #[error("fragment path {path:?} from {url} has no file name")]
    FragmentWithoutFileName { url: String, path: String },
    #[error("could not build docx package")]
    Package(#[from] zip::result::ZipError),
    #[error("could not build docx package")]
    PackageIo(#[from] io::Error),
}
