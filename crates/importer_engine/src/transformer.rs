//! Transformer plugins and the contract the converter runs them through.
//!
//! A transformer module exposes exactly one of two capabilities:
//! - `transform_dom`: maps the page to a single transformed HTML document,
//!   written to the job's output path;
//! - `transform`: maps the page to several fragments, each written under the
//!   job's output path using the final segment of the fragment's own path.
use std::fmt;
use std::sync::Arc;

use scraper::Html;
use serde_json::{Map, Value};

use crate::error::{ImportError, TransformFnError, TransformLoadError};

/// Everything a transform function gets to look at.
pub struct TransformInput<'a> {
    pub url: &'a str,
    pub document: &'a Html,
    pub html: &'a str,
    pub params: &'a Map<String, Value>,
}

pub trait DomTransform: Send + Sync {
    /// Returns the HTML of the document to convert.
    fn transform_dom(&self, input: &TransformInput<'_>) -> Result<String, TransformFnError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub html: String,
    pub path: String,
}

pub trait FragmentTransform: Send + Sync {
    fn transform(&self, input: &TransformInput<'_>) -> Result<Vec<Fragment>, TransformFnError>;
}

/// A loaded but not yet validated transformer.
#[derive(Clone, Default)]
pub struct TransformerModule {
    pub transform_dom: Option<Arc<dyn DomTransform>>,
    pub transform: Option<Arc<dyn FragmentTransform>>,
}

impl TransformerModule {
    pub fn with_dom(transform: impl DomTransform + 'static) -> Self {
        Self {
            transform_dom: Some(Arc::new(transform)),
            transform: None,
        }
    }

    pub fn with_fragments(transform: impl FragmentTransform + 'static) -> Self {
        Self {
            transform_dom: None,
            transform: Some(Arc::new(transform)),
        }
    }
}

/// Resolves a job's transformer reference to a module.
pub trait TransformerLoader: Send + Sync {
    fn load(&self, transformer_path: &str) -> Result<TransformerModule, TransformLoadError>;
}

#[derive(Clone)]
pub enum TransformContract {
    Dom {
        transform: Arc<dyn DomTransform>,
        output_path: String,
    },
    Fragments {
        transform: Arc<dyn FragmentTransform>,
        output_root: String,
    },
}

impl TransformContract {
    /// Destination for a produced document. The DOM variant ignores
    /// `relative_path` and always answers with the job's output path.
    pub fn generate_document_path(&self, relative_path: &str) -> String {
        match self {
            TransformContract::Dom { output_path, .. } => output_path.clone(),
            TransformContract::Fragments { output_root, .. } => {
                rebase_fragment_path(output_root, relative_path)
            }
        }
    }

    pub fn is_dom(&self) -> bool {
        matches!(self, TransformContract::Dom { .. })
    }
}

impl fmt::Debug for TransformContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformContract::Dom { output_path, .. } => f
                .debug_struct("Dom")
                .field("output_path", output_path)
                .finish_non_exhaustive(),
            TransformContract::Fragments { output_root, .. } => f
                .debug_struct("Fragments")
                .field("output_root", output_root)
                .finish_non_exhaustive(),
        }
    }
}

impl fmt::Debug for TransformerModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerModule")
            .field("transform_dom", &self.transform_dom.is_some())
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// Loads the job's transformer and checks it exposes exactly one capability.
pub fn load_transform(
    loader: &dyn TransformerLoader,
    transformer_path: &str,
    output_path: &str,
) -> Result<TransformContract, ImportError> {
    let module = loader.load(transformer_path)?;
    match (module.transform_dom, module.transform) {
        (Some(transform), None) => Ok(TransformContract::Dom {
            transform,
            output_path: output_path.to_string(),
        }),
        (None, Some(transform)) => Ok(TransformContract::Fragments {
            transform,
            output_root: output_path.to_string(),
        }),
        (None, None) => Err(ImportError::InvalidTransformer {
            path: transformer_path.to_string(),
            reason: "exposes neither transformDOM nor transform".to_string(),
        }),
        (Some(_), Some(_)) => Err(ImportError::InvalidTransformer {
            path: transformer_path.to_string(),
            reason: "exposes both transformDOM and transform".to_string(),
        }),
    }
}

/// Joins the last segment of `relative` onto `root`, adding a `/` only when
/// `root` does not already end in a separator.
pub fn rebase_fragment_path(root: &str, relative: &str) -> String {
    let file_name = relative
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(relative);
    if root.is_empty() {
        return file_name.to_string();
    }
    if root.ends_with(['/', '\\']) {
        format!("{root}{file_name}")
    } else {
        format!("{root}/{file_name}")
    }
}

#[cfg(test)]
mod tests {
    use super::rebase_fragment_path;

    #[test]
    fn keeps_only_final_segment() {
        assert_eq!(rebase_fragment_path("out/dir", "a/b/c.png"), "out/dir/c.png");
        assert_eq!(rebase_fragment_path("out/dir/", "a/b/c.png"), "out/dir/c.png");
        assert_eq!(rebase_fragment_path("out", "c.png"), "out/c.png");
    }

    #[test]
    fn backslash_separators_are_recognised() {
        assert_eq!(rebase_fragment_path("out\\", "a\\c.docx"), "out\\c.docx");
    }
}
