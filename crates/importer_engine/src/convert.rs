use std::sync::Arc;

use serde_json::{Map, Value};

use crate::docx::build_docx;
use crate::dom::DocumentFactory;
use crate::error::{ConversionError, TransformFnError};
use crate::transformer::{Fragment, TransformContract, TransformInput};
use crate::ImportResult;

pub trait MarkdownRenderer: Send + Sync {
    fn to_markdown(&self, html: &str) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Html2MdRenderer;

impl MarkdownRenderer for Html2MdRenderer {
    fn to_markdown(&self, html: &str) -> String {
        html2md::parse_html(html)
    }
}

/// HTML-to-document conversion routine.
///
/// Runs the job's transform contract over the page and returns one result per
/// produced document. Implementations must not touch the filesystem.
pub trait DocumentConverter: Send + Sync {
    fn convert(
        &self,
        url: &str,
        html: &str,
        contract: &TransformContract,
        documents: &dyn DocumentFactory,
    ) -> Result<Vec<ImportResult>, ConversionError>;
}

/// Bundled converter: applies the transform, then renders docx and markdown.
#[derive(Clone)]
pub struct Html2DocxConverter {
    markdown: Arc<dyn MarkdownRenderer>,
}

impl Html2DocxConverter {
    pub fn new() -> Self {
        Self::with_markdown(Arc::new(Html2MdRenderer))
    }

    pub fn with_markdown(markdown: Arc<dyn MarkdownRenderer>) -> Self {
        Self { markdown }
    }

    fn render(
        &self,
        html: String,
        path: String,
        documents: &dyn DocumentFactory,
    ) -> Result<ImportResult, ConversionError> {
        let document = documents.create_document_from_string(&html);
        let docx = build_docx(&document)?;
        let md = self.markdown.to_markdown(&html);
        Ok(ImportResult {
            docx,
            html,
            md,
            path,
        })
    }
}

impl Default for Html2DocxConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConverter for Html2DocxConverter {
    fn convert(
        &self,
        url: &str,
        html: &str,
        contract: &TransformContract,
        documents: &dyn DocumentFactory,
    ) -> Result<Vec<ImportResult>, ConversionError> {
        let document = documents.create_document_from_string(html);
        let params = transform_params(url);
        let input = TransformInput {
            url,
            document: &document,
            html,
            params: &params,
        };
        let wrap = |source: TransformFnError| ConversionError::Transform {
            url: url.to_string(),
            source,
        };

        match contract {
            TransformContract::Dom { transform, .. } => {
                let transformed = transform.transform_dom(&input).map_err(wrap)?;
                let path = contract.generate_document_path("");
                Ok(vec![self.render(transformed, path, documents)?])
            }
            TransformContract::Fragments { transform, .. } => {
                let fragments = transform.transform(&input).map_err(wrap)?;
                if fragments.is_empty() {
                    return Err(ConversionError::NoDocuments {
                        url: url.to_string(),
                    });
                }
                fragments
                    .into_iter()
                    .map(|Fragment { html, path }| {
                        if !has_file_name(&path) {
                            return Err(ConversionError::FragmentWithoutFileName {
                                url: url.to_string(),
                                path,
                            });
                        }
                        let path = contract.generate_document_path(&path);
                        self.render(html, path, documents)
                    })
                    .collect()
            }
        }
    }
}

fn has_file_name(path: &str) -> bool {
    path.rsplit(['/', '\\'])
        .next()
        .is_some_and(|segment| !segment.trim().is_empty())
}

fn transform_params(url: &str) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("originalURL".to_string(), Value::String(url.to_string()));
    params
}
