//! Declarative transformers read from JSON files.
//!
//! ```json
//! { "transformDOM": { "root": "article", "remove": ["nav", ".ads"] } }
//! { "transform": { "remove": ["script"],
//!                  "fragments": [{ "selector": "article", "path": "posts/post.docx" }] } }
//! ```
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ego_tree::NodeId;
use importer_logging::importer_debug;
use scraper::{Html, Selector};
use serde::Deserialize;

use crate::dom::{node_id, serialize_node};
use crate::error::{TransformFnError, TransformLoadError};
use crate::transformer::{
    DomTransform, Fragment, FragmentTransform, TransformInput, TransformerLoader,
    TransformerModule,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFile {
    #[serde(rename = "transformDOM")]
    transform_dom: Option<DomRules>,
    transform: Option<FragmentRules>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DomRules {
    #[serde(default)]
    root: Option<String>,
    #[serde(default)]
    remove: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FragmentRules {
    #[serde(default)]
    remove: Vec<String>,
    fragments: Vec<FragmentRule>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FragmentRule {
    selector: String,
    path: String,
}

/// Loads transformer rule files from disk.
///
/// Relative paths resolve against `base_dir` when set, otherwise against the
/// process working directory.
#[derive(Debug, Default, Clone)]
pub struct RuleFileLoader {
    base_dir: Option<PathBuf>,
}

impl RuleFileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve(&self, transformer_path: &str) -> PathBuf {
        let path = Path::new(transformer_path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl TransformerLoader for RuleFileLoader {
    fn load(&self, transformer_path: &str) -> Result<TransformerModule, TransformLoadError> {
        let path = self.resolve(transformer_path);
        let content = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                TransformLoadError::NotFound(path.clone())
            } else {
                TransformLoadError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        let rules: RuleFile =
            serde_json::from_str(&content).map_err(|source| TransformLoadError::Malformed {
                path: path.clone(),
                source,
            })?;
        importer_debug!("Loaded transformer rules from {:?}", path);

        let mut module = TransformerModule::default();
        if let Some(dom) = rules.transform_dom {
            module.transform_dom = Some(std::sync::Arc::new(RuleDomTransform {
                root: dom
                    .root
                    .as_deref()
                    .map(|s| compile(&path, s))
                    .transpose()?,
                remove: compile_all(&path, &dom.remove)?,
            }));
        }
        if let Some(fragments) = rules.transform {
            module.transform = Some(std::sync::Arc::new(RuleFragmentTransform {
                remove: compile_all(&path, &fragments.remove)?,
                fragments: fragments
                    .fragments
                    .iter()
                    .map(|rule| Ok((compile(&path, &rule.selector)?, rule.path.clone())))
                    .collect::<Result<_, TransformLoadError>>()?,
            }));
        }
        Ok(module)
    }
}

fn compile(path: &Path, selector: &str) -> Result<Selector, TransformLoadError> {
    Selector::parse(selector).map_err(|err| TransformLoadError::InvalidSelector {
        path: path.to_path_buf(),
        selector: selector.to_string(),
        message: err.to_string(),
    })
}

fn compile_all(path: &Path, selectors: &[String]) -> Result<Vec<Selector>, TransformLoadError> {
    selectors.iter().map(|s| compile(path, s)).collect()
}

fn removed_nodes(document: &Html, remove: &[Selector]) -> HashSet<NodeId> {
    remove
        .iter()
        .flat_map(|selector| document.select(selector))
        .map(node_id)
        .collect()
}

/// Keeps the `root` element (or the whole document) minus removed elements.
struct RuleDomTransform {
    root: Option<Selector>,
    remove: Vec<Selector>,
}

impl DomTransform for RuleDomTransform {
    fn transform_dom(&self, input: &TransformInput<'_>) -> Result<String, TransformFnError> {
        let skip = removed_nodes(input.document, &self.remove);
        let root = self
            .root
            .as_ref()
            .and_then(|selector| input.document.select(selector).next());
        let html = match root {
            Some(element) => {
                if skip.contains(&node_id(element)) {
                    return Err(TransformFnError::new(
                        "root element is matched by a remove selector",
                    ));
                }
                serialize_node(*element, &skip)
            }
            None => serialize_node(input.document.tree.root(), &skip),
        };
        Ok(html)
    }
}

/// Emits the first element matching each fragment rule.
struct RuleFragmentTransform {
    remove: Vec<Selector>,
    fragments: Vec<(Selector, String)>,
}

impl FragmentTransform for RuleFragmentTransform {
    fn transform(&self, input: &TransformInput<'_>) -> Result<Vec<Fragment>, TransformFnError> {
        let skip = removed_nodes(input.document, &self.remove);
        let fragments = self
            .fragments
            .iter()
            .filter_map(|(selector, path)| {
                let element = input
                    .document
                    .select(selector)
                    .find(|element| !skip.contains(&node_id(*element)))?;
                Some(Fragment {
                    html: serialize_node(*element, &skip),
                    path: path.clone(),
                })
            })
            .collect();
        Ok(fragments)
    }
}
