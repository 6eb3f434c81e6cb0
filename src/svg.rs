//! SVG content pipeline - optimization, color rewriting, storage placement.
//!
//! Turns raw vector markup into canonical stored form and decides where that
//! markup physically lives. The canonical form is what gets hashed; callers
//! never hash a `file://` reference, always the underlying markup bytes.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde_json::Value;
use tracing::debug;
use xmltree::{Element, EmitterConfig, XMLNode};

use crate::color::{self, ColorMap, RewriteOptions};
use crate::config::Config;
use crate::error::CoreError;
use crate::hashing;
use crate::lock::{Icon, FILE_PREFIX};

/// Canonical markup plus its digest, in the exact shape stored on
/// `Icon.svg`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSvg {
    pub content: String,
    pub hash: String,
}

/// Pluggable markup optimizer. The default honors a small set of project
/// rules from the config's `optimizer` object; a custom implementation can
/// shell out to heavier tooling.
pub trait SvgOptimizer: Send + Sync {
    fn optimize(&self, raw: &str, settings: &Value) -> Result<String, CoreError>;
}

/// Built-in optimizer: strips comments and processing instructions, drops
/// inter-element whitespace, removes configured attributes, re-serializes
/// compactly. Recognized settings: `removeComments` (default true),
/// `collapseWhitespace` (default true), `removeAttrs` (array of attribute
/// names).
pub struct DefaultOptimizer;

impl SvgOptimizer for DefaultOptimizer {
    fn optimize(&self, raw: &str, settings: &Value) -> Result<String, CoreError> {
        let remove_comments =
            settings.get("removeComments").and_then(Value::as_bool).unwrap_or(true);
        let collapse_whitespace =
            settings.get("collapseWhitespace").and_then(Value::as_bool).unwrap_or(true);
        let remove_attrs: Vec<String> = settings
            .get("removeAttrs")
            .and_then(Value::as_array)
            .map(|attrs| {
                attrs.iter().filter_map(Value::as_str).map(str::to_string).collect()
            })
            .unwrap_or_default();

        let mut doc = parse_svg(raw)?;
        scrub(&mut doc, remove_comments, collapse_whitespace, &remove_attrs);
        serialize_svg(&doc)
    }
}

fn scrub(el: &mut Element, remove_comments: bool, collapse_whitespace: bool, remove_attrs: &[String]) {
    for attr in remove_attrs {
        el.attributes.remove(attr);
    }

    el.children.retain(|child| match child {
        XMLNode::Comment(_) => !remove_comments,
        XMLNode::ProcessingInstruction(..) => false,
        XMLNode::Text(text) => !(collapse_whitespace && text.trim().is_empty()),
        _ => true,
    });

    for child in &mut el.children {
        if let XMLNode::Element(child_el) = child {
            scrub(child_el, remove_comments, collapse_whitespace, remove_attrs);
        }
    }
}

pub(crate) fn parse_svg(raw: &str) -> Result<Element, CoreError> {
    Element::parse(raw.as_bytes()).map_err(|e| CoreError::Svg(e.to_string()))
}

pub(crate) fn serialize_svg(doc: &Element) -> Result<String, CoreError> {
    let config = EmitterConfig::new()
        .write_document_declaration(false)
        .perform_indent(false)
        .normalize_empty_elements(true);

    let mut out = Vec::new();
    doc.write_with_config(&mut out, config).map_err(|e| CoreError::Svg(e.to_string()))?;
    String::from_utf8(out).map_err(|e| CoreError::Svg(e.to_string()))
}

pub struct SvgPipeline {
    root: PathBuf,
    optimizer: Box<dyn SvgOptimizer>,
}

impl SvgPipeline {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_optimizer(root, Box::new(DefaultOptimizer))
    }

    pub fn with_optimizer(root: impl Into<PathBuf>, optimizer: Box<dyn SvgOptimizer>) -> Self {
        Self { root: root.into(), optimizer }
    }

    /// Optimize raw markup with the project rules, then rewrite mapped
    /// colors across attributes, inline styles and embedded stylesheet
    /// text.
    pub fn optimize(
        &self,
        raw: &str,
        optimizer_settings: &Value,
        color_map: Option<&BTreeMap<String, String>>,
    ) -> Result<String, CoreError> {
        let optimized = self.optimizer.optimize(raw, optimizer_settings)?;

        let Some(pairs) = color_map else { return Ok(optimized) };
        let map = ColorMap::from_pairs(pairs.iter());
        if map.is_empty() {
            return Ok(optimized);
        }

        let mut doc = parse_svg(&optimized)?;
        color::rewrite_element(
            &mut doc,
            &map,
            &RewriteOptions { inline_style: true, style_element_text: true },
        );
        serialize_svg(&doc)
    }

    /// Place canonical markup according to the storage mode and return
    /// exactly what gets stored on `Icon.svg`.
    pub fn store(
        &self,
        config: &Config,
        icon_key: &str,
        canonical: &str,
    ) -> Result<StoredSvg, CoreError> {
        let hash = hashing::content_hash(canonical);

        if config.svg_storage.in_lock {
            return Ok(StoredSvg { content: canonical.to_string(), hash });
        }

        let folder = config.svg_storage.folder.as_deref().ok_or_else(|| {
            CoreError::Validation(
                "an svg folder must be provided when svg-in-lock is disabled".to_string(),
            )
        })?;

        let relative = format!("{}/{}.svg", folder.trim_end_matches('/'), icon_key);
        let full = self.root.join(&relative);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, canonical)?;
        debug!(path = %full.display(), "stored svg file");

        Ok(StoredSvg { content: format!("{}{}", FILE_PREFIX, relative), hash })
    }

    /// Resolve an icon's markup, following a `file://` reference relative to
    /// the project root. Fails with `FileMissing` when the referenced file
    /// does not exist.
    pub fn read(&self, icon: &Icon) -> Result<String, CoreError> {
        match icon.svg.file_path() {
            None => Ok(icon.svg.content.clone()),
            Some(relative) => {
                let full = self.root.join(relative);
                if !full.exists() {
                    return Err(CoreError::FileMissing(full));
                }
                Ok(fs::read_to_string(full)?)
            }
        }
    }

    /// Like [`SvgPipeline::read`], but absorbing a missing file into `None`
    /// for callers that only want to display what is available.
    pub fn try_read(&self, icon: &Icon) -> Result<Option<String>, CoreError> {
        match self.read(icon) {
            Ok(content) => Ok(Some(content)),
            Err(CoreError::FileMissing(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
