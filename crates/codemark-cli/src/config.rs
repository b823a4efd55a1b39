//! KDL configuration file for the highlighting pass.
//!
//! ```kdl
//! marker-group "hljs"
//! code-block-element "codeBlock"
//! line-break-elements "softBreak" "hardBreak"
//! enable-label "highlightCodeBlock"
//! debug-label "debug"
//! fallback-language "c"
//! ```
//!
//! Every node is optional; missing ones keep their defaults.

use std::path::Path;

use codemark_core::{HighlightConfig, SmolStr};
use kdl::{KdlDocument, KdlNode};
use miette::{IntoDiagnostic, Result, WrapErr};

pub fn load_config(path: &Path) -> Result<HighlightConfig> {
    let content = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<HighlightConfig> {
    let doc = content
        .parse::<KdlDocument>()
        .into_diagnostic()
        .wrap_err("parsing config")?;
    let mut config = HighlightConfig::default();

    if let Some(group) = string_arg(&doc, "marker-group")? {
        if group.contains(':') {
            miette::bail!("marker-group must not contain ':', got {group:?}");
        }
        config.marker_group = group;
    }
    if let Some(element) = string_arg(&doc, "code-block-element")? {
        config.code_block_element = element;
    }
    if let Some(node) = doc.get("line-break-elements") {
        config.line_break_elements = string_args(node)?;
    }
    if let Some(label) = string_arg(&doc, "enable-label")? {
        config.enable_label = label;
    }
    if let Some(label) = string_arg(&doc, "debug-label")? {
        config.debug_label = label;
    }
    if let Some(language) = string_arg(&doc, "fallback-language")? {
        config.fallback_language = Some(language);
    }

    tracing::debug!(target: "codemark::cli", ?config, "loaded config");
    Ok(config)
}

/// First argument of node `name`, which must be a string.
fn string_arg(doc: &KdlDocument, name: &str) -> Result<Option<SmolStr>> {
    let Some(node) = doc.get(name) else {
        return Ok(None);
    };
    let value = node
        .entries()
        .first()
        .ok_or_else(|| miette::miette!("`{name}` needs a value"))?
        .value();
    value
        .as_string()
        .map(|s| Some(SmolStr::new(s)))
        .ok_or_else(|| miette::miette!("`{name}` must be a string, got {value}"))
}

fn string_args(node: &KdlNode) -> Result<Vec<SmolStr>> {
    node.entries()
        .iter()
        .map(|entry| {
            entry.value().as_string().map(SmolStr::new).ok_or_else(|| {
                miette::miette!(
                    "`{}` takes strings, got {}",
                    node.name().value(),
                    entry.value()
                )
            })
        })
        .collect()
}
