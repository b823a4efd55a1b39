//! Highlighting configuration.
//!
//! Everything here has a default that matches the host's document schema, so
//! most callers only ever use `HighlightConfig::default()`.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Marker group shared by every highlighting marker.
pub const DEFAULT_MARKER_GROUP: &str = "hljs";
/// Element name of a code block in the document model.
pub const CODE_BLOCK_ELEMENT: &str = "codeBlock";
/// Element name of a line break inside a code block.
pub const SOFT_BREAK_ELEMENT: &str = "softBreak";
/// Label that turns highlighting on for a document.
pub const ENABLE_LABEL: &str = "highlightCodeBlock";
/// Label on the startup document that turns on debug output.
pub const DEBUG_LABEL: &str = "debug";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HighlightConfig {
    /// Prefix of every marker name; markers are `group:class:sequence`.
    pub marker_group: SmolStr,
    /// Element name that identifies code blocks among the root's children.
    pub code_block_element: SmolStr,
    /// Element names inside a code block that stand for `\n`.
    pub line_break_elements: Vec<SmolStr>,
    /// Document label that enables highlighting.
    pub enable_label: SmolStr,
    /// Startup document label that enables debug output.
    pub debug_label: SmolStr,
    /// Language token used when the highlighter cannot detect one.
    pub fallback_language: Option<SmolStr>,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            marker_group: SmolStr::new_static(DEFAULT_MARKER_GROUP),
            code_block_element: SmolStr::new_static(CODE_BLOCK_ELEMENT),
            line_break_elements: vec![SmolStr::new_static(SOFT_BREAK_ELEMENT)],
            enable_label: SmolStr::new_static(ENABLE_LABEL),
            debug_label: SmolStr::new_static(DEBUG_LABEL),
            fallback_language: None,
        }
    }
}

impl HighlightConfig {
    pub fn is_code_block(&self, name: &str) -> bool {
        self.code_block_element == name
    }

    pub fn is_line_break(&self, name: &str) -> bool {
        self.line_break_elements.iter().any(|el| el == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_host_schema() {
        let config = HighlightConfig::default();
        assert!(config.is_code_block("codeBlock"));
        assert!(config.is_line_break("softBreak"));
        assert!(!config.is_line_break("paragraph"));
        assert_eq!(config.marker_group, "hljs");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: HighlightConfig =
            serde_json::from_str(r#"{"marker-group": "syntax", "line-break-elements": ["br"]}"#)
                .unwrap();
        assert_eq!(config.marker_group, "syntax");
        assert!(config.is_line_break("br"));
        assert!(!config.is_line_break("softBreak"));
        assert_eq!(config.enable_label, ENABLE_LABEL);
    }
}
