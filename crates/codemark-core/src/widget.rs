//! Code block highlighting driven by the host's note lifecycle.
//!
//! The host owns the editor and calls in on two occasions: when the widget
//! is refreshed for a document, and when entities are reloaded. A pass walks
//! every top-level code block, highlights it, realigns the markup and
//! replaces the whole marker group in a single change.

use std::collections::BTreeSet;

use smol_str::SmolStr;

use crate::apply::{PlannedMarker, apply_markers, plan_markers};
use crate::collect::{code_blocks, collect_code_block};
use crate::config::HighlightConfig;
use crate::document::Document;
use crate::editor::Editor;
use crate::error::{CodemarkError, Result};
use crate::highlight::Highlighter;
use crate::realign::realign;
use crate::view::highlight_view;

/// Ids of documents whose content was reloaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadResults {
    content_reloaded: BTreeSet<SmolStr>,
}

impl LoadResults {
    pub fn content_reloaded(ids: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        Self {
            content_reloaded: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_content_reloaded(&self, id: &str) -> bool {
        self.content_reloaded.contains(id)
    }
}

/// Outcome of one highlighting pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub code_blocks: usize,
    pub markers_added: usize,
    pub markers_removed: usize,
}

/// Markers computed for a document, not yet applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerPlan {
    pub code_blocks: usize,
    pub markers: Vec<PlannedMarker>,
}

pub struct CodeBlockHighlighter<H> {
    highlighter: H,
    config: HighlightConfig,
    debug: bool,
}

impl<H: Highlighter> CodeBlockHighlighter<H> {
    /// Build the widget. The debug flag is read once, here, from the
    /// startup document's labels.
    pub fn new(highlighter: H, config: HighlightConfig, startup: &Document) -> Self {
        let debug_enabled = startup.has_label(&config.debug_label);
        tracing::info!(target: "codemark::widget", debug_output = debug_enabled, "starting");
        Self {
            highlighter,
            config,
            debug: debug_enabled,
        }
    }

    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Highlighting runs on text documents carrying the enabling label.
    pub fn is_enabled(&self, document: &Document) -> bool {
        document.content_type == "text" && document.has_label(&self.config.enable_label)
    }

    /// Register the marker view and re-highlight every code block.
    pub fn refresh(&self, editor: &mut Editor) -> Result<PassReport> {
        if self.debug {
            tracing::debug!(target: "codemark::widget", document = %editor.model.id, "refresh");
        }
        editor
            .conversion
            .marker_to_highlight(self.config.marker_group.clone(), highlight_view);

        let plan = self.plan(&editor.model)?;
        let removed = apply_markers(&mut editor.model, &self.config.marker_group, &plan.markers)?;

        let report = PassReport {
            code_blocks: plan.code_blocks,
            markers_added: plan.markers.len(),
            markers_removed: removed,
        };
        tracing::debug!(target: "codemark::widget", ?report, "highlighting pass done");
        Ok(report)
    }

    /// Re-highlight `editor` if its document is one of the reloaded ones and
    /// highlighting is enabled for it. Returns `None` when skipped.
    pub fn entities_reloaded(
        &self,
        results: &LoadResults,
        editor: &mut Editor,
    ) -> Result<Option<PassReport>> {
        if !results.is_content_reloaded(&editor.model.id) {
            return Ok(None);
        }
        if !self.is_enabled(&editor.model) {
            if self.debug {
                tracing::debug!(target: "codemark::widget", document = %editor.model.id, "highlighting not enabled");
            }
            return Ok(None);
        }
        self.refresh(editor).map(Some)
    }

    /// Compute the markers for every top-level code block without touching
    /// the document. Sequence numbers are unique across the whole pass.
    pub fn plan(&self, document: &Document) -> Result<MarkerPlan> {
        let mut plan = MarkerPlan::default();
        let mut next_sequence = 0;

        for (index, block) in code_blocks(&document.root, &self.config) {
            plan.code_blocks += 1;
            let collected = collect_code_block(block, &self.config);
            let highlighted = self.highlighter.highlight(&collected.text)?;
            if self.debug {
                tracing::debug!(
                    target: "codemark::widget",
                    block = index,
                    language = highlighted.language.as_deref(),
                    text = %collected.text.escape_debug(),
                    html = %highlighted.html.escape_debug(),
                    "highlighted code block"
                );
            }

            let spans = realign(&highlighted.html, &collected.runs).map_err(|source| {
                tracing::error!(target: "codemark::widget", block = index, error = %source, "realignment failed");
                CodemarkError::Realign {
                    block: index,
                    source,
                }
            })?;

            let (markers, next) =
                plan_markers(index, spans, &self.config.marker_group, next_sequence);
            next_sequence = next;
            if self.debug {
                for marker in &markers {
                    tracing::debug!(
                        target: "codemark::widget",
                        marker = %marker.name,
                        start = marker.start,
                        end = marker.end,
                        "planned marker"
                    );
                }
            }
            plan.markers.extend(markers);
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Element, Node};
    use crate::error::HighlightError;
    use crate::highlight::Highlighted;

    /// Wraps the whole text in one span.
    struct WholeText;

    impl Highlighter for WholeText {
        fn highlight(&self, text: &str) -> std::result::Result<Highlighted, HighlightError> {
            let mut html = String::from("<span class=\"hljs-code\">");
            crate::view::escape_html(&mut html, text);
            html.push_str("</span>");
            Ok(Highlighted {
                html,
                language: None,
            })
        }
    }

    fn editor(labels: &[&str]) -> Editor {
        let root = Element::new("$root")
            .with_child(Node::Element(Element::from_plain_text("codeBlock", "softBreak", "a<b")))
            .with_child(Node::Element(Element::new("paragraph")))
            .with_child(Node::Element(Element::from_plain_text("codeBlock", "softBreak", "x\ny")));
        let mut doc = Document::new("note-1", root);
        for label in labels {
            doc = doc.with_label(*label, "");
        }
        Editor::new(doc)
    }

    #[test]
    fn test_debug_flag_read_from_startup_document() {
        let startup = Document::new("root", Element::new("$root")).with_label("debug", "");
        let widget = CodeBlockHighlighter::new(WholeText, HighlightConfig::default(), &startup);
        assert!(widget.debug());
        assert_eq!(widget.config(), &HighlightConfig::default());

        let startup = Document::new("root", Element::new("$root"));
        let widget = CodeBlockHighlighter::new(WholeText, HighlightConfig::default(), &startup);
        assert!(!widget.debug());
    }

    #[test]
    fn test_enabled_needs_text_note_and_label() {
        let widget = CodeBlockHighlighter::new(WholeText, HighlightConfig::default(), &editor(&[]).model);
        assert!(widget.is_enabled(&editor(&["highlightCodeBlock"]).model));
        assert!(!widget.is_enabled(&editor(&[]).model));
        let code_note = editor(&["highlightCodeBlock"]).model.with_content_type("code");
        assert!(!widget.is_enabled(&code_note));
    }

    #[test]
    fn test_plan_numbers_across_blocks() {
        let editor = editor(&["highlightCodeBlock"]);
        let widget = CodeBlockHighlighter::new(WholeText, HighlightConfig::default(), &editor.model);
        let plan = widget.plan(&editor.model).unwrap();

        assert_eq!(plan.code_blocks, 2);
        let markers: Vec<_> = plan
            .markers
            .iter()
            .map(|m| (m.name.to_string(), m.block, m.start, m.end))
            .collect();
        assert_eq!(
            markers,
            vec![
                ("hljs:hljs-code:0".to_string(), 0, 0, 3),
                ("hljs:hljs-code:1".to_string(), 2, 0, 3),
            ]
        );
    }

    #[test]
    fn test_reload_of_other_document_is_ignored() {
        let mut editor = editor(&["highlightCodeBlock"]);
        let widget = CodeBlockHighlighter::new(WholeText, HighlightConfig::default(), &editor.model);

        let report = widget
            .entities_reloaded(&LoadResults::content_reloaded(["note-2"]), &mut editor)
            .unwrap();
        assert_eq!(report, None);
        assert!(editor.model.markers().is_empty());
        assert!(editor.conversion.is_empty());
    }

    #[test]
    fn test_reload_of_disabled_document_is_ignored() {
        let mut editor = editor(&[]);
        let widget = CodeBlockHighlighter::new(WholeText, HighlightConfig::default(), &editor.model);

        let report = widget
            .entities_reloaded(&LoadResults::content_reloaded(["note-1"]), &mut editor)
            .unwrap();
        assert_eq!(report, None);
    }

    #[test]
    fn test_reload_runs_pass() {
        let mut editor = editor(&["highlightCodeBlock"]);
        let widget = CodeBlockHighlighter::new(WholeText, HighlightConfig::default(), &editor.model);

        let report = widget
            .entities_reloaded(&LoadResults::content_reloaded(["note-1"]), &mut editor)
            .unwrap();
        assert_eq!(
            report,
            Some(PassReport {
                code_blocks: 2,
                markers_added: 2,
                markers_removed: 0,
            })
        );
        assert_eq!(editor.model.markers().len(), 2);
        assert_eq!(editor.conversion.len(), 1);
    }
}
