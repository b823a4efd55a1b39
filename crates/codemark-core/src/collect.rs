//! Code block text collection.
//!
//! The highlighter needs one flat string, the document stores text nodes and
//! line-break elements. Each piece of text is kept as a [`TextRun`] so the
//! re-aligner can map string positions back to offsets in the block.

use crate::config::HighlightConfig;
use crate::document::{Element, Node};

/// What a code block child means to the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeChild<'a> {
    Text(&'a str),
    LineBreak,
    Unrecognized(&'a Node),
}

impl<'a> CodeChild<'a> {
    pub fn classify(node: &'a Node, config: &HighlightConfig) -> Self {
        match node {
            Node::Text { data } => CodeChild::Text(data.as_str()),
            Node::Element(el) if config.is_line_break(&el.name) => CodeChild::LineBreak,
            Node::Element(_) => CodeChild::Unrecognized(node),
        }
    }
}

/// Text contributed by one child of a code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun<'a> {
    /// Index of the child in the code block.
    pub child_index: usize,
    /// Offset the child starts at inside the code block.
    pub start_offset: usize,
    pub text: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedBlock<'a> {
    /// Concatenated text, fed to the highlighter.
    pub text: String,
    pub runs: Vec<TextRun<'a>>,
}

pub fn collect_code_block<'a>(element: &'a Element, config: &HighlightConfig) -> CollectedBlock<'a> {
    let mut collected = CollectedBlock::default();

    for (child_index, (start_offset, child)) in element.children_with_offsets().enumerate() {
        let text = match CodeChild::classify(child, config) {
            CodeChild::Text(data) => data,
            CodeChild::LineBreak => "\n",
            CodeChild::Unrecognized(node) => {
                let name = node.as_element().map(|el| el.name.as_str()).unwrap_or("?");
                tracing::warn!(
                    target: "codemark::collect",
                    child_index,
                    start_offset,
                    element = name,
                    "unknown code block child, skipping"
                );
                continue;
            }
        };
        collected.text.push_str(text);
        collected.runs.push(TextRun {
            child_index,
            start_offset,
            text,
        });
    }

    collected
}

/// Top-level code blocks of `root`, with their child index.
pub fn code_blocks<'a>(
    root: &'a Element,
    config: &'a HighlightConfig,
) -> impl Iterator<Item = (usize, &'a Element)> + 'a {
    root.children
        .iter()
        .enumerate()
        .filter_map(|(index, child)| child.as_element().map(|el| (index, el)))
        .filter(|(_, el)| config.is_code_block(&el.name))
}
