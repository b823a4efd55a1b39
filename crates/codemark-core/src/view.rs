//! Model-to-view mapping for markers.
//!
//! A [`ConversionRegistry`] maps a marker group to a converter producing the
//! inline element a marked range is wrapped in. [`render_code_block`] is a
//! small downcast of one code block and its markers to HTML.

use std::collections::HashMap;
use std::fmt;

use smol_str::{SmolStr, ToSmolStr};

use crate::document::{Element, Node};
use crate::error::ModelError;
use crate::markers::{Marker, MarkerCollection, MarkerName};

/// Attribute carrying the marker sequence number. Every marker gets a
/// distinct value so the view never merges two adjacent highlights, which
/// also keeps marker removal reliable.
pub const SYNTAX_RESULT_ATTR: &str = "data-syntax-result";

/// Inline element a marked range is rendered as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewElement {
    pub name: SmolStr,
    pub classes: Vec<SmolStr>,
    pub attributes: Vec<(SmolStr, SmolStr)>,
}

impl ViewElement {
    fn write_open(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        if !self.classes.is_empty() {
            out.push_str(" class=\"");
            for (i, class) in self.classes.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                escape_html(out, class);
            }
            out.push('"');
        }
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            escape_html(out, value);
            out.push('"');
        }
        out.push('>');
    }

    fn write_close(&self, out: &mut String) {
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// The view for highlighting markers: `<span class="{class}" data-syntax-result="{sequence}">`.
pub fn highlight_view(name: &MarkerName) -> ViewElement {
    ViewElement {
        name: SmolStr::new_static("span"),
        classes: vec![name.class.clone()],
        attributes: vec![(
            SmolStr::new_static(SYNTAX_RESULT_ATTR),
            name.sequence.to_smolstr(),
        )],
    }
}

pub type MarkerConverter = Box<dyn Fn(&MarkerName) -> ViewElement>;

/// Marker-to-view converters, one per marker group.
#[derive(Default)]
pub struct ConversionRegistry {
    converters: HashMap<SmolStr, MarkerConverter>,
}

impl fmt::Debug for ConversionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut groups: Vec<_> = self.converters.keys().collect();
        groups.sort();
        f.debug_struct("ConversionRegistry")
            .field("groups", &groups)
            .finish()
    }
}

impl ConversionRegistry {
    /// Register the converter for `group`, replacing any earlier one.
    /// Returns true if one was replaced.
    pub fn marker_to_highlight(
        &mut self,
        group: impl Into<SmolStr>,
        converter: impl Fn(&MarkerName) -> ViewElement + 'static,
    ) -> bool {
        self.converters
            .insert(group.into(), Box::new(converter))
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// View for the marker called `marker_name`, or `None` if its group has
    /// no converter.
    pub fn convert(&self, marker_name: &str) -> Result<Option<ViewElement>, ModelError> {
        let name: MarkerName = marker_name.parse()?;
        Ok(self.converters.get(&name.group).map(|convert| convert(&name)))
    }
}

/// Escape the five characters the highlighters escape.
pub fn escape_html(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Boundary {
    Close,
    Open,
}

/// Render code block `index` of the root as `<pre><code>` HTML, wrapping
/// every marked range in its view element.
///
/// Markers are expected to nest, as highlighter spans do; collapsed markers
/// and markers whose group has no converter are left out. Line breaks
/// (per `is_line_break`) render as `<br>`, other elements are dropped.
pub fn render_code_block(
    block: &Element,
    index: usize,
    markers: &MarkerCollection,
    registry: &ConversionRegistry,
    is_line_break: impl Fn(&str) -> bool,
) -> Result<String, ModelError> {
    let mut views: Vec<(&Marker, ViewElement)> = Vec::new();
    for marker in markers.iter() {
        if marker.range.parent() != [index].as_slice() || marker.range.is_collapsed() {
            continue;
        }
        if let Some(view) = registry.convert(&marker.name)? {
            views.push((marker, view));
        }
    }
    // Outer ranges first, so opening order nests.
    views.sort_by(|(a, _), (b, _)| {
        a.range
            .start
            .offset
            .cmp(&b.range.start.offset)
            .then(b.range.end.offset.cmp(&a.range.end.offset))
            .then(a.name.cmp(&b.name))
    });

    // (offset, closes before opens, rank) with inner ranges closing first.
    let mut boundaries: Vec<(usize, Boundary, isize, usize)> = Vec::with_capacity(views.len() * 2);
    for (rank, (marker, _)) in views.iter().enumerate() {
        boundaries.push((marker.range.start.offset, Boundary::Open, rank as isize, rank));
        boundaries.push((marker.range.end.offset, Boundary::Close, -(rank as isize), rank));
    }
    boundaries.sort();

    let mut out = String::new();
    match block.attribute("language") {
        Some(language) => {
            out.push_str("<pre><code class=\"language-");
            escape_html(&mut out, language);
            out.push_str("\">");
        }
        None => out.push_str("<pre><code>"),
    }

    let mut next = 0;
    let mut emit_until = |offset: usize, out: &mut String| {
        while let Some(&(at, kind, _, rank)) = boundaries.get(next) {
            if at > offset {
                break;
            }
            let view = &views[rank].1;
            match kind {
                Boundary::Open => view.write_open(out),
                Boundary::Close => view.write_close(out),
            }
            next += 1;
        }
    };

    for (start, child) in block.children_with_offsets() {
        match child {
            Node::Text { data } => {
                for (i, c) in data.chars().enumerate() {
                    emit_until(start + i, &mut out);
                    let mut buf = [0u8; 4];
                    escape_html(&mut out, c.encode_utf8(&mut buf));
                }
            }
            Node::Element(el) => {
                emit_until(start, &mut out);
                if is_line_break(&el.name) {
                    out.push_str("<br>");
                }
            }
        }
    }
    emit_until(usize::MAX, &mut out);

    out.push_str("</code></pre>");
    Ok(out)
}
