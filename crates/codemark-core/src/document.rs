//! Structured document model.
//!
//! A small stand-in for the host editor's model: a tree of elements and text
//! nodes, positions addressed by a path of child indices plus an offset, and a
//! set of transient markers that is only ever mutated inside [`Document::change`].
//!
//! Offsets follow the host's rules: a text node occupies one offset per char
//! (Unicode scalar value), an element occupies exactly one offset in its parent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::ModelError;
use crate::markers::{Marker, MarkerCollection};

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    Text { data: String },
    Element(Element),
}

impl Node {
    pub fn text(data: impl Into<String>) -> Self {
        Node::Text { data: data.into() }
    }

    pub fn element(name: impl Into<SmolStr>) -> Self {
        Node::Element(Element::new(name))
    }

    /// Number of offsets this node occupies in its parent.
    pub fn offset_size(&self) -> usize {
        match self {
            Node::Text { data } => data.chars().count(),
            Node::Element(_) => 1,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text { .. } => None,
        }
    }
}

/// An element with a name, string attributes and ordered children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub name: SmolStr,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<SmolStr, SmolStr>,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Build an element from plain text, turning each `\n` into a
    /// `line_break` child element, the way the host stores pasted code.
    pub fn from_plain_text(
        name: impl Into<SmolStr>,
        line_break: impl Into<SmolStr>,
        text: &str,
    ) -> Self {
        let line_break = line_break.into();
        let mut element = Element::new(name);
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                element
                    .children
                    .push(Node::Element(Element::new(line_break.clone())));
            }
            if !line.is_empty() {
                element.children.push(Node::text(line));
            }
        }
        element
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|v| v.as_str())
    }

    /// Total number of offsets inside this element.
    pub fn max_offset(&self) -> usize {
        self.children.iter().map(Node::offset_size).sum()
    }

    /// Children paired with the offset each one starts at.
    pub fn children_with_offsets(&self) -> impl Iterator<Item = (usize, &Node)> {
        self.children.iter().scan(0, |offset, child| {
            let start = *offset;
            *offset += child.offset_size();
            Some((start, child))
        })
    }

    /// Descend through child indices; the empty path is `self`.
    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        path.iter().try_fold(self, |el, &index| {
            el.children.get(index).and_then(Node::as_element)
        })
    }

    /// Text between two offsets, with line-break elements read as `\n` and
    /// any other element skipped.
    pub fn text_between(&self, start: usize, end: usize, is_line_break: impl Fn(&str) -> bool) -> String {
        let mut out = String::new();
        for (child_start, child) in self.children_with_offsets() {
            let child_end = child_start + child.offset_size();
            if child_end <= start || child_start >= end {
                continue;
            }
            match child {
                Node::Text { data } => {
                    let skip = start.saturating_sub(child_start);
                    let take = end.min(child_end) - child_start.max(start);
                    out.extend(data.chars().skip(skip).take(take));
                }
                Node::Element(el) if is_line_break(&el.name) => out.push('\n'),
                Node::Element(_) => {}
            }
        }
        out
    }
}

/// A position inside the element at `path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub path: Vec<usize>,
    pub offset: usize,
}

/// A `[start, end)` range whose ends share a parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRange {
    pub start: Position,
    pub end: Position,
}

impl ModelRange {
    pub fn parent(&self) -> &[usize] {
        &self.start.path
    }

    pub fn is_collapsed(&self) -> bool {
        self.start.offset == self.end.offset
    }

    pub fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }
}

/// A document: identity, labels, content tree and transient markers.
///
/// Markers are never serialized: they are decorations recomputed by the
/// highlighting pass, not content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: SmolStr,
    #[serde(default = "default_content_type")]
    pub content_type: SmolStr,
    #[serde(default)]
    pub labels: BTreeMap<SmolStr, SmolStr>,
    pub root: Element,
    #[serde(skip)]
    markers: MarkerCollection,
}

fn default_content_type() -> SmolStr {
    SmolStr::new_static("text")
}

impl Document {
    pub fn new(id: impl Into<SmolStr>, root: Element) -> Self {
        Self {
            id: id.into(),
            content_type: default_content_type(),
            labels: BTreeMap::new(),
            root,
            markers: MarkerCollection::default(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<SmolStr>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_label(mut self, name: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.contains_key(name)
    }

    pub fn markers(&self) -> &MarkerCollection {
        &self.markers
    }

    /// Run `f` against a staged copy of the marker set and commit it only if
    /// `f` succeeds. On error the document is left as it was.
    pub fn change<T, E>(
        &mut self,
        f: impl FnOnce(&mut Writer<'_>) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut writer = Writer {
            root: &self.root,
            markers: self.markers.clone(),
        };
        let out = f(&mut writer)?;
        let staged = writer.markers;
        self.markers = staged;
        Ok(out)
    }

    /// Text covered by `range`, or `None` if its parent is gone.
    pub fn range_text(&self, range: &ModelRange, is_line_break: impl Fn(&str) -> bool) -> Option<String> {
        let parent = self.root.element_at(range.parent())?;
        Some(parent.text_between(range.start.offset, range.end.offset, is_line_break))
    }
}

/// Mutation handle passed to [`Document::change`].
pub struct Writer<'a> {
    root: &'a Element,
    markers: MarkerCollection,
}

impl<'a> Writer<'a> {
    pub fn markers(&self) -> &MarkerCollection {
        &self.markers
    }

    pub fn create_position_at(&self, path: &[usize], offset: usize) -> Result<Position, ModelError> {
        let parent = self
            .root
            .element_at(path)
            .ok_or_else(|| ModelError::NoElement {
                path: path.to_vec(),
            })?;
        let size = parent.max_offset();
        if offset > size {
            return Err(ModelError::OffsetOutOfBounds {
                path: path.to_vec(),
                offset,
                size,
            });
        }
        Ok(Position {
            path: path.to_vec(),
            offset,
        })
    }

    pub fn create_range(&self, start: Position, end: Position) -> Result<ModelRange, ModelError> {
        if start.path != end.path {
            return Err(ModelError::CrossParentRange {
                start: start.path,
                end: end.path,
            });
        }
        if start.offset > end.offset {
            return Err(ModelError::InvertedRange {
                start: start.offset,
                end: end.offset,
            });
        }
        Ok(ModelRange { start, end })
    }

    pub fn add_marker(&mut self, name: impl Into<SmolStr>, range: ModelRange) -> Result<(), ModelError> {
        self.markers.insert(Marker {
            name: name.into(),
            range,
        })
    }

    pub fn remove_marker(&mut self, name: &str) -> Result<Marker, ModelError> {
        self.markers
            .remove(name)
            .ok_or_else(|| ModelError::NoSuchMarker(SmolStr::new(name)))
    }
}
