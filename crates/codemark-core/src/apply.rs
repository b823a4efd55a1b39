//! Marker planning and application.
//!
//! Planning turns realigned spans into named markers; applying replaces the
//! whole marker group in one [`Document::change`]. Deletion always precedes
//! creation, so a name from the previous pass can be reused.

use serde::Serialize;

use crate::document::Document;
use crate::error::ModelError;
use crate::markers::MarkerName;
use crate::realign::SpanRange;

/// A marker to be created by [`apply_markers`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedMarker {
    pub name: MarkerName,
    /// Index of the code block among the root's children.
    pub block: usize,
    pub start: usize,
    pub end: usize,
}

/// Name `spans` of code block `block`, numbering from `next_sequence`.
///
/// Returns the planned markers and the next free sequence number. Threading
/// the counter through every block of a pass keeps names unique across the
/// whole marker group.
pub fn plan_markers(
    block: usize,
    spans: Vec<SpanRange>,
    group: &str,
    next_sequence: u64,
) -> (Vec<PlannedMarker>, u64) {
    let mut sequence = next_sequence;
    let planned = spans
        .into_iter()
        .map(|span| {
            let name = MarkerName::new(group, span.class, sequence);
            sequence += 1;
            PlannedMarker {
                name,
                block,
                start: span.start,
                end: span.end,
            }
        })
        .collect();
    (planned, sequence)
}

/// Replace every marker of `group` with `planned`, atomically.
///
/// Returns how many old markers were removed. On error nothing changes.
pub fn apply_markers(
    document: &mut Document,
    group: &str,
    planned: &[PlannedMarker],
) -> Result<usize, ModelError> {
    document.change(|writer| {
        let stale: Vec<_> = writer.markers().group(group).map(|m| m.name.clone()).collect();
        for name in &stale {
            tracing::trace!(target: "codemark::apply", marker = %name, "removing marker");
            writer.remove_marker(name)?;
        }

        for marker in planned {
            let path = [marker.block];
            let start = writer.create_position_at(&path, marker.start)?;
            let end = writer.create_position_at(&path, marker.end)?;
            let range = writer.create_range(start, end)?;
            tracing::trace!(
                target: "codemark::apply",
                marker = %marker.name,
                block = marker.block,
                start = marker.start,
                end = marker.end,
                "adding marker"
            );
            writer.add_marker(marker.name.to_smolstr(), range)?;
        }

        Ok(stale.len())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Element, Node};

    fn span(class: &str, start: usize, end: usize) -> SpanRange {
        SpanRange {
            class: class.into(),
            start,
            end,
        }
    }

    fn document() -> Document {
        let root = Element::new("$root")
            .with_child(Node::Element(Element::from_plain_text(
                "codeBlock",
                "softBreak",
                "int x;",
            )))
            .with_child(Node::Element(Element::new("paragraph").with_child(Node::text("prose"))))
            .with_child(Node::Element(Element::from_plain_text(
                "codeBlock",
                "softBreak",
                "x = 1",
            )));
        Document::new("note", root)
    }

    fn names(document: &Document) -> Vec<String> {
        document.markers().iter().map(|m| m.name.to_string()).collect()
    }

    #[test]
    fn test_plan_threads_sequence() {
        let (first, next) = plan_markers(0, vec![span("a", 0, 1), span("b", 1, 2)], "hljs", 0);
        let (second, next) = plan_markers(2, vec![span("a", 0, 1)], "hljs", next);

        assert_eq!(next, 3);
        let all: Vec<_> = first
            .iter()
            .chain(&second)
            .map(|m| (m.name.to_string(), m.block))
            .collect();
        assert_eq!(
            all,
            vec![
                ("hljs:a:0".to_string(), 0),
                ("hljs:b:1".to_string(), 0),
                ("hljs:a:2".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_apply_replaces_group_only() {
        let mut doc = document();
        doc.change(|w| {
            let range = w.create_range(w.create_position_at(&[0], 0)?, w.create_position_at(&[0], 3)?)?;
            w.add_marker("search:0", range.clone())?;
            w.add_marker("hljs:hljs-type:0", range)
        })
        .unwrap();

        let (planned, _) = plan_markers(
            0,
            vec![span("hljs-type", 0, 3), span("hljs-variable", 4, 5)],
            "hljs",
            0,
        );
        let removed = apply_markers(&mut doc, "hljs", &planned).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(
            names(&doc),
            vec!["hljs:hljs-type:0", "hljs:hljs-variable:1", "search:0"]
        );
        let marker = doc.markers().get("hljs:hljs-variable:1").unwrap();
        assert_eq!(marker.range.start.path, vec![0]);
        assert_eq!((marker.range.start.offset, marker.range.end.offset), (4, 5));
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let mut doc = document();
        let (planned, _) = plan_markers(0, vec![span("hljs-type", 0, 3)], "hljs", 0);
        apply_markers(&mut doc, "hljs", &planned).unwrap();

        // Second block is only 5 offsets long.
        let (planned, _) = plan_markers(
            2,
            vec![span("hljs-variable", 0, 1), span("hljs-number", 4, 9)],
            "hljs",
            0,
        );
        let err = apply_markers(&mut doc, "hljs", &planned).unwrap_err();

        assert!(matches!(err, ModelError::OffsetOutOfBounds { offset: 9, .. }));
        assert_eq!(names(&doc), vec!["hljs:hljs-type:0"]);
    }

    #[test]
    fn test_apply_empty_plan_clears_group() {
        let mut doc = document();
        let (planned, _) = plan_markers(0, vec![span("hljs-type", 0, 3)], "hljs", 0);
        apply_markers(&mut doc, "hljs", &planned).unwrap();

        assert_eq!(apply_markers(&mut doc, "hljs", &[]).unwrap(), 1);
        assert!(doc.markers().is_empty());
    }
}
