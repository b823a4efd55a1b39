//! Re-alignment of highlighter markup onto code block offsets.
//!
//! The highlighter returns annotated text, never offsets, and the document
//! stores structured children, not a flat string. [`realign`] walks the
//! markup and the block's [`TextRun`]s in lockstep and turns every
//! `<span class="...">...</span>` into a `[start, end)` range of block offsets.
//!
//! Only the narrow markup convention of the highlighters is understood:
//! `<span class="...">` and `</span>` tags, and the entities for `&`, `<`, `>`,
//! `"` and `'`. Anything else is reported as an error instead of guessed at.
//!
//! For `#include <stdio.h>` highlight.js produces
//!
//! ```text
//! <span class="hljs-meta">#<span class="hljs-keyword">include</span> <span class="hljs-string">&lt;stdio.h&gt;</span></span>
//! ```
//!
//! which realigns to `hljs-keyword` at `1..8`, `hljs-string` at `9..18` and
//! `hljs-meta` at `0..18`, in closing order.

use serde::Serialize;
use smol_str::SmolStr;

use crate::collect::TextRun;
use crate::error::{RealignError, RealignErrorKind};

/// A span recovered from the markup, in code block offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpanRange {
    /// First class of the span; sub-scope classes are dropped.
    pub class: SmolStr,
    pub start: usize,
    pub end: usize,
}

/// Span opened in the markup and not yet closed.
#[derive(Debug, Clone)]
struct PendingSpan {
    class: SmolStr,
    start: usize,
    /// Byte offset of the opening tag, for error reporting.
    tag_offset: usize,
}

/// Longest entity the highlighters emit is `&#x27;`.
const MAX_ENTITY_LEN: usize = 8;

/// Decode one of the entities the highlighters use.
pub fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "&amp;" => Some('&'),
        "&lt;" => Some('<'),
        "&gt;" => Some('>'),
        "&quot;" => Some('"'),
        // highlight.js writes `&#x27;`, syntect writes `&#39;`
        "&#x27;" | "&#39;" => Some('\''),
        _ => None,
    }
}

/// Map every span of `html` onto offsets of the block the `runs` came from.
///
/// Ranges are returned in the order their closing tags appear.
pub fn realign(html: &str, runs: &[TextRun<'_>]) -> Result<Vec<SpanRange>, RealignError> {
    Realigner::new(html, runs).run()
}

/// Read position inside the text runs.
struct RunCursor<'r, 'a> {
    runs: &'r [TextRun<'a>],
    index: usize,
    byte: usize,
    chars: usize,
}

impl<'r, 'a> RunCursor<'r, 'a> {
    fn new(runs: &'r [TextRun<'a>]) -> Self {
        Self {
            runs,
            index: 0,
            byte: 0,
            chars: 0,
        }
    }

    fn current(&self) -> Option<&'r TextRun<'a>> {
        self.runs.get(self.index)
    }

    fn is_exhausted(&self) -> bool {
        self.current().is_none_or(|run| self.byte >= run.text.len())
    }

    /// Move past exhausted runs. Past the last run the cursor stays at its
    /// end, so trailing closing tags land on the end of the block text.
    fn skip_exhausted(&mut self) {
        while self.is_exhausted() && self.index + 1 < self.runs.len() {
            self.index += 1;
            self.byte = 0;
            self.chars = 0;
        }
    }

    /// Offset in the code block of the next unread char.
    fn position(&self) -> usize {
        self.current()
            .map(|run| run.start_offset + self.chars)
            .unwrap_or(0)
    }

    fn next_char(&mut self) -> Option<char> {
        let run = self.current()?;
        let c = run.text[self.byte..].chars().next()?;
        self.byte += c.len_utf8();
        self.chars += 1;
        Some(c)
    }

    /// Chars not yet consumed, across the current and later runs.
    fn remaining(&self) -> usize {
        let Some(run) = self.current() else {
            return 0;
        };
        let in_current = run.text[self.byte.min(run.text.len())..].chars().count();
        let later: usize = self.runs[self.index + 1..]
            .iter()
            .map(|run| run.text.chars().count())
            .sum();
        in_current + later
    }
}

struct Realigner<'h, 'r, 'a> {
    html: &'h str,
    pos: usize,
    cursor: RunCursor<'r, 'a>,
    stack: Vec<PendingSpan>,
    ranges: Vec<SpanRange>,
}

impl<'h, 'r, 'a> Realigner<'h, 'r, 'a> {
    fn new(html: &'h str, runs: &'r [TextRun<'a>]) -> Self {
        Self {
            html,
            pos: 0,
            cursor: RunCursor::new(runs),
            stack: Vec::new(),
            ranges: Vec::new(),
        }
    }

    fn error(&self, kind: RealignErrorKind, offset: usize, len: usize) -> RealignError {
        RealignError::new(kind, self.html, offset, len)
    }

    fn run(mut self) -> Result<Vec<SpanRange>, RealignError> {
        while self.pos < self.html.len() {
            self.cursor.skip_exhausted();

            let html = self.html;
            let rest = &html[self.pos..];
            if rest.starts_with("</") {
                self.close_span()?;
            } else if rest.starts_with('<') {
                self.open_span()?;
            } else if rest.starts_with('&') {
                self.entity()?;
            } else if let Some(c) = rest.chars().next() {
                self.consume(c, self.pos, c.len_utf8())?;
                self.pos += c.len_utf8();
            }
        }

        if !self.stack.is_empty() {
            let first = self.stack[0].tag_offset;
            let classes = self.stack.iter().map(|span| span.class.clone()).collect();
            return Err(self.error(
                RealignErrorKind::UnclosedSpans { classes },
                first,
                self.html.len() - first,
            ));
        }

        let remaining = self.cursor.remaining();
        if remaining > 0 {
            return Err(self.error(
                RealignErrorKind::UnconsumedText { remaining },
                self.html.len(),
                0,
            ));
        }

        Ok(self.ranges)
    }

    /// Length of the tag starting at `self.pos`, including its `>`.
    fn tag_len(&self) -> Result<usize, RealignError> {
        self.html[self.pos..]
            .find('>')
            .map(|i| i + 1)
            .ok_or_else(|| {
                self.error(
                    RealignErrorKind::UnterminatedTag,
                    self.pos,
                    self.html.len() - self.pos,
                )
            })
    }

    fn open_span(&mut self) -> Result<(), RealignError> {
        let len = self.tag_len()?;
        let html = self.html;
        let tag = &html[self.pos..self.pos + len];

        let is_span = tag
            .strip_prefix("<span")
            .and_then(|after| after.chars().next())
            .is_some_and(|c| c.is_ascii_whitespace() || c == '>');
        if !is_span {
            return Err(self.error(RealignErrorKind::UnsupportedTag, self.pos, len));
        }

        // Keep the first class only: highlight.js sub-scopes ("title function_")
        // and syntect scope atoms ("hljs-keyword hljs-control") share it.
        let class = tag
            .find("class=\"")
            .map(|i| &tag[i + "class=\"".len()..])
            .and_then(|value| value.split('"').next())
            .and_then(|value| value.split_ascii_whitespace().next())
            .ok_or_else(|| self.error(RealignErrorKind::MissingClass, self.pos, len))?;

        let start = self.cursor.position();
        tracing::trace!(target: "codemark::realign", class, start, "span start");
        self.stack.push(PendingSpan {
            class: SmolStr::new(class),
            start,
            tag_offset: self.pos,
        });
        self.pos += len;
        Ok(())
    }

    fn close_span(&mut self) -> Result<(), RealignError> {
        let len = self.tag_len()?;
        if !self.html[self.pos..].starts_with("</span") {
            return Err(self.error(RealignErrorKind::UnsupportedTag, self.pos, len));
        }
        let pending = self
            .stack
            .pop()
            .ok_or_else(|| self.error(RealignErrorKind::UnbalancedClose, self.pos, len))?;

        let end = self.cursor.position();
        tracing::trace!(target: "codemark::realign", class = %pending.class, start = pending.start, end, "span end");
        self.ranges.push(SpanRange {
            class: pending.class,
            start: pending.start,
            end,
        });
        self.pos += len;
        Ok(())
    }

    /// An entity stands for exactly one char of the source text.
    fn entity(&mut self) -> Result<(), RealignError> {
        let html = self.html;
        let rest = &html[self.pos..];
        let window = &rest[..floor_char_boundary(rest, MAX_ENTITY_LEN)];
        let len = window.find(';').map(|i| i + 1).ok_or_else(|| {
            self.error(RealignErrorKind::UnterminatedEntity, self.pos, window.len())
        })?;
        let entity = &rest[..len];
        let c = decode_entity(entity).ok_or_else(|| {
            self.error(
                RealignErrorKind::UnsupportedEntity(SmolStr::new(entity)),
                self.pos,
                len,
            )
        })?;
        self.consume(c, self.pos, len)?;
        self.pos += len;
        Ok(())
    }

    /// Consume one source char, which must be `found`.
    fn consume(&mut self, found: char, offset: usize, len: usize) -> Result<(), RealignError> {
        match self.cursor.next_char() {
            None => Err(self.error(RealignErrorKind::TextOverrun, offset, len)),
            Some(expected) if expected != found => Err(self.error(
                RealignErrorKind::TextMismatch { expected, found },
                offset,
                len,
            )),
            Some(_) => Ok(()),
        }
    }
}

/// Largest char boundary of `s` that is `<= max`.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::collect_code_block;
    use crate::config::HighlightConfig;
    use crate::document::{Element, Node};

    fn block(text: &str) -> Element {
        Element::from_plain_text("codeBlock", "softBreak", text)
    }

    fn realign_block(block: &Element, html: &str) -> Result<Vec<SpanRange>, RealignError> {
        let collected = collect_code_block(block, &HighlightConfig::default());
        realign(html, &collected.runs)
    }

    fn summary(ranges: &[SpanRange]) -> Vec<(&str, usize, usize)> {
        ranges
            .iter()
            .map(|r| (r.class.as_str(), r.start, r.end))
            .collect()
    }

    fn kind(result: Result<Vec<SpanRange>, RealignError>) -> RealignErrorKind {
        result.unwrap_err().kind().clone()
    }

    #[test]
    fn test_include_example() {
        let block = block("#include <stdio.h>");
        let html = r#"<span class="hljs-meta">#<span class="hljs-keyword">include</span> <span class="hljs-string">&lt;stdio.h&gt;</span></span>"#;
        let ranges = realign_block(&block, html).unwrap();
        assert_eq!(
            summary(&ranges),
            vec![
                ("hljs-keyword", 1, 8),
                ("hljs-string", 9, 18),
                ("hljs-meta", 0, 18),
            ]
        );
    }

    #[test]
    fn test_ranges_slice_back_to_span_text() {
        let source = "let x = foo(1);";
        let block = block(source);
        let html = r#"<span class="hljs-keyword">let</span> x = <span class="hljs-title function_">foo</span>(<span class="hljs-number">1</span>);"#;
        let ranges = realign_block(&block, html).unwrap();

        let sliced: Vec<_> = ranges
            .iter()
            .map(|r| {
                let text: String = source.chars().skip(r.start).take(r.end - r.start).collect();
                (r.class.as_str(), text)
            })
            .collect();
        assert_eq!(
            sliced,
            vec![
                ("hljs-keyword", "let".to_string()),
                ("hljs-title", "foo".to_string()),
                ("hljs-number", "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_each_entity_is_one_source_char() {
        let block = block(r#"a&b<c>"d'e'"#);
        let html = r#"<span class="hljs-string">a&amp;b&lt;c&gt;&quot;d&#x27;e&#39;</span>"#;
        let ranges = realign_block(&block, html).unwrap();
        assert_eq!(summary(&ranges), vec![("hljs-string", 0, 11)]);
    }

    #[test]
    fn test_line_breaks_are_one_offset() {
        // "/* a" <br> "b */" <br> "x"
        let block = block("/* a\nb */\nx");
        let html = "<span class=\"hljs-comment\">/* a\nb */</span>\n<span class=\"hljs-variable\">x</span>";
        let ranges = realign_block(&block, html).unwrap();
        assert_eq!(
            summary(&ranges),
            vec![("hljs-comment", 0, 9), ("hljs-variable", 10, 11)]
        );
        let brk = |name: &str| name == "softBreak";
        assert_eq!(block.text_between(0, 9, brk), "/* a\nb */");
    }

    #[test]
    fn test_empty_lines() {
        let block = block("a\n\n\nb");
        let html = "a\n<span class=\"x\">\n\n</span>b";
        let ranges = realign_block(&block, html).unwrap();
        assert_eq!(summary(&ranges), vec![("x", 2, 4)]);
    }

    #[test]
    fn test_trailing_close_tags_land_on_block_end() {
        let block = block("ab\ncd");
        let html = "<span class=\"a\"><span class=\"b\">ab\ncd</span></span>";
        let ranges = realign_block(&block, html).unwrap();
        assert_eq!(summary(&ranges), vec![("b", 0, 5), ("a", 0, 5)]);
    }

    #[test]
    fn test_span_opening_at_run_boundary_starts_in_next_run() {
        let block = block("ab\ncd");
        let html = "ab\n<span class=\"k\">cd</span>";
        let ranges = realign_block(&block, html).unwrap();
        assert_eq!(summary(&ranges), vec![("k", 3, 5)]);
    }

    #[test]
    fn test_unknown_child_offsets_are_skipped() {
        let block = Element::new("codeBlock")
            .with_child(Node::text("ab"))
            .with_child(Node::element("widget"))
            .with_child(Node::text("cd"));
        let html = "a<span class=\"k\">bc</span>d";
        let ranges = realign_block(&block, html).unwrap();
        // "c" lives after the widget, at offset 3.
        assert_eq!(summary(&ranges), vec![("k", 1, 4)]);
    }

    #[test]
    fn test_multibyte_text() {
        let block = block("s = \"héllo wörld\"");
        let html = "s = <span class=\"hljs-string\">&quot;héllo wörld&quot;</span>";
        let ranges = realign_block(&block, html).unwrap();
        assert_eq!(summary(&ranges), vec![("hljs-string", 4, 17)]);
    }

    #[test]
    fn test_empty_block() {
        let block = Element::new("codeBlock");
        assert_eq!(realign_block(&block, "").unwrap(), vec![]);
        assert_eq!(
            summary(&realign_block(&block, "<span class=\"x\"></span>").unwrap()),
            vec![("x", 0, 0)]
        );
    }

    #[test]
    fn test_unbalanced_close_is_detected() {
        let block = block("ab");
        let result = realign_block(&block, "<span class=\"k\">a</span>b</span>");
        let err = result.unwrap_err();
        assert_eq!(err.kind(), &RealignErrorKind::UnbalancedClose);
        assert_eq!(err.offset(), 25);
    }

    #[test]
    fn test_unclosed_span_is_detected() {
        let block = block("ab");
        assert_eq!(
            kind(realign_block(&block, "<span class=\"k\">a<span class=\"s\">b</span>")),
            RealignErrorKind::UnclosedSpans {
                classes: vec!["k".into()]
            }
        );
    }

    #[test]
    fn test_markup_longer_than_text() {
        let block = block("ab");
        assert_eq!(
            kind(realign_block(&block, "<span class=\"k\">abc</span>")),
            RealignErrorKind::TextOverrun
        );
    }

    #[test]
    fn test_markup_shorter_than_text() {
        let block = block("ab\nc");
        assert_eq!(
            kind(realign_block(&block, "<span class=\"k\">ab</span>")),
            RealignErrorKind::UnconsumedText { remaining: 2 }
        );
    }

    #[test]
    fn test_mismatched_text() {
        let block = block("a<b");
        assert_eq!(
            kind(realign_block(&block, "a&gt;b")),
            RealignErrorKind::TextMismatch {
                expected: '<',
                found: '>'
            }
        );
    }

    #[test]
    fn test_unsupported_escaping() {
        let block = block("a b");
        assert_eq!(
            kind(realign_block(&block, "a&nbsp;b")),
            RealignErrorKind::UnsupportedEntity("&nbsp;".into())
        );
        assert_eq!(
            kind(realign_block(&block, "a& b")),
            RealignErrorKind::UnterminatedEntity
        );
    }

    #[test]
    fn test_unsupported_tags() {
        let block = block("ab");
        assert_eq!(
            kind(realign_block(&block, "<b>ab</b>")),
            RealignErrorKind::UnsupportedTag
        );
        assert_eq!(
            kind(realign_block(&block, "<spanx class=\"k\">ab</span>")),
            RealignErrorKind::UnsupportedTag
        );
        assert_eq!(
            kind(realign_block(&block, "<span>ab</span>")),
            RealignErrorKind::MissingClass
        );
        assert_eq!(
            kind(realign_block(&block, "<span class=\"k\"ab")),
            RealignErrorKind::UnterminatedTag
        );
    }

    #[test]
    fn test_decode_entity() {
        assert_eq!(decode_entity("&amp;"), Some('&'));
        assert_eq!(decode_entity("&#39;"), Some('\''));
        assert_eq!(decode_entity("&#x27;"), Some('\''));
        assert_eq!(decode_entity("&apos;"), None);
    }

    #[test]
    fn test_floor_char_boundary() {
        assert_eq!(floor_char_boundary("abc", 8), 3);
        assert_eq!(floor_char_boundary("&ééééé", 4), 3);
    }
}
