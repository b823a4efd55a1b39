//! Error types for codemark.

use miette::{Diagnostic, NamedSource, SourceSpan};
use smol_str::SmolStr;

/// Result type alias for codemark operations.
pub type Result<T, E = CodemarkError> = std::result::Result<T, E>;

/// Main error type for a highlighting pass.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum CodemarkError {
    /// Document model rejected a position, range or marker operation
    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),

    /// The highlighter could not produce markup
    #[error(transparent)]
    #[diagnostic(transparent)]
    Highlight(#[from] HighlightError),

    /// Highlighter markup did not line up with the code block text
    #[error("code block {block}: {source}")]
    #[diagnostic(code(codemark::realign))]
    Realign {
        /// Index of the code block among the root's children
        block: usize,
        #[source]
        #[diagnostic_source]
        source: RealignError,
    },
}

/// Errors raised by the document model.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ModelError {
    #[error("no element at path {path:?}")]
    #[diagnostic(code(codemark::model::no_element))]
    NoElement { path: Vec<usize> },

    #[error("offset {offset} is past the end of the element at {path:?} (size {size})")]
    #[diagnostic(code(codemark::model::offset_out_of_bounds))]
    OffsetOutOfBounds {
        path: Vec<usize>,
        offset: usize,
        size: usize,
    },

    #[error("range ends in a different parent ({start:?} vs {end:?})")]
    #[diagnostic(code(codemark::model::cross_parent_range))]
    CrossParentRange { start: Vec<usize>, end: Vec<usize> },

    #[error("range start {start} is after its end {end}")]
    #[diagnostic(code(codemark::model::inverted_range))]
    InvertedRange { start: usize, end: usize },

    #[error("marker `{0}` already exists")]
    #[diagnostic(
        code(codemark::model::duplicate_marker),
        help("remove the old marker in the same change before adding it again")
    )]
    DuplicateMarker(SmolStr),

    #[error("no marker named `{0}`")]
    #[diagnostic(code(codemark::model::no_such_marker))]
    NoSuchMarker(SmolStr),

    #[error("malformed marker name `{0}`")]
    #[diagnostic(
        code(codemark::model::marker_name),
        help("marker names look like `group:style-class:sequence`")
    )]
    InvalidMarkerName(SmolStr),
}

/// Errors raised by a highlighter adapter.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum HighlightError {
    #[error("unknown theme `{0}`")]
    #[diagnostic(code(codemark::highlight::unknown_theme))]
    UnknownTheme(SmolStr),

    #[error("syntect failed")]
    #[diagnostic(code(codemark::highlight::syntect))]
    Syntect(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("highlighter failed: {0}")]
    #[diagnostic(code(codemark::highlight::other))]
    Other(String),
}

#[cfg(feature = "syntax-highlighting")]
impl From<syntect::Error> for HighlightError {
    fn from(err: syntect::Error) -> Self {
        HighlightError::Syntect(Box::new(err))
    }
}

/// Re-alignment failure, pointing into the highlighter markup.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[error("cannot realign highlighter output: {kind}")]
#[diagnostic(code(codemark::realign))]
pub struct RealignError {
    #[diagnostic_source]
    kind: RealignErrorKind,
    #[source_code]
    html: NamedSource<String>,
    #[label("here")]
    location: SourceSpan,
    #[help]
    advice: Option<String>,
}

impl RealignError {
    pub(crate) fn new(kind: RealignErrorKind, html: &str, offset: usize, len: usize) -> Self {
        let advice = kind.advice();
        Self {
            kind,
            html: NamedSource::new("highlighted.html", html.to_string()),
            location: (offset, len).into(),
            advice,
        }
    }

    pub fn kind(&self) -> &RealignErrorKind {
        &self.kind
    }

    /// Byte offset into the highlighter markup where the problem was found.
    pub fn offset(&self) -> usize {
        self.location.offset()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum RealignErrorKind {
    #[error("closing tag with no open span")]
    UnbalancedClose,

    #[error("{} span(s) never closed: {classes:?}", classes.len())]
    UnclosedSpans { classes: Vec<SmolStr> },

    #[error("unsupported tag")]
    UnsupportedTag,

    #[error("unterminated tag")]
    UnterminatedTag,

    #[error("span without a class attribute")]
    MissingClass,

    #[error("unsupported entity `{0}`")]
    UnsupportedEntity(SmolStr),

    #[error("unterminated entity")]
    UnterminatedEntity,

    #[error("markup has text with no corresponding code block text")]
    TextOverrun,

    #[error("markup has {found:?} where the code block has {expected:?}")]
    TextMismatch { expected: char, found: char },

    #[error("{remaining} character(s) of code block text missing from the markup")]
    UnconsumedText { remaining: usize },
}

impl RealignErrorKind {
    fn advice(&self) -> Option<String> {
        match self {
            RealignErrorKind::UnsupportedEntity(_) => Some(
                "only &amp; &lt; &gt; &quot; &#x27; and &#39; are understood".to_string(),
            ),
            RealignErrorKind::TextMismatch { .. } | RealignErrorKind::UnconsumedText { .. } => {
                Some("the highlighter was fed different text than the code block holds".to_string())
            }
            _ => None,
        }
    }
}
