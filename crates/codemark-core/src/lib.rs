//! codemark-core: syntax-highlighting markers for code blocks.
//!
//! This crate provides:
//! - `Document` - a structured document model with transient markers
//! - `Highlighter` - the highlighter adapter seam, with a syntect implementation
//! - `realign` - mapping highlighter markup back onto code block offsets
//! - `CodeBlockHighlighter` - the full pass, driven by host lifecycle events

pub mod apply;
pub mod collect;
pub mod config;
#[cfg(feature = "syntax-css")]
pub mod css;
pub mod document;
pub mod editor;
pub mod error;
pub mod highlight;
pub mod markers;
pub mod realign;
pub mod view;
pub mod widget;

pub use apply::{PlannedMarker, apply_markers, plan_markers};
pub use collect::{CodeChild, CollectedBlock, TextRun, code_blocks, collect_code_block};
pub use config::HighlightConfig;
pub use document::{Document, Element, ModelRange, Node, Position, Writer};
pub use editor::Editor;
pub use error::{CodemarkError, HighlightError, ModelError, RealignError, RealignErrorKind, Result};
#[cfg(feature = "syntax-highlighting")]
pub use highlight::SyntectHighlighter;
pub use highlight::{CSS_PREFIX, Highlighted, Highlighter};
pub use markers::{Marker, MarkerCollection, MarkerName};
pub use realign::{SpanRange, realign};
pub use smol_str::SmolStr;
pub use view::{ConversionRegistry, SYNTAX_RESULT_ATTR, ViewElement, highlight_view};
pub use widget::{CodeBlockHighlighter, LoadResults, MarkerPlan, PassReport};
