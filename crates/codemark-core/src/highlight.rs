//! Highlighter adapters.
//!
//! A [`Highlighter`] turns plain text into markup with nested
//! `<span class="...">` regions. Escaping must stay within the entities
//! [`decode_entity`](crate::realign::decode_entity) understands, otherwise
//! realignment reports an error.
//!
//! No language hint is passed in, even when the code block carries a
//! `language` attribute; adapters detect the language themselves.

use smol_str::SmolStr;

use crate::error::HighlightError;

/// Class prefix for highlight classes, shared with the generated CSS.
pub const CSS_PREFIX: &str = "hljs-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlighted {
    pub html: String,
    /// Language the highlighter settled on, if it reports one.
    pub language: Option<SmolStr>,
}

pub trait Highlighter {
    fn highlight(&self, text: &str) -> Result<Highlighted, HighlightError>;
}

#[cfg(feature = "syntax-highlighting")]
pub use self::syntect_adapter::SyntectHighlighter;

#[cfg(feature = "syntax-highlighting")]
mod syntect_adapter {
    use std::sync::LazyLock;

    use smol_str::{SmolStr, ToSmolStr};
    use syntect::html::{ClassStyle, ClassedHTMLGenerator};
    use syntect::parsing::{ParseState, ScopeStackOp, SyntaxReference, SyntaxSet};
    use syntect::util::LinesWithEndings;

    use super::{CSS_PREFIX, Highlighted, Highlighter};
    use crate::error::HighlightError;

    static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

    /// Syntaxes tried when guessing from content, in tie-break order.
    const CANDIDATES: &[&str] = &[
        "C",
        "C++",
        "Rust",
        "Python",
        "JavaScript",
        "Java",
        "C#",
        "Go",
        "Ruby",
        "Bourne Again Shell (bash)",
        "SQL",
        "HTML",
        "CSS",
        "JSON",
        "YAML",
    ];

    /// Scope roots that count towards a syntax's relevance.
    const RELEVANT_SCOPES: &[&str] = &[
        "keyword", "storage", "entity", "string", "constant", "comment", "support",
    ];

    /// Lines parsed per candidate.
    const DETECT_LINES: usize = 30;

    /// Below this, content detection gives up.
    const MIN_RELEVANCE: i64 = 3;

    /// Relevant scopes pushed while parsing the start of `text`, minus a
    /// penalty for every `invalid` scope.
    fn relevance(syntax: &SyntaxReference, text: &str) -> i64 {
        let mut state = ParseState::new(syntax);
        let mut score = 0;
        for line in LinesWithEndings::from(text).take(DETECT_LINES) {
            let Ok(ops) = state.parse_line(line, &SYNTAX_SET) else {
                return i64::MIN;
            };
            for (_, op) in ops {
                let ScopeStackOp::Push(scope) = op else {
                    continue;
                };
                let name = scope.build_string();
                match name.split('.').next() {
                    Some("invalid") => score -= 3,
                    Some(root) if RELEVANT_SCOPES.contains(&root) => score += 1,
                    _ => {}
                }
            }
        }
        score
    }

    /// Highlighter backed by syntect's bundled syntaxes.
    ///
    /// Scopes become prefixed classes, so `keyword.control.c` is written as
    /// `class="hljs-keyword hljs-control hljs-c"` and realigns as
    /// `hljs-keyword`.
    #[derive(Debug, Clone, Default)]
    pub struct SyntectHighlighter {
        fallback_language: Option<SmolStr>,
    }

    impl SyntectHighlighter {
        pub fn new() -> Self {
            Self::default()
        }

        /// Language token (`"c"`, `"rs"`, `"Python"`...) used when neither the
        /// first line nor the content gives the language away.
        pub fn with_fallback_language(mut self, language: Option<SmolStr>) -> Self {
            self.fallback_language = language;
            self
        }

        /// Pick a syntax from the first line (shebang, modeline, `<?php`...),
        /// then from content, then the fallback language, then plain text.
        pub fn detect(&self, text: &str) -> &'static SyntaxReference {
            let syntax_set: &'static SyntaxSet = &SYNTAX_SET;
            let first_line = text.lines().next().unwrap_or_default();
            syntax_set
                .find_syntax_by_first_line(first_line)
                .or_else(|| Self::detect_from_content(text))
                .or_else(|| {
                    self.fallback_language
                        .as_deref()
                        .and_then(|token| syntax_set.find_syntax_by_token(token))
                })
                .unwrap_or_else(|| syntax_set.find_syntax_plain_text())
        }

        /// Candidate syntax with the highest relevance, if any reaches
        /// [`MIN_RELEVANCE`]. Earlier candidates win ties.
        fn detect_from_content(text: &str) -> Option<&'static SyntaxReference> {
            let syntax_set: &'static SyntaxSet = &SYNTAX_SET;
            let mut best: Option<(&'static SyntaxReference, i64)> = None;
            for syntax in CANDIDATES
                .iter()
                .filter_map(|name| syntax_set.find_syntax_by_name(name))
            {
                let score = relevance(syntax, text);
                if best.is_none_or(|(_, top)| score > top) {
                    best = Some((syntax, score));
                }
            }
            let (syntax, score) = best.filter(|(_, score)| *score >= MIN_RELEVANCE)?;
            tracing::trace!(target: "codemark::highlight", syntax = %syntax.name, score, "detected from content");
            Some(syntax)
        }
    }

    impl Highlighter for SyntectHighlighter {
        fn highlight(&self, text: &str) -> Result<Highlighted, HighlightError> {
            let syntax = self.detect(text);
            tracing::trace!(target: "codemark::highlight", syntax = %syntax.name, "highlighting");

            let mut generator = ClassedHTMLGenerator::new_with_class_style(
                syntax,
                &SYNTAX_SET,
                ClassStyle::SpacedPrefixed { prefix: CSS_PREFIX },
            );
            for line in LinesWithEndings::from(text) {
                generator.parse_html_for_line_which_includes_newline(line)?;
            }

            Ok(Highlighted {
                html: generator.finalize(),
                language: Some(syntax.name.to_smolstr()),
            })
        }
    }
}
