//! Error types for the Lexi interpreter

use std::fmt::Write as _;
use std::rc::Rc;

use thiserror::Error;

use crate::lexer::{Position, Span};
use crate::runtime::Context;

/// Lexi errors
///
/// Lexing and parsing errors only carry a span. Runtime errors also carry the
/// call frames that were active when they were raised, captured eagerly so the
/// error does not keep any interpreter state alive.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Character the lexer does not recognise
    ///
    /// **Triggered by:** any character outside the token alphabet
    /// **Example:** `1 @ 2`
    #[error("Illegal Character: {detail}")]
    IllegalCharacter {
        /// The offending character, quoted
        detail: String,
        /// Where it was found
        span: Span,
    },

    /// Incomplete two-character operator or unterminated string
    ///
    /// **Example:** `1 = 2` (a bare `=` is not an operator)
    #[error("Expected Character: {detail}")]
    ExpectedCharacter {
        /// What was expected
        detail: String,
        /// Where it was expected
        span: Span,
    },

    /// Token sequence that does not match the grammar
    #[error("Invalid Syntax: {detail}")]
    InvalidSyntax {
        /// Error description
        detail: String,
        /// Offending token span
        span: Span,
    },

    /// Failure while evaluating the tree
    #[error("Runtime Error: {detail}")]
    Runtime {
        /// Classification of the failure
        kind: RuntimeErrorKind,
        /// Error description
        detail: String,
        /// Span of the expression that failed
        span: Span,
        /// Active frames, innermost first
        traceback: Vec<Frame>,
    },
}

/// Classification of runtime failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// Access to a name that is not bound
    Undefined,
    /// Division by zero
    ZeroDivision,
    /// Operator or conversion not supported by the operand types
    IllegalOperation,
    /// Wrong number of arguments
    Arity,
    /// Index outside of a collection
    IndexOutOfRange,
    /// Builtin received an argument it cannot work with
    InvalidArgument,
    /// Call depth limit reached
    RecursionLimit,
    /// A script started by the `run` builtin failed
    Script,
    /// Console or file access failed
    Io,
}

/// One line of a traceback
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Display name of the context (`<program>`, function name, ...)
    pub display_name: String,
    /// Position reached inside that context
    pub position: Position,
}

impl Error {
    /// Create an illegal character error
    pub fn illegal_character(span: Span, character: char) -> Self {
        Error::IllegalCharacter {
            detail: format!("'{}'", character),
            span,
        }
    }

    /// Create an expected character error
    pub fn expected_character(span: Span, detail: impl Into<String>) -> Self {
        Error::ExpectedCharacter {
            detail: detail.into(),
            span,
        }
    }

    /// Create a syntax error
    pub fn invalid_syntax(span: Span, detail: impl Into<String>) -> Self {
        Error::InvalidSyntax {
            detail: detail.into(),
            span,
        }
    }

    /// Create a runtime error, capturing the frames reachable from `context`
    pub fn runtime(
        kind: RuntimeErrorKind,
        span: Span,
        detail: impl Into<String>,
        context: &Rc<Context>,
    ) -> Self {
        let traceback = Self::capture_frames(&span.start, context);
        Error::Runtime {
            kind,
            detail: detail.into(),
            span,
            traceback,
        }
    }

    fn capture_frames(start: &Position, context: &Rc<Context>) -> Vec<Frame> {
        let mut frames = Vec::new();
        let mut position = start.clone();
        let mut current = Some(Rc::clone(context));

        while let Some(ctx) = current {
            frames.push(Frame {
                display_name: ctx.display_name().to_string(),
                position: position.clone(),
            });
            if let Some(entry) = ctx.entry() {
                position = entry.clone();
            }
            current = ctx.parent().cloned();
        }

        frames
    }

    /// Human readable error name, as shown in `Error[ <name>: ... ]`
    pub fn name(&self) -> &'static str {
        match self {
            Error::IllegalCharacter { .. } => "Illegal Character",
            Error::ExpectedCharacter { .. } => "Expected Character",
            Error::InvalidSyntax { .. } => "Invalid Syntax",
            Error::Runtime { .. } => "Runtime Error",
        }
    }

    /// Error description without the name
    pub fn detail(&self) -> &str {
        match self {
            Error::IllegalCharacter { detail, .. }
            | Error::ExpectedCharacter { detail, .. }
            | Error::InvalidSyntax { detail, .. }
            | Error::Runtime { detail, .. } => detail,
        }
    }

    /// Source span the error points at
    pub fn span(&self) -> &Span {
        match self {
            Error::IllegalCharacter { span, .. }
            | Error::ExpectedCharacter { span, .. }
            | Error::InvalidSyntax { span, .. }
            | Error::Runtime { span, .. } => span,
        }
    }

    /// Runtime classification, `None` for lexing and parsing errors
    pub fn runtime_kind(&self) -> Option<RuntimeErrorKind> {
        match self {
            Error::Runtime { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Full report: traceback (runtime only), header, location and caret excerpt
    pub fn describe(&self) -> String {
        let mut out = String::new();

        if let Error::Runtime { traceback, .. } = self {
            out.push_str("Traceback (most recent call last): {\n");
            for frame in traceback.iter().rev() {
                let _ = writeln!(
                    out,
                    "    File[ {} ], Line[ {} ], In[ {} ]",
                    frame.position.file_name(),
                    frame.position.line + 1,
                    frame.display_name
                );
            }
            out.push_str("}\n");
        }

        let span = self.span();
        let _ = writeln!(out, "Error[ {}: {} ]", self.name(), self.detail());
        let _ = write!(
            out,
            "File[ {} ], Line[ {} ]",
            span.start.file_name(),
            span.start.line + 1
        );
        out.push_str("\n\n");
        out.push_str(&excerpt(span));
        out
    }
}

/// Renders the lines covered by `span` with a row of carets under the
/// covered columns
pub fn excerpt(span: &Span) -> String {
    let text = &span.start.source.text;
    let lines: Vec<&str> = text.split('\n').collect();
    let first = span.start.line;
    let last = span.end.line.max(first);
    let mut out = String::new();

    for line_no in first..=last {
        let line = lines
            .get(line_no)
            .copied()
            .unwrap_or("")
            .trim_end_matches('\r')
            .replace('\t', " ");
        let width = line.chars().count();
        let col_start = if line_no == first { span.start.column } else { 0 };
        let col_end = if line_no == last { span.end.column } else { width };
        let carets = col_end.saturating_sub(col_start).max(1);

        if line_no > first {
            out.push('\n');
        }
        out.push_str(&line);
        out.push('\n');
        out.push_str(&" ".repeat(col_start));
        out.push_str(&"^".repeat(carets));
    }

    out
}

/// Result type for Lexi operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Source;

    fn span_of(text: &str, from: usize, to: usize) -> Span {
        let source = Source::new("<test>", text);
        let mut start = Position::start(source);
        let chars: Vec<char> = text.chars().collect();
        for c in &chars[..from] {
            start.advance(*c);
        }
        let mut end = start.clone();
        for c in &chars[from..to] {
            end.advance(*c);
        }
        Span::new(start, end)
    }

    #[test]
    fn test_excerpt_single_line() {
        let span = span_of("1 + @", 4, 5);
        assert_eq!(excerpt(&span), "1 + @\n    ^");
    }

    #[test]
    fn test_excerpt_multi_line() {
        let span = span_of("ab\ncd", 1, 4);
        assert_eq!(excerpt(&span), "ab\n ^\ncd\n^");
    }

    #[test]
    fn test_describe_syntax_error() {
        let err = Error::invalid_syntax(span_of("1 +", 3, 3), "Expected int");
        let text = err.describe();
        assert!(text.starts_with("Error[ Invalid Syntax: Expected int ]\n"));
        assert!(text.contains("File[ <test> ], Line[ 1 ]"));
        assert!(!text.contains("Traceback"));
    }

    #[test]
    fn test_display_and_accessors() {
        let err = Error::illegal_character(span_of("@", 0, 1), '@');
        assert_eq!(err.to_string(), "Illegal Character: '@'");
        assert_eq!(err.name(), "Illegal Character");
        assert_eq!(err.detail(), "'@'");
        assert_eq!(err.runtime_kind(), None);
    }
}
