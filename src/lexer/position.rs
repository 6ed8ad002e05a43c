use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// A named piece of source text shared by every position pointing into it
#[derive(Debug, PartialEq, Eq)]
pub struct Source {
    /// File name, or a pseudo name such as `<stdin>`
    pub name: String,
    /// Full text of the source
    pub text: String,
}

impl Source {
    /// Creates a shared source record
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Arc<Self> {
        Arc::new(Source {
            name: name.into(),
            text: text.into(),
        })
    }
}

/// A location in a source file
///
/// `line` and `column` are 0-based; they are rendered 1-based in diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    /// Character offset from the start of the source
    pub offset: usize,
    /// Line number (0-indexed)
    pub line: usize,
    /// Column number (0-indexed)
    pub column: usize,
    /// Source this position points into
    #[serde(rename = "file", serialize_with = "serialize_source_name")]
    pub source: Arc<Source>,
}

fn serialize_source_name<S: Serializer>(source: &Arc<Source>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&source.name)
}

impl Position {
    /// Position of the first character of `source`
    pub fn start(source: Arc<Source>) -> Self {
        Position {
            offset: 0,
            line: 0,
            column: 0,
            source,
        }
    }

    /// Moves past `current`, wrapping to the next line after a newline
    pub fn advance(&mut self, current: char) {
        self.offset += 1;
        if current == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }

    /// Returns a copy moved past `current`
    pub fn advanced(&self, current: char) -> Self {
        let mut next = self.clone();
        next.advance(current);
        next
    }

    /// Name of the source file
    pub fn file_name(&self) -> &str {
        &self.source.name
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.source.name,
            self.line + 1,
            self.column + 1
        )
    }
}

/// Start and end (exclusive) of a piece of source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    /// First position covered
    pub start: Position,
    /// Position just after the last covered character
    pub end: Position,
}

impl Span {
    /// Creates a span between two positions
    pub fn new(start: Position, end: Position) -> Self {
        Span { start, end }
    }

    /// Span from the start of `self` to the end of `other`
    pub fn to(&self, other: &Span) -> Span {
        Span::new(self.start.clone(), other.end.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_tracks_lines() {
        let mut pos = Position::start(Source::new("<test>", "a\nb"));
        pos.advance('a');
        assert_eq!((pos.offset, pos.line, pos.column), (1, 0, 1));
        pos.advance('\n');
        assert_eq!((pos.offset, pos.line, pos.column), (2, 1, 0));
    }

    #[test]
    fn test_advanced_leaves_original_untouched() {
        let pos = Position::start(Source::new("<test>", "xy"));
        let next = pos.advanced('x');
        assert_eq!(pos.offset, 0);
        assert_eq!(next.offset, 1);
    }

    #[test]
    fn test_display_is_one_based() {
        let pos = Position::start(Source::new("main.lexi", ""));
        assert_eq!(pos.to_string(), "main.lexi:1:1");
    }
}
