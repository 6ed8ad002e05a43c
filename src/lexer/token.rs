use super::position::{Position, Span};
use serde::Serialize;
use std::fmt;

/// A single token from the source code
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    /// The type of token, with its literal payload if any
    pub kind: TokenKind,
    /// Position of the first character
    pub start: Position,
    /// Position just after the last character
    pub end: Position,
}

impl Token {
    /// Creates a new token covering `start..end`
    pub fn new(kind: TokenKind, start: Position, end: Position) -> Self {
        Token { kind, start, end }
    }

    /// Creates a token one character wide starting at `start`
    pub fn single(kind: TokenKind, start: Position) -> Self {
        let end = start.advanced(' ');
        Token { kind, start, end }
    }

    /// Source span of the token
    pub fn span(&self) -> Span {
        Span::new(self.start.clone(), self.end.clone())
    }

    /// True when this token is the given keyword
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// Identifier text, if this is an identifier
    pub fn identifier(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(name) => Some(name),
            _ => None,
        }
    }
}

/// Reserved words of the language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Keyword {
    /// `var` introduces an assignment
    Var,
    /// `if`
    If,
    /// `elif`
    Elif,
    /// `else`
    Else,
    /// `while`
    While,
    /// `fun` introduces a function definition
    Fun,
    /// `and`
    And,
    /// `or`
    Or,
    /// `not`
    Not,
    /// `stru` (reserved)
    Stru,
}

impl Keyword {
    /// Looks up the keyword spelled by `s`
    pub fn lookup(s: &str) -> Option<Keyword> {
        Some(match s {
            "var" => Keyword::Var,
            "if" => Keyword::If,
            "elif" => Keyword::Elif,
            "else" => Keyword::Else,
            "while" => Keyword::While,
            "fun" => Keyword::Fun,
            "and" => Keyword::And,
            "or" => Keyword::Or,
            "not" => Keyword::Not,
            "stru" => Keyword::Stru,
            _ => return None,
        })
    }

    /// Source spelling of the keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Var => "var",
            Keyword::If => "if",
            Keyword::Elif => "elif",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::Fun => "fun",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
            Keyword::Stru => "stru",
        }
    }
}

/// All possible token types in Lexi
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TokenKind {
    // Literals
    /// Integer literal
    Int(i64),
    /// Floating-point literal
    Float(f64),
    /// String literal
    Str(String),
    /// Identifier
    Identifier(String),
    /// Keyword
    Keyword(Keyword),

    // Operators
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `^`
    Pow,
    /// `^^`
    Tetration,
    /// `==`
    Ee,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Lte,
    /// `>=`
    Gte,
    /// `->`
    Arrow,
    /// `!` (call without arguments)
    NSet,

    // Delimiters
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LSquare,
    /// `]`
    RSquare,
    /// `{`
    LCurl,
    /// `}`
    RCurl,
    /// `:`
    Set,
    /// `,`
    Comma,
    /// `;`
    Semi,
    /// `.` (reserved)
    Dot,

    // Special
    /// End of file marker
    Eof,
}

impl TokenKind {
    /// True for tokens carrying a literal value
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Int(_) | TokenKind::Float(_) | TokenKind::Str(_)
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenKind::Int(n) => write!(f, "INT:{}", n),
            TokenKind::Float(fl) => write!(f, "FLOAT:{}", fl),
            TokenKind::Str(s) => write!(f, "STRING:\"{}\"", s),
            TokenKind::Identifier(id) => write!(f, "IDENTIFIER:{}", id),
            TokenKind::Keyword(kw) => write!(f, "KEYWORD:{}", kw.as_str()),
            TokenKind::Plus => write!(f, "PLUS"),
            TokenKind::Minus => write!(f, "MINUS"),
            TokenKind::Mul => write!(f, "MUL"),
            TokenKind::Div => write!(f, "DIV"),
            TokenKind::Pow => write!(f, "POW"),
            TokenKind::Tetration => write!(f, "TETRATION"),
            TokenKind::Ee => write!(f, "EE"),
            TokenKind::Ne => write!(f, "NE"),
            TokenKind::Lt => write!(f, "LT"),
            TokenKind::Gt => write!(f, "GT"),
            TokenKind::Lte => write!(f, "LTE"),
            TokenKind::Gte => write!(f, "GTE"),
            TokenKind::Arrow => write!(f, "ARROW"),
            TokenKind::NSet => write!(f, "NSET"),
            TokenKind::LParen => write!(f, "LPAREN"),
            TokenKind::RParen => write!(f, "RPAREN"),
            TokenKind::LSquare => write!(f, "LSQUARE"),
            TokenKind::RSquare => write!(f, "RSQUARE"),
            TokenKind::LCurl => write!(f, "LCURL"),
            TokenKind::RCurl => write!(f, "RCURL"),
            TokenKind::Set => write!(f, "SET"),
            TokenKind::Comma => write!(f, "COMMA"),
            TokenKind::Semi => write!(f, "SEMI"),
            TokenKind::Dot => write!(f, "DOT"),
            TokenKind::Eof => write!(f, "EOF"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(Keyword::lookup("var"), Some(Keyword::Var));
        assert_eq!(Keyword::lookup("stru"), Some(Keyword::Stru));
        assert_eq!(Keyword::lookup("define"), None);
        assert_eq!(Keyword::While.as_str(), "while");
    }

    #[test]
    fn test_display() {
        assert_eq!(TokenKind::Int(42).to_string(), "INT:42");
        assert_eq!(TokenKind::Keyword(Keyword::Fun).to_string(), "KEYWORD:fun");
        assert_eq!(TokenKind::Tetration.to_string(), "TETRATION");
    }

    #[test]
    fn test_is_literal() {
        assert!(TokenKind::Float(1.5).is_literal());
        assert!(!TokenKind::Identifier("x".to_string()).is_literal());
    }
}
