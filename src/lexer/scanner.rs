use std::sync::Arc;

use super::position::{Position, Source, Span};
use super::token::{Keyword, Token, TokenKind};
use crate::error::{Error, Result};

/// Scanner for Lexi source text
pub struct Scanner {
    /// Source code as character vector
    source: Vec<char>,
    /// Accumulated tokens
    tokens: Vec<Token>,
    /// Position of the current character
    pos: Position,
    /// Index of the current character in `source`
    current: usize,
}

impl Scanner {
    /// Creates a new scanner over `text`, reporting positions against `name`
    pub fn new(name: &str, text: &str) -> Self {
        Self::from_source(Source::new(name, text))
    }

    /// Creates a scanner over an already shared source
    pub fn from_source(source: Arc<Source>) -> Self {
        Scanner {
            source: source.text.chars().collect(),
            tokens: Vec::new(),
            pos: Position::start(source),
            current: 0,
        }
    }

    /// Scans all tokens from source code and returns them as a vector
    ///
    /// Stops at the first lexical error; the returned vector always ends
    /// with an `Eof` token on success.
    pub fn scan_tokens(&mut self) -> Result<Vec<Token>> {
        while let Some(c) = self.peek() {
            self.scan_token(c)?;
        }

        self.tokens
            .push(Token::single(TokenKind::Eof, self.pos.clone()));
        tracing::debug!(count = self.tokens.len(), "scanned tokens");

        Ok(std::mem::take(&mut self.tokens))
    }

    fn scan_token(&mut self, c: char) -> Result<()> {
        match c {
            // Whitespace, newlines only move the position
            ' ' | '\t' | '\r' | '\n' => {
                self.advance();
            }

            '+' => self.single(TokenKind::Plus),
            '*' => self.single(TokenKind::Mul),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '[' => self.single(TokenKind::LSquare),
            ']' => self.single(TokenKind::RSquare),
            '{' => self.single(TokenKind::LCurl),
            '}' => self.single(TokenKind::RCurl),
            ':' => self.single(TokenKind::Set),
            ',' => self.single(TokenKind::Comma),
            ';' => self.single(TokenKind::Semi),
            '.' => self.single(TokenKind::Dot),

            '/' => {
                if self.peek_next() == Some('/') {
                    self.skip_line_comment();
                } else {
                    self.single(TokenKind::Div);
                }
            }
            '-' => self.one_or_two('>', TokenKind::Arrow, TokenKind::Minus),
            '^' => self.one_or_two('^', TokenKind::Tetration, TokenKind::Pow),
            '<' => self.one_or_two('=', TokenKind::Lte, TokenKind::Lt),
            '>' => self.one_or_two('=', TokenKind::Gte, TokenKind::Gt),
            '!' => self.one_or_two('=', TokenKind::Ne, TokenKind::NSet),
            '=' => self.scan_equals()?,

            '"' => self.scan_string()?,

            c if c.is_ascii_digit() => self.scan_number(),

            c if c.is_alphabetic() || c == '_' => self.scan_identifier_or_keyword(),

            _ => {
                let start = self.pos.clone();
                self.advance();
                return Err(Error::illegal_character(
                    Span::new(start, self.pos.clone()),
                    c,
                ));
            }
        }

        Ok(())
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// `==` is the only operator starting with `=`
    fn scan_equals(&mut self) -> Result<()> {
        let start = self.pos.clone();
        self.advance();

        if self.peek() == Some('=') {
            self.advance();
            self.push(TokenKind::Ee, start);
            return Ok(());
        }

        let end = match self.peek() {
            Some(c) => self.pos.advanced(c),
            None => self.pos.clone(),
        };
        Err(Error::expected_character(
            Span::new(start, end),
            "'=' (after '=')",
        ))
    }

    fn scan_string(&mut self) -> Result<()> {
        let start = self.pos.clone();
        let mut value = String::new();
        let mut escaped = false;
        self.advance(); // Opening "

        loop {
            match self.peek() {
                None => {
                    return Err(Error::expected_character(
                        Span::new(start, self.pos.clone()),
                        "'\"' (string was not closed)",
                    ));
                }
                Some(c) if escaped => {
                    value.push(match c {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                    escaped = false;
                }
                Some('\\') => escaped = true,
                Some('"') => break,
                Some(c) => value.push(c),
            }
            self.advance();
        }

        self.advance(); // Closing "
        self.push(TokenKind::Str(value), start);
        Ok(())
    }

    /// Digits with at most one `.`; a second `.` ends the literal
    fn scan_number(&mut self) {
        let start = self.pos.clone();
        let mut text = String::new();
        let mut dot_count = 0;

        while let Some(c) = self.peek() {
            if c == '.' {
                if dot_count == 1 {
                    break;
                }
                dot_count += 1;
            } else if !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            self.advance();
        }

        // Digit runs always parse; huge integers fall back to floats
        let kind = if dot_count == 0 {
            match text.parse::<i64>() {
                Ok(n) => TokenKind::Int(n),
                Err(_) => TokenKind::Float(text.parse().unwrap_or(f64::INFINITY)),
            }
        } else {
            TokenKind::Float(text.parse().unwrap_or(0.0))
        };

        self.push(kind, start);
    }

    fn scan_identifier_or_keyword(&mut self) {
        let start = self.pos.clone();
        let mut text = String::new();

        while let Some(c) = self.peek() {
            if !(c.is_alphanumeric() || c == '_') {
                break;
            }
            text.push(c);
            self.advance();
        }

        let kind = match Keyword::lookup(&text) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier(text),
        };
        self.push(kind, start);
    }

    fn one_or_two(&mut self, second: char, double: TokenKind, single: TokenKind) {
        let start = self.pos.clone();
        self.advance();

        if self.peek() == Some(second) {
            self.advance();
            self.push(double, start);
        } else {
            self.push(single, start);
        }
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.pos.clone();
        self.advance();
        self.push(kind, start);
    }

    fn push(&mut self, kind: TokenKind, start: Position) {
        let token = Token::new(kind, start, self.pos.clone());
        tracing::trace!(token = %token.kind, "token");
        self.tokens.push(token);
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos.advance(c);
            self.current += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.current).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.source.get(self.current + 1).copied()
    }
}

/// Tokenizes `text`, reporting positions against `name`
pub fn tokenize(name: &str, text: &str) -> Result<Vec<Token>> {
    Scanner::new(name, text).scan_tokens()
}
