//! Lexical analysis for Lexi
//!
//! Converts source text into a flat stream of tokens.

mod position;
mod scanner;
mod token;

pub use position::{Position, Source, Span};
pub use scanner::{tokenize, Scanner};
pub use token::{Keyword, Token, TokenKind};
