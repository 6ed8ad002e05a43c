//! Lexi Parser Module
//!
//! Parses the token stream into an expression tree.

mod ast;
mod expr_parser;

pub use ast::{
    BinaryOp, Block, Collection, ConversionKind, FunctionDef, IfCase, Node, UnaryOp,
};
pub use expr_parser::{parse, Parser};
