//! # Lexi - a small expression language
//!
//! Lexi is a dynamically typed scripting language in which everything is an
//! expression: assignments, conditionals, loops and function definitions all
//! produce values. Source text is tokenized, parsed into an expression tree
//! and evaluated directly by a tree-walking interpreter.
//!
//! ## Quick Start
//!
//! ```rust
//! use lexi::Lexi;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let lexi = Lexi::new();
//!
//! let value = lexi.run("<doc>", "2 + 3 * 4")?;
//! assert_eq!(value.to_string(), "14");
//!
//! // Bindings persist between runs of the same session
//! lexi.run("<doc>", "var total : 40")?;
//! let value = lexi.run("<doc>", "total + 2")?;
//! assert_eq!(value.to_string(), "42");
//! # Ok(())
//! # }
//! ```
//!
//! ### Driving the pipeline by hand
//!
//! ```rust
//! use lexi::{parse, tokenize, Context, Interpreter, SymbolTable, Value, PROGRAM_CONTEXT};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tokens = tokenize("<doc>", "{fun sq(x) : x * x; sq -> (7)}!")?;
//! let tree = parse(tokens)?;
//!
//! let context = Context::root(PROGRAM_CONTEXT, SymbolTable::global());
//! let value = Interpreter::new().evaluate(&tree, &context)?;
//! assert_eq!(value, Value::number(49.0));
//! # Ok(())
//! # }
//! ```
//!
//! ## Language Overview
//!
//! ### Data Types
//!
//! - **Scalars**: numbers (always 64-bit floats), strings, `true`/`false`, `null`
//! - **Collections**: lists `[1, 2]`, tuples `(1, 2)` and deferred blocks `{a; b}`
//! - **Callables**: `fun` definitions and the builtins
//!
//! ### Expressions
//!
//! - `var name : value` binds a name in the current scope and yields the value
//! - `if c : a elif d : b else : e` yields the first matching branch, or `null`
//! - `while c : body` yields the list of body values
//! - `f -> (a, b)` calls `f`; `f!` calls it without arguments
//! - `x[..]`, `x(..)`, `x{..}` convert or index a value
//! - `^` is power, `^^` is tetration
//!
//! ### Built-in Functions
//!
//! `print`, `input`, `clear`, `type`, `len` and `run` (executes another file
//! against the same global scope).
//!
//! ## Error Handling
//!
//! Every stage reports failures through [`Error`]. [`Error::describe`] renders
//! a traceback for runtime errors followed by the offending source excerpt:
//!
//! ```rust
//! use lexi::{Lexi, RuntimeErrorKind};
//!
//! let err = Lexi::new().run("<doc>", "10 / 0").unwrap_err();
//! assert_eq!(err.runtime_kind(), Some(RuntimeErrorKind::ZeroDivision));
//! assert!(err.describe().contains("Error[ Runtime Error: Division by zero ]"));
//! ```

use std::rc::Rc;

/// Version of the Lexi interpreter
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod shell;

// Re-export main types
pub use error::{excerpt, Error, Frame, Result, RuntimeErrorKind};
pub use lexer::{tokenize, Position, Scanner, Source, Span, Token, TokenKind};
pub use parser::{parse, Node, Parser};
pub use runtime::{
    BufferConsole, Builtin, Console, Context, Interpreter, InterpreterConfig, StdConsole,
    SymbolTable, Value, ValueKind, MAX_REPEAT_LEN, PROGRAM_CONTEXT,
};
pub use shell::{Project, Reply, Shell, ShellCommand, ShellError};

/// Tokenizes, parses and evaluates `text` in a fresh program context over
/// `globals`
///
/// `name` is used in positions and tracebacks. The first failure of any
/// stage is returned.
pub fn run(
    name: &str,
    text: &str,
    globals: &Rc<SymbolTable>,
    interpreter: &Interpreter,
) -> Result<Value> {
    run_nested(name, text, globals, interpreter, 0)
}

/// [`run`] for a script started from inside a program, `depth` calls deep
pub(crate) fn run_nested(
    name: &str,
    text: &str,
    globals: &Rc<SymbolTable>,
    interpreter: &Interpreter,
    depth: usize,
) -> Result<Value> {
    let _run = tracing::debug_span!("run", name).entered();

    let tokens = Scanner::from_source(Source::new(name, text)).scan_tokens()?;
    let tree = parse(tokens)?;
    let context = Context::root_at_depth(PROGRAM_CONTEXT, Rc::clone(globals), depth);

    interpreter.evaluate(&tree, &context)
}

/// An interpreter session: one global table shared by every run
pub struct Lexi {
    globals: Rc<SymbolTable>,
    interpreter: Interpreter,
}

impl Lexi {
    /// Creates a session with default settings and a fresh global table
    pub fn new() -> Self {
        Self::with_interpreter(Interpreter::new())
    }

    /// Creates a session around a configured interpreter
    pub fn with_interpreter(interpreter: Interpreter) -> Self {
        Lexi {
            globals: SymbolTable::global(),
            interpreter,
        }
    }

    /// Runs `text` against the session's global table
    pub fn run(&self, name: &str, text: &str) -> Result<Value> {
        run(name, text, &self.globals, &self.interpreter)
    }

    /// Global bindings of the session
    pub fn globals(&self) -> &Rc<SymbolTable> {
        &self.globals
    }

    /// Interpreter used by the session
    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }
}

impl Default for Lexi {
    fn default() -> Self {
        Self::new()
    }
}
