//! Runtime execution for Lexi programs using tree-walking evaluation

mod builtins;
mod context;
mod interpreter;
mod symbol_table;
mod value;

pub use builtins::{BufferConsole, Builtin, Console, StdConsole};
pub use context::{Context, PROGRAM_CONTEXT};
pub use interpreter::{Interpreter, InterpreterConfig};
pub use symbol_table::{SymbolError, SymbolTable};
pub use value::{
    resolve_index, Capabilities, DeferredBlock, Function, Value, ValueError, ValueKind,
    MAX_REPEAT_LEN,
};
