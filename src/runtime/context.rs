use std::fmt;
use std::rc::Rc;

use crate::lexer::Position;
use crate::runtime::SymbolTable;

/// Display name of the outermost context
pub const PROGRAM_CONTEXT: &str = "<program>";

/// One activation of code: the program itself, or a function or block call
///
/// Contexts form a chain through `parent` that is walked to build tracebacks.
pub struct Context {
    display_name: String,
    parent: Option<Rc<Context>>,
    /// Where control entered this context, within the parent
    entry: Option<Position>,
    symbols: Rc<SymbolTable>,
    depth: usize,
}

impl Context {
    /// Creates the outermost context over `symbols`
    pub fn root(display_name: impl Into<String>, symbols: Rc<SymbolTable>) -> Rc<Self> {
        Self::root_at_depth(display_name, symbols, 0)
    }

    /// Creates an outermost context for a script started `depth` calls deep
    pub fn root_at_depth(
        display_name: impl Into<String>,
        symbols: Rc<SymbolTable>,
        depth: usize,
    ) -> Rc<Self> {
        Rc::new(Context {
            display_name: display_name.into(),
            parent: None,
            entry: None,
            symbols,
            depth,
        })
    }

    /// Creates a context entered from `entry` inside `parent`
    pub fn child(
        display_name: impl Into<String>,
        parent: Rc<Context>,
        entry: Position,
        symbols: Rc<SymbolTable>,
        depth: usize,
    ) -> Rc<Self> {
        Rc::new(Context {
            display_name: display_name.into(),
            parent: Some(parent),
            entry: Some(entry),
            symbols,
            depth,
        })
    }

    /// Name shown in tracebacks
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Enclosing context
    pub fn parent(&self) -> Option<&Rc<Context>> {
        self.parent.as_ref()
    }

    /// Position in the parent at which this context was entered
    pub fn entry(&self) -> Option<&Position> {
        self.entry.as_ref()
    }

    /// Variable bindings visible from this context
    pub fn symbols(&self) -> &Rc<SymbolTable> {
        &self.symbols
    }

    /// Number of active calls below this context
    pub fn depth(&self) -> usize {
        self.depth
    }
}

// Symbol tables may hold values whose context points back here.
impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("display_name", &self.display_name)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}
