//! Functions provided by the interpreter and the console they talk to

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use crate::error::{Error, Result, RuntimeErrorKind};
use crate::lexer::Span;
use crate::runtime::{Context, Interpreter, Value};

/// Builtin functions bound in the global table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// `print(value)`
    Print,
    /// `input()`
    Input,
    /// `clear()`
    Clear,
    /// `type(value)`
    Type,
    /// `len(value)`
    Len,
    /// `run(path)`
    Run,
}

impl Builtin {
    /// Every builtin, in binding order
    pub const ALL: [Builtin; 6] = [
        Builtin::Print,
        Builtin::Input,
        Builtin::Clear,
        Builtin::Type,
        Builtin::Len,
        Builtin::Run,
    ];

    /// Name the builtin is bound to
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Input => "input",
            Builtin::Clear => "clear",
            Builtin::Type => "type",
            Builtin::Len => "len",
            Builtin::Run => "run",
        }
    }

    /// Fixed parameter list
    pub fn params(self) -> &'static [&'static str] {
        match self {
            Builtin::Print | Builtin::Type | Builtin::Len => &["value"],
            Builtin::Input | Builtin::Clear => &[],
            Builtin::Run => &["path"],
        }
    }
}

/// Terminal used by `print`, `input` and `clear`
pub trait Console {
    /// Writes one line of output
    fn write_line(&self, text: &str) -> io::Result<()>;

    /// Reads one line of input without its line terminator
    fn read_line(&self) -> io::Result<String>;

    /// Clears the screen
    fn clear(&self) -> io::Result<()>;
}

/// Console over the process' standard streams
#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsole;

impl Console for StdConsole {
    fn write_line(&self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", text)?;
        stdout.flush()
    }

    fn read_line(&self) -> io::Result<String> {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\n', '\r']).to_string())
    }

    fn clear(&self) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "\x1B[2J\x1B[1;1H")?;
        stdout.flush()
    }
}

/// In-memory console, for tests and embedding
#[derive(Debug, Default)]
pub struct BufferConsole {
    output: RefCell<Vec<String>>,
    input: RefCell<VecDeque<String>>,
    clears: RefCell<usize>,
}

impl BufferConsole {
    /// Creates an empty console
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a console that answers `input()` with `lines`, in order
    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        BufferConsole {
            input: RefCell::new(lines.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Lines written so far
    pub fn output(&self) -> Vec<String> {
        self.output.borrow().clone()
    }

    /// Number of times the screen was cleared
    pub fn clears(&self) -> usize {
        *self.clears.borrow()
    }
}

impl Console for BufferConsole {
    fn write_line(&self, text: &str) -> io::Result<()> {
        self.output.borrow_mut().push(text.to_string());
        Ok(())
    }

    fn read_line(&self) -> io::Result<String> {
        self.input.borrow_mut().pop_front().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "no more input")
        })
    }

    fn clear(&self) -> io::Result<()> {
        *self.clears.borrow_mut() += 1;
        Ok(())
    }
}

/// Runs `builtin`; the caller has already checked the argument count
pub(crate) fn execute(
    interpreter: &Interpreter,
    builtin: Builtin,
    args: Vec<Value>,
    span: &Span,
    context: &Rc<Context>,
) -> Result<Value> {
    let arg = args.into_iter().next().unwrap_or_else(Value::null);
    let io_error = |err: io::Error| {
        Error::runtime(RuntimeErrorKind::Io, span.clone(), err.to_string(), context)
    };
    let console = interpreter.console();

    let result = match builtin {
        Builtin::Print => {
            console.write_line(&arg.to_string()).map_err(io_error)?;
            Value::null()
        }
        Builtin::Input => Value::string(console.read_line().map_err(io_error)?),
        Builtin::Clear => {
            console.clear().map_err(io_error)?;
            Value::null()
        }
        Builtin::Type => Value::string(arg.type_name()),
        Builtin::Len => match arg.element_count() {
            Some(n) => Value::number(n as f64),
            None => {
                return Err(Error::runtime(
                    RuntimeErrorKind::InvalidArgument,
                    span.clone(),
                    format!("Argument of type '{}' has no length", arg.type_name()),
                    context,
                ))
            }
        },
        Builtin::Run => {
            run_script(interpreter, &arg, span, context)?;
            Value::null()
        }
    };

    Ok(result.stamped(span.clone(), context))
}

/// Executes the file named by `path` against the global table of `context`
fn run_script(
    interpreter: &Interpreter,
    path: &Value,
    span: &Span,
    context: &Rc<Context>,
) -> Result<()> {
    let path = match path.as_str() {
        Some(path) => path,
        None => {
            return Err(Error::runtime(
                RuntimeErrorKind::InvalidArgument,
                span.clone(),
                format!("Expected a string path, got {}", path.type_name()),
                context,
            ))
        }
    };

    let text = std::fs::read_to_string(path).map_err(|err| {
        Error::runtime(
            RuntimeErrorKind::Io,
            span.clone(),
            format!("Failed to load script \"{}\"\n{}", path, err),
            context,
        )
    })?;

    let depth = interpreter.enter_depth(span, context)?;
    let mut root = context;
    while let Some(parent) = root.parent() {
        root = parent;
    }

    tracing::debug!(path, depth, "running script");
    crate::run_nested(path, &text, root.symbols(), interpreter, depth).map_err(|err| {
        Error::runtime(
            RuntimeErrorKind::Script,
            span.clone(),
            format!(
                "Failed to finish executing script \"{}\"\n{}",
                path,
                err.describe()
            ),
            context,
        )
    })?;

    Ok(())
}
