use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Parser as _;
use lexi::{Interpreter, InterpreterConfig, Lexi, Reply, Shell, Source};
use reedline::{DefaultPrompt, DefaultPromptSegment, Reedline, Signal};

/// Stack for the evaluation thread; deep Lexi recursion nests native calls
const EVAL_STACK_SIZE: usize = 256 * 1024 * 1024;

const SHELL_PROMPT: &str = "<lexi#>";

/// Lexi - a small expression language
#[derive(clap::Parser, Debug)]
#[command(name = "lexi", version)]
#[command(about = "Run Lexi scripts or start the interactive shell", long_about = None)]
struct Args {
    /// Script to run (starts the shell when omitted)
    file: Option<PathBuf>,

    /// Code to evaluate instead of a file
    #[arg(short, long, conflicts_with = "file")]
    eval: Option<String>,

    /// Print the tokens as JSON instead of running
    #[arg(long)]
    tokens: bool,

    /// Print the expression tree as JSON instead of running
    #[arg(long, conflicts_with = "tokens")]
    ast: bool,

    /// Maximum nesting of function calls
    #[arg(long)]
    max_depth: Option<usize>,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    use tracing_subscriber::{fmt, EnvFilter};

    // LEXI_LOG controls the log level, warnings by default
    let filter = EnvFilter::try_from_env("LEXI_LOG").or_else(|_| EnvFilter::try_new("warn"))?;
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let handle = std::thread::Builder::new()
        .name("lexi".to_string())
        .stack_size(EVAL_STACK_SIZE)
        .spawn(move || dispatch(args))
        .context("failed to start the interpreter thread")?;

    match handle.join() {
        Ok(result) => result,
        Err(_) => anyhow::bail!("interpreter thread panicked"),
    }
}

fn dispatch(args: Args) -> Result<ExitCode> {
    let mut config = InterpreterConfig::default();
    if let Some(depth) = args.max_depth {
        config.max_call_depth = depth;
    }
    let lexi = Lexi::with_interpreter(Interpreter::with_config(config));

    let (name, text) = match (&args.eval, &args.file) {
        (Some(code), _) => ("<eval>".to_string(), code.clone()),
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            (path.display().to_string(), text)
        }
        (None, None) => return repl(lexi),
    };

    if args.tokens || args.ast {
        return dump(&name, &text, args.ast);
    }

    match lexi.run(&name, &text) {
        Ok(value) => {
            println!("{}", value.repr());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{}", err.describe());
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Prints tokens, or the expression tree, as pretty JSON
fn dump(name: &str, text: &str, ast: bool) -> Result<ExitCode> {
    let tokens = match lexi::Scanner::from_source(Source::new(name, text)).scan_tokens() {
        Ok(tokens) => tokens,
        Err(err) => {
            eprintln!("{}", err.describe());
            return Ok(ExitCode::FAILURE);
        }
    };

    let json = if ast {
        match lexi::parse(tokens) {
            Ok(tree) => serde_json::to_string_pretty(&tree)?,
            Err(err) => {
                eprintln!("{}", err.describe());
                return Ok(ExitCode::FAILURE);
            }
        }
    } else {
        serde_json::to_string_pretty(&tokens)?
    };

    println!("{}", json);
    Ok(ExitCode::SUCCESS)
}

fn repl(lexi: Lexi) -> Result<ExitCode> {
    let mut shell = Shell::new(lexi);

    if !io::stdin().is_terminal() {
        // Piped input: one shell line per input line, no prompt
        for line in io::stdin().lock().lines() {
            let line = line.context("failed to read from stdin")?;
            respond(&mut shell, &line);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut line_editor = Reedline::create();
    let prompt = shell_prompt();

    println!("Lexi {} (Ctrl+D or Ctrl+C to exit)", lexi::VERSION);

    loop {
        let signal = line_editor
            .read_line(&prompt)
            .context("failed to read shell input")?;

        match signal {
            Signal::Success(buffer) => respond(&mut shell, &buffer),
            Signal::CtrlD | Signal::CtrlC => {
                println!();
                return Ok(ExitCode::SUCCESS);
            }
        }
    }
}

fn shell_prompt() -> DefaultPrompt {
    DefaultPrompt::new(
        DefaultPromptSegment::Basic(SHELL_PROMPT.to_string()),
        DefaultPromptSegment::Empty,
    )
}

fn respond(shell: &mut Shell, line: &str) {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.trim().is_empty() {
        return;
    }

    match shell.handle(line) {
        Ok(Reply::Done) => {}
        Ok(reply) => println!("{}", reply),
        Err(err) => println!("Error: {}", err),
    }
}
