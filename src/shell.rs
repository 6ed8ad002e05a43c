//! Interactive shell with a small project manager
//!
//! A line is either Lexi code, run immediately, or a backtick command:
//!
//! - `` 3`code `` stores `code` as fragment 3 (an empty fragment removes it)
//! - `` `ls `` lists the stored fragments
//! - `` `clear `` removes every fragment
//! - `` `run `` joins the fragments in ascending order and runs them
//!
//! Fragments are joined with newlines, so a program may be spread over
//! several of them.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use thiserror::Error;

use crate::{Error, Lexi, Value};

/// Pseudo file name of code typed into the shell
pub const SHELL_SOURCE: &str = "<stdin>";

/// Shell failures that are not Lexi errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShellError {
    /// Backtick command that does not exist
    #[error("Unknown command '`{0}'")]
    UnknownCommand(String),

    /// Fragment number that does not fit
    #[error("Invalid fragment number '{0}'")]
    InvalidIndex(String),

    /// `` `run `` without fragments
    #[error("Nothing to run")]
    NothingToRun,
}

/// A parsed shell line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Code to run right away
    Eval(String),
    /// Store `code` as fragment `index`
    Store {
        /// Fragment number
        index: u32,
        /// Fragment text
        code: String,
    },
    /// List fragments
    List,
    /// Remove all fragments
    Clear,
    /// Run the joined fragments
    Run,
}

impl ShellCommand {
    /// Parses one line typed into the shell
    pub fn parse(line: &str) -> Result<Self, ShellError> {
        let Some((name, rest)) = line.split_once('`') else {
            return Ok(ShellCommand::Eval(line.to_string()));
        };
        // Anything after a second backtick is ignored
        let data = rest.split('`').next().unwrap_or_default();

        if !name.is_empty() && name.chars().all(|c| c.is_ascii_digit()) {
            let index = name
                .parse()
                .map_err(|_| ShellError::InvalidIndex(name.to_string()))?;
            return Ok(ShellCommand::Store {
                index,
                code: data.to_string(),
            });
        }

        match data.trim() {
            "ls" => Ok(ShellCommand::List),
            "clear" => Ok(ShellCommand::Clear),
            "run" => Ok(ShellCommand::Run),
            other => Err(ShellError::UnknownCommand(other.to_string())),
        }
    }
}

/// Numbered source fragments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    fragments: BTreeMap<u32, String>,
}

impl Project {
    /// Creates an empty project
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `code` as fragment `index`, replacing any previous text;
    /// empty code removes the fragment
    pub fn store(&mut self, index: u32, code: impl Into<String>) {
        let code = code.into();
        if code.is_empty() {
            self.fragments.remove(&index);
        } else {
            self.fragments.insert(index, code);
        }
    }

    /// Fragments in ascending order
    pub fn fragments(&self) -> impl Iterator<Item = (u32, &str)> {
        self.fragments.iter().map(|(i, code)| (*i, code.as_str()))
    }

    /// Removes every fragment
    pub fn clear(&mut self) {
        self.fragments.clear();
    }

    /// Checks whether no fragment is stored
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// All fragments joined with newlines, `None` when empty
    pub fn source(&self) -> Option<String> {
        if self.fragments.is_empty() {
            return None;
        }
        let parts: Vec<&str> = self.fragments.values().map(String::as_str).collect();
        Some(parts.join("\n"))
    }
}

/// What the shell has to show after a line
#[derive(Debug)]
pub enum Reply {
    /// A program produced a value
    Value(Value),
    /// A program failed
    Failure(Error),
    /// Fragment listing
    Listing(Vec<(u32, String)>),
    /// Project changed, nothing to show
    Done,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Reply::Value(value) => write!(f, "{}", value.repr()),
            Reply::Failure(err) => write!(f, "{}", err.describe()),
            Reply::Listing(fragments) => {
                for (i, (index, code)) in fragments.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}`{}", index, code)?;
                }
                Ok(())
            }
            Reply::Done => Ok(()),
        }
    }
}

/// Shell state: a Lexi session plus the project being edited
#[derive(Default)]
pub struct Shell {
    lexi: Lexi,
    project: Project,
}

impl Shell {
    /// Creates a shell around `lexi`
    pub fn new(lexi: Lexi) -> Self {
        Shell {
            lexi,
            project: Project::new(),
        }
    }

    /// Handles one line of input
    pub fn handle(&mut self, line: &str) -> Result<Reply, ShellError> {
        let command = ShellCommand::parse(line)?;
        tracing::debug!(?command, "shell command");

        match command {
            ShellCommand::Eval(code) => Ok(self.execute(&code)),
            ShellCommand::Store { index, code } => {
                self.project.store(index, code);
                Ok(Reply::Done)
            }
            ShellCommand::List => Ok(Reply::Listing(
                self.project
                    .fragments()
                    .map(|(i, code)| (i, code.to_string()))
                    .collect(),
            )),
            ShellCommand::Clear => {
                self.project.clear();
                Ok(Reply::Done)
            }
            ShellCommand::Run => {
                let source = self.project.source().ok_or(ShellError::NothingToRun)?;
                Ok(self.execute(&source))
            }
        }
    }

    fn execute(&self, code: &str) -> Reply {
        let started = Instant::now();
        let result = self.lexi.run(SHELL_SOURCE, code);
        tracing::debug!(
            seconds = started.elapsed().as_secs_f64(),
            ok = result.is_ok(),
            "shell program finished"
        );

        match result {
            Ok(value) => Reply::Value(value),
            Err(err) => Reply::Failure(err),
        }
    }

    /// Fragments stored so far
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Session used to run code
    pub fn lexi(&self) -> &Lexi {
        &self.lexi
    }
}
