//! A small interactive shell.
//!
//! A command line is split on `;` into sequences and each sequence on `|` into
//! stages. A stage is tokenized (double quotes group, backslash escapes) and its
//! `<`/`>` redirections are pulled out. Single-stage builtins (`exit`, `cd`,
//! `help`, `prev`, `source`) run in-process; everything else is forked and
//! exec'd, with one pipe between each pair of adjacent stages.
//!
//! The main entry points are [`execute_line`], which runs one line against a
//! [`Session`], and [`Interpreter`], which adds the interactive loop, the
//! previous-command record and configuration on top.

mod builtin;
pub mod config;
pub mod error;
mod external;
mod interpreter;
mod io_adapters;
mod lexer;
pub mod logging;
mod parser;
pub mod pipeline;
mod session;
pub mod splitter;

pub use builtin::{is_builtin, try_builtin};
pub use config::ShellConfig;
pub use external::find_command_path;
pub use interpreter::{Interpreter, execute_line};
pub use io_adapters::MemWriter;
pub use lexer::{Token, split_into_words};
pub use parser::{Stage, parse_stage};
pub use session::Session;
