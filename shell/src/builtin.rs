use crate::interpreter;
use crate::session::Session;
use anyhow::{Context, Result, anyhow, bail};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process, without forking.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd".
    fn name() -> &'static str;

    /// Executes the command against the session.
    ///
    /// An `Err` is a user-facing message; the dispatcher prints it on the
    /// session's error writer and the shell carries on.
    fn execute(self, session: &mut Session) -> Result<()>;
}

type Handler = fn(&mut Session, &[&str]);

fn run<T: BuiltinCommand>(session: &mut Session, args: &[&str]) {
    match T::from_args(&[T::name()], args) {
        Ok(cmd) => {
            if let Err(e) = cmd.execute(session) {
                session.report(e);
            }
        }
        Err(EarlyExit { output, status }) => {
            let target = if status.is_ok() {
                &mut session.out
            } else {
                &mut session.err
            };
            let _ = writeln!(target, "{}", output.trim_end());
        }
    }
}

fn match_builtin(name: &str) -> Option<Handler> {
    match name {
        "exit" => Some(run::<Exit>),
        "cd" => Some(run::<Cd>),
        "help" => Some(run::<Help>),
        "prev" => Some(run::<Prev>),
        "source" => Some(run::<Source>),
        _ => None,
    }
}

/// Whether `name` is executed in-process.
pub fn is_builtin(name: &str) -> bool {
    match_builtin(name).is_some()
}

/// Run `args` as a builtin if `args[0]` names one.
///
/// Returns false (and does nothing) for anything else, including an empty
/// argument list. Errors are reported on the session and still count as handled.
pub fn try_builtin(session: &mut Session, args: &[String]) -> bool {
    let Some((name, rest)) = args.split_first() else {
        return false;
    };
    let Some(handler) = match_builtin(name) else {
        return false;
    };
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
    handler(session, &rest);
    true
}

#[derive(FromArgs)]
/// Exit the shell.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, session: &mut Session) -> Result<()> {
        session.should_exit = true;
        writeln!(session.out, "{}", session.farewell).map_err(|e| anyhow!("exit: {e}"))?;
        Ok(())
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; absolute or relative to the current directory.
    /// Words after it are ignored.
    pub args: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, session: &mut Session) -> Result<()> {
        let Some(target) = self.args.into_iter().next() else {
            bail!("cd: expected argument");
        };
        env::set_current_dir(&target).map_err(|e| anyhow!("cd: {e}"))?;
        session.current_dir = env::current_dir().context("cd")?;
        Ok(())
    }
}

const HELP_TEXT: &str = "\
Built-in commands:
  exit - Exit the shell
  cd [dir] - Change directory to 'dir'
  help - Show this help message
  prev - Execute the previous command
  source [file] - Execute commands from 'file'";

#[derive(FromArgs)]
/// Show the list of builtin commands.
pub struct Help {
    #[argh(positional, greedy)]
    /// ignored
    pub _args: Vec<String>,
}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn execute(self, session: &mut Session) -> Result<()> {
        writeln!(session.out, "{HELP_TEXT}")?;
        Ok(())
    }
}

#[derive(FromArgs)]
/// Print and re-run the previous command line.
pub struct Prev {
    #[argh(positional, greedy)]
    /// ignored
    pub _args: Vec<String>,
}

impl BuiltinCommand for Prev {
    fn name() -> &'static str {
        "prev"
    }

    fn execute(self, session: &mut Session) -> Result<()> {
        let Some(line) = session.previous_line.clone() else {
            writeln!(session.out, "No previous command.")?;
            return Ok(());
        };
        if !session.enter() {
            bail!("prev: maximum nesting depth exceeded");
        }
        // A failed echo is reported but does not stop the re-run.
        if let Err(e) = writeln!(session.out, "{line}") {
            session.report(format!("prev: {e}"));
        }
        interpreter::execute_line(session, &line);
        session.leave();
        Ok(())
    }
}

#[derive(FromArgs)]
/// Execute commands from a file, one line at a time.
pub struct Source {
    #[argh(positional, greedy)]
    /// file to read commands from. Words after it are ignored.
    pub args: Vec<String>,
}

impl BuiltinCommand for Source {
    fn name() -> &'static str {
        "source"
    }

    fn execute(self, session: &mut Session) -> Result<()> {
        let Some(file) = self.args.into_iter().next() else {
            bail!("source: expected filename");
        };
        source_file(session, Path::new(&file))
    }
}

/// Execute every non-blank line of `path` in order.
///
/// Stops at the first read error, or when a line runs `exit`. Lines are not
/// recorded as the previous command.
pub(crate) fn source_file(session: &mut Session, path: &Path) -> Result<()> {
    let file = File::open(path).map_err(|e| anyhow!("source: {e}"))?;
    if !session.enter() {
        bail!("source: maximum nesting depth exceeded");
    }
    let result = execute_lines(session, BufReader::new(file));
    session.leave();
    result.map_err(|e| anyhow!("source: {e}"))
}

fn execute_lines(session: &mut Session, reader: impl BufRead) -> std::io::Result<()> {
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        interpreter::execute_line(session, &line);
        if session.should_exit {
            break;
        }
    }
    Ok(())
}
