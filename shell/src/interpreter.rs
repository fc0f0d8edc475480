use crate::builtin;
use crate::config::ShellConfig;
use crate::parser::parse_stage;
use crate::pipeline;
use crate::session::Session;
use crate::splitter::{self, PIPE, SEQUENCE};
use log::{debug, info, warn};
use rustyline::config::Config;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result};
use std::io::{self, IsTerminal, Write};
use std::path::Path;

/// Execute one command line: `;`-separated sequences in order, each either a
/// single stage or a `|` pipeline.
///
/// Never fails. Every problem is reported on the session's error writer and
/// the next sequence still runs, unless a builtin asked the shell to exit.
pub fn execute_line(session: &mut Session, line: &str) {
    for sequence in splitter::split(line, SEQUENCE) {
        if session.should_exit {
            break;
        }
        execute_sequence(session, &sequence);
    }
}

fn execute_sequence(session: &mut Session, sequence: &str) {
    let stages = splitter::split(sequence, PIPE);
    let result = match stages.as_slice() {
        [] => return,
        [single] => {
            let stage = parse_stage(single);
            if stage.is_empty() || builtin::try_builtin(session, &stage.args) {
                return;
            }
            pipeline::run_single(session, &stage)
        }
        _ => pipeline::run_pipeline(session, &stages),
    };
    match result {
        Ok(report) => debug!("{sequence:?} exited with {:?}", report.exit_codes()),
        Err(e) => {
            warn!("{sequence:?}: {e}");
            session.report(e);
        }
    }
}

/// Interactive front end around a [`Session`].
///
/// Owns the session for the whole shell lifetime and records the previous
/// command line for `prev`.
pub struct Interpreter {
    session: Session,
    config: ShellConfig,
}

impl Interpreter {
    /// Interpreter on the process stdout/stderr, configured by `config`.
    pub fn new(config: ShellConfig) -> Self {
        Self::with_session(Session::new(), config)
    }

    /// Interpreter around an existing session. The configured farewell and
    /// nesting limit replace the session's.
    pub fn with_session(mut session: Session, config: ShellConfig) -> Self {
        session.farewell = config.farewell.clone();
        session.max_nesting = config.max_nesting;
        Self { session, config }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn should_exit(&self) -> bool {
        self.session.should_exit
    }

    /// Handle one raw line of user input.
    ///
    /// A trailing newline is stripped and empty lines are ignored. Every other
    /// line except `prev` itself becomes the new previous command before it runs.
    pub fn execute_input(&mut self, line: &str) {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            return;
        }
        if line.trim() != "prev" {
            self.session.previous_line = Some(line.to_string());
        }
        execute_line(&mut self.session, line);
        self.session.flush();
    }

    /// Execute every non-blank line of `path`, like `source`.
    pub fn run_script(&mut self, path: &Path) -> anyhow::Result<()> {
        info!("running script {}", path.display());
        let result = builtin::source_file(&mut self.session, path);
        self.session.flush();
        result
    }

    /// Read-Eval-Print Loop on stdin.
    ///
    /// The prompt is printed before every read, also when stdin is a pipe or
    /// a file. Ctrl-C discards the current line. End of input prints the farewell and
    /// returns, and so does `exit`.
    pub fn repl(&mut self) -> Result<()> {
        let history = &self.config.history;
        let editor_config = Config::builder()
            .max_history_size(history.max_entries)?
            .auto_add_history(false)
            .build();
        let mut rl = DefaultEditor::with_config(editor_config)?;
        let history_file = history.file.clone().filter(|_| history.enabled);
        if let Some(path) = &history_file {
            if let Err(err) = rl.load_history(path) {
                debug!("no history loaded from {}: {err}", path.display());
            }
        }

        let _ = writeln!(self.session.out, "{}", self.config.welcome);
        self.session.flush();
        // rustyline only draws the prompt on a terminal.
        let echo_prompt = !io::stdin().is_terminal();

        let result = loop {
            if echo_prompt {
                let _ = write!(self.session.out, "{}", self.config.prompt);
                self.session.flush();
            }
            match rl.readline(&self.config.prompt) {
                Ok(line) => {
                    if self.config.history.enabled && !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    self.execute_input(&line);
                    if self.session.should_exit {
                        break Ok(());
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    let _ = writeln!(self.session.out, "{}", self.session.farewell);
                    self.session.flush();
                    break Ok(());
                }
                Err(err) => break Err(err),
            }
        };

        if let Some(path) = &history_file {
            if let Err(err) = rl.save_history(path) {
                warn!("failed to save history to {}: {err}", path.display());
            }
        }
        result
    }
}
