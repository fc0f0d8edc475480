use std::env as stdenv;
use std::io::{self, Write};
use std::path::PathBuf;

/// Nesting limit for `prev` and `source` when no configuration overrides it.
pub const DEFAULT_MAX_NESTING: usize = 64;
/// Message printed by `exit` and at end of input.
pub const DEFAULT_FAREWELL: &str = "Bye bye.";

/// Mutable state shared by every line executed during one shell lifetime.
///
/// Builtins report through `out` and `err` rather than the process streams so the
/// whole engine can run with captured output. External programs always inherit
/// the real descriptors.
pub struct Session {
    /// Working directory as last set by `cd`. The OS copy is authoritative.
    pub current_dir: PathBuf,
    /// The last top-level line other than `prev`.
    pub previous_line: Option<String>,
    /// Set by `exit`; every execution loop stops once it is true.
    pub should_exit: bool,
    pub farewell: String,
    pub max_nesting: usize,
    pub out: Box<dyn Write>,
    pub err: Box<dyn Write>,
    depth: usize,
}

impl Session {
    /// Session writing to the process stdout/stderr.
    pub fn new() -> Self {
        Self::with_writers(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    pub fn with_writers(out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            current_dir,
            previous_line: None,
            should_exit: false,
            farewell: DEFAULT_FAREWELL.to_string(),
            max_nesting: DEFAULT_MAX_NESTING,
            out,
            err,
            depth: 0,
        }
    }

    /// Report a user-facing error on the error writer.
    pub fn report(&mut self, msg: impl std::fmt::Display) {
        let _ = writeln!(self.err, "{msg}");
    }

    /// Flush both writers and the process stdout.
    ///
    /// Called before every fork: anything still buffered would otherwise show
    /// up after the child's output, or twice.
    pub fn flush(&mut self) {
        let _ = self.out.flush();
        let _ = self.err.flush();
        let _ = io::stdout().flush();
    }

    /// Enter one level of `prev`/`source` re-entry. Returns false when the limit
    /// is reached; the caller must not call [`Session::leave`] in that case.
    pub fn enter(&mut self) -> bool {
        if self.depth >= self.max_nesting {
            return false;
        }
        self.depth += 1;
        true
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
