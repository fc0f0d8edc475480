use crate::error::ExecError;
use crate::parser::Stage;
use nix::errno::Errno;
use nix::fcntl::{self, OFlag};
use nix::libc;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::stat::Mode;
use nix::unistd;
use std::borrow::Cow;
use std::ffi::{CStr, CString, OsStr};
use std::io;
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Search path used when `PATH` is unset, matching `execvp`.
const DEFAULT_SEARCH_PATH: &str = "/bin:/usr/bin";
/// Interpreter for executables without a recognized binary format.
const FALLBACK_SHELL: &CStr = c"/bin/sh";

/// What the child turns into once its descriptors are wired.
enum Image {
    Program(CString),
    /// Print the message and exit 1 without exec.
    Refuse(Vec<u8>),
}

/// A stage with every byte the child will need already allocated.
///
/// Everything here is built in the parent. After fork the child only calls
/// `dup2`, `open`, `close`, `execv`, `write` and `_exit`.
pub struct ExternalCommand {
    argv: Vec<CString>,
    /// `/bin/sh <program> <args...>`, run when the kernel returns `ENOEXEC`.
    script_argv: Vec<CString>,
    image: Image,
    not_found: Vec<u8>,
    input: Option<CString>,
    output: Option<CString>,
}

impl ExternalCommand {
    /// Resolve the stage's program against `search_paths` (a `PATH` value).
    ///
    /// Resolution failure is not an error here: the child reports
    /// `<name>: command not found` and exits 1, like a failed exec.
    pub fn resolve(stage: &Stage, search_paths: Option<&OsStr>) -> Result<Self, ExecError> {
        let name = stage.program().unwrap_or_default();
        let search_paths = search_paths.unwrap_or(OsStr::new(DEFAULT_SEARCH_PATH));
        let image = match find_command_path(search_paths, Path::new(name)) {
            Some(path) => Image::Program(to_cstring(path.as_os_str().as_bytes(), name)?),
            None => Image::Refuse(not_found_message(name)),
        };
        Self::build(stage, image)
    }

    /// A stage that must not exec anything; the child prints `msg` and exits 1.
    pub fn refuse(stage: &Stage, msg: &str) -> Result<Self, ExecError> {
        Self::build(stage, Image::Refuse(format!("{msg}\n").into_bytes()))
    }

    fn build(stage: &Stage, image: Image) -> Result<Self, ExecError> {
        let name = stage.program().unwrap_or_default();
        let argv = stage
            .args
            .iter()
            .map(|arg| to_cstring(arg.as_bytes(), name))
            .collect::<Result<Vec<_>, _>>()?;
        let input = stage
            .input
            .as_deref()
            .map(|p| to_cstring(p.as_bytes(), p))
            .transpose()?;
        let output = stage
            .output
            .as_deref()
            .map(|p| to_cstring(p.as_bytes(), p))
            .transpose()?;
        let script_argv = match &image {
            Image::Program(path) => [FALLBACK_SHELL.to_owned(), path.clone()]
                .into_iter()
                .chain(argv.iter().skip(1).cloned())
                .collect(),
            Image::Refuse(_) => Vec::new(),
        };
        Ok(Self {
            argv,
            script_argv,
            image,
            not_found: not_found_message(name),
            input,
            output,
        })
    }

    #[cfg(test)]
    fn is_resolved(&self) -> bool {
        matches!(self.image, Image::Program(_))
    }

    /// Child side of a fork: wire stdin/stdout, close every pipe descriptor and
    /// replace the process image. Never returns.
    ///
    /// Pipe ends are applied first and file redirections second, so a file
    /// always wins over the adjacent pipe. SIGPIPE is reset to its default
    /// first: the Rust runtime ignores it in the parent and an ignored
    /// disposition survives exec.
    pub(crate) fn exec_in_child(
        &self,
        stdin_pipe: Option<RawFd>,
        stdout_pipe: Option<RawFd>,
        pipe_fds: &[RawFd],
    ) -> ! {
        // SAFETY: SIG_DFL installs no handler; `signal` is async-signal-safe.
        let _ = unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) };

        if let (None, Some(fd)) = (&self.input, stdin_pipe) {
            let _ = unistd::dup2(fd, libc::STDIN_FILENO);
        }
        if let (None, Some(fd)) = (&self.output, stdout_pipe) {
            let _ = unistd::dup2(fd, libc::STDOUT_FILENO);
        }

        if let Some(path) = &self.input {
            redirect(path, OFlag::O_RDONLY, libc::STDIN_FILENO, b"Input redirection: ");
        }
        if let Some(path) = &self.output {
            redirect(
                path,
                OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
                libc::STDOUT_FILENO,
                b"Output redirection: ",
            );
        }

        for &fd in pipe_fds {
            let _ = unistd::close(fd);
        }

        match &self.image {
            Image::Program(path) => {
                if let Err(Errno::ENOEXEC) = unistd::execv(path, &self.argv) {
                    let _ = unistd::execv(FALLBACK_SHELL, &self.script_argv);
                }
                child_fail(&[self.not_found.as_slice()])
            }
            Image::Refuse(msg) => child_fail(&[msg.as_slice()]),
        }
    }
}

fn redirect(path: &CString, flags: OFlag, target: RawFd, context: &[u8]) {
    let mode = Mode::from_bits_truncate(0o644);
    match fcntl::open(path.as_c_str(), flags, mode) {
        Ok(fd) => {
            let _ = unistd::dup2(fd, target);
            let _ = unistd::close(fd);
        }
        Err(errno) => child_fail(&[context, errno.desc().as_bytes(), b"\n".as_slice()]),
    }
}

/// Write `parts` to stderr and leave the child without running any Rust
/// destructors or atexit handlers inherited from the parent.
fn child_fail(parts: &[&[u8]]) -> ! {
    for part in parts {
        let _ = unistd::write(io::stderr(), part);
    }
    unsafe { libc::_exit(1) }
}

fn not_found_message(name: &str) -> Vec<u8> {
    format!("{name}: command not found\n").into_bytes()
}

fn to_cstring(bytes: &[u8], context: &str) -> Result<CString, ExecError> {
    CString::new(bytes).map_err(|_| ExecError::NulByte(context.to_string()))
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it is an executable file.
/// - Relative with multiple components (e.g., `bin/sh`) or `./foo`: returns it
///   if it is an executable file, relative to the current directory.
/// - Single path component (no separators): search each directory in
///   `search_paths` (PATH) and return the first executable match.
/// - Empty path: returns `None`.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        (Some(x), None) if !path.starts_with(".") => {
            find_in_path(search_paths, x.as_os_str()).map(Cow::Owned)
        }
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    for dir in std::env::split_paths(search_paths) {
        let path = dir.join(cmd);
        if let Some(path) = find_by_path(&path) {
            return Some(path.to_owned());
        }
    }
    None
}

fn find_by_path(path: &Path) -> Option<&Path> {
    let meta = path.metadata().ok()?;
    if meta.is_file() && meta.permissions().mode() & 0o111 != 0 {
        Some(path)
    } else {
        None
    }
}
