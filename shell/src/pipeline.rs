//! Process orchestration: pipes, fork, descriptor wiring and reaping.
//!
//! Both resources are scoped. A [`PipeSet`] closes its descriptors when dropped
//! and a [`ChildSet`] reaps every pid it recorded when dropped, so an early
//! return (failed `pipe` or `fork`) leaks neither descriptors nor zombies.

use crate::builtin;
use crate::error::ExecError;
use crate::external::ExternalCommand;
use crate::parser::Stage;
use crate::session::Session;
use log::{debug, warn};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{self, ForkResult, Pid};
use std::env;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

/// What a finished pipeline looked like from the parent.
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// Pipes created, always `stages - 1`.
    pub pipes: usize,
    /// Processes forked. Stages without arguments are not forked.
    pub spawned: usize,
    /// One status per reaped child, in spawn order.
    pub statuses: Vec<WaitStatus>,
}

impl PipelineReport {
    /// Shell-style exit codes of the reaped children.
    pub fn exit_codes(&self) -> Vec<i32> {
        self.statuses.iter().map(status_code).collect()
    }
}

/// `N - 1` pipes for an `N`-stage pipeline; pipe `i` carries stage `i`'s
/// stdout to stage `i + 1`'s stdin.
struct PipeSet {
    pipes: Vec<(OwnedFd, OwnedFd)>,
}

impl PipeSet {
    /// Create all pipes up front. On failure the pipes created so far are closed.
    ///
    /// The pipes are close-on-exec: `dup2` clears the flag on the stdin/stdout
    /// copy a child keeps, while any other child forked concurrently (another
    /// thread's pipeline) drops them at exec instead of holding a write end open.
    fn open(count: usize) -> Result<Self, ExecError> {
        let mut pipes = Vec::with_capacity(count);
        for _ in 0..count {
            pipes.push(unistd::pipe2(OFlag::O_CLOEXEC).map_err(ExecError::Pipe)?);
        }
        Ok(Self { pipes })
    }

    fn len(&self) -> usize {
        self.pipes.len()
    }

    fn read_end(&self, i: usize) -> RawFd {
        self.pipes[i].0.as_raw_fd()
    }

    fn write_end(&self, i: usize) -> RawFd {
        self.pipes[i].1.as_raw_fd()
    }

    /// Every descriptor of every pipe. Collected before forking so the child
    /// does not allocate.
    fn raw_fds(&self) -> Vec<RawFd> {
        self.pipes
            .iter()
            .flat_map(|(r, w)| [r.as_raw_fd(), w.as_raw_fd()])
            .collect()
    }
}

/// Children forked for one pipeline. Dropping the set waits for all of them.
#[derive(Default)]
struct ChildSet {
    pids: Vec<Pid>,
}

impl ChildSet {
    fn with_capacity(n: usize) -> Self {
        Self {
            pids: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, pid: Pid) {
        self.pids.push(pid);
    }

    fn len(&self) -> usize {
        self.pids.len()
    }

    /// Wait for every recorded child. Only our own pids are waited on, never
    /// an unrelated child of the process.
    fn wait_all(&mut self) -> Vec<WaitStatus> {
        let mut statuses = Vec::with_capacity(self.pids.len());
        for pid in self.pids.drain(..) {
            match wait_for(pid) {
                Ok(status) => {
                    debug!("child {pid} finished: {status:?}");
                    statuses.push(status);
                }
                Err(e) => warn!("{}", ExecError::Wait(e)),
            }
        }
        statuses
    }
}

impl Drop for ChildSet {
    fn drop(&mut self) {
        if !self.pids.is_empty() {
            self.wait_all();
        }
    }
}

fn wait_for(pid: Pid) -> Result<WaitStatus, Errno> {
    loop {
        match waitpid(pid, None) {
            Err(Errno::EINTR) => continue,
            result => return result,
        }
    }
}

/// Shell-style exit code: the exit status, or 128 + signal number.
pub fn status_code(status: &WaitStatus) -> i32 {
    match *status {
        WaitStatus::Exited(_, code) => code,
        WaitStatus::Signaled(_, signal, _) => 128 + signal as i32,
        _ => -1,
    }
}

/// Run a single stage (no pipes) as an external program.
///
/// Builtins are dispatched by the caller before this point; here the stage is
/// always forked, even if its name matches a builtin.
pub fn run_single(session: &mut Session, stage: &Stage) -> Result<PipelineReport, ExecError> {
    let path = env::var_os("PATH");
    let command = ExternalCommand::resolve(stage, path.as_deref())?;
    spawn_all(session, vec![Some(command)])
}

/// Run `stage_texts` as one pipeline and block until every spawned child has
/// terminated.
///
/// Each stage is parsed on its own; its file redirections override the pipe
/// connection at that end. Builtins are not valid pipeline members: such a
/// stage is still forked to keep the pipe topology, but the child only reports
/// the problem and exits 1.
pub fn run_pipeline(
    session: &mut Session,
    stage_texts: &[String],
) -> Result<PipelineReport, ExecError> {
    let path = env::var_os("PATH");
    let mut commands = Vec::with_capacity(stage_texts.len());
    for text in stage_texts {
        let stage = crate::parser::parse_stage(text);
        debug!("pipeline stage {}: {:?}", commands.len(), stage);
        let command = match stage.program() {
            None => None,
            Some(name) if builtin::is_builtin(name) => Some(ExternalCommand::refuse(
                &stage,
                &format!("{name}: builtin not supported in a pipeline"),
            )?),
            Some(_) => Some(ExternalCommand::resolve(&stage, path.as_deref())?),
        };
        commands.push(command);
    }
    spawn_all(session, commands)
}

fn spawn_all(
    session: &mut Session,
    commands: Vec<Option<ExternalCommand>>,
) -> Result<PipelineReport, ExecError> {
    let n = commands.len();
    if n == 0 {
        return Ok(PipelineReport::default());
    }
    session.flush();

    // `pipes` is declared after `children`, so on an early return the pipes are
    // closed first and no child is left blocked on a pipe we still hold.
    let mut children = ChildSet::with_capacity(n);
    let pipes = PipeSet::open(n - 1)?;
    let pipe_fds = pipes.raw_fds();
    debug!("spawning {n} stage(s) over {} pipe(s)", pipes.len());

    for (i, command) in commands.iter().enumerate() {
        let Some(command) = command else {
            debug!("stage {i} has no arguments, nothing to run");
            continue;
        };
        let stdin_pipe = (i > 0).then(|| pipes.read_end(i - 1));
        let stdout_pipe = (i + 1 < n).then(|| pipes.write_end(i));

        match unsafe { unistd::fork() } {
            Ok(ForkResult::Parent { child }) => {
                debug!("stage {i} running as pid {child}");
                children.push(child);
            }
            Ok(ForkResult::Child) => command.exec_in_child(stdin_pipe, stdout_pipe, &pipe_fds),
            Err(e) => {
                warn!("fork failed for stage {i}: {e}");
                return Err(ExecError::Fork(e));
            }
        }
    }

    let pipe_count = pipes.len();
    drop(pipes);
    let spawned = children.len();
    let statuses = children.wait_all();

    Ok(PipelineReport {
        pipes: pipe_count,
        spawned,
        statuses,
    })
}
