use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};
use tracing::{debug, error, warn};

use crate::types::{ExecutionOutcome, FailureKind, NO_OUTPUT};

/// One external command to run to completion
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
    pub deadline: Duration,
}

impl CommandSpec {
    pub fn new(
        program: impl Into<OsString>,
        args: impl IntoIterator<Item = impl Into<OsString>>,
        working_dir: impl Into<PathBuf>,
        deadline: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: working_dir.into(),
            deadline,
        }
    }

    fn display_program(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

/// Runs a command under a deadline and reports exactly one outcome
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: CommandSpec) -> ExecutionOutcome;
}

/// Single-use outcome slot shared by the exit path and the deadline timer.
/// Whichever calls [`Settlement::settle`] first wins; later calls are no-ops.
struct Settlement {
    settled: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<ExecutionOutcome>>>,
}

impl Settlement {
    fn new() -> (Arc<Self>, oneshot::Receiver<ExecutionOutcome>) {
        let (tx, rx) = oneshot::channel();
        let settlement = Settlement {
            settled: AtomicBool::new(false),
            sender: Mutex::new(Some(tx)),
        };
        (Arc::new(settlement), rx)
    }

    fn settle(&self, outcome: ExecutionOutcome) -> bool {
        if self.settled.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(tx) = self.sender.lock().ok().and_then(|mut slot| slot.take()) {
            let _ = tx.send(outcome);
        }
        true
    }

    fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }
}

/// Spawns real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: CommandSpec) -> ExecutionOutcome {
        let program = spec.display_program();
        debug!(
            "Spawning {} {:?} in {}",
            program,
            spec.args,
            spec.working_dir.display()
        );

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&spec.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            // own group, so the whole tree can be killed on timeout
            .process_group(0);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Command not found: {}", program);
                return ExecutionOutcome::toolchain_missing(&program);
            }
            Err(e) => {
                error!("Failed to spawn {}: {}", program, e);
                return ExecutionOutcome::failure(FailureKind::InternalError, e.to_string());
            }
        };

        let (settlement, mut settled) = Settlement::new();
        let deadline = spec.deadline;
        let pid = child.id();
        let timer = tokio::spawn({
            let settlement = settlement.clone();
            async move {
                time::sleep(deadline).await;
                if settlement.settle(ExecutionOutcome::timeout(deadline)) {
                    warn!("{} exceeded its {:?} deadline, killing it", program, deadline);
                    if let Some(pid) = pid {
                        terminate(pid);
                    }
                }
            }
        });
        let _guard = DeadlineGuard {
            timer,
            settlement: settlement.clone(),
            pid,
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let exited = async {
            let (status, stdout, stderr) =
                tokio::join!(child.wait(), read_stream(stdout), read_stream(stderr));
            match status {
                Ok(status) => classify_exit(status, stdout, stderr),
                Err(e) => {
                    error!("Failed to wait for {}: {}", spec.display_program(), e);
                    ExecutionOutcome::failure(FailureKind::InternalError, e.to_string())
                }
            }
        };

        // a descendant that left the process group can hold the pipes open
        // past the kill, so the deadline must not wait for EOF
        let timed_out = tokio::select! {
            outcome = exited => {
                settlement.settle(outcome);
                None
            }
            outcome = &mut settled => Some(outcome),
        };
        let outcome = match timed_out {
            Some(outcome) => outcome,
            None => settled.await,
        };

        outcome.unwrap_or_else(|_| {
            ExecutionOutcome::failure(
                FailureKind::InternalError,
                "Process finished without an outcome",
            )
        })
    }
}

/// Stops the deadline timer when a run ends. A run abandoned before it
/// settled (its future was dropped) kills the process group on the spot,
/// since `kill_on_drop` only reaches the group leader.
struct DeadlineGuard {
    timer: JoinHandle<()>,
    settlement: Arc<Settlement>,
    pid: Option<u32>,
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        self.timer.abort();
        if self.settlement.is_settled() {
            return;
        }
        if let Some(pid) = self.pid {
            debug!("Run abandoned before settling, killing process group {}", pid);
            terminate(pid);
        }
    }
}

/// SIGKILL the process group led by `pid`, falling back to the process itself
fn terminate(pid: u32) {
    let pid = Pid::from_raw(pid as i32);
    match killpg(pid, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => {
            debug!("killpg({}) failed: {}, signalling the process", pid, e);
            if let Err(e) = kill(pid, Signal::SIGKILL) {
                debug!("kill({}) failed: {}", pid, e);
            }
        }
    }
}

async fn read_stream<R>(stream: Option<R>) -> String
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        if let Err(e) = stream.read_to_end(&mut buf).await {
            debug!("Stopped reading child output: {}", e);
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn classify_exit(status: ExitStatus, stdout: String, stderr: String) -> ExecutionOutcome {
    if status.success() {
        let output = if stdout.is_empty() {
            NO_OUTPUT.to_string()
        } else {
            stdout
        };
        return ExecutionOutcome::success(output);
    }

    let message = if !stderr.is_empty() {
        stderr
    } else if !stdout.is_empty() {
        stdout
    } else {
        match status.code() {
            Some(code) => format!("Process exited with code {code}"),
            None => {
                use std::os::unix::process::ExitStatusExt;
                match status.signal() {
                    Some(signal) => format!("Process terminated by signal {signal}"),
                    None => "Process exited abnormally".to_string(),
                }
            }
        }
    };
    ExecutionOutcome::failure(FailureKind::RuntimeError, message)
}
