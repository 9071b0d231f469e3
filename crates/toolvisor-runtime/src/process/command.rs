//! Command building and spawning for tool-server processes.
//!
//! A spawned server keeps all three stdio pipes: stdin stays open for the
//! life of the process, stdout is drained to `tracing`, stderr is drained
//! into a bounded tail buffer used for launch-failure reports.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use toolvisor_core::domain::ServerDefinition;

use super::error::ProcessError;
use super::shutdown::shutdown_child;
use super::stream::{StderrTail, spawn_line_reader};

/// Everything needed to launch one server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Identifier used in log fields.
    pub server_id: String,
    pub program: String,
    pub args: Vec<String>,
    /// Applied on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    pub working_dir: PathBuf,
}

impl LaunchSpec {
    /// Launch spec for a server definition, run from `working_dir`.
    pub fn for_server(server: &ServerDefinition, working_dir: PathBuf) -> Self {
        Self {
            server_id: server.id.clone(),
            program: server.command.clone(),
            args: server.arguments.clone(),
            env: server.environment.clone(),
            working_dir,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(&self.env)
            .current_dir(&self.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// A running child process owned by the supervisor.
#[derive(Debug)]
pub struct SupervisedProcess {
    pid: u32,
    /// Locked for each liveness check and for the whole shutdown sequence.
    child: Mutex<Child>,
    stdin: std::sync::Mutex<Option<ChildStdin>>,
    stderr: StderrTail,
    stderr_reader: std::sync::Mutex<Option<JoinHandle<()>>>,
}

/// Spawn the process described by `spec`.
pub fn spawn(spec: &LaunchSpec) -> Result<SupervisedProcess, ProcessError> {
    let mut child = spec.command().spawn().map_err(|source| ProcessError::Spawn {
        program: spec.program.clone(),
        source,
    })?;

    let pid = child.id().ok_or(ProcessError::MissingPid)?;
    debug!(server_id = %spec.server_id, pid, program = %spec.program, "Spawned server process");

    if let Some(stdout) = child.stdout.take() {
        spawn_line_reader(stdout, spec.server_id.clone(), "stdout", |_| {});
    }

    let stderr = StderrTail::new();
    let stderr_reader = child.stderr.take().map(|pipe| {
        let sink = stderr.clone();
        spawn_line_reader(pipe, spec.server_id.clone(), "stderr", move |line| {
            sink.push_line(line);
        })
    });

    let stdin = child.stdin.take();

    Ok(SupervisedProcess {
        pid,
        child: Mutex::new(child),
        stdin: std::sync::Mutex::new(stdin),
        stderr,
        stderr_reader: std::sync::Mutex::new(stderr_reader),
    })
}

impl SupervisedProcess {
    /// OS process id captured at spawn.
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Exit status if the process has exited, without blocking.
    pub async fn try_wait(&self) -> io::Result<Option<ExitStatus>> {
        self.child.lock().await.try_wait()
    }

    /// Access to the child for callers that must race the lock against
    /// something else (the health monitor races it against cancellation).
    pub async fn lock_child(&self) -> tokio::sync::MutexGuard<'_, Child> {
        self.child.lock().await
    }

    /// Currently retained standard-error output.
    pub fn stderr_snapshot(&self) -> String {
        self.stderr.snapshot()
    }

    /// Standard error after the process exited.
    ///
    /// Waits up to `limit` for the reader to hit end-of-file so the tail is
    /// complete, then returns whatever was captured.
    pub async fn collect_stderr(&self, limit: Duration) -> String {
        let reader = self
            .stderr_reader
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(reader) = reader {
            if tokio::time::timeout(limit, reader).await.is_err() {
                debug!(pid = self.pid, ?limit, "Stderr reader still open, returning partial tail");
            }
        }
        self.stderr.snapshot()
    }

    /// SIGTERM, wait up to `grace`, then SIGKILL; always reaps.
    pub async fn shutdown(&self, grace: Duration) -> io::Result<ExitStatus> {
        // Closing stdin first lets well-behaved stdio servers exit on EOF
        drop(
            self.stdin
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .take(),
        );
        let mut child = self.child.lock().await;
        shutdown_child(&mut child, grace).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(program: &str, args: &[&str]) -> LaunchSpec {
        LaunchSpec {
            server_id: "test".to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            env: BTreeMap::new(),
            working_dir: std::env::temp_dir(),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let result = spawn(&spec("definitely-not-a-real-binary-xyz", &[]));
        assert!(matches!(result, Err(ProcessError::Spawn { .. })));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_stdin_is_held_open() {
        // cat exits on stdin EOF, so staying alive proves the pipe is open
        let process = spawn(&spec("cat", &[])).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(process.try_wait().await.unwrap().is_none());

        process.shutdown(Duration::from_secs(2)).await.unwrap();
        assert!(process.try_wait().await.unwrap().is_some());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_stderr_is_captured() {
        let process = spawn(&spec("sh", &["-c", "echo boom >&2; exit 3"])).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        let status = process.try_wait().await.unwrap().unwrap();
        assert_eq!(status.code(), Some(3));
        let stderr = process.collect_stderr(Duration::from_secs(1)).await;
        assert_eq!(stderr, "boom\n");
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_env_and_working_dir_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        let mut launch = spec("sh", &["-c", "echo \"$GREETING\" > out.txt"]);
        launch.env.insert("GREETING".to_string(), "hello".to_string());
        launch.working_dir = dir.path().to_path_buf();

        let process = spawn(&launch).unwrap();
        let mut exited = false;
        for _ in 0..40 {
            if process.try_wait().await.unwrap().is_some() {
                exited = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        assert!(exited);
        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written, "hello\n");
    }
}
