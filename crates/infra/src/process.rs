//! Launching a server under test as a child process.
//!
//! The server runs in its own process group so that `stop` also takes down
//! whatever the launcher forked (`npm run` spawns a shell, which spawns node).

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use testrig_core::HarnessError;

/// How long `stop` waits for the group to exit before killing it.
const STOP_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited before its pid could be read")]
    NoPid { program: String },
}

impl From<LaunchError> for HarnessError {
    fn from(err: LaunchError) -> Self {
        HarnessError::process(err.to_string())
    }
}

/// Server launch configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Executable to run.
    pub program: OsString,
    /// Arguments passed verbatim.
    pub args: Vec<OsString>,
    /// Working directory (inherits ours when unset).
    pub current_dir: Option<PathBuf>,
    /// Extra environment variables.
    pub envs: Vec<(OsString, OsString)>,
    /// Forward the child's stdout/stderr lines to the log.
    pub log_output: bool,
    /// Fixed wait after spawning, giving the server time to bind.
    pub startup_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            program: OsString::from("npm"),
            args: Vec::new(),
            current_dir: None,
            envs: Vec::new(),
            log_output: false,
            startup_delay: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// `npm run -s <script>`, the usual way a JS project starts its test server.
    pub fn npm_script(script: impl AsRef<OsStr>) -> Self {
        Self::default().with_args(["run", "-s"]).with_arg(script)
    }

    /// Run an arbitrary program.
    pub fn command(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            ..Self::default()
        }
    }

    pub fn with_arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    pub fn with_log_output(mut self, log_output: bool) -> Self {
        self.log_output = log_output;
        self
    }

    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    fn build_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).envs(self.envs.iter().map(|(k, v)| (k, v)));
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        let output = || {
            if self.log_output {
                Stdio::piped()
            } else {
                Stdio::null()
            }
        };
        command
            .stdin(Stdio::null())
            .stdout(output())
            .stderr(output())
            .kill_on_drop(true);

        // Leader of a fresh group: the whole tree can be signalled at once.
        #[cfg(unix)]
        command.process_group(0);

        command
    }
}

/// A running server process.
///
/// Call [`stop`](Self::stop) to terminate the process group gracefully and
/// reap it. Dropping the handle without stopping (a panicking test, an early
/// `?`) kills the whole group outright.
#[derive(Debug)]
pub struct ServerProcess {
    child: Child,
    pid: u32,
    program: String,
    log_tasks: Vec<JoinHandle<()>>,
    stopped: bool,
}

impl ServerProcess {
    /// Spawn the configured command and wait out its startup delay.
    pub async fn start(config: ServerConfig) -> Result<Self, LaunchError> {
        let program = config.program_name();
        let mut child = config
            .build_command()
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: program.clone(),
                source,
            })?;

        let pid = child.id().ok_or_else(|| LaunchError::NoPid {
            program: program.clone(),
        })?;

        let mut log_tasks = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            log_tasks.push(forward_lines(stdout, pid, "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            log_tasks.push(forward_lines(stderr, pid, "stderr"));
        }

        info!(pid, program = %program, "server process started");
        sleep(config.startup_delay).await;

        Ok(Self {
            child,
            pid,
            program,
            log_tasks,
            stopped: false,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether the group leader is still alive.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Terminate the process group and reap the leader.
    ///
    /// Failures are logged, never returned: a server that already died is not
    /// a reason to fail the test suite's teardown.
    pub async fn stop(mut self) {
        self.stopped = true;
        self.terminate_group();

        match tokio::time::timeout(STOP_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => debug!(pid = self.pid, %status, "server process exited"),
            Ok(Err(e)) => warn!(pid = self.pid, error = %e, "failed to reap server process"),
            Err(_) => {
                warn!(pid = self.pid, "server ignored SIGTERM; killing its process group");
                self.kill_group();
                if let Err(e) = self.child.wait().await {
                    warn!(pid = self.pid, error = %e, "failed to reap server process");
                }
            }
        }

        self.abort_log_tasks();
        info!(pid = self.pid, program = %self.program, "server process stopped");
    }

    fn abort_log_tasks(&mut self) {
        for task in self.log_tasks.drain(..) {
            task.abort();
        }
    }

    #[cfg(unix)]
    fn terminate_group(&mut self) {
        self.signal_group(nix::sys::signal::Signal::SIGTERM);
    }

    #[cfg(unix)]
    fn kill_group(&mut self) {
        self.signal_group(nix::sys::signal::Signal::SIGKILL);
    }

    #[cfg(unix)]
    fn signal_group(&self, signal: nix::sys::signal::Signal) {
        use nix::errno::Errno;
        use nix::sys::signal::killpg;
        use nix::unistd::Pid;

        match killpg(Pid::from_raw(self.pid as i32), signal) {
            Ok(()) => debug!(pid = self.pid, %signal, "signalled server process group"),
            // Nothing left in the group.
            Err(Errno::ESRCH) => debug!(pid = self.pid, %signal, "server process group already gone"),
            Err(errno) => warn!(pid = self.pid, %signal, %errno, "failed to signal server process group"),
        }
    }

    #[cfg(not(unix))]
    fn terminate_group(&mut self) {
        self.kill_group();
    }

    #[cfg(not(unix))]
    fn kill_group(&mut self) {
        if let Err(e) = self.child.start_kill() {
            warn!(pid = self.pid, error = %e, "failed to kill server process");
        }
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        if self.stopped {
            return;
        }
        warn!(pid = self.pid, program = %self.program, "server dropped without stop; killing its process group");
        self.kill_group();
        self.abort_log_tasks();
    }
}

fn forward_lines<R>(reader: R, pid: u32, stream: &'static str) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => info!(pid, stream, "{line}"),
                Ok(None) => break,
                Err(e) => {
                    debug!(pid, stream, error = %e, "stopped reading server output");
                    break;
                }
            }
        }
    })
}

/// Suspend the current task for `duration`.
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}
