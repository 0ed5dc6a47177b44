//! Dev-server session manager.
//!
//! A local state machine supervises the remote handler process through
//! narrow primitives on the [`CommandRunner`] seam: start the handler, probe
//! a pid, kill politely then forcibly, block on a one-shot recursive file
//! watch. The loop restarts the handler on every qualifying change and
//! reinstalls dependencies when the change touches a requirements file.
//!
//! Leaving [`DevServer::run`] by any path (cancellation, watch failure,
//! remote error) stops the active handler first. Stopping is idempotent:
//! a pid that is already gone counts as stopped.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ProjectFile;
use crate::error::{ProjectError, ProjectResult};
use crate::ignore;
use crate::paths::RemotePaths;
use crate::ssh::{CommandRunner, run_checked};

/// Grace period between the polite kill and the forced one.
const KILL_GRACE: Duration = Duration::from_secs(1);

/// Port the dev API server listens on inside the pod.
pub const DEV_API_PORT: u16 = 8080;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerState {
    Stopped,
    Starting,
    Running { pid: u32 },
    Restarting { pid: u32 },
}

pub struct DevServer<'a> {
    session: &'a dyn CommandRunner,
    project_dir: String,
    activate: String,
    handler: String,
    requirements: String,
    log_path: String,
    exclude: String,
    state: ServerState,
}

impl<'a> DevServer<'a> {
    pub fn new(
        session: &'a dyn CommandRunner,
        config: &ProjectFile,
        paths: &RemotePaths,
        ignore_patterns: &[String],
    ) -> Self {
        Self {
            session,
            project_dir: paths.project_dir().to_string(),
            activate: paths.activate(),
            handler: paths.handler(config),
            requirements: paths.requirements(config),
            log_path: paths.dev_log(),
            exclude: ignore::exclude_pattern(ignore_patterns),
            state: ServerState::Stopped,
        }
    }

    /// Supervise the handler until cancelled or a remote failure.
    ///
    /// The active handler is stopped before this returns, whatever the exit
    /// path.
    pub async fn run(&mut self, cancel: &CancellationToken) -> ProjectResult<()> {
        self.kill_stale_watchers().await;
        let result = self.supervise(cancel).await;
        let cleanup = self.stop().await;
        result.and(cleanup)
    }

    async fn supervise(&mut self, cancel: &CancellationToken) -> ProjectResult<()> {
        self.start().await?;
        loop {
            let changed = tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                changed = self.wait_for_change() => changed?,
            };
            info!(path = %changed, "change detected, restarting handler");
            if let ServerState::Running { pid } = self.state {
                self.state = ServerState::Restarting { pid };
            }
            self.stop().await?;
            if changed.contains("requirements") {
                info!("requirements changed, reinstalling dependencies");
                self.reinstall_requirements().await?;
            }
            self.start().await?;
        }
    }

    async fn start(&mut self) -> ProjectResult<()> {
        self.state = ServerState::Starting;
        let output = run_checked(self.session, &self.start_command()).await?;
        let pid = parse_pid(&output.stdout)?;
        self.state = ServerState::Running { pid };
        info!(pid, "handler started");
        Ok(())
    }

    /// Stop the active handler: polite kill, one second of grace, forced
    /// kill, re-verify. No-op when nothing is running.
    async fn stop(&mut self) -> ProjectResult<()> {
        let pid = match self.state {
            ServerState::Running { pid } | ServerState::Restarting { pid } => pid,
            ServerState::Stopped | ServerState::Starting => return Ok(()),
        };

        let polite = self.session.run(&format!("kill {pid}")).await?;
        if !polite.success() {
            // already gone
            debug!(pid, "handler was not running");
            self.state = ServerState::Stopped;
            return Ok(());
        }

        tokio::time::sleep(KILL_GRACE).await;
        if self.is_alive(pid).await? {
            warn!(pid, "graceful kill failed, sending SIGKILL");
            self.session.run(&format!("kill -9 {pid}")).await?;
            tokio::time::sleep(KILL_GRACE).await;
            if self.is_alive(pid).await? {
                return Err(ProjectError::DevServer(format!(
                    "failed to kill handler pid {pid}"
                )));
            }
        }

        debug!(pid, "handler stopped");
        self.state = ServerState::Stopped;
        Ok(())
    }

    async fn is_alive(&self, pid: u32) -> ProjectResult<bool> {
        let probe = self
            .session
            .run(&format!("kill -0 {pid} 2>/dev/null"))
            .await?;
        Ok(probe.success())
    }

    /// Block until one qualifying file change happens under the project
    /// directory; returns the changed path.
    async fn wait_for_change(&self) -> ProjectResult<String> {
        let output = self.session.run(&self.watch_command()).await?;
        if !output.success() {
            return Err(ProjectError::DevServer(format!(
                "file watch failed: {}",
                output.stderr.trim()
            )));
        }
        Ok(output.stdout.trim().to_string())
    }

    async fn reinstall_requirements(&self) -> ProjectResult<()> {
        let command = format!(
            ". {} && python -m pip install --upgrade pip && \
             python -m pip install -r {}",
            self.activate, self.requirements
        );
        run_checked(self.session, &command).await?;
        Ok(())
    }

    /// A watcher left over from a previous session would steal change events
    /// from this one; clear it, best-effort.
    async fn kill_stale_watchers(&self) {
        let command = format!("pkill -f 'inotifywait.*{}' || true", self.project_dir);
        if let Err(e) = self.session.run(&command).await {
            warn!(error = %e, "failed to clear stale watchers");
        }
    }

    fn start_command(&self) -> String {
        format!(
            "cd {dir} && . {activate} && nohup python {handler} --rp_serve_api \
             --rp_api_host 0.0.0.0 --rp_api_port {port} --rp_api_concurrency 1 \
             >> {log} 2>&1 & echo $!",
            dir = self.project_dir,
            activate = self.activate,
            handler = self.handler,
            port = DEV_API_PORT,
            log = self.log_path,
        )
    }

    fn watch_command(&self) -> String {
        format!(
            "inotifywait -q -r -e modify,create,delete --exclude '{}' \
             --format '%w%f' {}",
            self.exclude, self.project_dir
        )
    }
}

fn parse_pid(stdout: &str) -> ProjectResult<u32> {
    stdout
        .trim()
        .lines()
        .last()
        .and_then(|line| line.trim().parse().ok())
        .ok_or_else(|| {
            ProjectError::DevServer(format!("handler did not report a pid: {stdout:?}"))
        })
}
