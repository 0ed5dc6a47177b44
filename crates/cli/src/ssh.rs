//! SSH transport: remote command execution and rsync file transfer.
//!
//! Orchestration code depends on the narrow [`CommandRunner`] seam, not on
//! [`SshSession`] directly, so the dev-server state machine and bootstrap
//! batches are testable against a scripted mock.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::trace;

use runpod_api::types::Pod;

use crate::error::{ProjectError, ProjectResult};
use crate::ignore::BASE_RSYNC_EXCLUDES;

const SSH_USER: &str = "root";
const SSH_OPTIONS: [&str; 3] = [
    "StrictHostKeyChecking=no",
    "UserKnownHostsFile=/dev/null",
    "LogLevel=ERROR",
];

/// Result of a remote command.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Remote command execution seam.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a shell command on the remote host.
    ///
    /// `Err` only on transport failure; a non-zero remote exit is reported
    /// through [`ExecOutput::exit_code`] so callers can probe (e.g.
    /// `kill -0`) without treating the probe as an error.
    async fn run(&self, command: &str) -> ProjectResult<ExecOutput>;
}

/// Run a command and fail on a non-zero exit, carrying the remote stderr
/// verbatim.
pub async fn run_checked(
    runner: &dyn CommandRunner,
    command: &str,
) -> ProjectResult<ExecOutput> {
    let output = runner.run(command).await?;
    if !output.success() {
        return Err(ProjectError::Remote {
            command: command.to_string(),
            exit_code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output)
}

/// Public SSH endpoint of a running pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshEndpoint {
    pub host: String,
    pub port: u16,
}

/// Resolve the pod's public mapping of private port 22.
pub fn ssh_endpoint(pod: &Pod) -> ProjectResult<SshEndpoint> {
    let runtime = pod.runtime.as_ref().ok_or_else(|| {
        ProjectError::Ssh(format!("pod {} has no runtime descriptor", pod.id))
    })?;
    for mapping in runtime.ports.as_deref().unwrap_or_default() {
        if mapping.private_port != 22 || !mapping.is_ip_public {
            continue;
        }
        if let (Some(ip), Some(port)) = (&mapping.ip, mapping.public_port) {
            return Ok(SshEndpoint {
                host: ip.clone(),
                port,
            });
        }
    }
    Err(ProjectError::Ssh(format!(
        "pod {} exposes no public ssh port",
        pod.id
    )))
}

/// Verify the local `ssh`/`rsync` binaries exist before any remote work.
pub fn check_local_tools() -> ProjectResult<()> {
    let missing: Vec<&str> = ["ssh", "rsync"]
        .into_iter()
        .filter(|tool| which::which(tool).is_err())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ProjectError::Ssh(format!(
            "missing local tools: {}",
            missing.join(", ")
        )))
    }
}

/// Default private key installed by the RunPod tooling.
pub fn default_key_path() -> ProjectResult<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".runpod").join("ssh").join("RunPod-Key-Go"))
        .ok_or_else(|| ProjectError::Ssh("cannot determine home directory".into()))
}

/// An SSH connection to a pod. Each command spawns a fresh `ssh` process;
/// there is no persistent channel to keep alive.
pub struct SshSession {
    endpoint: SshEndpoint,
    key_path: PathBuf,
}

impl SshSession {
    pub fn connect(pod: &Pod, key_path: PathBuf) -> ProjectResult<Self> {
        Ok(Self {
            endpoint: ssh_endpoint(pod)?,
            key_path,
        })
    }

    fn ssh_args(&self) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            self.key_path.display().to_string(),
            "-p".to_string(),
            self.endpoint.port.to_string(),
        ];
        for option in SSH_OPTIONS {
            args.push("-o".to_string());
            args.push(option.to_string());
        }
        args.push(format!("{SSH_USER}@{}", self.endpoint.host));
        args
    }

    /// Push the local project tree into `remote_dir` (contents-of semantics:
    /// `local/` → `remote_dir`), excluding the built-in patterns plus
    /// `excludes`.
    pub async fn rsync(
        &self,
        local: &Path,
        remote_dir: &str,
        excludes: &[String],
    ) -> ProjectResult<()> {
        let args = rsync_args(&self.endpoint, &self.key_path, local, remote_dir, excludes);
        trace!(?args, "rsync");
        let output = Command::new("rsync")
            .args(&args)
            .output()
            .await
            .map_err(|e| ProjectError::Ssh(format!("spawn rsync: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProjectError::Ssh(format!(
                "rsync to {remote_dir}: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CommandRunner for SshSession {
    async fn run(&self, command: &str) -> ProjectResult<ExecOutput> {
        trace!(command, "ssh exec");
        let mut args = self.ssh_args();
        args.push(command.to_string());
        let output = Command::new("ssh")
            .args(&args)
            .output()
            .await
            .map_err(|e| ProjectError::Ssh(format!("spawn ssh: {e}")))?;
        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

fn rsync_args(
    endpoint: &SshEndpoint,
    key_path: &Path,
    local: &Path,
    remote_dir: &str,
    excludes: &[String],
) -> Vec<String> {
    let mut args = vec!["-az".to_string()];
    for pattern in BASE_RSYNC_EXCLUDES {
        args.push(format!("--exclude={pattern}"));
    }
    for pattern in excludes {
        args.push(format!("--exclude={pattern}"));
    }
    let ssh_options: Vec<String> = SSH_OPTIONS.iter().map(|o| format!("-o {o}")).collect();
    args.push("-e".to_string());
    args.push(format!(
        "ssh -i {} -p {} {}",
        key_path.display(),
        endpoint.port,
        ssh_options.join(" ")
    ));
    args.push(format!("{}/", local.display()));
    args.push(format!("{SSH_USER}@{}:{remote_dir}", endpoint.host));
    args
}
