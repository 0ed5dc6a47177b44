//! Pod lifecycle orchestration: launch with idempotency guard, readiness
//! polling, and remote environment bootstrap.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use runpod_api::types::Pod;
use runpod_api::{ApiError, DeployPodFields, PodApi};

use crate::config::{PROJECT_ID_ENV, ProjectFile};
use crate::error::{ProjectError, ProjectResult};
use crate::paths::RemotePaths;
use crate::ssh::{CommandRunner, run_checked};

/// Default deadline for a pod to come online.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(300);
/// Initial delay between readiness polls; doubles up to [`POLL_MAX`].
const POLL_INITIAL: Duration = Duration::from_secs(1);
const POLL_MAX: Duration = Duration::from_secs(10);

/// Result of [`launch_pod`]. At most one pod exists per project uuid.
#[derive(Debug)]
pub enum LaunchOutcome {
    Created(Pod),
    /// A pod tagged with this project's uuid already exists; no create
    /// mutation was issued.
    AlreadyLaunched(Pod),
}

/// Name given to the project's development pod. The uuid tag is what the
/// idempotency lookup matches on.
pub fn dev_pod_name(config: &ProjectFile) -> String {
    format!("{}-dev ({})", config.project.name, config.project.uuid)
}

/// Env for the launched pod: the config's vars plus the mandatory
/// project-id binding.
fn launch_env(config: &ProjectFile) -> BTreeMap<String, String> {
    let mut env = config.project.env_vars.clone();
    env.insert(PROJECT_ID_ENV.to_string(), config.project.uuid.clone());
    env
}

/// GPU types to attempt, in preference order: `gpu_types`, then the optional
/// single `gpu` override.
fn gpu_candidates(config: &ProjectFile) -> Vec<String> {
    let mut candidates = config.project.gpu_types.clone();
    if let Some(gpu) = &config.project.gpu {
        candidates.push(gpu.clone());
    }
    candidates
}

fn deploy_fields(config: &ProjectFile, gpu_type_id: &str) -> DeployPodFields {
    let project = &config.project;
    DeployPodFields {
        name: Some(dev_pod_name(config)),
        image_name: Some(project.base_image.clone()),
        cloud_type: Some("ALL".to_string()),
        container_disk_in_gb: Some(project.container_disk_size_gb),
        gpu_type_id: Some(gpu_type_id.to_string()),
        gpu_count: Some(project.gpu_count),
        ports: Some(project.ports.clone()),
        volume_mount_path: Some(project.volume_mount_path.clone()),
        network_volume_id: Some(project.storage_id.clone()),
        env: Some(launch_env(config)),
        support_public_ip: Some(true),
        ..Default::default()
    }
}

/// Launch the project pod, unless one already exists for this uuid.
///
/// Each configured GPU type is attempted in order; a remote rejection
/// (capacity, unsupported type) falls through to the next candidate, while
/// any other error aborts immediately. When every candidate is rejected the
/// last remote message is surfaced verbatim.
pub async fn launch_pod<A: PodApi + ?Sized>(
    api: &A,
    config: &ProjectFile,
) -> ProjectResult<LaunchOutcome> {
    if let Some(existing) = api.find_project_pod(&config.project.uuid).await? {
        return Ok(LaunchOutcome::AlreadyLaunched(existing));
    }

    let candidates = gpu_candidates(config);
    if candidates.is_empty() {
        return Err(ProjectError::Config(
            "project.gpu_types must list at least one GPU type".into(),
        ));
    }

    let mut last_error = String::new();
    for gpu_type in &candidates {
        match api.create_pod(&deploy_fields(config, gpu_type)).await {
            Ok(pod) => {
                info!(pod_id = %pod.id, gpu_type, "pod created");
                return Ok(LaunchOutcome::Created(pod));
            }
            Err(ApiError::Api(message)) => {
                warn!(gpu_type, %message, "gpu type rejected");
                last_error = message;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ProjectError::GpuUnavailable {
        tried: candidates,
        last_error,
    })
}

/// Poll until the pod reports RUNNING with a live runtime descriptor.
///
/// Bounded by `timeout` and cancellable between polls; the delay doubles
/// from one second up to ten.
pub async fn await_ready<A: PodApi + ?Sized>(
    api: &A,
    pod_id: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> ProjectResult<Pod> {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut delay = POLL_INITIAL;
    loop {
        let pod = api.pod(pod_id).await?;
        if pod.is_ready() {
            return Ok(pod);
        }
        if tokio::time::Instant::now() + delay > deadline {
            return Err(ProjectError::ReadyTimeout {
                pod_id: pod_id.to_string(),
                waited_secs: timeout.as_secs(),
            });
        }
        tokio::select! {
            () = cancel.cancelled() => return Err(ProjectError::Cancelled),
            () = tokio::time::sleep(delay) => {}
        }
        delay = (delay * 2).min(POLL_MAX);
    }
}

/// Remote commands that build the project venv and install dependencies.
pub fn bootstrap_commands(config: &ProjectFile, paths: &RemotePaths) -> Vec<String> {
    vec![
        format!(
            "python{} -m venv {}",
            config.runtime.python_version,
            paths.venv()
        ),
        format!(
            ". {} && cd {} && python -m pip install --upgrade pip && \
             python -m pip install -r {}",
            paths.activate(),
            paths.project_dir(),
            config.runtime.requirements_path
        ),
    ]
}

/// Run the bootstrap batch in order. The first failing command aborts the
/// rest and surfaces the remote stderr verbatim.
pub async fn bootstrap(
    session: &dyn CommandRunner,
    config: &ProjectFile,
    paths: &RemotePaths,
) -> ProjectResult<()> {
    for command in bootstrap_commands(config, paths) {
        run_checked(session, &command).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::new_project_file;
    use crate::testutil::{MockApi, MockResponse, MockSession, ready_pod, stopped_pod};

    fn test_config() -> ProjectFile {
        let mut config = new_project_file("proj", "vol_1", "3.11", "default", None);
        config.project.uuid = "abc12345".into();
        config
            .project
            .env_vars
            .insert(PROJECT_ID_ENV.into(), "abc12345".into());
        config.project.gpu_types = vec!["A4000".into(), "A5000".into()];
        config
    }

    #[test]
    fn dev_pod_name_carries_uuid_tag() {
        assert_eq!(dev_pod_name(&test_config()), "proj-dev (abc12345)");
    }

    #[test]
    fn deploy_fields_merge_env_and_project_settings() {
        let mut config = test_config();
        config
            .project
            .env_vars
            .insert("HF_TOKEN".into(), "secret".into());
        let fields = deploy_fields(&config, "A4000");

        assert_eq!(fields.name.as_deref(), Some("proj-dev (abc12345)"));
        assert_eq!(fields.gpu_type_id.as_deref(), Some("A4000"));
        assert_eq!(fields.cloud_type.as_deref(), Some("ALL"));
        assert_eq!(fields.network_volume_id.as_deref(), Some("vol_1"));
        let env = fields.env.unwrap();
        assert_eq!(env.get(PROJECT_ID_ENV), Some(&"abc12345".to_string()));
        assert_eq!(env.get("HF_TOKEN"), Some(&"secret".to_string()));
    }

    #[test]
    fn gpu_override_is_appended_last() {
        let mut config = test_config();
        config.project.gpu = Some("H100".into());
        assert_eq!(gpu_candidates(&config), vec!["A4000", "A5000", "H100"]);
    }

    #[tokio::test]
    async fn launch_is_idempotent_per_uuid() {
        let api = MockApi::default();
        *api.existing_pod.lock().unwrap() =
            Some(ready_pod("pod_1", "proj-dev (abc12345)"));

        let outcome = launch_pod(&api, &test_config()).await.unwrap();
        assert!(matches!(outcome, LaunchOutcome::AlreadyLaunched(pod) if pod.id == "pod_1"));
        // the create mutation must never have been issued
        assert!(api.create_fields.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn launch_falls_through_rejected_gpu_types() {
        let api = MockApi::default();
        api.create_results.lock().unwrap().push_back(Err(
            ApiError::Api("no instances with the requested specifications".into()),
        ));
        api.create_results
            .lock()
            .unwrap()
            .push_back(Ok(stopped_pod("pod_2", "proj-dev (abc12345)")));

        let outcome = launch_pod(&api, &test_config()).await.unwrap();
        assert!(matches!(outcome, LaunchOutcome::Created(pod) if pod.id == "pod_2"));

        let attempts = api.create_fields.lock().unwrap();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].gpu_type_id.as_deref(), Some("A4000"));
        assert_eq!(attempts[1].gpu_type_id.as_deref(), Some("A5000"));
    }

    #[tokio::test]
    async fn launch_surfaces_last_error_when_all_types_fail() {
        let api = MockApi::default();
        for message in ["first unavailable", "second unavailable"] {
            api.create_results
                .lock()
                .unwrap()
                .push_back(Err(ApiError::Api(message.into())));
        }

        let err = launch_pod(&api, &test_config()).await.unwrap_err();
        match err {
            ProjectError::GpuUnavailable { tried, last_error } => {
                assert_eq!(tried, vec!["A4000", "A5000"]);
                assert_eq!(last_error, "second unavailable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn await_ready_polls_until_running() {
        let api = MockApi::default();
        {
            let mut polls = api.poll_results.lock().unwrap();
            polls.push_back(stopped_pod("pod_1", "proj-dev (abc12345)"));
            polls.push_back(stopped_pod("pod_1", "proj-dev (abc12345)"));
            polls.push_back(ready_pod("pod_1", "proj-dev (abc12345)"));
        }

        let pod = await_ready(
            &api,
            "pod_1",
            Duration::from_secs(60),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(pod.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn await_ready_times_out() {
        let api = MockApi::default();
        *api.poll_fallback.lock().unwrap() =
            Some(stopped_pod("pod_1", "proj-dev (abc12345)"));

        let err = await_ready(
            &api,
            "pod_1",
            Duration::from_secs(30),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProjectError::ReadyTimeout { waited_secs: 30, .. }));
    }

    #[tokio::test]
    async fn await_ready_honors_cancellation() {
        let api = MockApi::default();
        *api.poll_fallback.lock().unwrap() =
            Some(stopped_pod("pod_1", "proj-dev (abc12345)"));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = await_ready(&api, "pod_1", Duration::from_secs(60), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ProjectError::Cancelled));
    }

    #[test]
    fn bootstrap_commands_build_venv_then_install() {
        let config = test_config();
        let paths = RemotePaths::new(&config);
        let commands = bootstrap_commands(&config, &paths);

        assert_eq!(commands.len(), 2);
        assert_eq!(
            commands[0],
            "python3.11 -m venv /runpod-volume/abc12345/venv"
        );
        assert!(commands[1].contains(". /runpod-volume/abc12345/venv/bin/activate"));
        assert!(commands[1].contains("cd /runpod-volume/abc12345/proj"));
        assert!(commands[1].contains("pip install --upgrade pip"));
        assert!(commands[1].contains("pip install -r builder/requirements.txt"));
    }

    #[tokio::test]
    async fn bootstrap_aborts_on_first_failure() {
        let config = test_config();
        let paths = RemotePaths::new(&config);
        let session = MockSession::new(|command| {
            if command.contains("-m venv") {
                MockResponse::exit(1, "python3.11: command not found")
            } else {
                MockResponse::ok("")
            }
        });

        let err = bootstrap(&session, &config, &paths).await.unwrap_err();
        match err {
            ProjectError::Remote {
                exit_code, stderr, ..
            } => {
                assert_eq!(exit_code, 1);
                assert_eq!(stderr, "python3.11: command not found");
            }
            other => panic!("unexpected error: {other}"),
        }
        // the second command never ran
        assert_eq!(session.commands().len(), 1);
    }
}
