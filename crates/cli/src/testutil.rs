//! Shared test doubles: a scripted remote session and a recording API mock.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use runpod_api::types::{Endpoint, Pod, PodRuntime, PodStatus, PortMapping, Template};
use runpod_api::{
    ApiError, ApiResult, DeployPodFields, PodApi, SaveEndpointFields, SaveTemplateFields,
};

use crate::error::{ProjectError, ProjectResult};
use crate::ssh::{CommandRunner, ExecOutput};

// ---------------------------------------------------------------------------
// Pods
// ---------------------------------------------------------------------------

/// A RUNNING pod with a public ssh port mapping.
pub(crate) fn ready_pod(id: &str, name: &str) -> Pod {
    Pod {
        id: id.to_string(),
        name: name.to_string(),
        desired_status: Some(PodStatus::Running),
        runtime: Some(PodRuntime {
            uptime_in_seconds: Some(5),
            ports: Some(vec![PortMapping {
                ip: Some("1.2.3.4".to_string()),
                is_ip_public: true,
                private_port: 22,
                public_port: Some(10022),
            }]),
        }),
    }
}

/// A pod that exists but has no runtime yet.
pub(crate) fn stopped_pod(id: &str, name: &str) -> Pod {
    Pod {
        id: id.to_string(),
        name: name.to_string(),
        desired_status: Some(PodStatus::Pending),
        runtime: None,
    }
}

// ---------------------------------------------------------------------------
// MockSession
// ---------------------------------------------------------------------------

pub(crate) enum MockResponse {
    Output(ExecOutput),
    /// Transport-level failure.
    Transport(String),
    /// Never resolves; stands in for a blocking remote watch.
    Pending,
}

impl MockResponse {
    pub(crate) fn ok(stdout: &str) -> Self {
        MockResponse::Output(ExecOutput {
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        })
    }

    pub(crate) fn exit(exit_code: i32, stderr: &str) -> Self {
        MockResponse::Output(ExecOutput {
            exit_code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        })
    }
}

/// A [`CommandRunner`] that records every command and answers from a
/// caller-supplied script.
pub(crate) struct MockSession {
    commands: Mutex<Vec<String>>,
    respond: Box<dyn Fn(&str) -> MockResponse + Send + Sync>,
}

impl MockSession {
    pub(crate) fn new(respond: impl Fn(&str) -> MockResponse + Send + Sync + 'static) -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        }
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for MockSession {
    async fn run(&self, command: &str) -> ProjectResult<ExecOutput> {
        self.commands.lock().unwrap().push(command.to_string());
        match (self.respond)(command) {
            MockResponse::Output(output) => Ok(output),
            MockResponse::Transport(message) => Err(ProjectError::Ssh(message)),
            MockResponse::Pending => std::future::pending().await,
        }
    }
}

// ---------------------------------------------------------------------------
// MockApi
// ---------------------------------------------------------------------------

/// A [`PodApi`] that records calls and replays scripted results.
#[derive(Default)]
pub(crate) struct MockApi {
    pub existing_pod: Mutex<Option<Pod>>,
    pub create_fields: Mutex<Vec<DeployPodFields>>,
    pub create_results: Mutex<VecDeque<ApiResult<Pod>>>,
    pub poll_results: Mutex<VecDeque<Pod>>,
    /// Returned by `pod()` once `poll_results` is drained.
    pub poll_fallback: Mutex<Option<Pod>>,
    pub template_fields: Mutex<Vec<SaveTemplateFields>>,
    pub template_results: Mutex<VecDeque<ApiResult<Template>>>,
    pub endpoint_fields: Mutex<Vec<SaveEndpointFields>>,
    pub endpoint_results: Mutex<VecDeque<ApiResult<Endpoint>>>,
}

fn unscripted<T>(what: &str) -> ApiResult<T> {
    Err(ApiError::Api(format!("{what} not scripted")))
}

#[async_trait]
impl PodApi for MockApi {
    async fn find_project_pod(&self, project_uuid: &str) -> ApiResult<Option<Pod>> {
        let existing = self.existing_pod.lock().unwrap();
        Ok(existing
            .as_ref()
            .filter(|pod| pod.name.contains(project_uuid))
            .cloned())
    }

    async fn create_pod(&self, fields: &DeployPodFields) -> ApiResult<Pod> {
        self.create_fields.lock().unwrap().push(fields.clone());
        self.create_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| unscripted("create_pod"))
    }

    async fn pod(&self, _pod_id: &str) -> ApiResult<Pod> {
        if let Some(pod) = self.poll_results.lock().unwrap().pop_front() {
            return Ok(pod);
        }
        match self.poll_fallback.lock().unwrap().clone() {
            Some(pod) => Ok(pod),
            None => unscripted("pod"),
        }
    }

    async fn stop_pod(&self, _pod_id: &str) -> ApiResult<Pod> {
        unscripted("stop_pod")
    }

    async fn resume_pod(&self, _pod_id: &str, _gpu_count: u32) -> ApiResult<Pod> {
        unscripted("resume_pod")
    }

    async fn terminate_pod(&self, _pod_id: &str) -> ApiResult<()> {
        unscripted("terminate_pod")
    }

    async fn create_template(&self, fields: &SaveTemplateFields) -> ApiResult<Template> {
        self.template_fields.lock().unwrap().push(fields.clone());
        self.template_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| unscripted("create_template"))
    }

    async fn create_endpoint(&self, fields: &SaveEndpointFields) -> ApiResult<Endpoint> {
        self.endpoint_fields.lock().unwrap().push(fields.clone());
        self.endpoint_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| unscripted("create_endpoint"))
    }
}
