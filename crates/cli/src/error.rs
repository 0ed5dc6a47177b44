#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Api(#[from] runpod_api::ApiError),

    /// Every configured GPU type was rejected. Carries the last remote
    /// error message verbatim.
    #[error("no GPU type available (tried {tried:?}): {last_error}")]
    GpuUnavailable {
        tried: Vec<String>,
        last_error: String,
    },

    #[error("pod {pod_id} not ready after {waited_secs}s")]
    ReadyTimeout { pod_id: String, waited_secs: u64 },

    #[error("no pod found for project {uuid}; run \"runpod launch\" first")]
    PodNotFound { uuid: String },

    #[error("pod {pod_id} is not running; run \"runpod pod resume --pod-id {pod_id}\"")]
    PodNotRunning { pod_id: String },

    #[error("cancelled")]
    Cancelled,

    #[error("ssh error: {0}")]
    Ssh(String),

    /// A remote command exited non-zero. Carries the remote stderr verbatim.
    #[error("remote command failed ({command}): exit {exit_code}\n{stderr}")]
    Remote {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("dev server error: {0}")]
    DevServer(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProjectResult<T> = Result<T, ProjectError>;
