use serde::Deserialize;

// ---------------------------------------------------------------------------
// Pods
// ---------------------------------------------------------------------------

/// Desired lifecycle status reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PodStatus {
    Pending,
    Created,
    Running,
    Restarting,
    Exited,
    Paused,
    Dead,
    Terminated,
    /// Forward-compatible catch-all for statuses this client does not know.
    #[serde(other)]
    Unknown,
}

/// A remote pod, mirrored locally only as id + last-observed state.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub desired_status: Option<PodStatus>,
    /// Non-null only once the pod is actually running.
    #[serde(default)]
    pub runtime: Option<PodRuntime>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodRuntime {
    #[serde(default)]
    pub uptime_in_seconds: Option<u64>,
    #[serde(default)]
    pub ports: Option<Vec<PortMapping>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub is_ip_public: bool,
    pub private_port: u16,
    #[serde(default)]
    pub public_port: Option<u16>,
}

impl Pod {
    /// `true` once the pod reports RUNNING with a live runtime descriptor.
    pub fn is_ready(&self) -> bool {
        self.desired_status == Some(PodStatus::Running) && self.runtime.is_some()
    }
}

// ---------------------------------------------------------------------------
// Templates / endpoints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

// ---------------------------------------------------------------------------
// GraphQL envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
}
