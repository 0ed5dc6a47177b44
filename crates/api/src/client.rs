use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::mutations::{self, DeployPodFields, SaveEndpointFields, SaveTemplateFields};
use crate::queries;
use crate::types::{Endpoint, GraphQlResponse, Pod, Template};

pub const DEFAULT_API_URL: &str = "https://api.runpod.io/graphql";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Pod/template/endpoint operations as seen by the orchestrator.
///
/// The concrete implementation is [`ApiClient`]; tests substitute a mock to
/// exercise orchestration logic without network access.
#[async_trait]
pub trait PodApi: Send + Sync {
    /// Find the pod tagged with a project uuid, if one exists.
    async fn find_project_pod(&self, project_uuid: &str) -> ApiResult<Option<Pod>>;
    async fn create_pod(&self, fields: &DeployPodFields) -> ApiResult<Pod>;
    async fn pod(&self, pod_id: &str) -> ApiResult<Pod>;
    async fn stop_pod(&self, pod_id: &str) -> ApiResult<Pod>;
    async fn resume_pod(&self, pod_id: &str, gpu_count: u32) -> ApiResult<Pod>;
    async fn terminate_pod(&self, pod_id: &str) -> ApiResult<()>;
    async fn create_template(&self, fields: &SaveTemplateFields) -> ApiResult<Template>;
    async fn create_endpoint(&self, fields: &SaveEndpointFields) -> ApiResult<Endpoint>;
}

/// GraphQL client for the RunPod API. Owns the connection pool, base URL,
/// and API key. Clone is a cheap Arc refcount bump.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    client: Client,
    api_url: String,
    api_key: String,
}

impl ApiClient {
    pub fn new(api_url: String, api_key: String) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Http(format!("http client: {e}")))?;

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                api_url,
                api_key,
            }),
        })
    }

    /// Post a GraphQL document and return the `data` object.
    ///
    /// GraphQL-level errors are surfaced verbatim as [`ApiError::Api`].
    async fn post(&self, document: &str) -> ApiResult<serde_json::Value> {
        debug!(document, "graphql request");
        let resp = self
            .inner
            .client
            .post(&self.inner.api_url)
            .bearer_auth(&self.inner.api_key)
            .json(&serde_json::json!({ "query": document }))
            .send()
            .await
            .map_err(|e| ApiError::Http(format!("graphql: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Http(format!("graphql {status}: {body}")));
        }

        let envelope: GraphQlResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("graphql envelope: {e}")))?;

        if !envelope.errors.is_empty() {
            let messages: Vec<String> =
                envelope.errors.into_iter().map(|e| e.message).collect();
            return Err(ApiError::Api(messages.join("; ")));
        }

        envelope
            .data
            .ok_or_else(|| ApiError::Decode("graphql response missing data".into()))
    }

    fn field<T: DeserializeOwned>(data: &serde_json::Value, key: &str) -> ApiResult<T> {
        let value = data
            .get(key)
            .cloned()
            .ok_or_else(|| ApiError::Decode(format!("response missing {key}")))?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(format!("{key}: {e}")))
    }
}

#[async_trait]
impl PodApi for ApiClient {
    async fn find_project_pod(&self, project_uuid: &str) -> ApiResult<Option<Pod>> {
        let data = self.post(&queries::myself_pods_query()).await?;
        let myself = data
            .get("myself")
            .cloned()
            .ok_or_else(|| ApiError::Decode("response missing myself".into()))?;
        let pods: Vec<Pod> = Self::field(&myself, "pods")?;
        Ok(pods.into_iter().find(|pod| pod.name.contains(project_uuid)))
    }

    async fn create_pod(&self, fields: &DeployPodFields) -> ApiResult<Pod> {
        let document = mutations::deploy_pod(fields)?;
        let data = self.post(&document).await?;
        Self::field(&data, "podFindAndDeployOnDemand")
    }

    async fn pod(&self, pod_id: &str) -> ApiResult<Pod> {
        let document = queries::pod_query(pod_id)?;
        let data = self.post(&document).await?;
        Self::field(&data, "pod")
    }

    async fn stop_pod(&self, pod_id: &str) -> ApiResult<Pod> {
        let document = mutations::stop_pod(pod_id)?;
        let data = self.post(&document).await?;
        Self::field(&data, "podStop")
    }

    async fn resume_pod(&self, pod_id: &str, gpu_count: u32) -> ApiResult<Pod> {
        let document = mutations::resume_pod(pod_id, gpu_count)?;
        let data = self.post(&document).await?;
        Self::field(&data, "podResume")
    }

    async fn terminate_pod(&self, pod_id: &str) -> ApiResult<()> {
        let document = mutations::terminate_pod(pod_id)?;
        self.post(&document).await?;
        Ok(())
    }

    async fn create_template(&self, fields: &SaveTemplateFields) -> ApiResult<Template> {
        let document = mutations::save_template(fields)?;
        let data = self.post(&document).await?;
        Self::field(&data, "saveTemplate")
    }

    async fn create_endpoint(&self, fields: &SaveEndpointFields) -> ApiResult<Endpoint> {
        let document = mutations::save_endpoint(fields)?;
        let data = self.post(&document).await?;
        Self::field(&data, "saveEndpoint")
    }
}
