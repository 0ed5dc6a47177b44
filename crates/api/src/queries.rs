//! GraphQL query builders for pod lookups.

use crate::error::{ApiError, ApiResult};
use crate::mutations::quote;

/// Selection shared by every pod query: enough to poll readiness and locate
/// the SSH endpoint.
const POD_SELECTION: &str = "id name desiredStatus \
     runtime { uptimeInSeconds ports { ip isIpPublic privatePort publicPort } }";

/// Build the single-pod status query. Fails on an empty pod id.
pub fn pod_query(pod_id: &str) -> ApiResult<String> {
    if pod_id.trim().is_empty() {
        return Err(ApiError::Validation("pod_id must not be empty".into()));
    }
    Ok(format!(
        "query {{ pod(input: {{ podId: {} }}) {{ {POD_SELECTION} }} }}",
        quote(pod_id)
    ))
}

/// Build the query listing all pods owned by the caller.
pub fn myself_pods_query() -> String {
    format!("query {{ myself {{ pods {{ {POD_SELECTION} }} }} }}")
}
