//! GraphQL mutation builders for pod, template, and endpoint operations.
//!
//! Every builder is a pure function: it validates its fields and returns the
//! finished mutation document, or a [`ApiError::Validation`] before anything
//! touches the network. Unset optional fields are omitted from the document,
//! never emitted as explicit nulls.

use std::collections::BTreeMap;

use crate::error::{ApiError, ApiResult};

/// Applied when the caller does not set `gpu_count`.
pub const DEFAULT_GPU_COUNT: u32 = 1;
/// Applied when the caller does not set `container_disk_in_gb` on a template.
pub const DEFAULT_TEMPLATE_DISK_GB: u32 = 10;

// ---------------------------------------------------------------------------
// Field structs
// ---------------------------------------------------------------------------

/// Loosely-filled field set for [`deploy_pod`].
///
/// Required: `name`, `image_name`, `cloud_type`, `container_disk_in_gb`.
#[derive(Debug, Clone, Default)]
pub struct DeployPodFields {
    pub name: Option<String>,
    pub image_name: Option<String>,
    /// GraphQL enum token (`ALL`, `SECURE`, `COMMUNITY`), emitted unquoted.
    pub cloud_type: Option<String>,
    pub container_disk_in_gb: Option<u32>,
    pub gpu_type_id: Option<String>,
    pub gpu_count: Option<u32>,
    pub ports: Option<String>,
    pub volume_in_gb: Option<u32>,
    pub volume_mount_path: Option<String>,
    pub min_vcpu_count: Option<u32>,
    pub min_memory_in_gb: Option<u32>,
    pub docker_args: Option<String>,
    pub env: Option<BTreeMap<String, String>>,
    pub network_volume_id: Option<String>,
    pub data_center_id: Option<String>,
    pub country_code: Option<String>,
    pub support_public_ip: Option<bool>,
    pub template_id: Option<String>,
}

/// Field set for [`save_template`]. Required: `name`, `image_name`.
#[derive(Debug, Clone, Default)]
pub struct SaveTemplateFields {
    pub name: Option<String>,
    pub image_name: Option<String>,
    /// Container start command, passed through as the template's docker args.
    pub docker_start_cmd: Option<String>,
    pub container_disk_in_gb: Option<u32>,
    pub volume_in_gb: Option<u32>,
    pub env: Option<BTreeMap<String, String>>,
    pub is_serverless: bool,
    pub ports: Option<String>,
    pub readme: Option<String>,
}

/// Field set for [`save_endpoint`]. Required: `name`, `template_id`.
#[derive(Debug, Clone, Default)]
pub struct SaveEndpointFields {
    pub name: Option<String>,
    pub template_id: Option<String>,
    pub network_volume_id: Option<String>,
    pub gpu_ids: Option<String>,
    pub workers_min: Option<u32>,
    pub workers_max: Option<u32>,
    pub idle_timeout: Option<u32>,
    pub scaler_type: Option<String>,
    pub scaler_value: Option<u32>,
    pub locations: Option<String>,
}

// ---------------------------------------------------------------------------
// Pod lifecycle
// ---------------------------------------------------------------------------

/// Build the `podFindAndDeployOnDemand` mutation.
///
/// `gpu_count` is always emitted (defaulting to [`DEFAULT_GPU_COUNT`]); all
/// other optional fields appear only when set. Whitespace in `ports` is
/// stripped, matching the wire format the API expects.
pub fn deploy_pod(fields: &DeployPodFields) -> ApiResult<String> {
    let name = require_str(&fields.name, "name")?;
    let image_name = require_str(&fields.image_name, "image_name")?;
    let cloud_type = require_str(&fields.cloud_type, "cloud_type")?;
    let container_disk_in_gb = fields
        .container_disk_in_gb
        .ok_or_else(|| missing("container_disk_in_gb"))?;

    let mut input = vec![
        format!("name: {}", quote(name)),
        format!("imageName: {}", quote(image_name)),
        format!("cloudType: {cloud_type}"),
        format!("containerDiskInGb: {container_disk_in_gb}"),
        format!(
            "gpuCount: {}",
            fields.gpu_count.unwrap_or(DEFAULT_GPU_COUNT)
        ),
    ];
    push_str(&mut input, "gpuTypeId", &fields.gpu_type_id);
    if let Some(ports) = &fields.ports {
        input.push(format!("ports: {}", quote(&ports.replace(' ', ""))));
    }
    push_int(&mut input, "volumeInGb", fields.volume_in_gb);
    push_str(&mut input, "volumeMountPath", &fields.volume_mount_path);
    push_int(&mut input, "minVcpuCount", fields.min_vcpu_count);
    push_int(&mut input, "minMemoryInGb", fields.min_memory_in_gb);
    push_str(&mut input, "dockerArgs", &fields.docker_args);
    if let Some(env) = &fields.env {
        input.push(format!("env: {}", env_list(env)));
    }
    push_str(&mut input, "networkVolumeId", &fields.network_volume_id);
    push_str(&mut input, "dataCenterId", &fields.data_center_id);
    push_str(&mut input, "countryCode", &fields.country_code);
    if let Some(public_ip) = fields.support_public_ip {
        input.push(format!("supportPublicIp: {public_ip}"));
    }
    push_str(&mut input, "templateId", &fields.template_id);

    Ok(format!(
        "mutation {{ podFindAndDeployOnDemand(input: {{ {} }}) \
         {{ id name desiredStatus imageName machineId machine {{ podHostId }} }} }}",
        input.join(", ")
    ))
}

/// Build the `podStop` mutation. Fails on an empty pod id.
pub fn stop_pod(pod_id: &str) -> ApiResult<String> {
    let pod_id = require_id(pod_id)?;
    Ok(format!(
        "mutation {{ podStop(input: {{ podId: {} }}) {{ id desiredStatus }} }}",
        quote(pod_id)
    ))
}

/// Build the `podResume` mutation. Fails on an empty pod id or a zero
/// gpu count.
pub fn resume_pod(pod_id: &str, gpu_count: u32) -> ApiResult<String> {
    let pod_id = require_id(pod_id)?;
    if gpu_count == 0 {
        return Err(ApiError::Validation(
            "gpu_count must be at least 1".into(),
        ));
    }
    Ok(format!(
        "mutation {{ podResume(input: {{ podId: {}, gpuCount: {gpu_count} }}) \
         {{ id desiredStatus }} }}",
        quote(pod_id)
    ))
}

/// Build the `podTerminate` mutation. Fails on an empty pod id.
pub fn terminate_pod(pod_id: &str) -> ApiResult<String> {
    let pod_id = require_id(pod_id)?;
    Ok(format!(
        "mutation {{ podTerminate(input: {{ podId: {} }}) }}",
        quote(pod_id)
    ))
}

// ---------------------------------------------------------------------------
// Template / endpoint
// ---------------------------------------------------------------------------

/// Build the `saveTemplate` mutation for a (serverless) template.
pub fn save_template(fields: &SaveTemplateFields) -> ApiResult<String> {
    let name = require_str(&fields.name, "name")?;
    let image_name = require_str(&fields.image_name, "image_name")?;

    let mut input = vec![
        format!("name: {}", quote(name)),
        format!("imageName: {}", quote(image_name)),
        format!(
            "containerDiskInGb: {}",
            fields
                .container_disk_in_gb
                .unwrap_or(DEFAULT_TEMPLATE_DISK_GB)
        ),
        format!("volumeInGb: {}", fields.volume_in_gb.unwrap_or(0)),
        format!("isServerless: {}", fields.is_serverless),
    ];
    push_str(&mut input, "dockerArgs", &fields.docker_start_cmd);
    if let Some(env) = &fields.env {
        input.push(format!("env: {}", env_list(env)));
    }
    push_str(&mut input, "ports", &fields.ports);
    push_str(&mut input, "readme", &fields.readme);

    Ok(format!(
        "mutation {{ saveTemplate(input: {{ {} }}) \
         {{ id name imageName isServerless }} }}",
        input.join(", ")
    ))
}

/// Build the `saveEndpoint` mutation referencing an existing template.
pub fn save_endpoint(fields: &SaveEndpointFields) -> ApiResult<String> {
    let name = require_str(&fields.name, "name")?;
    let template_id = require_str(&fields.template_id, "template_id")?;

    let mut input = vec![
        format!("name: {}", quote(name)),
        format!("templateId: {}", quote(template_id)),
        format!(
            "gpuIds: {}",
            quote(fields.gpu_ids.as_deref().unwrap_or("AMPERE_16"))
        ),
        format!("workersMin: {}", fields.workers_min.unwrap_or(0)),
        format!("workersMax: {}", fields.workers_max.unwrap_or(3)),
        format!("idleTimeout: {}", fields.idle_timeout.unwrap_or(5)),
        format!(
            "scalerType: {}",
            quote(fields.scaler_type.as_deref().unwrap_or("QUEUE_DELAY"))
        ),
        format!("scalerValue: {}", fields.scaler_value.unwrap_or(4)),
    ];
    push_str(&mut input, "networkVolumeId", &fields.network_volume_id);
    push_str(&mut input, "locations", &fields.locations);

    Ok(format!(
        "mutation {{ saveEndpoint(input: {{ {} }}) {{ id name templateId }} }}",
        input.join(", ")
    ))
}

// ---------------------------------------------------------------------------
// Serialization helpers
// ---------------------------------------------------------------------------

/// Quote and escape a GraphQL string value.
pub(crate) fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Encode an env map as `[{ key: "K", value: "V" }, …]` in key order.
fn env_list(env: &BTreeMap<String, String>) -> String {
    let entries: Vec<String> = env
        .iter()
        .map(|(key, value)| format!("{{ key: {}, value: {} }}", quote(key), quote(value)))
        .collect();
    format!("[{}]", entries.join(", "))
}

fn push_str(input: &mut Vec<String>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        input.push(format!("{key}: {}", quote(value)));
    }
}

fn push_int(input: &mut Vec<String>, key: &str, value: Option<u32>) {
    if let Some(value) = value {
        input.push(format!("{key}: {value}"));
    }
}

fn missing(field: &str) -> ApiError {
    ApiError::Validation(format!("missing required field: {field}"))
}

fn require_str<'a>(value: &'a Option<String>, field: &str) -> ApiResult<&'a str> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(missing(field)),
    }
}

fn require_id(pod_id: &str) -> ApiResult<&str> {
    if pod_id.trim().is_empty() {
        return Err(ApiError::Validation("pod_id must not be empty".into()));
    }
    Ok(pod_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_deploy() -> DeployPodFields {
        DeployPodFields {
            name: Some("t".into()),
            image_name: Some("img".into()),
            cloud_type: Some("c".into()),
            container_disk_in_gb: Some(10),
            ..Default::default()
        }
    }

    #[test]
    fn deploy_minimal_applies_defaults() {
        let doc = deploy_pod(&minimal_deploy()).unwrap();
        assert!(doc.starts_with("mutation {"));
        assert!(doc.contains("podFindAndDeployOnDemand"));
        assert!(doc.contains("name: \"t\""));
        assert!(doc.contains("imageName: \"img\""));
        assert!(doc.contains("cloudType: c"));
        assert!(doc.contains("containerDiskInGb: 10"));
        assert!(doc.contains("gpuCount: 1"));
        assert!(!doc.contains("ports"));
        assert!(!doc.contains("null"));
    }

    #[test]
    fn deploy_includes_supplied_fields_verbatim() {
        let mut fields = minimal_deploy();
        fields.gpu_type_id = Some("NVIDIA RTX A4000".into());
        fields.gpu_count = Some(2);
        fields.ports = Some("8080/http, 22/tcp".into());
        fields.volume_mount_path = Some("/runpod-volume".into());
        fields.network_volume_id = Some("vol_123".into());
        fields.support_public_ip = Some(true);
        let mut env = BTreeMap::new();
        env.insert("RUNPOD_PROJECT_ID".into(), "abc12345".into());
        env.insert("HF_TOKEN".into(), "secret".into());
        fields.env = Some(env);

        let doc = deploy_pod(&fields).unwrap();
        assert!(doc.contains("gpuTypeId: \"NVIDIA RTX A4000\""));
        assert!(doc.contains("gpuCount: 2"));
        // whitespace is stripped from ports
        assert!(doc.contains("ports: \"8080/http,22/tcp\""));
        assert!(doc.contains("volumeMountPath: \"/runpod-volume\""));
        assert!(doc.contains("networkVolumeId: \"vol_123\""));
        assert!(doc.contains("supportPublicIp: true"));
        // env entries are emitted in key order
        assert!(doc.contains(
            "env: [{ key: \"HF_TOKEN\", value: \"secret\" }, \
             { key: \"RUNPOD_PROJECT_ID\", value: \"abc12345\" }]"
        ));
        assert!(!doc.contains("null"));
    }

    #[test]
    fn deploy_rejects_missing_required_fields() {
        for field in ["name", "image_name", "cloud_type", "container_disk_in_gb"] {
            let mut fields = minimal_deploy();
            match field {
                "name" => fields.name = None,
                "image_name" => fields.image_name = None,
                "cloud_type" => fields.cloud_type = None,
                _ => fields.container_disk_in_gb = None,
            }
            let err = deploy_pod(&fields).unwrap_err();
            assert!(
                err.to_string().contains(field),
                "expected {field} in: {err}"
            );
        }
    }

    #[test]
    fn stop_references_id_exactly_once() {
        let doc = stop_pod("pod_abc").unwrap();
        assert!(doc.contains("podStop"));
        assert_eq!(doc.matches("\"pod_abc\"").count(), 1);
    }

    #[test]
    fn stop_rejects_empty_id() {
        assert!(stop_pod("").is_err());
        assert!(stop_pod("   ").is_err());
    }

    #[test]
    fn terminate_references_id_exactly_once() {
        let doc = terminate_pod("pod_abc").unwrap();
        assert!(doc.contains("podTerminate"));
        assert_eq!(doc.matches("\"pod_abc\"").count(), 1);
    }

    #[test]
    fn terminate_rejects_empty_id() {
        assert!(terminate_pod("").is_err());
    }

    #[test]
    fn resume_includes_both_fields() {
        let doc = resume_pod("pod_abc", 2).unwrap();
        assert!(doc.contains("podResume"));
        assert!(doc.contains("podId: \"pod_abc\""));
        assert!(doc.contains("gpuCount: 2"));
    }

    #[test]
    fn resume_rejects_zero_gpu_count() {
        let err = resume_pod("pod_abc", 0).unwrap_err();
        assert!(err.to_string().contains("gpu_count"));
    }

    #[test]
    fn resume_rejects_empty_id() {
        assert!(resume_pod("", 1).is_err());
    }

    #[test]
    fn quote_escapes_embedded_characters() {
        assert_eq!(quote(r#"bash -c "run""#), r#""bash -c \"run\"""#);
        assert_eq!(quote("a\\b"), r#""a\\b""#);
        assert_eq!(quote("a\nb"), r#""a\nb""#);
    }

    #[test]
    fn template_requires_name_and_image() {
        let err = save_template(&SaveTemplateFields::default()).unwrap_err();
        assert!(err.to_string().contains("name"));

        let fields = SaveTemplateFields {
            name: Some("tmpl".into()),
            ..Default::default()
        };
        let err = save_template(&fields).unwrap_err();
        assert!(err.to_string().contains("image_name"));
    }

    #[test]
    fn template_escapes_start_command() {
        let fields = SaveTemplateFields {
            name: Some("proj-endpoint | abc12345".into()),
            image_name: Some("runpod/base:0.2.1".into()),
            docker_start_cmd: Some(r#"bash -c ". /venv/bin/activate && python -u h.py""#.into()),
            is_serverless: true,
            ..Default::default()
        };
        let doc = save_template(&fields).unwrap();
        assert!(doc.contains("saveTemplate"));
        assert!(doc.contains("isServerless: true"));
        assert!(doc.contains("containerDiskInGb: 10"));
        assert!(doc.contains(r#"dockerArgs: "bash -c \". /venv/bin/activate && python -u h.py\"""#));
    }

    #[test]
    fn endpoint_requires_name_and_template() {
        let err = save_endpoint(&SaveEndpointFields::default()).unwrap_err();
        assert!(err.to_string().contains("name"));

        let fields = SaveEndpointFields {
            name: Some("ep".into()),
            ..Default::default()
        };
        let err = save_endpoint(&fields).unwrap_err();
        assert!(err.to_string().contains("template_id"));
    }

    #[test]
    fn endpoint_applies_scaling_defaults() {
        let fields = SaveEndpointFields {
            name: Some("proj-endpoint | abc12345".into()),
            template_id: Some("tmpl_1".into()),
            network_volume_id: Some("vol_1".into()),
            ..Default::default()
        };
        let doc = save_endpoint(&fields).unwrap();
        assert!(doc.contains("templateId: \"tmpl_1\""));
        assert!(doc.contains("networkVolumeId: \"vol_1\""));
        assert!(doc.contains("gpuIds: \"AMPERE_16\""));
        assert!(doc.contains("workersMin: 0"));
        assert!(doc.contains("workersMax: 3"));
        assert!(doc.contains("idleTimeout: 5"));
        assert!(doc.contains("scalerType: \"QUEUE_DELAY\""));
        assert!(doc.contains("scalerValue: 4"));
    }
}
