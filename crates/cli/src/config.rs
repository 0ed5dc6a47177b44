use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ProjectError, ProjectResult};

/// File name of the per-project config, in the project root.
pub const CONFIG_FILE: &str = "runpod.toml";
/// Env var binding every project pod and endpoint carries.
pub const PROJECT_ID_ENV: &str = "RUNPOD_PROJECT_ID";

pub(crate) const DEFAULT_BASE_IMAGE: &str = "runpod/base:0.2.1";
pub(crate) const DEFAULT_VOLUME_MOUNT_PATH: &str = "/runpod-volume";
pub(crate) const DEFAULT_PORTS: &str = "8080/http, 22/tcp";
pub(crate) const DEFAULT_CONTAINER_DISK_GB: u32 = 10;
pub(crate) const DEFAULT_GPU_TYPES: [&str; 5] = [
    "NVIDIA RTX A4000",
    "NVIDIA RTX A4500",
    "NVIDIA RTX A5000",
    "NVIDIA GeForce RTX 3090",
    "NVIDIA RTX A6000",
];

/// The whole `runpod.toml` document. Section names and nesting are a stable
/// contract: the file round-trips through load/save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub title: String,
    pub project: ProjectConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateConfig>,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// 8-hex project id; immutable once assigned.
    pub uuid: String,
    pub name: String,
    pub base_image: String,
    /// GPU types to try at launch, in order of preference.
    pub gpu_types: Vec<String>,
    /// Optional single GPU override, appended to the candidate list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<String>,
    pub gpu_count: u32,
    /// Network volume backing the project.
    pub storage_id: String,
    pub volume_mount_path: String,
    pub ports: String,
    pub container_disk_size_gb: u32,
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
}

/// Scaffold metadata written by `new`; round-tripped untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub model_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub python_version: String,
    pub handler_path: String,
    pub requirements_path: String,
}

/// Build the config for a freshly scaffolded project with a new 8-hex uuid.
pub fn new_project_file(
    name: &str,
    storage_id: &str,
    python_version: &str,
    model_type: &str,
    model_name: Option<&str>,
) -> ProjectFile {
    let uuid = short_uuid();
    let mut env_vars = BTreeMap::new();
    env_vars.insert(PROJECT_ID_ENV.to_string(), uuid.clone());

    ProjectFile {
        title: name.to_string(),
        project: ProjectConfig {
            uuid,
            name: name.to_string(),
            base_image: DEFAULT_BASE_IMAGE.to_string(),
            gpu_types: DEFAULT_GPU_TYPES.iter().map(|s| s.to_string()).collect(),
            gpu: None,
            gpu_count: 1,
            storage_id: storage_id.to_string(),
            volume_mount_path: DEFAULT_VOLUME_MOUNT_PATH.to_string(),
            ports: DEFAULT_PORTS.to_string(),
            container_disk_size_gb: DEFAULT_CONTAINER_DISK_GB,
            env_vars,
        },
        template: Some(TemplateConfig {
            model_type: model_type.to_string(),
            model_name: model_name.map(str::to_string),
        }),
        runtime: RuntimeConfig {
            python_version: python_version.to_string(),
            handler_path: "src/handler.py".to_string(),
            requirements_path: "builder/requirements.txt".to_string(),
        },
    }
}

fn short_uuid() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Load and validate a project config from a TOML file.
pub async fn load(path: &Path) -> ProjectResult<ProjectFile> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ProjectError::Config(format!("read {}: {e}", path.display())))?;
    let mut file: ProjectFile = toml::from_str(&content)
        .map_err(|e| ProjectError::Config(format!("parse {}: {e}", path.display())))?;
    validate(&mut file)?;
    Ok(file)
}

/// Write a project config to a TOML file.
pub async fn save(file: &ProjectFile, path: &Path) -> ProjectResult<()> {
    let content = toml::to_string_pretty(file)
        .map_err(|e| ProjectError::Config(format!("serialize config: {e}")))?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| ProjectError::Config(format!("write {}: {e}", path.display())))?;
    Ok(())
}

/// Check invariants and re-assert the project-id env binding.
///
/// A missing binding is injected; a binding that contradicts the (immutable)
/// uuid is a config error.
fn validate(file: &mut ProjectFile) -> ProjectResult<()> {
    let project = &mut file.project;
    if project.uuid.len() != 8 || !project.uuid.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ProjectError::Config(format!(
            "project.uuid must be 8 hex characters, got {:?}",
            project.uuid
        )));
    }
    if project.name.is_empty() {
        return Err(ProjectError::Config("project.name must not be empty".into()));
    }
    if project.storage_id.is_empty() {
        return Err(ProjectError::Config(
            "project.storage_id must not be empty".into(),
        ));
    }
    if project.gpu_count == 0 {
        return Err(ProjectError::Config(
            "project.gpu_count must be at least 1".into(),
        ));
    }
    match project.env_vars.get(PROJECT_ID_ENV) {
        None => {
            project
                .env_vars
                .insert(PROJECT_ID_ENV.to_string(), project.uuid.clone());
        }
        Some(bound) if bound != &project.uuid => {
            return Err(ProjectError::Config(format!(
                "env_vars.{PROJECT_ID_ENV} ({bound}) does not match project.uuid ({})",
                project.uuid
            )));
        }
        Some(_) => {}
    }
    Ok(())
}
