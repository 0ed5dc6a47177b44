use crate::config::ProjectFile;

/// Remote filesystem layout for a project on the pod's network volume.
///
/// Everything lives under `{volume_mount_path}/{uuid}`: the synced project
/// tree in a directory named after the project, and the shared venv next to
/// it so reinstalls survive pod recreation.
#[derive(Debug, Clone)]
pub struct RemotePaths {
    root: String,
    project_dir: String,
    venv: String,
}

impl RemotePaths {
    pub fn new(config: &ProjectFile) -> Self {
        let project = &config.project;
        let root = format!("{}/{}", project.volume_mount_path, project.uuid);
        let project_dir = format!("{root}/{}", project.name);
        let venv = format!("{root}/venv");
        Self {
            root,
            project_dir,
            venv,
        }
    }

    /// `{volume_mount_path}/{uuid}/{name}`, the synced project tree.
    pub fn project_dir(&self) -> &str {
        &self.project_dir
    }

    pub fn venv(&self) -> &str {
        &self.venv
    }

    pub fn activate(&self) -> String {
        format!("{}/bin/activate", self.venv)
    }

    /// Absolute remote path of the handler entry point.
    pub fn handler(&self, config: &ProjectFile) -> String {
        format!("{}/{}", self.project_dir, config.runtime.handler_path)
    }

    /// Absolute remote path of the requirements file.
    pub fn requirements(&self, config: &ProjectFile) -> String {
        format!("{}/{}", self.project_dir, config.runtime.requirements_path)
    }

    /// Handler output log, outside the watched project tree so appends do
    /// not trigger the file watcher.
    pub fn dev_log(&self) -> String {
        format!("{}/dev-server.log", self.root)
    }
}
