//! Embedded starter files written by `runpod new`.

use std::path::Path;

use crate::error::{ProjectError, ProjectResult};
use crate::ignore::IGNORE_FILE;

const MODEL_NAME_PLACEHOLDER: &str = "<<MODEL_NAME>>";

const HANDLER_PY: &str = r#""""Minimal serverless handler. Replace `run` with your model logic."""

import runpod

MODEL_NAME = "<<MODEL_NAME>>"


def run(job):
    """Handle one job. `job["input"]` carries the request payload."""
    prompt = job["input"].get("prompt")
    return {"model": MODEL_NAME, "output": f"echo: {prompt}"}


runpod.serverless.start({"handler": run})
"#;

const REQUIREMENTS_TXT: &str = "runpod\n";

const IGNORE_STARTER: &str = "\
# Patterns ignored by the dev-server file watcher and rsync.
# One pattern per line; lines starting with # are comments.
*.pyc
__pycache__/
.git/
";

/// Write the starter tree into `project_dir`, skipping files that already
/// exist so re-running `new --init` never clobbers user code.
pub async fn write_starter(project_dir: &Path, model_name: Option<&str>) -> ProjectResult<()> {
    let handler = HANDLER_PY.replace(MODEL_NAME_PLACEHOLDER, model_name.unwrap_or("default"));

    write_if_absent(&project_dir.join("src").join("handler.py"), &handler).await?;
    write_if_absent(
        &project_dir.join("builder").join("requirements.txt"),
        REQUIREMENTS_TXT,
    )
    .await?;
    write_if_absent(&project_dir.join(IGNORE_FILE), IGNORE_STARTER).await?;
    Ok(())
}

async fn write_if_absent(path: &Path, content: &str) -> ProjectResult<()> {
    if tokio::fs::try_exists(path)
        .await
        .map_err(|e| ProjectError::Config(format!("check {}: {e}", path.display())))?
    {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ProjectError::Config(format!("create {}: {e}", parent.display())))?;
    }
    tokio::fs::write(path, content)
        .await
        .map_err(|e| ProjectError::Config(format!("write {}: {e}", path.display())))?;
    Ok(())
}
