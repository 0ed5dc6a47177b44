pub mod deploy;
pub mod launch;
pub mod new;
pub mod pod;
pub mod start;

use std::path::{Path, PathBuf};

use clap::Args;
use tokio_util::sync::CancellationToken;

use runpod_api::ApiClient;
use runpod_api::client::DEFAULT_API_URL;

use crate::error::ProjectResult;

pub use deploy::{DeployArgs, run_deploy};
pub use launch::{LaunchArgs, run_launch};
pub use new::{NewArgs, run_new};
pub use pod::{PodArgs, run_pod};
pub use start::{StartArgs, run_start};

/// API connection flags shared by every command that talks to RunPod.
#[derive(Args)]
pub struct ApiArgs {
    /// RunPod API key
    #[arg(long, env = "RUNPOD_API_KEY")]
    pub api_key: String,
    /// RunPod GraphQL endpoint
    #[arg(long, env = "RUNPOD_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
}

impl ApiArgs {
    pub fn client(&self) -> ProjectResult<ApiClient> {
        Ok(ApiClient::new(self.api_url.clone(), self.api_key.clone())?)
    }
}

/// Token cancelled on the first Ctrl-C.
pub(crate) fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let handle = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });
    cancel
}

/// Directory the config file lives in, i.e. the local project root.
pub(crate) fn project_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
