use std::path::PathBuf;

use clap::Args;

use runpod_api::PodApi;

use crate::cmd::{ApiArgs, cancel_on_ctrl_c, project_root};
use crate::config::{self, CONFIG_FILE};
use crate::devserver::{DEV_API_PORT, DevServer};
use crate::error::{ProjectError, ProjectResult};
use crate::ignore;
use crate::paths::RemotePaths;
use crate::ssh::{self, SshSession};

#[derive(Args)]
pub struct StartArgs {
    #[command(flatten)]
    api: ApiArgs,
    /// Path to the project config
    #[arg(long, short, default_value = CONFIG_FILE)]
    config: PathBuf,
    /// SSH private key (defaults to the RunPod key in the home directory)
    #[arg(long)]
    ssh_key: Option<PathBuf>,
}

/// Sync the project tree and supervise the remote dev server until Ctrl-C.
pub async fn run_start(args: StartArgs) -> ProjectResult<()> {
    let config = config::load(&args.config).await?;
    ssh::check_local_tools()?;
    let api = args.api.client()?;

    let uuid = config.project.uuid.clone();
    let pod = api
        .find_project_pod(&uuid)
        .await?
        .ok_or(ProjectError::PodNotFound { uuid })?;
    if !pod.is_ready() {
        return Err(ProjectError::PodNotRunning {
            pod_id: pod.id.clone(),
        });
    }

    let key_path = match args.ssh_key {
        Some(path) => path,
        None => ssh::default_key_path()?,
    };
    let session = SshSession::connect(&pod, key_path)?;
    let paths = RemotePaths::new(&config);

    println!("Syncing project files to pod {}", pod.id);
    let local_root = project_root(&args.config);
    let patterns = ignore::load_patterns(&local_root).await?;
    session
        .rsync(&local_root, paths.project_dir(), &patterns)
        .await?;

    println!("Starting dev server; press Ctrl-C to stop.");
    println!(
        "API docs: https://{}-{}.proxy.runpod.net/docs",
        pod.id, DEV_API_PORT
    );
    println!();

    let cancel = cancel_on_ctrl_c();
    let mut server = DevServer::new(&session, &config, &paths, &patterns);
    server.run(&cancel).await?;

    println!("Dev server stopped.");
    Ok(())
}
