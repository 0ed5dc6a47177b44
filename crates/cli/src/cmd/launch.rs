use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::cmd::{ApiArgs, cancel_on_ctrl_c, project_root};
use crate::config::{self, CONFIG_FILE};
use crate::error::ProjectResult;
use crate::ignore;
use crate::paths::RemotePaths;
use crate::project::{self, LaunchOutcome};
use crate::ssh::{self, SshSession, run_checked};

#[derive(Args)]
pub struct LaunchArgs {
    #[command(flatten)]
    api: ApiArgs,
    /// Path to the project config
    #[arg(long, short, default_value = CONFIG_FILE)]
    config: PathBuf,
    /// Seconds to wait for the pod to come online
    #[arg(long, default_value_t = project::DEFAULT_READY_TIMEOUT.as_secs())]
    timeout: u64,
    /// SSH private key (defaults to the RunPod key in the home directory)
    #[arg(long)]
    ssh_key: Option<PathBuf>,
}

/// Provision the project pod, wait for it, sync files, and bootstrap the
/// remote environment.
pub async fn run_launch(args: LaunchArgs) -> ProjectResult<()> {
    let config = config::load(&args.config).await?;
    ssh::check_local_tools()?;
    let api = args.api.client()?;

    let project = &config.project;
    println!("Launching project '{}' ({})", project.name, project.uuid);
    println!("    - base_image: {}", project.base_image);
    println!("    - gpu_types: {}", project.gpu_types.join(", "));
    println!("    - gpu_count: {}", project.gpu_count);
    println!("    - storage_id: {}", project.storage_id);
    println!();

    let pod = match project::launch_pod(&api, &config).await? {
        LaunchOutcome::AlreadyLaunched(pod) => {
            println!(
                "Project pod already launched ({}). Run \"runpod start\" to start the dev server.",
                pod.id
            );
            return Ok(());
        }
        LaunchOutcome::Created(pod) => pod,
    };

    println!("Waiting for pod {} to come online...", pod.id);
    let cancel = cancel_on_ctrl_c();
    let pod = project::await_ready(
        &api,
        &pod.id,
        Duration::from_secs(args.timeout),
        &cancel,
    )
    .await?;
    println!("Pod {} is running.", pod.id);

    let key_path = match args.ssh_key {
        Some(path) => path,
        None => ssh::default_key_path()?,
    };
    let session = SshSession::connect(&pod, key_path)?;
    let paths = RemotePaths::new(&config);

    println!("Creating project folder {} on pod {}", paths.project_dir(), pod.id);
    run_checked(&session, &format!("mkdir -p {}", paths.project_dir())).await?;

    println!("Copying files to pod {}", pod.id);
    let local_root = project_root(&args.config);
    let patterns = ignore::load_patterns(&local_root).await?;
    session
        .rsync(&local_root, paths.project_dir(), &patterns)
        .await?;

    println!("Creating virtual environment {} on pod {}", paths.venv(), pod.id);
    project::bootstrap(&session, &config, &paths).await?;

    println!();
    println!("Project launched. Run \"runpod start\" to start the dev server.");
    Ok(())
}
