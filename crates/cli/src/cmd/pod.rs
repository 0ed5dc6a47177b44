use clap::{Args, Subcommand};

use runpod_api::PodApi;

use crate::cmd::ApiArgs;
use crate::error::ProjectResult;

#[derive(Args)]
pub struct PodArgs {
    #[command(subcommand)]
    command: PodCommand,
}

#[derive(Subcommand)]
enum PodCommand {
    /// Stop a pod (it can be resumed later)
    Stop {
        #[command(flatten)]
        api: ApiArgs,
        #[arg(long)]
        pod_id: String,
    },
    /// Resume a stopped pod
    Resume {
        #[command(flatten)]
        api: ApiArgs,
        #[arg(long)]
        pod_id: String,
        #[arg(long, default_value_t = 1)]
        gpu_count: u32,
    },
    /// Terminate a pod permanently
    Terminate {
        #[command(flatten)]
        api: ApiArgs,
        #[arg(long)]
        pod_id: String,
    },
}

pub async fn run_pod(args: PodArgs) -> ProjectResult<()> {
    match args.command {
        PodCommand::Stop { api, pod_id } => {
            let pod = api.client()?.stop_pod(&pod_id).await?;
            println!("Pod {} stopping.", pod.id);
        }
        PodCommand::Resume {
            api,
            pod_id,
            gpu_count,
        } => {
            let pod = api.client()?.resume_pod(&pod_id, gpu_count).await?;
            println!("Pod {} resuming with {gpu_count} GPU(s).", pod.id);
        }
        PodCommand::Terminate { api, pod_id } => {
            api.client()?.terminate_pod(&pod_id).await?;
            println!("Pod {pod_id} terminated.");
        }
    }
    Ok(())
}
