use std::path::PathBuf;

use clap::Args;

use runpod_api::{PodApi, SaveEndpointFields, SaveTemplateFields};

use crate::cmd::ApiArgs;
use crate::config::{self, CONFIG_FILE, ProjectFile};
use crate::error::ProjectResult;
use crate::paths::RemotePaths;

#[derive(Args)]
pub struct DeployArgs {
    #[command(flatten)]
    api: ApiArgs,
    /// Path to the project config
    #[arg(long, short, default_value = CONFIG_FILE)]
    config: PathBuf,
}

/// Promote the project to a serverless endpoint.
pub async fn run_deploy(args: DeployArgs) -> ProjectResult<()> {
    let config = config::load(&args.config).await?;
    let api = args.api.client()?;

    println!(
        "Deploying project '{}' ({}) as a serverless endpoint",
        config.project.name, config.project.uuid
    );
    let endpoint_id = promote(&api, &config).await?;

    println!("Endpoint created: {endpoint_id}");
    println!("  https://api.runpod.ai/v2/{endpoint_id}/runsync");
    Ok(())
}

/// Shell command the endpoint workers run: activate the bootstrapped venv,
/// then the handler unbuffered.
fn docker_start_cmd(config: &ProjectFile, paths: &RemotePaths) -> String {
    format!(
        "bash -c \". {} && python -u {}\"",
        paths.activate(),
        paths.handler(config)
    )
}

fn endpoint_name(config: &ProjectFile) -> String {
    format!("{}-endpoint | {}", config.project.name, config.project.uuid)
}

/// Create the serverless template, then the endpoint referencing it.
///
/// There is no rollback: when endpoint creation fails after the template was
/// created, the template is left in place for the operator to reuse or
/// delete.
pub async fn promote<A: PodApi + ?Sized>(
    api: &A,
    config: &ProjectFile,
) -> ProjectResult<String> {
    let paths = RemotePaths::new(config);
    let name = endpoint_name(config);

    let template = api
        .create_template(&SaveTemplateFields {
            name: Some(name.clone()),
            image_name: Some(config.project.base_image.clone()),
            docker_start_cmd: Some(docker_start_cmd(config, &paths)),
            container_disk_in_gb: Some(config.project.container_disk_size_gb),
            env: Some(config.project.env_vars.clone()),
            is_serverless: true,
            ..Default::default()
        })
        .await?;

    let endpoint = api
        .create_endpoint(&SaveEndpointFields {
            name: Some(name),
            template_id: Some(template.id),
            network_volume_id: Some(config.project.storage_id.clone()),
            ..Default::default()
        })
        .await?;

    Ok(endpoint.id)
}
