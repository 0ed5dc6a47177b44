use std::path::PathBuf;

use clap::Args;

use crate::config::{self, CONFIG_FILE};
use crate::error::{ProjectError, ProjectResult};
use crate::starter;

#[derive(Args)]
pub struct NewArgs {
    /// Name of the project to create
    pub name: String,
    /// Network volume id backing the project
    #[arg(long)]
    pub storage_id: String,
    /// Python interpreter version for the remote venv
    #[arg(long, default_value = "3.11")]
    pub python_version: String,
    /// Starter template variant
    #[arg(long, default_value = "default")]
    pub model_type: String,
    /// Model name substituted into the starter handler
    #[arg(long)]
    pub model_name: Option<String>,
    /// Scaffold into the current directory instead of creating a new one
    #[arg(long)]
    pub init: bool,
}

pub async fn run_new(args: NewArgs) -> ProjectResult<()> {
    let project_dir = if args.init {
        std::env::current_dir()?
    } else {
        PathBuf::from(&args.name)
    };

    let config_path = project_dir.join(CONFIG_FILE);
    if tokio::fs::try_exists(&config_path)
        .await
        .map_err(|e| ProjectError::Config(format!("check {}: {e}", config_path.display())))?
    {
        return Err(ProjectError::Config(format!(
            "{} already exists; this directory is already a project",
            config_path.display()
        )));
    }

    tokio::fs::create_dir_all(&project_dir).await?;
    starter::write_starter(&project_dir, args.model_name.as_deref()).await?;

    let file = config::new_project_file(
        &args.name,
        &args.storage_id,
        &args.python_version,
        &args.model_type,
        args.model_name.as_deref(),
    );
    config::save(&file, &config_path).await?;

    println!(
        "Created project '{}' ({})",
        args.name, file.project.uuid
    );
    println!();
    println!("Next steps:");
    if !args.init {
        println!("  cd {}", args.name);
    }
    println!("  runpod launch    # provision the dev pod");
    println!("  runpod start     # run the dev server with auto-restart");
    println!("  runpod deploy    # promote to a serverless endpoint");
    Ok(())
}
