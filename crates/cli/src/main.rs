mod cmd;
mod config;
mod devserver;
mod error;
mod ignore;
mod paths;
mod project;
mod ssh;
mod starter;
#[cfg(test)]
mod testutil;

use std::fmt;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct Elapsed(Instant);

impl FormatTime for Elapsed {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let d = self.0.elapsed();
        let total_secs = d.as_secs();
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        let millis = d.subsec_millis();
        write!(w, "[{mins:02}:{secs:02}:{millis:03}]")
    }
}

#[derive(Parser)]
#[command(
    name = "runpod",
    version,
    about = "Scaffold, develop, and deploy RunPod serverless projects"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new project skeleton and config
    New(cmd::NewArgs),
    /// Provision the project pod and bootstrap its environment
    Launch(Box<cmd::LaunchArgs>),
    /// Sync files and run the dev server with auto-restart
    Start(Box<cmd::StartArgs>),
    /// Promote the project to a serverless endpoint
    Deploy(cmd::DeployArgs),
    /// Pod lifecycle operations
    Pod(cmd::PodArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_timer(Elapsed(Instant::now()))
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::New(args) => cmd::run_new(args).await,
        Command::Launch(args) => cmd::run_launch(*args).await,
        Command::Start(args) => cmd::run_start(*args).await,
        Command::Deploy(args) => cmd::run_deploy(args).await,
        Command::Pod(args) => cmd::run_pod(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
