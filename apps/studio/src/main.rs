use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, GenerationBackend, SourceFile, StudioClient, UiState, WorkflowController,
};
use shared::domain::JobId;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod view;

use view::TerminalView;

#[derive(Parser, Debug)]
#[command(name = "studio", about = "Run image effects against the generation service")]
struct Args {
    #[arg(long, global = true, default_value = "studio.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload, generate, poll and save the result.
    Generate {
        file: PathBuf,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Upload only and print the public URL.
    Upload { file: PathBuf },
    /// Fetch the status of a job once.
    Status { job_id: String },
    /// Download a result URL through the fallback chain.
    Download {
        url: String,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let args = Args::parse();

    let client = StudioClient::new(load_settings(&args.config)?);
    let settings = client.settings();
    info!(
        api = %settings.api_base_url,
        mode = settings.mode.endpoint(),
        effect = %settings.effect_id,
        "studio: settings loaded"
    );

    match args.command {
        Command::Generate { file, out } => generate(client, file, out).await,
        Command::Upload { file } => {
            let source = SourceFile::from_path(&file).await?;
            println!("{}", client.upload_file(&source).await?);
            Ok(())
        }
        Command::Status { job_id } => {
            let status = client.job_status(&JobId::from(job_id.as_str())).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
        Command::Download { url, out } => {
            let media = client.download(&url).await?;
            let path = media.save_into(&out).await?;
            println!("saved {}", path.display());
            Ok(())
        }
    }
}

async fn generate(client: StudioClient, file: PathBuf, out: PathBuf) -> Result<()> {
    let source = SourceFile::from_path(&file).await?;
    let mut controller = WorkflowController::new(client, TerminalView::default());
    controller.render();

    let uploaded = tokio::select! {
        uploaded = controller.select_file(source) => uploaded,
        _ = tokio::signal::ctrl_c() => bail!("interrupted during upload"),
    };
    if uploaded.is_none() {
        return fail(&controller);
    }

    let token = controller.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("studio: interrupted, cancelling session");
            token.cancel();
        }
    });

    if controller.generate().await.is_none() {
        return fail(&controller);
    }

    match controller.download(&out).await {
        Some(path) => println!("saved {}", path.display()),
        None => {
            if let Some(url) = controller.view_model().download_url {
                println!("{url}");
            }
        }
    }
    Ok(())
}

fn fail<B: GenerationBackend, V: client_core::View>(
    controller: &WorkflowController<B, V>,
) -> Result<()> {
    match controller.state() {
        UiState::Error(report) => bail!("{}", report.message),
        _ => bail!("session cancelled"),
    }
}
