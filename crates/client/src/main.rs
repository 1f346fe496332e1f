use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mia_client::client::AnimateClient;
use mia_client::config::ClientConfig;
use mia_client::error::ClientError;
use mia_client::output::save_outputs;

/// Usage: `mia-client <mesh.glb|mesh.fbx> [animation]`
#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mia_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Animation request failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &[String]) -> Result<(), ClientError> {
    let config = ClientConfig::from_env(args)?;
    let mesh = tokio::fs::read(&config.mesh_path)
        .await
        .map_err(|source| ClientError::Io {
            path: config.mesh_path.clone(),
            source,
        })?;

    tracing::info!(
        url = %config.animate_url(),
        animation = %config.animation,
        mesh_bytes = mesh.len(),
        "Sending animation request",
    );
    let client = AnimateClient::new(&config)?;
    let result = client
        .animate(&AnimateClient::job_for(&mesh, config.animation))
        .await?;

    let saved = save_outputs(&result, &config.output_dir).await?;
    tracing::info!(path = %saved.mesh.display(), "Saved animated mesh");
    match &saved.gif {
        Some(path) => tracing::info!(path = %path.display(), "Saved animation GIF"),
        None => tracing::warn!("No GIF preview in the response"),
    }
    match &saved.thumbnail {
        Some(path) => tracing::info!(path = %path.display(), "Saved thumbnail"),
        None => tracing::warn!("No thumbnail in the response"),
    }
    Ok(())
}
