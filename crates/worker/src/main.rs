use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mia_worker::auth::identity::HttpIdentityClient;
use mia_worker::auth::AuthGate;
use mia_worker::config::WorkerConfig;
use mia_worker::library::AnimationLibrary;
use mia_worker::pipeline::CommandPipeline;
use mia_worker::render::CommandRenderer;
use mia_worker::router::build_app_router;
use mia_worker::scratch::ScratchSpace;
use mia_worker::service::AnimationService;
use mia_worker::state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mia_worker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Worker failed to start");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // --- Configuration ---
    let config = WorkerConfig::from_env()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        scratch_dir = %config.scratch_dir.display(),
        animation_dir = %config.animation_dir.display(),
        "Loaded worker configuration",
    );

    // --- Animation library ---
    let library = AnimationLibrary::new(&config.animation_dir);
    let available = library.available().await;
    if available.is_empty() {
        tracing::warn!("No animation clips found; every job will fail with 404");
    } else {
        tracing::info!(clips = ?available, "Animation library loaded");
    }

    // --- Scratch space ---
    tokio::fs::create_dir_all(&config.scratch_dir).await?;
    let scratch = ScratchSpace::new(&config.scratch_dir);

    // --- Authentication ---
    let identity = HttpIdentityClient::new(
        config.identity_endpoints.clone(),
        Duration::from_secs(config.identity_timeout_secs),
    )?;
    let auth = AuthGate::new(
        Arc::new(identity),
        Duration::from_secs(config.auth_cache_ttl_secs),
    );

    // --- Pipeline and renderers ---
    let pipeline = CommandPipeline::new(
        config.pipeline_command.clone(),
        Duration::from_secs(config.pipeline_timeout_secs),
    );
    let renderer = CommandRenderer::new(
        config.thumbnail_command.clone(),
        config.preview_command.clone(),
        Duration::from_secs(config.render_timeout_secs),
    );
    if config.thumbnail_command.is_none() || config.preview_command.is_none() {
        tracing::info!("Preview rendering partially disabled; missing previews are returned as null");
    }

    let service = AnimationService::new(library, scratch, Arc::new(pipeline), Arc::new(renderer));

    // --- App state ---
    let state = AppState {
        auth: Arc::new(auth),
        service: Arc::new(service),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(config.host.parse()?, config.port);
    tracing::info!(%addr, "Starting worker");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the worker stops
/// cleanly whether run interactively or by the launcher.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
