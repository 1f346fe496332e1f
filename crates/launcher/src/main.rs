use std::process::ExitCode;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mia_launcher::config::LauncherConfig;
use mia_launcher::error::LaunchError;
use mia_launcher::plan::LaunchPlan;
use mia_launcher::supervisor::Supervisor;

/// Usage: `mia-launcher [dev|prod]`
#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mia_launcher=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(std::env::args().nth(1)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Launcher stopped with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(env_arg: Option<String>) -> Result<(), LaunchError> {
    let config = LauncherConfig::from_env(env_arg)?;
    let plan = LaunchPlan::new(&config)?;
    tracing::info!(
        environment = %config.environment,
        workers = plan.workers.len(),
        router = %plan.router.name,
        "Launching animation services",
    );

    let supervisor = Supervisor::launch(
        &plan,
        Duration::from_secs(config.startup_grace_secs),
        Duration::from_secs(config.shutdown_grace_secs),
    )
    .await?;
    tracing::info!(processes = supervisor.len(), "All services launched");

    supervisor.supervise(shutdown_signal()).await?;
    tracing::info!("All services stopped");
    Ok(())
}

/// Resolve on SIGINT or, on Unix, SIGTERM.
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
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), stopping services"),
        () = terminate => tracing::info!("Received SIGTERM, stopping services"),
    }
}
