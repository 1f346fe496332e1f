use mia_core::config::{parse_var, split_list};
use mia_core::deployment::{Environment, DEFAULT_WORKER_HOST};
use mia_core::error::CoreError;
use mia_core::pool::WorkerAddress;

/// Router configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: the environment's router port).
    pub port: u16,
    pub environment: Environment,
    /// Workers in dispatch order.
    pub workers: Vec<WorkerAddress>,
    /// Upper bound on one forwarded call, connect to last byte.
    pub worker_timeout_secs: u64,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl RouterConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var               | Default                                   |
    /// |-----------------------|-------------------------------------------|
    /// | `MIA_ENV`             | *(required)* `dev` or `prod`              |
    /// | `HOST`                | `0.0.0.0`                                 |
    /// | `PORT`                | `8000` (dev) / `9000` (prod)              |
    /// | `WORKER_HOST`         | `localhost`                               |
    /// | `WORKER_URLS`         | *(unset)* overrides the environment ports |
    /// | `WORKER_TIMEOUT_SECS` | `300`                                     |
    /// | `CORS_ORIGINS`        | *(any)*                                   |
    /// | `MAX_BODY_BYTES`      | `536870912` (512 MiB)                     |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let environment: Environment = lookup("MIA_ENV")
            .ok_or_else(|| CoreError::Config("MIA_ENV must be set to 'dev' or 'prod'".to_string()))?
            .parse()?;
        let deployment = environment.deployment();

        let workers = match lookup("WORKER_URLS") {
            Some(raw) => split_list(&raw)
                .iter()
                .map(|s| s.parse())
                .collect::<Result<Vec<WorkerAddress>, _>>()?,
            None => deployment.worker_addresses(&get("WORKER_HOST", DEFAULT_WORKER_HOST)),
        };
        if workers.is_empty() {
            return Err(CoreError::Config(
                "Worker pool must contain at least one worker".to_string(),
            ));
        }

        let port = match lookup("PORT") {
            Some(raw) => parse_var("PORT", &raw)?,
            None => deployment.router_port,
        };

        Ok(Self {
            host: get("HOST", "0.0.0.0"),
            port,
            environment,
            workers,
            worker_timeout_secs: parse_var(
                "WORKER_TIMEOUT_SECS",
                &get("WORKER_TIMEOUT_SECS", "300"),
            )?,
            cors_origins: split_list(&get("CORS_ORIGINS", "")),
            max_body_bytes: parse_var("MAX_BODY_BYTES", &get("MAX_BODY_BYTES", "536870912"))?,
        })
    }
}
