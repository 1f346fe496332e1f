use mia_core::config::parse_var;
use mia_core::deployment::Environment;
use mia_core::error::CoreError;

/// Launcher configuration.
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub environment: Environment,
    /// Worker executable, started once per GPU.
    pub worker_bin: String,
    pub router_bin: String,
    /// Pause between starting the workers and starting the router.
    pub startup_grace_secs: u64,
    /// How long a child may take to exit after SIGTERM before it is killed.
    pub shutdown_grace_secs: u64,
}

impl LauncherConfig {
    /// Load configuration from the command-line environment argument and
    /// environment variables.
    ///
    /// | Source                | Default                  |
    /// |-----------------------|--------------------------|
    /// | first argument        | `MIA_ENV`, else `dev`    |
    /// | `WORKER_BIN`          | `mia-worker`             |
    /// | `ROUTER_BIN`          | `mia-router`             |
    /// | `STARTUP_GRACE_SECS`  | `3`                      |
    /// | `SHUTDOWN_GRACE_SECS` | `10`                     |
    pub fn from_env(env_arg: Option<String>) -> Result<Self, CoreError> {
        Self::from_lookup(env_arg, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(env_arg: Option<String>, lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let environment = env_arg
            .or_else(|| lookup("MIA_ENV"))
            .unwrap_or_else(|| "dev".to_string())
            .parse()?;

        Ok(Self {
            environment,
            worker_bin: get("WORKER_BIN", "mia-worker"),
            router_bin: get("ROUTER_BIN", "mia-router"),
            startup_grace_secs: parse_var("STARTUP_GRACE_SECS", &get("STARTUP_GRACE_SECS", "3"))?,
            shutdown_grace_secs: parse_var(
                "SHUTDOWN_GRACE_SECS",
                &get("SHUTDOWN_GRACE_SECS", "10"),
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_dev() {
        let config = LauncherConfig::from_lookup(None, |_| None).unwrap();
        assert_eq!(config.environment, Environment::Dev);
        assert_eq!(config.worker_bin, "mia-worker");
        assert_eq!(config.router_bin, "mia-router");
        assert_eq!(config.startup_grace_secs, 3);
    }

    #[test]
    fn argument_wins_over_mia_env() {
        let config = LauncherConfig::from_lookup(Some("prod".into()), |key| {
            (key == "MIA_ENV").then(|| "dev".to_string())
        })
        .unwrap();
        assert_eq!(config.environment, Environment::Prod);
    }

    #[test]
    fn unknown_environment_is_rejected() {
        assert!(LauncherConfig::from_lookup(Some("staging".into()), |_| None).is_err());
    }
}
