use std::path::PathBuf;

use mia_core::config::parse_var;
use mia_core::error::CoreError;
use mia_core::job::AnimationName;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the router (or a single worker).
    pub base_url: String,
    pub api_key: String,
    pub mesh_path: PathBuf,
    pub animation: AnimationName,
    /// Directory the returned files are written to.
    pub output_dir: PathBuf,
    pub timeout_secs: u64,
}

impl ClientConfig {
    /// Load configuration from the command-line arguments and environment
    /// variables.
    ///
    /// | Source                 | Default                 |
    /// |------------------------|-------------------------|
    /// | first argument         | required (mesh path)    |
    /// | second argument        | `ANIMATION`, else `running` |
    /// | `MIA_URL`              | `http://localhost:8000` |
    /// | `MIA_API_KEY`          | required                |
    /// | `OUTPUT_DIR`           | `.`                     |
    /// | `REQUEST_TIMEOUT_SECS` | `600`                   |
    pub fn from_env(args: &[String]) -> Result<Self, CoreError> {
        Self::from_lookup(args, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(args: &[String], lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let mesh_path = args
            .first()
            .map(PathBuf::from)
            .ok_or_else(|| CoreError::Config("usage: mia-client <mesh> [animation]".into()))?;

        let animation = args
            .get(1)
            .cloned()
            .unwrap_or_else(|| get("ANIMATION", "running"))
            .parse()?;

        let api_key = lookup("MIA_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CoreError::Config("MIA_API_KEY must be set".into()))?;

        Ok(Self {
            base_url: get("MIA_URL", "http://localhost:8000")
                .trim_end_matches('/')
                .to_string(),
            api_key,
            mesh_path,
            animation,
            output_dir: PathBuf::from(get("OUTPUT_DIR", ".")),
            timeout_secs: parse_var(
                "REQUEST_TIMEOUT_SECS",
                &get("REQUEST_TIMEOUT_SECS", "600"),
            )?,
        })
    }

    pub fn animate_url(&self) -> String {
        format!("{}/animate", self.base_url)
    }
}
