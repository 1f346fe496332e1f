use std::path::PathBuf;

use mia_core::config::{parse_var, split_list};
use mia_core::error::CoreError;

use crate::process::CommandLine;

/// Identity endpoints tried in order when no `IDENTITY_ENDPOINTS` is set.
const DEFAULT_IDENTITY_ENDPOINTS: &str =
    "https://api.csm.ai/user/userdata,https://devapi.csm.ai/user/userdata";

/// Worker configuration loaded from environment variables.
///
/// All fields have defaults suitable for a single-GPU development box.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
    /// Largest accepted request body; base64 meshes are large.
    pub max_body_bytes: usize,
    /// Directory holding one `<animation>.fbx` clip per animation name.
    pub animation_dir: PathBuf,
    /// Root for request-scoped scratch files.
    pub scratch_dir: PathBuf,
    /// Identity service endpoints, primary first.
    pub identity_endpoints: Vec<String>,
    pub identity_timeout_secs: u64,
    /// How long a successful credential check is reused.
    pub auth_cache_ttl_secs: u64,
    /// Program (plus leading arguments) that runs the animation pipeline.
    pub pipeline_command: CommandLine,
    pub pipeline_timeout_secs: u64,
    /// Thumbnail renderer; previews are skipped when unset.
    pub thumbnail_command: Option<CommandLine>,
    /// Animated preview renderer; previews are skipped when unset.
    pub preview_command: Option<CommandLine>,
    pub render_timeout_secs: u64,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                          |
    /// |-------------------------|----------------------------------|
    /// | `HOST`                  | `0.0.0.0`                        |
    /// | `PORT`                  | `8000`                           |
    /// | `CORS_ORIGINS`          | *(any)*                          |
    /// | `MAX_BODY_BYTES`        | `536870912` (512 MiB)            |
    /// | `ANIMATION_DIR`         | `animation-fbx-files`            |
    /// | `SCRATCH_DIR`           | `/dev/shm`, else the OS temp dir |
    /// | `IDENTITY_ENDPOINTS`    | production, then dev userdata    |
    /// | `IDENTITY_TIMEOUT_SECS` | `10`                             |
    /// | `AUTH_CACHE_TTL_SECS`   | `300`                            |
    /// | `PIPELINE_COMMAND`      | `mia-pipeline`                   |
    /// | `PIPELINE_TIMEOUT_SECS` | `300`                            |
    /// | `THUMBNAIL_COMMAND`     | *(unset)*                        |
    /// | `PREVIEW_COMMAND`       | *(unset)*                        |
    /// | `RENDER_TIMEOUT_SECS`   | `120`                            |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let scratch_dir = match lookup("SCRATCH_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_scratch_dir(),
        };

        let identity_endpoints = split_list(&get("IDENTITY_ENDPOINTS", DEFAULT_IDENTITY_ENDPOINTS));
        if identity_endpoints.is_empty() {
            return Err(CoreError::Config(
                "IDENTITY_ENDPOINTS must list at least one endpoint".to_string(),
            ));
        }

        let pipeline_command = CommandLine::parse(&get("PIPELINE_COMMAND", "mia-pipeline"))
            .ok_or_else(|| CoreError::Config("PIPELINE_COMMAND must not be empty".to_string()))?;

        Ok(Self {
            host: get("HOST", "0.0.0.0"),
            port: parse_var("PORT", &get("PORT", "8000"))?,
            cors_origins: split_list(&get("CORS_ORIGINS", "")),
            max_body_bytes: parse_var("MAX_BODY_BYTES", &get("MAX_BODY_BYTES", "536870912"))?,
            animation_dir: PathBuf::from(get("ANIMATION_DIR", "animation-fbx-files")),
            scratch_dir,
            identity_endpoints,
            identity_timeout_secs: parse_var(
                "IDENTITY_TIMEOUT_SECS",
                &get("IDENTITY_TIMEOUT_SECS", "10"),
            )?,
            auth_cache_ttl_secs: parse_var(
                "AUTH_CACHE_TTL_SECS",
                &get("AUTH_CACHE_TTL_SECS", "300"),
            )?,
            pipeline_command,
            pipeline_timeout_secs: parse_var(
                "PIPELINE_TIMEOUT_SECS",
                &get("PIPELINE_TIMEOUT_SECS", "300"),
            )?,
            thumbnail_command: lookup("THUMBNAIL_COMMAND").and_then(|c| CommandLine::parse(&c)),
            preview_command: lookup("PREVIEW_COMMAND").and_then(|c| CommandLine::parse(&c)),
            render_timeout_secs: parse_var(
                "RENDER_TIMEOUT_SECS",
                &get("RENDER_TIMEOUT_SECS", "120"),
            )?,
        })
    }
}

/// Prefer shared memory for scratch files when the host has it.
fn default_scratch_dir() -> PathBuf {
    let shm = PathBuf::from("/dev/shm");
    if shm.is_dir() {
        shm
    } else {
        std::env::temp_dir()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<WorkerConfig, CoreError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.max_body_bytes, 512 * 1024 * 1024);
        assert_eq!(config.identity_endpoints.len(), 2);
        assert_eq!(config.auth_cache_ttl_secs, 300);
        assert_eq!(config.pipeline_command.program(), "mia-pipeline");
        assert!(config.thumbnail_command.is_none());
        assert!(config.preview_command.is_none());
    }

    #[test]
    fn overrides_are_read() {
        let config = config_from(&[
            ("PORT", "8002"),
            ("SCRATCH_DIR", "/tmp/mia"),
            ("IDENTITY_ENDPOINTS", "http://a/user, http://b/user"),
            ("PIPELINE_COMMAND", "python -m mia.run"),
            ("THUMBNAIL_COMMAND", "blender-thumb"),
        ])
        .unwrap();
        assert_eq!(config.port, 8002);
        assert_eq!(config.scratch_dir, PathBuf::from("/tmp/mia"));
        assert_eq!(config.identity_endpoints, vec!["http://a/user", "http://b/user"]);
        assert_eq!(config.pipeline_command.program(), "python");
        assert_eq!(config.pipeline_command.args(), &["-m", "mia.run"]);
        assert!(config.thumbnail_command.is_some());
    }

    #[test]
    fn invalid_port_is_a_config_error() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, CoreError::Config(ref m) if m.contains("PORT")));
    }

    #[test]
    fn empty_identity_endpoints_are_rejected() {
        assert!(config_from(&[("IDENTITY_ENDPOINTS", " , ")]).is_err());
    }
}
