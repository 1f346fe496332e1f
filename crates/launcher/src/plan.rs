//! What to start, with which ports and GPUs.

use std::process::Stdio;

use mia_core::deployment::Deployment;
use tokio::process::Command;

use crate::config::LauncherConfig;
use crate::error::LaunchError;

/// One process the launcher owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    /// Label used in logs, e.g. `worker:8001`.
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    /// Variables set on top of the launcher's own environment.
    pub env: Vec<(String, String)>,
}

impl ProcessSpec {
    /// Build the command. Output goes to the launcher's stdout/stderr and the
    /// child is killed if its handle is dropped.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }

    /// Value of `key` in this process's extra environment.
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Workers first, router last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub workers: Vec<ProcessSpec>,
    pub router: ProcessSpec,
}

impl LaunchPlan {
    /// Plan for the configured environment's deployment table.
    pub fn new(config: &LauncherConfig) -> Result<Self, LaunchError> {
        Self::for_deployment(config.environment.deployment(), config)
    }

    /// One worker per `(port, gpu)` pair, each pinned to its GPU, plus the
    /// router on the deployment's router port.
    pub fn for_deployment(
        deployment: &Deployment,
        config: &LauncherConfig,
    ) -> Result<Self, LaunchError> {
        let workers = deployment
            .worker_gpu_assignments()?
            .into_iter()
            .map(|(port, gpu)| ProcessSpec {
                name: format!("worker:{port}"),
                program: config.worker_bin.clone(),
                args: Vec::new(),
                env: vec![
                    ("PORT".to_string(), port.to_string()),
                    ("CUDA_VISIBLE_DEVICES".to_string(), gpu.to_string()),
                ],
            })
            .collect();

        let router = ProcessSpec {
            name: format!("router:{}", deployment.router_port),
            program: config.router_bin.clone(),
            args: Vec::new(),
            env: vec![
                ("PORT".to_string(), deployment.router_port.to_string()),
                (
                    "MIA_ENV".to_string(),
                    deployment.environment.as_str().to_string(),
                ),
            ],
        };

        Ok(Self { workers, router })
    }
}
