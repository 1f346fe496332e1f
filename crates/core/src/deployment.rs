//! Static deployment table shared by the router and the process launcher.
//!
//! Each environment maps to a fixed list of worker ports and a router port.
//! The table is compiled in and never changes at runtime; pass the selected
//! [`Deployment`] to whichever component needs it instead of re-declaring
//! ports elsewhere.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::pool::WorkerAddress;

/// Host the router uses to reach workers when none is configured.
pub const DEFAULT_WORKER_HOST: &str = "localhost";

/// GPU indices assigned to workers, in worker-port order. Only the launcher
/// reads these.
pub const GPU_IDS: &[u32] = &[5, 6, 7];

/// Named deployment environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        }
    }

    /// The deployment table entry for this environment.
    pub fn deployment(&self) -> &'static Deployment {
        match self {
            Environment::Dev => &DEV,
            Environment::Prod => &PROD,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            other => Err(CoreError::Config(format!(
                "Unknown environment '{other}'. Expected 'dev' or 'prod'"
            ))),
        }
    }
}

/// Ports and GPUs for one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub environment: Environment,
    pub worker_ports: &'static [u16],
    pub router_port: u16,
    pub gpu_ids: &'static [u32],
}

static DEV: Deployment = Deployment {
    environment: Environment::Dev,
    worker_ports: &[8001, 8002, 8003],
    router_port: 8000,
    gpu_ids: GPU_IDS,
};

static PROD: Deployment = Deployment {
    environment: Environment::Prod,
    worker_ports: &[9001, 9002, 9003],
    router_port: 9000,
    gpu_ids: GPU_IDS,
};

impl Deployment {
    /// Worker addresses on `host`, in port order.
    pub fn worker_addresses(&self, host: &str) -> Vec<WorkerAddress> {
        self.worker_ports
            .iter()
            .map(|port| WorkerAddress::new(host, *port))
            .collect()
    }

    /// Pair every worker port with the GPU it should own.
    ///
    /// Fails when the two lists differ in length, since a worker without a
    /// dedicated GPU would contend with another worker for the device.
    pub fn worker_gpu_assignments(&self) -> Result<Vec<(u16, u32)>, CoreError> {
        if self.worker_ports.len() != self.gpu_ids.len() {
            return Err(CoreError::Config(format!(
                "The number of worker ports ({}) must match the number of GPU ids ({})",
                self.worker_ports.len(),
                self.gpu_ids.len()
            )));
        }
        Ok(self
            .worker_ports
            .iter()
            .copied()
            .zip(self.gpu_ids.iter().copied())
            .collect())
    }
}
