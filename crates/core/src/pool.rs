//! Static worker pool with a round-robin dispatch cursor.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Serialize, Serializer};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Worker address
// ---------------------------------------------------------------------------

/// Network endpoint of one worker service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerAddress {
    host: String,
    port: u16,
}

impl WorkerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL of the worker, e.g. `http://localhost:8001`.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Absolute URL of `path` on this worker. `path` must start with `/`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }
}

impl fmt::Display for WorkerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http://{}:{}", self.host, self.port)
    }
}

impl FromStr for WorkerAddress {
    type Err = CoreError;

    /// Accepts `host:port` or `http://host:port` (trailing slash allowed).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let rest = trimmed.strip_prefix("http://").unwrap_or(trimmed);
        let rest = rest.trim_end_matches('/');

        let (host, port) = rest.rsplit_once(':').ok_or_else(|| {
            CoreError::Config(format!("Worker address '{s}' must be of the form host:port"))
        })?;
        if host.is_empty() {
            return Err(CoreError::Config(format!(
                "Worker address '{s}' is missing a host"
            )));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| CoreError::Config(format!("Worker address '{s}' has an invalid port")))?;

        Ok(Self::new(host, port))
    }
}

impl Serialize for WorkerAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Worker pool
// ---------------------------------------------------------------------------

/// Ordered, unique, non-empty set of workers plus the shared dispatch cursor.
///
/// The cursor is only ever read through [`WorkerPool::next`], which selects
/// and advances in one atomic step, so concurrent dispatches see a strict
/// cyclic order.
#[derive(Debug)]
pub struct WorkerPool {
    workers: Vec<WorkerAddress>,
    cursor: AtomicUsize,
}

impl WorkerPool {
    /// Build a pool whose cursor starts at the first worker.
    pub fn new(workers: Vec<WorkerAddress>) -> Result<Self, CoreError> {
        Self::starting_at(workers, 0)
    }

    /// Build a pool whose cursor starts at `start` (taken modulo the size).
    pub fn starting_at(workers: Vec<WorkerAddress>, start: usize) -> Result<Self, CoreError> {
        if workers.is_empty() {
            return Err(CoreError::Config(
                "Worker pool must contain at least one worker".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(workers.len());
        for worker in &workers {
            if !seen.insert(worker) {
                return Err(CoreError::Config(format!(
                    "Duplicate worker address: {worker}"
                )));
            }
        }

        let start = start % workers.len();
        Ok(Self {
            workers,
            cursor: AtomicUsize::new(start),
        })
    }

    /// Select the worker under the cursor and advance the cursor by one.
    pub fn next(&self) -> &WorkerAddress {
        let n = self.workers.len();
        let index = match self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + 1) % n))
        {
            Ok(prev) | Err(prev) => prev,
        };
        &self.workers[index]
    }

    /// Current cursor position. For introspection only; never use it to pick
    /// a worker.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    pub fn workers(&self) -> &[WorkerAddress] {
        &self.workers
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Always `false`; construction rejects empty pools.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}
