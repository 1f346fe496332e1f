//! Child process ownership.
//!
//! The launcher keeps every child it started. Stopping is done here rather
//! than by searching for processes by port: on shutdown each child gets
//! SIGTERM, then is killed if it has not exited within the grace period.

use std::future::Future;
use std::process::ExitStatus;
use std::time::Duration;

use futures::future::select_all;
use tokio::process::Child;

use crate::error::LaunchError;
use crate::plan::{LaunchPlan, ProcessSpec};

struct RunningChild {
    name: String,
    child: Child,
}

/// Running children, in start order.
pub struct Supervisor {
    children: Vec<RunningChild>,
    shutdown_grace: Duration,
}

impl Supervisor {
    /// Start the workers, wait `startup_grace`, then start the router.
    ///
    /// If any spawn fails, the children started so far are killed when the
    /// partially built supervisor is dropped.
    pub async fn launch(
        plan: &LaunchPlan,
        startup_grace: Duration,
        shutdown_grace: Duration,
    ) -> Result<Self, LaunchError> {
        let mut supervisor = Self {
            children: Vec::with_capacity(plan.workers.len() + 1),
            shutdown_grace,
        };

        for worker in &plan.workers {
            supervisor.spawn(worker)?;
        }
        tracing::info!(count = plan.workers.len(), "Workers started");

        if !startup_grace.is_zero() {
            tokio::time::sleep(startup_grace).await;
        }

        supervisor.spawn(&plan.router)?;
        Ok(supervisor)
    }

    fn spawn(&mut self, spec: &ProcessSpec) -> Result<(), LaunchError> {
        let child = spec.command().spawn().map_err(|source| LaunchError::Spawn {
            name: spec.name.clone(),
            program: spec.program.clone(),
            source,
        })?;
        tracing::info!(
            name = %spec.name,
            program = %spec.program,
            pid = child.id(),
            env = ?spec.env,
            "Process started",
        );
        self.children.push(RunningChild {
            name: spec.name.clone(),
            child,
        });
        Ok(())
    }

    /// Number of children started.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Run until `shutdown` resolves or any child exits, then stop every
    /// child. A child exiting on its own is reported as an error.
    pub async fn supervise<F>(mut self, shutdown: F) -> Result<(), LaunchError>
    where
        F: Future<Output = ()>,
    {
        if self.children.is_empty() {
            return Ok(());
        }

        let exited = {
            let exits = self.children.iter_mut().map(|running| {
                Box::pin(async move {
                    let status = running.child.wait().await;
                    (running.name.clone(), status)
                })
            });

            tokio::select! {
                () = shutdown => None,
                ((name, status), _, _) = select_all(exits) => Some((name, status)),
            }
        };

        if let Some((name, status)) = &exited {
            tracing::error!(name = %name, status = %describe(status), "Process exited, stopping all");
        }

        self.stop_all().await;

        match exited {
            None => Ok(()),
            Some((name, status)) => Err(LaunchError::ChildExited {
                name,
                status: describe(&status),
            }),
        }
    }

    /// Stop children in reverse start order so the router goes first.
    async fn stop_all(&mut self) {
        for running in self.children.iter_mut().rev() {
            if matches!(running.child.try_wait(), Ok(None)) {
                request_stop(&mut running.child);
            }
        }

        for running in self.children.iter_mut().rev() {
            match tokio::time::timeout(self.shutdown_grace, running.child.wait()).await {
                Ok(Ok(status)) => {
                    tracing::info!(name = %running.name, %status, "Process stopped");
                }
                Ok(Err(e)) => {
                    tracing::warn!(name = %running.name, error = %e, "Could not reap process");
                }
                Err(_) => {
                    tracing::warn!(name = %running.name, "Process ignored SIGTERM, killing");
                    if let Err(e) = running.child.kill().await {
                        tracing::warn!(name = %running.name, error = %e, "Kill failed");
                    }
                }
            }
        }
    }
}

fn describe(status: &std::io::Result<ExitStatus>) -> String {
    match status {
        Ok(status) => status.to_string(),
        Err(e) => format!("wait failed: {e}"),
    }
}

/// Ask `child` to exit, falling back to an immediate kill.
fn request_stop(child: &mut Child) {
    if send_sigterm(child) {
        return;
    }
    if let Err(e) = child.start_kill() {
        tracing::warn!(error = %e, "Failed to kill process");
    }
}

#[cfg(unix)]
fn send_sigterm(child: &Child) -> bool {
    let Some(pid) = child.id().and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return false;
    };
    // Safety: `kill` takes plain integers; `pid` is a child we have not yet
    // reaped, so it cannot have been recycled for another process.
    let ret = unsafe { libc::kill(pid, libc::SIGTERM) };
    if ret != 0 {
        tracing::warn!(pid, error = %std::io::Error::last_os_error(), "SIGTERM failed");
    }
    ret == 0
}

#[cfg(not(unix))]
fn send_sigterm(_child: &Child) -> bool {
    false
}

#[cfg(all(test, unix))]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn spec(name: &str, script: &str) -> ProcessSpec {
        ProcessSpec {
            name: name.to_string(),
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            env: Vec::new(),
        }
    }

    fn plan(router_script: &str) -> LaunchPlan {
        LaunchPlan {
            workers: vec![spec("worker:1", "exec sleep 30"), spec("worker:2", "exec sleep 30")],
            router: spec("router", router_script),
        }
    }

    #[tokio::test]
    async fn shutdown_stops_every_child() {
        let supervisor = Supervisor::launch(
            &plan("exec sleep 30"),
            Duration::ZERO,
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(supervisor.len(), 3);

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            supervisor.supervise(std::future::ready(())),
        )
        .await
        .expect("supervisor must stop promptly");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn child_exit_stops_the_rest_and_is_reported() {
        let supervisor = Supervisor::launch(&plan("exit 3"), Duration::ZERO, Duration::from_secs(5))
            .await
            .unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            supervisor.supervise(std::future::pending()),
        )
        .await
        .expect("supervisor must notice the exit");
        assert_matches!(result, Err(LaunchError::ChildExited { ref name, .. }) if name == "router");
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let mut broken = plan("exec sleep 30");
        broken.workers[1].program = "definitely-not-a-real-binary-mia".to_string();

        let err = Supervisor::launch(&broken, Duration::ZERO, Duration::from_secs(1))
            .await
            .err()
            .unwrap();
        assert_matches!(err, LaunchError::Spawn { ref name, .. } if name == "worker:2");
    }

    #[tokio::test]
    async fn sigterm_is_delivered_to_the_child() {
        let mut child = spec("worker:1", "trap 'exit 7' TERM; while :; do sleep 0.1; done")
            .command()
            .spawn()
            .unwrap();
        // Give the shell time to install its trap.
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(send_sigterm(&child));
        let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
            .await
            .expect("child must exit on SIGTERM")
            .unwrap();
        assert_eq!(status.code(), Some(7));
    }
}
