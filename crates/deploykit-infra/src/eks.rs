//! EKS cluster readiness via the `aws eks` CLI.

use crate::error::{InfraError, Result};
use deploykit_core::runner::{CommandRunner, CommandSpec};
use deploykit_core::{obs, poll_until_deadline, ClusterHandle, PollError, Probe};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const NOT_FOUND_MARKER: &str = "ResourceNotFoundException";
const TERMINAL_STATES: [&str; 2] = ["FAILED", "DELETING"];

/// Bounds for [`EksReadinessProbe::wait_until_active`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWait {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for ActiveWait {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1800),
            interval: Duration::from_secs(15),
        }
    }
}

/// Status checks for one EKS cluster.
pub struct EksReadinessProbe {
    cluster: ClusterHandle,
    runner: Arc<dyn CommandRunner>,
}

impl EksReadinessProbe {
    pub fn new(cluster: ClusterHandle, runner: Arc<dyn CommandRunner>) -> Self {
        Self { cluster, runner }
    }

    pub fn cluster(&self) -> &ClusterHandle {
        &self.cluster
    }

    fn describe(&self) -> Vec<String> {
        vec![
            "eks".to_string(),
            "describe-cluster".to_string(),
            "--region".to_string(),
            self.cluster.region.clone(),
            "--name".to_string(),
            self.cluster.name.clone(),
        ]
    }

    /// `false` only when AWS reports the cluster as not found.
    pub async fn cluster_exists(&self) -> Result<bool> {
        let spec = CommandSpec::new("aws", self.describe())
            .capture()
            .unchecked()
            .quiet();
        let output = self.runner.run(&spec).await?;
        if output.success() {
            return Ok(true);
        }
        let stderr = output.stderr.trim();
        if stderr.contains(NOT_FOUND_MARKER) {
            return Ok(false);
        }
        let detail = if stderr.is_empty() {
            "unknown error"
        } else {
            stderr
        };
        Err(InfraError::ClusterLookup(detail.to_string()))
    }

    /// Control-plane status (`ACTIVE`, `CREATING`, ...), or `None` if the
    /// lookup fails.
    pub async fn status(&self) -> Option<String> {
        let mut args = self.describe();
        args.extend(["--query", "cluster.status", "--output", "text"].map(String::from));
        let spec = CommandSpec::new("aws", args).capture().unchecked().quiet();
        match self.runner.run(&spec).await {
            Ok(output) if output.success() => Some(output.stdout.trim().to_string()),
            _ => None,
        }
    }

    /// Poll until the cluster is `ACTIVE`. `FAILED` and `DELETING` abort at
    /// once; otherwise the wait ends after `wait.timeout`.
    pub async fn wait_until_active(&self, wait: ActiveWait) -> Result<()> {
        obs::info(format!(
            "Waiting for EKS cluster to become ACTIVE (timeout: {}s)",
            wait.timeout.as_secs()
        ));
        let result = poll_until_deadline(wait.timeout, wait.interval, || async move {
            match self.status().await {
                Some(status) if status == "ACTIVE" => Probe::Ready(()),
                Some(status) if TERMINAL_STATES.contains(&status.as_str()) => {
                    Probe::Failed(status)
                }
                status => {
                    tracing::info!(
                        "  Cluster status: {} (waiting...)",
                        status.as_deref().unwrap_or("unknown")
                    );
                    Probe::Pending
                }
            }
        })
        .await;

        match result {
            Ok(()) => {
                obs::success(format!("Cluster {} is ACTIVE", self.cluster.name));
                Ok(())
            }
            Err(PollError::Failed(status)) => Err(InfraError::ClusterTerminal {
                cluster: self.cluster.name.clone(),
                status,
            }),
            Err(PollError::TimedOut { .. }) | Err(PollError::Exhausted { .. }) => {
                Err(InfraError::ClusterTimeout {
                    cluster: self.cluster.name.clone(),
                    timeout: wait.timeout,
                })
            }
        }
    }

    /// Write cluster credentials into the default or the given kubeconfig.
    pub async fn update_kubeconfig(&self, kubeconfig: Option<&Path>) -> Result<()> {
        obs::info(format!(
            "Updating kubeconfig for cluster {}",
            self.cluster.name
        ));
        let mut args = vec![
            "eks".to_string(),
            "update-kubeconfig".to_string(),
            "--region".to_string(),
            self.cluster.region.clone(),
            "--name".to_string(),
            self.cluster.name.clone(),
        ];
        if let Some(path) = kubeconfig {
            args.push("--kubeconfig".to_string());
            args.push(path.display().to_string());
        }
        self.runner.run(&CommandSpec::new("aws", args)).await?;
        obs::success("Kubeconfig updated successfully");
        Ok(())
    }
}
