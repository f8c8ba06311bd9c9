//! Deployment topologies.
//!
//! A topology maps the environment file onto Terraform variables, and
//! Terraform outputs onto Helm releases and validation targets.

mod public_fullnode;
mod validator_vfn;

pub use public_fullnode::PublicFullnode;
pub use validator_vfn::ValidatorVfn;

use crate::error::Result;
use crate::plan::{TeardownPlan, WorkloadPlan};
use deploykit_core::{ClusterHandle, DeploymentVariables, ProvisionOutputs};

pub trait Topology: Send + Sync {
    fn name(&self) -> &str;

    /// Terraform input variables for apply and destroy.
    fn variables(&self) -> &DeploymentVariables;

    /// Cluster to assume when Terraform has no outputs yet.
    fn fallback_cluster(&self) -> ClusterHandle {
        fallback_cluster(self.variables())
    }

    /// Check local inputs before anything is provisioned.
    fn preflight(&self) -> Result<()> {
        Ok(())
    }

    /// Operator-facing description of what will be deployed.
    fn describe(&self) -> Vec<String> {
        Vec::new()
    }

    fn workload(&self, outputs: &ProvisionOutputs) -> Result<WorkloadPlan>;

    fn teardown(&self) -> TeardownPlan;
}

/// `<validator_name>-cluster` in `region`, defaulting to `demo` and
/// `us-east-1`.
pub fn fallback_cluster(vars: &DeploymentVariables) -> ClusterHandle {
    let name = vars.get_text("validator_name").unwrap_or("demo");
    let region = vars.get_text("region").unwrap_or("us-east-1");
    ClusterHandle::new(format!("{name}-cluster"), region)
}

/// Comma-separated list, trimmed, empties dropped.
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_cluster_defaults() {
        let handle = fallback_cluster(&DeploymentVariables::new());
        assert_eq!(handle, ClusterHandle::new("demo-cluster", "us-east-1"));
    }

    #[test]
    fn test_fallback_cluster_from_vars() {
        let vars = DeploymentVariables::new()
            .with("validator_name", "validator-07")
            .with("region", "ap-southeast-1");
        assert_eq!(
            fallback_cluster(&vars),
            ClusterHandle::new("validator-07-cluster", "ap-southeast-1")
        );
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" t3.large, m5.xlarge ,,"),
            vec!["t3.large".to_string(), "m5.xlarge".to_string()]
        );
    }
}
