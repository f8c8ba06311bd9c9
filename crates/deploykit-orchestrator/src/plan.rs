//! What a topology asks the orchestrator to do.

use deploykit_core::{ProvisionOutputs, ReleaseSpec};
use deploykit_infra::ActiveWait;
use deploykit_validate::ValidationSettings;
use std::time::Duration;

/// Releases, secret and checks for one deploy, built after provisioning so
/// Terraform outputs can feed the Helm values.
#[derive(Debug, Clone)]
pub struct WorkloadPlan {
    pub namespace: String,
    /// Installed in order; uninstalled in reverse.
    pub releases: Vec<ReleaseSpec>,
    pub secret: Option<SecretSeed>,
    pub validation: ValidationPlan,
}

impl WorkloadPlan {
    pub fn release_names(&self) -> Vec<String> {
        self.releases
            .iter()
            .map(|r| r.release_name.clone())
            .collect()
    }
}

/// Copy of an AWS Secrets Manager secret into a Kubernetes `Opaque` secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretSeed {
    pub source_secret_id: String,
    pub secret_name: String,
    /// Key of the single entry in the Kubernetes secret.
    pub data_key: String,
}

#[derive(Debug, Clone)]
pub struct ValidationPlan {
    /// Service whose pods and endpoint are checked.
    pub service_name: String,
    /// Further `app=` labels that only need a ready pod.
    pub companion_labels: Vec<String>,
    /// Whether the service has a public load balancer worth probing.
    pub expose_api: bool,
    pub settings: ValidationSettings,
}

/// A value read from Terraform outputs, with a fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBinding {
    pub key: Option<String>,
    pub fallback: String,
}

impl OutputBinding {
    pub fn output(key: &str, fallback: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            fallback: fallback.to_string(),
        }
    }

    pub fn fixed(value: &str) -> Self {
        Self {
            key: None,
            fallback: value.to_string(),
        }
    }

    pub fn resolve(&self, outputs: &ProvisionOutputs) -> String {
        self.key
            .as_deref()
            .and_then(|key| outputs.get_str(key))
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Releases to remove before `terraform destroy`, in install order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownPlan {
    pub namespace: OutputBinding,
    pub releases: Vec<OutputBinding>,
}

/// Knobs for [`ClusterOrchestrator::deploy`](crate::ClusterOrchestrator::deploy).
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Skip Terraform when the derived cluster already exists.
    pub skip_if_exists: bool,
    /// Probe the public endpoint after pods are ready.
    pub validate_api: bool,
    pub active_wait: ActiveWait,
    /// `helm --wait --timeout` for each release.
    pub helm_wait: Option<Duration>,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            skip_if_exists: true,
            validate_api: true,
            active_wait: ActiveWait::default(),
            helm_wait: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_binding_resolution() {
        let mut outputs = ProvisionOutputs::new();
        outputs.insert("public_fullnode_namespace", "fullnodes");
        let bound = OutputBinding::output("public_fullnode_namespace", "movement-l1");
        assert_eq!(bound.resolve(&outputs), "fullnodes");
        assert_eq!(bound.resolve(&ProvisionOutputs::new()), "movement-l1");
        assert_eq!(OutputBinding::fixed("vfn-01").resolve(&outputs), "vfn-01");
    }

    #[test]
    fn test_default_options() {
        let options = DeployOptions::default();
        assert!(options.skip_if_exists);
        assert!(options.validate_api);
        assert_eq!(options.active_wait, ActiveWait::default());
    }
}
