//! Deploy and teardown sequencing.
//!
//! `deploy` runs Terraform (unless the cluster already exists), waits for the
//! EKS control plane, installs the topology's Helm releases and validates the
//! result. `destroy` uninstalls releases on a best-effort basis and then
//! always runs `terraform destroy`.
//!
//! Every call builds fresh component instances; nothing is cached between
//! runs.

use crate::error::{OrchestratorError, Result};
use crate::plan::{DeployOptions, TeardownPlan, WorkloadPlan};
use crate::seeder::SecretSeeder;
use crate::summary::render_summary;
use crate::topology::Topology;
use chrono::{DateTime, Utc};
use deploykit_core::{obs, ClusterHandle, CommandRunner, ProvisionOutputs};
use deploykit_infra::{EksReadinessProbe, HelmDeployer, SecretsManagerReader, TerraformProvisioner};
use deploykit_validate::{
    DeploymentValidator, HealthProbe, KubeApi, KubeConnector, ValidationOutcome,
};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Result of a successful deploy.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentReport {
    pub run_id: Uuid,
    pub topology: String,
    pub cluster: ClusterHandle,
    pub namespace: String,
    pub release_names: Vec<String>,
    pub service_name: String,
    pub outputs: ProvisionOutputs,
    pub validation: ValidationOutcome,
    pub completed_at: DateTime<Utc>,
}

/// Coordinates Terraform, EKS, Helm and validation for one topology.
pub struct ClusterOrchestrator {
    terraform_dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
    connector: Arc<dyn KubeConnector>,
    probe: Arc<dyn HealthProbe>,
    kubeconfig: Option<PathBuf>,
}

impl ClusterOrchestrator {
    pub fn new(
        terraform_dir: impl Into<PathBuf>,
        runner: Arc<dyn CommandRunner>,
        connector: Arc<dyn KubeConnector>,
        probe: Arc<dyn HealthProbe>,
    ) -> Self {
        Self {
            terraform_dir: terraform_dir.into(),
            runner,
            connector,
            probe,
            kubeconfig: None,
        }
    }

    /// Write cluster credentials to `path` instead of the default kubeconfig.
    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    fn terraform(&self) -> Result<TerraformProvisioner> {
        Ok(TerraformProvisioner::new(
            &self.terraform_dir,
            self.runner.clone(),
        )?)
    }

    fn eks(&self, cluster: &ClusterHandle) -> EksReadinessProbe {
        EksReadinessProbe::new(cluster.clone(), self.runner.clone())
    }

    /// Provision, deploy and validate `topology`.
    pub async fn deploy(
        &self,
        topology: &dyn Topology,
        options: &DeployOptions,
    ) -> Result<DeploymentReport> {
        let run_id = Uuid::new_v4();
        traced(run_id, "deploy", topology.name(), async {
            self.deploy_steps(run_id, topology, options).await
        })
        .await
    }

    async fn deploy_steps(
        &self,
        run_id: Uuid,
        topology: &dyn Topology,
        options: &DeployOptions,
    ) -> Result<DeploymentReport> {
        let id = run_id.to_string();
        topology.preflight()?;
        for line in topology.describe() {
            obs::info(line);
        }

        obs::emit_step(&id, "provision");
        let terraform = self.terraform()?;
        let mut outputs = terraform.outputs().await;
        let candidate = resolve_cluster(&outputs, &topology.fallback_cluster());

        let exists = options.skip_if_exists && self.eks(&candidate).cluster_exists().await?;
        if exists {
            obs::info(format!(
                "Cluster {candidate} already exists, skipping Terraform"
            ));
        } else {
            terraform.init(true).await?;
            terraform.validate().await?;
            terraform.apply(topology.variables(), true).await?;
            outputs = terraform.outputs().await;
            if outputs.is_empty() {
                return Err(OrchestratorError::NoOutputs);
            }
        }
        if outputs.is_empty() {
            outputs = terraform.outputs().await;
        }
        let cluster = resolve_cluster(&outputs, &topology.fallback_cluster());

        obs::emit_step(&id, "cluster");
        let eks = self.eks(&cluster);
        eks.wait_until_active(options.active_wait).await?;
        eks.update_kubeconfig(self.kubeconfig.as_deref()).await?;

        let plan = topology.workload(&outputs)?;
        if plan.releases.is_empty() {
            return Err(OrchestratorError::EmptyPlan(topology.name().to_string()));
        }
        let kube = self.connector.connect().await?;

        if let Some(seed) = &plan.secret {
            obs::emit_step(&id, "secret");
            let reader = SecretsManagerReader::new(&cluster.region, self.runner.clone());
            SecretSeeder::new(kube.clone(), reader)
                .seed(&plan.namespace, seed)
                .await?;
        }

        obs::emit_step(&id, "workload");
        let helm = HelmDeployer::new(self.runner.clone());
        for release in &plan.releases {
            helm.upgrade_install(release, options.helm_wait).await?;
        }

        for line in render_summary(&cluster, &plan, &outputs) {
            obs::info(line);
        }

        obs::emit_step(&id, "validate");
        let validation = self.run_validation(kube, &plan, options.validate_api).await?;
        obs::success("Deployment complete!");

        Ok(DeploymentReport {
            run_id,
            topology: topology.name().to_string(),
            cluster,
            namespace: plan.namespace.clone(),
            release_names: plan.release_names(),
            service_name: plan.validation.service_name.clone(),
            outputs,
            validation,
            completed_at: Utc::now(),
        })
    }

    async fn run_validation(
        &self,
        kube: Arc<dyn KubeApi>,
        plan: &WorkloadPlan,
        validate_api: bool,
    ) -> Result<ValidationOutcome> {
        let validator = DeploymentValidator::new(kube, self.probe.clone());
        let target = &plan.validation;
        for label in &target.companion_labels {
            validator
                .wait_for_pod_ready(
                    &plan.namespace,
                    label,
                    target.settings.pod_timeout,
                    target.settings.interval,
                )
                .await?;
        }
        let outcome = validator
            .validate_deployment(
                &plan.namespace,
                &target.service_name,
                &target.settings,
                validate_api && target.expose_api,
            )
            .await?;
        Ok(outcome)
    }

    /// Uninstall releases (best effort), then destroy the infrastructure.
    pub async fn destroy(&self, topology: &dyn Topology) -> Result<()> {
        traced(Uuid::new_v4(), "destroy", topology.name(), async {
            let terraform = self.terraform()?;
            terraform.init(false).await?;
            let outputs = terraform.outputs().await;

            match (outputs.get_str("cluster_name"), outputs.get_str("region")) {
                _ if outputs.is_empty() => {
                    obs::info("No Terraform outputs found, skipping Helm uninstall");
                }
                (Some(name), Some(region)) => {
                    let cluster = ClusterHandle::new(name, region);
                    if let Err(e) = self
                        .uninstall_releases(&cluster, &topology.teardown(), &outputs)
                        .await
                    {
                        obs::warn(format!("Failed to uninstall Helm release: {e}"));
                    }
                }
                _ => obs::warn("Cluster name or region missing from outputs, skipping Helm uninstall"),
            }

            terraform.destroy(topology.variables(), true).await?;
            obs::success("Infrastructure destroyed");
            Ok(())
        })
        .await
    }

    async fn uninstall_releases(
        &self,
        cluster: &ClusterHandle,
        teardown: &TeardownPlan,
        outputs: &ProvisionOutputs,
    ) -> Result<()> {
        self.eks(cluster)
            .update_kubeconfig(self.kubeconfig.as_deref())
            .await?;
        let namespace = teardown.namespace.resolve(outputs);
        let helm = HelmDeployer::new(self.runner.clone());
        for release in teardown.releases.iter().rev() {
            helm.uninstall(&release.resolve(outputs), &namespace, None)
                .await?;
        }
        Ok(())
    }

    /// Validate an existing deployment without touching Terraform or Helm.
    pub async fn validate(
        &self,
        topology: &dyn Topology,
        validate_api: bool,
    ) -> Result<ValidationOutcome> {
        traced(Uuid::new_v4(), "validate", topology.name(), async {
            let outputs = self.terraform()?.outputs().await;
            let cluster = resolve_cluster(&outputs, &topology.fallback_cluster());
            self.eks(&cluster)
                .update_kubeconfig(self.kubeconfig.as_deref())
                .await?;
            let plan = topology.workload(&outputs)?;
            let kube = self.connector.connect().await?;
            self.run_validation(kube, &plan, validate_api).await
        })
        .await
    }

    /// Current Terraform outputs; empty when nothing has been applied.
    pub async fn outputs(&self) -> Result<ProvisionOutputs> {
        Ok(self.terraform()?.outputs().await)
    }

    /// `helm list` in the topology's namespace.
    pub async fn releases(&self, topology: &dyn Topology) -> Result<()> {
        let outputs = self.terraform()?.outputs().await;
        let namespace = topology.teardown().namespace.resolve(&outputs);
        HelmDeployer::new(self.runner.clone())
            .list_releases(Some(&namespace))
            .await?;
        Ok(())
    }
}

/// Cluster from `cluster_name` / `region` outputs, falling back per field.
pub fn resolve_cluster(outputs: &ProvisionOutputs, fallback: &ClusterHandle) -> ClusterHandle {
    ClusterHandle::new(
        outputs.string_or("cluster_name", &fallback.name),
        outputs.string_or("region", &fallback.region),
    )
}

async fn traced<T, F>(run_id: Uuid, operation: &str, topology: &str, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let id = run_id.to_string();
    let started = Instant::now();
    async {
        obs::emit_run_started(&id, operation, topology);
        let result = work.await;
        obs::emit_run_finished(
            &id,
            operation,
            started.elapsed().as_millis() as u64,
            result.is_ok(),
        );
        result
    }
    .instrument(obs::run_span(&id))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_cluster_prefers_outputs() {
        let fallback = ClusterHandle::new("demo-cluster", "us-east-1");
        let mut outputs = ProvisionOutputs::new();
        assert_eq!(resolve_cluster(&outputs, &fallback), fallback);

        outputs.insert("cluster_name", "pfn-cluster");
        assert_eq!(
            resolve_cluster(&outputs, &fallback),
            ClusterHandle::new("pfn-cluster", "us-east-1")
        );
        outputs.insert("region", "us-west-2");
        assert_eq!(
            resolve_cluster(&outputs, &fallback),
            ClusterHandle::new("pfn-cluster", "us-west-2")
        );
    }
}
