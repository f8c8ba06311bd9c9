//! Helm release management.

use crate::error::Result;
use deploykit_core::runner::{CommandRunner, CommandSpec};
use deploykit_core::{obs, ReleaseSpec};
use std::sync::Arc;
use std::time::Duration;

/// Installs, upgrades and removes Helm releases.
pub struct HelmDeployer {
    runner: Arc<dyn CommandRunner>,
}

impl HelmDeployer {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// `helm upgrade --install` for `spec`. With `wait`, Helm blocks until the
    /// release's resources are ready or the duration elapses.
    pub async fn upgrade_install(&self, spec: &ReleaseSpec, wait: Option<Duration>) -> Result<()> {
        obs::info(format!(
            "Deploying Helm release '{}' to namespace '{}'",
            spec.release_name, spec.namespace
        ));
        let args = upgrade_install_args(spec, wait);
        self.runner.run(&CommandSpec::new("helm", args)).await?;
        obs::success(format!(
            "Helm release '{}' deployed successfully",
            spec.release_name
        ));
        Ok(())
    }

    /// Remove a release. A failing uninstall (usually: release not found) is
    /// logged and otherwise ignored.
    pub async fn uninstall(
        &self,
        release_name: &str,
        namespace: &str,
        wait: Option<Duration>,
    ) -> Result<()> {
        obs::info(format!(
            "Uninstalling Helm release '{release_name}' from namespace '{namespace}'"
        ));
        let mut args = vec![
            "uninstall".to_string(),
            release_name.to_string(),
            "--namespace".to_string(),
            namespace.to_string(),
        ];
        push_wait(&mut args, wait);
        let output = self
            .runner
            .run(&CommandSpec::new("helm", args).unchecked())
            .await?;
        if output.success() {
            obs::success(format!("Helm release '{release_name}' uninstalled"));
        } else {
            obs::warn(format!(
                "Helm uninstall of '{release_name}' exited with {}: {}",
                output.code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                output.detail()
            ));
        }
        Ok(())
    }

    /// `helm list`, streamed to the terminal.
    pub async fn list_releases(&self, namespace: Option<&str>) -> Result<()> {
        let mut args = vec!["list".to_string()];
        if let Some(ns) = namespace {
            args.push("--namespace".to_string());
            args.push(ns.to_string());
        }
        self.runner.run(&CommandSpec::new("helm", args)).await?;
        Ok(())
    }
}

fn push_wait(args: &mut Vec<String>, wait: Option<Duration>) {
    if let Some(timeout) = wait {
        args.push("--wait".to_string());
        args.push("--timeout".to_string());
        args.push(format!("{}s", timeout.as_secs()));
    }
}

/// Arguments for `helm upgrade --install`, without the program name.
///
/// Scalar overrides use `--set`, lists and mappings use `--set-json`, nulls
/// are dropped. Each group is emitted in key order.
pub fn upgrade_install_args(spec: &ReleaseSpec, wait: Option<Duration>) -> Vec<String> {
    let mut args = vec![
        "upgrade".to_string(),
        "--install".to_string(),
        spec.release_name.clone(),
        spec.chart.display().to_string(),
        "--namespace".to_string(),
        spec.namespace.clone(),
    ];
    if spec.create_namespace {
        args.push("--create-namespace".to_string());
    }
    if spec.reset_values {
        args.push("--reset-values".to_string());
    }
    push_wait(&mut args, wait);

    let (structured, scalar): (Vec<_>, Vec<_>) = spec
        .set_values
        .iter()
        .partition(|(_, value)| value.is_structured());
    for (flag, entries) in [("--set", scalar), ("--set-json", structured)] {
        for (key, value) in entries {
            if let Some(rendered) = value.render() {
                args.push(flag.to_string());
                args.push(format!("{key}={rendered}"));
            }
        }
    }
    for (key, path) in &spec.set_files {
        args.push("--set-file".to_string());
        args.push(format!("{key}={}", path.display()));
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploykit_core::fakes::ScriptedRunner;
    use deploykit_core::DeploymentValue;
    use std::collections::BTreeMap;

    fn release() -> ReleaseSpec {
        ReleaseSpec::new("public-fullnode", "charts/node", "movement-l1")
    }

    #[test]
    fn test_minimal_args() {
        assert_eq!(
            upgrade_install_args(&release(), None),
            vec![
                "upgrade",
                "--install",
                "public-fullnode",
                "charts/node",
                "--namespace",
                "movement-l1",
                "--create-namespace",
            ]
        );
    }

    #[test]
    fn test_flags_and_value_routing() {
        let mut annotations = BTreeMap::new();
        annotations.insert(
            "service.beta.kubernetes.io/aws-load-balancer-type".to_string(),
            "nlb",
        );
        let spec = release()
            .create_namespace(false)
            .reset_values(true)
            .set("storage.create", true)
            .set("node.id", "public-fullnode")
            .set("bootstrap.s3Uri", DeploymentValue::Null)
            .set("service.annotations", annotations)
            .set_file("config.inline", "configs/testnet.yaml");
        let args = upgrade_install_args(&spec, Some(Duration::from_secs(600)));
        assert_eq!(
            args[6..].to_vec(),
            vec![
                "--reset-values",
                "--wait",
                "--timeout",
                "600s",
                "--set",
                "node.id=public-fullnode",
                "--set",
                "storage.create=true",
                "--set-json",
                r#"service.annotations={"service.beta.kubernetes.io/aws-load-balancer-type":"nlb"}"#,
                "--set-file",
                "config.inline=configs/testnet.yaml",
            ]
        );
    }

    #[tokio::test]
    async fn test_upgrade_install_failure_is_fatal() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.fail(&["helm", "upgrade"], 1, "Error: chart not found");
        let helm = HelmDeployer::new(runner.clone());
        let err = helm.upgrade_install(&release(), None).await.unwrap_err();
        assert!(err.to_string().contains("chart not found"));
    }

    #[tokio::test]
    async fn test_uninstall_failure_is_swallowed() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.fail(&["helm", "uninstall"], 1, "Error: release: not found");
        let helm = HelmDeployer::new(runner.clone());
        helm.uninstall("public-fullnode", "movement-l1", Some(Duration::from_secs(300)))
            .await
            .unwrap();
        assert_eq!(
            runner.command_lines(),
            vec!["helm uninstall public-fullnode --namespace movement-l1 --wait --timeout 300s"]
        );
    }

    #[tokio::test]
    async fn test_list_releases_namespace() {
        let runner = Arc::new(ScriptedRunner::new());
        let helm = HelmDeployer::new(runner.clone());
        helm.list_releases(Some("movement-l1")).await.unwrap();
        helm.list_releases(None).await.unwrap();
        assert_eq!(
            runner.command_lines(),
            vec!["helm list --namespace movement-l1", "helm list"]
        );
    }
}
