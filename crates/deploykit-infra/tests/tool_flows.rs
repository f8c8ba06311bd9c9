//! Command-level flows across the infra wrappers, driven by a scripted runner.

use deploykit_core::fakes::ScriptedRunner;
use deploykit_core::{ClusterHandle, DeploymentVariables, ReleaseSpec};
use deploykit_infra::{ActiveWait, EksReadinessProbe, HelmDeployer, TerraformProvisioner};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Terraform
// ---------------------------------------------------------------------------

#[tokio::test]
async fn provision_sequence_runs_in_working_dir() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(ScriptedRunner::new());
    runner.ok(
        &["terraform", "output", "-json"],
        r#"{"cluster_name":{"value":"validator-01-cluster"},"region":{"value":"us-west-2"}}"#,
    );
    let tf = TerraformProvisioner::new(dir.path(), runner.clone()).unwrap();
    let vars = DeploymentVariables::new()
        .with("validator_name", "validator-01")
        .with("node_min_size", 2);

    tf.init(true).await.unwrap();
    tf.validate().await.unwrap();
    tf.apply(&vars, true).await.unwrap();
    let outputs = tf.outputs().await;

    assert_eq!(
        runner.command_lines(),
        vec![
            "terraform init -upgrade",
            "terraform validate",
            "terraform apply -auto-approve -var node_min_size=2 -var validator_name=validator-01",
            "terraform output -json",
        ]
    );
    assert!(runner
        .calls()
        .iter()
        .all(|c| c.cwd.as_deref() == Some(dir.path())));
    assert_eq!(outputs.string_or("cluster_name", "x"), "validator-01-cluster");
}

#[tokio::test]
async fn destroy_passes_variables() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(ScriptedRunner::new());
    let tf = TerraformProvisioner::new(dir.path(), runner.clone()).unwrap();
    let vars = DeploymentVariables::new().with("enable_dns", true);
    tf.destroy(&vars, true).await.unwrap();
    assert_eq!(
        runner.command_lines(),
        vec!["terraform destroy -auto-approve -var enable_dns=true"]
    );
}

// ---------------------------------------------------------------------------
// EKS + Helm
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn cluster_ready_then_release_installed() {
    let runner = Arc::new(ScriptedRunner::new());
    runner.ok(&["aws", "--query", "cluster.status"], "CREATING\n");
    runner.ok(&["aws", "--query", "cluster.status"], "ACTIVE\n");

    let eks = EksReadinessProbe::new(
        ClusterHandle::new("validator-01-cluster", "us-west-2"),
        runner.clone(),
    );
    eks.wait_until_active(ActiveWait {
        timeout: Duration::from_secs(120),
        interval: Duration::from_secs(15),
    })
    .await
    .unwrap();
    eks.update_kubeconfig(None).await.unwrap();

    let helm = HelmDeployer::new(runner.clone());
    let release = ReleaseSpec::new("validator-01", "charts/movement-node", "movement-l1")
        .set("node.type", "validator")
        .set("service.type", "ClusterIP");
    helm.upgrade_install(&release, None).await.unwrap();

    let lines = runner.command_lines();
    assert_eq!(lines.len(), 4);
    assert!(lines[2].starts_with("aws eks update-kubeconfig"));
    assert_eq!(
        lines[3],
        "helm upgrade --install validator-01 charts/movement-node --namespace movement-l1 \
         --create-namespace --set node.type=validator --set service.type=ClusterIP"
    );
}
