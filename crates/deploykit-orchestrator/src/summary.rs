//! Post-deploy access summary.

use crate::plan::WorkloadPlan;
use deploykit_core::{ClusterHandle, ProvisionOutputs};

/// Lines describing where the workload landed and how to inspect it.
pub fn render_summary(
    cluster: &ClusterHandle,
    plan: &WorkloadPlan,
    outputs: &ProvisionOutputs,
) -> Vec<String> {
    let namespace = &plan.namespace;
    let service = &plan.validation.service_name;
    let releases = plan.release_names();
    let bootstrap = outputs.flag("fullnode_bootstrap_enabled");

    let mut lines = vec![
        "Deployment Summary".to_string(),
        format!("  Cluster:   {}", cluster.name),
        format!("  Region:    {}", cluster.region),
        format!("  Namespace: {namespace}"),
        format!("  Releases:  {}", releases.join(", ")),
        format!("  Service:   {service}"),
    ];
    if bootstrap {
        lines.push(format!(
            "  Bootstrap: {}",
            outputs.string_or("fullnode_bootstrap_s3_uri", "(unknown)")
        ));
    }

    lines.push("Useful commands:".to_string());
    lines.push(format!("  kubectl get pods -n {namespace}"));
    lines.push(format!("  kubectl get svc {service} -n {namespace}"));
    for release in &releases {
        lines.push(format!("  kubectl logs {release}-0 -n {namespace}"));
    }
    if bootstrap {
        for release in &releases {
            lines.push(format!(
                "  kubectl logs {release}-0 -n {namespace} -c s3-bootstrap"
            ));
        }
    }
    lines
}
