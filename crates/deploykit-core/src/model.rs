//! Cluster and release descriptors passed between components.

use crate::value::DeploymentValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A managed Kubernetes cluster, identified by name and region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterHandle {
    pub name: String,
    pub region: String,
}

impl ClusterHandle {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
        }
    }
}

impl fmt::Display for ClusterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.region)
    }
}

/// One Helm release to install or upgrade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseSpec {
    pub release_name: String,
    pub chart: PathBuf,
    pub namespace: String,
    pub set_values: BTreeMap<String, DeploymentValue>,
    pub set_files: BTreeMap<String, PathBuf>,
    pub create_namespace: bool,
    pub reset_values: bool,
}

impl ReleaseSpec {
    pub fn new(
        release_name: impl Into<String>,
        chart: impl Into<PathBuf>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            release_name: release_name.into(),
            chart: chart.into(),
            namespace: namespace.into(),
            set_values: BTreeMap::new(),
            set_files: BTreeMap::new(),
            create_namespace: true,
            reset_values: false,
        }
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<DeploymentValue>) -> Self {
        self.set_values.insert(key.into(), value.into());
        self
    }

    pub fn set_file(mut self, key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.set_files.insert(key.into(), path.into());
        self
    }

    pub fn reset_values(mut self, reset: bool) -> Self {
        self.reset_values = reset;
        self
    }

    pub fn create_namespace(mut self, create: bool) -> Self {
        self.create_namespace = create;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_spec_defaults() {
        let spec = ReleaseSpec::new("public-fullnode", "charts/node", "movement-l1");
        assert!(spec.create_namespace);
        assert!(!spec.reset_values);
        assert!(spec.set_values.is_empty());
    }

    #[test]
    fn test_release_spec_builder_overrides() {
        let spec = ReleaseSpec::new("vfn-01", "charts/node", "movement-l1")
            .set("node.type", "vfn")
            .set("storage.create", true)
            .set_file("config.inline", "configs/vfn.yaml")
            .reset_values(true);
        assert_eq!(spec.set_values.len(), 2);
        assert_eq!(
            spec.set_values.get("storage.create"),
            Some(&DeploymentValue::Bool(true))
        );
        assert!(spec.reset_values);
    }

    #[test]
    fn test_cluster_handle_display() {
        let handle = ClusterHandle::new("demo-cluster", "us-east-1");
        assert_eq!(handle.to_string(), "demo-cluster (us-east-1)");
    }
}
