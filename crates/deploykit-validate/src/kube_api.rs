//! Kubernetes API access used by validation and secret seeding.

use crate::error::{Result, ValidationError};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Pod, Secret, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, ListParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// The handful of core/v1 calls deploykit makes.
#[async_trait]
pub trait KubeApi: Send + Sync {
    /// Pods in `namespace` matching `label_selector`, in API order.
    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>>;

    /// A named service; [`ValidationError::ServiceNotFound`] if absent.
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service>;

    async fn secret_exists(&self, namespace: &str, name: &str) -> Result<bool>;

    /// Create an `Opaque` secret from plain-text entries.
    async fn create_secret(
        &self,
        namespace: &str,
        name: &str,
        string_data: BTreeMap<String, String>,
    ) -> Result<()>;

    /// Create `namespace` unless it exists.
    async fn ensure_namespace(&self, namespace: &str) -> Result<()>;
}

/// Opens a [`KubeApi`] session. Connection happens after the kubeconfig has
/// been refreshed, so it cannot be done up front.
#[async_trait]
pub trait KubeConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn KubeApi>>;
}

/// [`KubeApi`] on a live `kube::Client`.
#[derive(Clone)]
pub struct KubeClientApi {
    client: Client,
}

impl KubeClientApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KubeApi for KubeClientApi {
    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods
            .list(&ListParams::default().labels(label_selector))
            .await?;
        Ok(list.items)
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service> {
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        services
            .get_opt(name)
            .await?
            .ok_or_else(|| ValidationError::ServiceNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    async fn secret_exists(&self, namespace: &str, name: &str) -> Result<bool> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(secrets.get_opt(name).await?.is_some())
    }

    async fn create_secret(
        &self,
        namespace: &str,
        name: &str,
        string_data: BTreeMap<String, String>,
    ) -> Result<()> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            type_: Some("Opaque".to_string()),
            string_data: Some(string_data),
            ..Default::default()
        };
        secrets.create(&PostParams::default(), &secret).await?;
        Ok(())
    }

    async fn ensure_namespace(&self, namespace: &str) -> Result<()> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        if namespaces.get_opt(namespace).await?.is_some() {
            return Ok(());
        }
        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some(namespace.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        namespaces.create(&PostParams::default(), &ns).await?;
        Ok(())
    }
}

/// Connects with an explicit kubeconfig file, or the default inference
/// chain (`KUBECONFIG`, `~/.kube/config`, in-cluster).
#[derive(Debug, Clone, Default)]
pub struct KubeconfigConnector {
    kubeconfig: Option<PathBuf>,
}

impl KubeconfigConnector {
    pub fn new(kubeconfig: Option<PathBuf>) -> Self {
        Self { kubeconfig }
    }
}

#[async_trait]
impl KubeConnector for KubeconfigConnector {
    async fn connect(&self) -> Result<Arc<dyn KubeApi>> {
        let config = match &self.kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)
                    .map_err(|e| ValidationError::Kubeconfig(format!("{}: {e}", path.display())))?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| ValidationError::Kubeconfig(e.to_string()))?
            }
            None => Config::infer()
                .await
                .map_err(|e| ValidationError::Kubeconfig(e.to_string()))?,
        };
        let client = Client::try_from(config)?;
        Ok(Arc::new(KubeClientApi::new(client)))
    }
}
