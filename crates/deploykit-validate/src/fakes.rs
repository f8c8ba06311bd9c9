//! In-memory Kubernetes and HTTP fakes (testing only)
//!
//! Scripted responses are consumed in order and the last one repeats, which
//! models a cluster that settles into a steady state.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    LoadBalancerIngress, LoadBalancerStatus, Pod, PodCondition, PodStatus, Service, ServiceStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::error::{Result, ValidationError};
use crate::kube_api::{KubeApi, KubeConnector};
use crate::probe::{HealthProbe, ProbeResponse};

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// A pod with the given phase and `Ready` condition.
pub fn pod(name: &str, phase: &str, ready: bool) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            conditions: Some(vec![PodCondition {
                type_: "Ready".to_string(),
                status: if ready { "True" } else { "False" }.to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A LoadBalancer service with at most one ingress entry.
pub fn load_balancer_service(name: &str, hostname: Option<&str>, ip: Option<&str>) -> Service {
    let ingress = if hostname.is_none() && ip.is_none() {
        Vec::new()
    } else {
        vec![LoadBalancerIngress {
            hostname: hostname.map(str::to_string),
            ip: ip.map(str::to_string),
            ..Default::default()
        }]
    };
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        status: Some(ServiceStatus {
            load_balancer: Some(LoadBalancerStatus {
                ingress: Some(ingress),
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A Kubernetes API error as the real client would report it.
pub fn api_error(code: u16, message: &str) -> ValidationError {
    ValidationError::Kube(kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: "InternalError".to_string(),
        code,
    }))
}

fn next<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

// ---------------------------------------------------------------------------
// FakeKube
// ---------------------------------------------------------------------------

/// Scripted [`KubeApi`]. Pod listings are keyed by label selector, services
/// by name.
#[derive(Debug, Default)]
pub struct FakeKube {
    pods: Mutex<HashMap<String, VecDeque<std::result::Result<Vec<Pod>, String>>>>,
    services: Mutex<HashMap<String, VecDeque<Option<Service>>>>,
    secrets: Mutex<BTreeMap<(String, String), BTreeMap<String, String>>>,
    namespaces: Mutex<BTreeSet<String>>,
    pod_lists: Mutex<Vec<String>>,
    service_reads: Mutex<Vec<String>>,
}

impl FakeKube {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a listing for `selector` (e.g. `app=vfn-01`).
    pub fn push_pods(&self, selector: &str, pods: Vec<Pod>) -> &Self {
        self.pods
            .lock()
            .unwrap()
            .entry(selector.to_string())
            .or_default()
            .push_back(Ok(pods));
        self
    }

    /// Queue a failing list call for `selector`.
    pub fn push_pod_error(&self, selector: &str, message: &str) -> &Self {
        self.pods
            .lock()
            .unwrap()
            .entry(selector.to_string())
            .or_default()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn push_service(&self, name: &str, service: Service) -> &Self {
        self.services
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .push_back(Some(service));
        self
    }

    /// Queue a read of `name` that reports not-found.
    pub fn push_missing_service(&self, name: &str) -> &Self {
        self.services
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .push_back(None);
        self
    }

    pub fn insert_secret(&self, namespace: &str, name: &str, data: BTreeMap<String, String>) {
        self.secrets
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), data);
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<BTreeMap<String, String>> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.lock().unwrap().contains(namespace)
    }

    /// Number of list calls made with `selector`.
    pub fn pod_list_count(&self, selector: &str) -> usize {
        self.pod_lists
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.as_str() == selector)
            .count()
    }

    pub fn service_read_count(&self, name: &str) -> usize {
        self.service_reads
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.as_str() == name)
            .count()
    }
}

#[async_trait]
impl KubeApi for FakeKube {
    async fn list_pods(&self, _namespace: &str, label_selector: &str) -> Result<Vec<Pod>> {
        self.pod_lists
            .lock()
            .unwrap()
            .push(label_selector.to_string());
        let scripted = self
            .pods
            .lock()
            .unwrap()
            .get_mut(label_selector)
            .and_then(next);
        match scripted {
            Some(Ok(pods)) => Ok(pods),
            Some(Err(message)) => Err(api_error(500, &message)),
            None => Ok(Vec::new()),
        }
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service> {
        self.service_reads.lock().unwrap().push(name.to_string());
        let scripted = self
            .services
            .lock()
            .unwrap()
            .get_mut(name)
            .and_then(next)
            .flatten();
        scripted.ok_or_else(|| ValidationError::ServiceNotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    async fn secret_exists(&self, namespace: &str, name: &str) -> Result<bool> {
        Ok(self.secret(namespace, name).is_some())
    }

    async fn create_secret(
        &self,
        namespace: &str,
        name: &str,
        string_data: BTreeMap<String, String>,
    ) -> Result<()> {
        let mut secrets = self.secrets.lock().unwrap();
        let key = (namespace.to_string(), name.to_string());
        if secrets.contains_key(&key) {
            return Err(api_error(409, "secrets already exists"));
        }
        secrets.insert(key, string_data);
        Ok(())
    }

    async fn ensure_namespace(&self, namespace: &str) -> Result<()> {
        self.namespaces
            .lock()
            .unwrap()
            .insert(namespace.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeConnector
// ---------------------------------------------------------------------------

/// Hands out the same [`FakeKube`] on every connect.
#[derive(Debug, Clone)]
pub struct FakeConnector {
    kube: Arc<FakeKube>,
    connects: Arc<Mutex<usize>>,
}

impl FakeConnector {
    pub fn new(kube: Arc<FakeKube>) -> Self {
        Self {
            kube,
            connects: Arc::new(Mutex::new(0)),
        }
    }

    pub fn connect_count(&self) -> usize {
        *self.connects.lock().unwrap()
    }
}

#[async_trait]
impl KubeConnector for FakeConnector {
    async fn connect(&self) -> Result<Arc<dyn KubeApi>> {
        *self.connects.lock().unwrap() += 1;
        Ok(self.kube.clone())
    }
}

// ---------------------------------------------------------------------------
// FakeProbe
// ---------------------------------------------------------------------------

/// Scripted [`HealthProbe`]. `Err` entries simulate transport failures.
#[derive(Debug, Default)]
pub struct FakeProbe {
    responses: Mutex<VecDeque<std::result::Result<ProbeResponse, String>>>,
    requests: Mutex<Vec<String>>,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, status: u16, body: &str) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(ProbeResponse {
            status,
            body: body.to_string(),
        }));
        self
    }

    pub fn push_unreachable(&self, message: &str) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HealthProbe for FakeProbe {
    async fn get(&self, url: &str) -> Result<ProbeResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        let scripted = {
            let mut responses = self.responses.lock().unwrap();
            next(&mut *responses)
        };
        match scripted {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(ValidationError::Probe {
                url: url.to_string(),
                message,
            }),
            None => Err(ValidationError::Probe {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }),
        }
    }
}
