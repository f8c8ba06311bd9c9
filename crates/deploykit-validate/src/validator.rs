//! Pod readiness and load-balancer/API health polling.
//!
//! Two loops run back to back:
//!
//! 1. **Pod readiness**, bounded by a wall-clock deadline. Succeeds as soon as
//!    any pod with `app=<label>` reports `Ready=True`; a pod in phase `Failed`
//!    aborts the wait.
//! 2. **Endpoint health**, bounded by an attempt budget. Each attempt reads the
//!    service's load-balancer address and GETs `http://<addr>:<port><path>`.
//!    Only a 200 whose body carries a numeric `ledger_version` counts.

use crate::error::{Result, ValidationError};
use crate::kube_api::KubeApi;
use crate::probe::{ledger_version, HealthProbe};
use deploykit_core::config::keys;
use deploykit_core::{obs, poll_attempts, poll_until_deadline, ConfigError, EnvFile, PollError, Probe};
use k8s_openapi::api::core::v1::{Pod, Service};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Bounds and endpoint coordinates for validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationSettings {
    pub pod_timeout: Duration,
    pub lb_attempts: u32,
    pub interval: Duration,
    pub api_path: String,
    pub api_port: u16,
    pub http_timeout: Duration,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            pod_timeout: Duration::from_secs(3600),
            lb_attempts: 60,
            interval: Duration::from_secs(10),
            api_path: "/v1".to_string(),
            api_port: 8080,
            http_timeout: Duration::from_secs(10),
        }
    }
}

impl ValidationSettings {
    /// Defaults overridden by `POD_READY_TIMEOUT`, `MAX_RETRIES` and
    /// `RETRY_INTERVAL`.
    pub fn from_env(env: &EnvFile) -> std::result::Result<Self, ConfigError> {
        let defaults = Self::default();
        let attempts = env.u64_or(keys::MAX_RETRIES, u64::from(defaults.lb_attempts))?;
        let lb_attempts = u32::try_from(attempts).map_err(|e| ConfigError::Invalid {
            key: keys::MAX_RETRIES.to_string(),
            value: attempts.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            pod_timeout: env.secs_or(keys::POD_READY_TIMEOUT, defaults.pod_timeout.as_secs())?,
            lb_attempts,
            interval: env.secs_or(keys::RETRY_INTERVAL, defaults.interval.as_secs())?,
            ..defaults
        })
    }
}

/// Address and ledger marker of a healthy public endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointHealth {
    pub host: String,
    pub ledger_version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub ready_pod: String,
    pub endpoint: Option<EndpointHealth>,
}

/// Verdict over one pod listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodAssessment {
    Ready(String),
    Failed(String),
    Waiting,
}

pub fn pod_is_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
}

fn pod_name(pod: &Pod) -> String {
    pod.metadata.name.clone().unwrap_or_default()
}

fn pod_phase(pod: &Pod) -> Option<&str> {
    pod.status.as_ref().and_then(|s| s.phase.as_deref())
}

/// Walk pods in list order: the first ready pod wins, a `Failed` pod seen
/// before any ready one is fatal.
pub fn assess_pods(pods: &[Pod]) -> PodAssessment {
    for pod in pods {
        let name = pod_name(pod);
        if pod_is_ready(pod) {
            return PodAssessment::Ready(name);
        }
        let phase = pod_phase(pod);
        tracing::info!("  Pod {}: phase={}", name, phase.unwrap_or("Unknown"));
        if phase == Some("Failed") {
            return PodAssessment::Failed(name);
        }
    }
    PodAssessment::Waiting
}

/// First load-balancer ingress address, hostname preferred over IP.
pub fn load_balancer_address(service: &Service) -> Option<String> {
    let ingress = service
        .status
        .as_ref()?
        .load_balancer
        .as_ref()?
        .ingress
        .as_ref()?
        .first()?;
    let host = ingress
        .hostname
        .as_deref()
        .filter(|h| !h.is_empty())
        .or(ingress.ip.as_deref())
        .unwrap_or_default()
        .trim();
    (!host.is_empty()).then(|| host.to_string())
}

/// Runs the readiness loops against a cluster session and an HTTP probe.
pub struct DeploymentValidator {
    kube: Arc<dyn KubeApi>,
    probe: Arc<dyn HealthProbe>,
}

impl DeploymentValidator {
    pub fn new(kube: Arc<dyn KubeApi>, probe: Arc<dyn HealthProbe>) -> Self {
        Self { kube, probe }
    }

    /// Wait until a pod labelled `app=<label>` is ready. Returns its name.
    pub async fn wait_for_pod_ready(
        &self,
        namespace: &str,
        label: &str,
        timeout: Duration,
        interval: Duration,
    ) -> Result<String> {
        obs::info(format!(
            "Waiting for pod to become ready (namespace={namespace}, app={label})"
        ));
        let selector = format!("app={label}");
        let selector = selector.as_str();

        let result = poll_until_deadline(timeout, interval, || async move {
            let pods = match self.kube.list_pods(namespace, selector).await {
                Ok(pods) => pods,
                Err(e) => return Probe::Failed(e),
            };
            if pods.is_empty() {
                obs::warn(format!("No pods found with label {selector}"));
                return Probe::Pending;
            }
            match assess_pods(&pods) {
                PodAssessment::Ready(name) => Probe::Ready(name),
                PodAssessment::Failed(pod) => Probe::Failed(ValidationError::PodFailed { pod }),
                PodAssessment::Waiting => Probe::Pending,
            }
        })
        .await;

        match result {
            Ok(name) => {
                obs::success(format!("Pod {name} is ready"));
                Ok(name)
            }
            Err(PollError::Failed(e)) => Err(e),
            Err(PollError::TimedOut { .. }) | Err(PollError::Exhausted { .. }) => {
                Err(ValidationError::PodTimeout {
                    namespace: namespace.to_string(),
                    label: label.to_string(),
                    timeout,
                })
            }
        }
    }

    /// Wait for `service` to get a load-balancer address that serves a
    /// healthy API.
    pub async fn wait_for_load_balancer_and_api(
        &self,
        namespace: &str,
        service: &str,
        settings: &ValidationSettings,
    ) -> Result<EndpointHealth> {
        obs::info(format!(
            "Waiting for LoadBalancer and API health (service={service})"
        ));
        let retries = settings.lb_attempts;
        let port = settings.api_port;
        let path = settings.api_path.as_str();

        let result = poll_attempts(retries, settings.interval, |attempt| async move {
            let svc = match self.kube.get_service(namespace, service).await {
                Ok(svc) => svc,
                Err(e) => {
                    obs::warn(format!(
                        "Failed to read service: {e}, retry {attempt}/{retries}"
                    ));
                    return Probe::<EndpointHealth, ValidationError>::Pending;
                }
            };
            let Some(host) = load_balancer_address(&svc) else {
                tracing::info!("  LoadBalancer pending, retry {}/{}", attempt, retries);
                return Probe::Pending;
            };

            let url = format!("http://{host}:{port}{path}");
            match self.probe.get(&url).await {
                Ok(response) if response.status == 200 => match ledger_version(&response.body) {
                    Some(version) => {
                        obs::success(format!(
                            "API healthy at {host} (ledger_version={version})"
                        ));
                        Probe::Ready(EndpointHealth {
                            host,
                            ledger_version: version,
                        })
                    }
                    None => {
                        obs::warn(format!(
                            "API at {host} answered without a ledger_version, retry {attempt}/{retries}"
                        ));
                        Probe::Pending
                    }
                },
                Ok(response) => {
                    obs::warn(format!(
                        "LB reachable, API HTTP {}, retry {attempt}/{retries}",
                        response.status
                    ));
                    Probe::Pending
                }
                Err(e) => {
                    obs::warn(format!(
                        "LB/API not ready ({e}), retry {attempt}/{retries}"
                    ));
                    Probe::Pending
                }
            }
        })
        .await;

        match result {
            Ok(health) => Ok(health),
            Err(PollError::Failed(e)) => Err(e),
            Err(PollError::Exhausted { attempts }) => Err(ValidationError::EndpointUnhealthy {
                service: service.to_string(),
                attempts,
            }),
            Err(PollError::TimedOut { .. }) => Err(ValidationError::EndpointUnhealthy {
                service: service.to_string(),
                attempts: retries,
            }),
        }
    }

    /// Pod readiness on `app=<service>`, then endpoint health when
    /// `validate_api` is set.
    pub async fn validate_deployment(
        &self,
        namespace: &str,
        service: &str,
        settings: &ValidationSettings,
        validate_api: bool,
    ) -> Result<ValidationOutcome> {
        obs::info("Validating deployment");
        let ready_pod = self
            .wait_for_pod_ready(namespace, service, settings.pod_timeout, settings.interval)
            .await?;
        let endpoint = if validate_api {
            Some(
                self.wait_for_load_balancer_and_api(namespace, service, settings)
                    .await?,
            )
        } else {
            None
        };
        obs::success("Deployment validation passed");
        Ok(ValidationOutcome {
            ready_pod,
            endpoint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{load_balancer_service, pod};

    #[test]
    fn test_assess_first_ready_wins() {
        let pods = vec![pod("node-0", "Pending", false), pod("node-1", "Running", true)];
        assert_eq!(assess_pods(&pods), PodAssessment::Ready("node-1".into()));
    }

    #[test]
    fn test_assess_failed_before_ready_is_fatal() {
        let pods = vec![pod("node-0", "Failed", false), pod("node-1", "Running", true)];
        assert_eq!(assess_pods(&pods), PodAssessment::Failed("node-0".into()));
    }

    #[test]
    fn test_assess_ready_before_failed_succeeds() {
        let pods = vec![pod("node-0", "Running", true), pod("node-1", "Failed", false)];
        assert_eq!(assess_pods(&pods), PodAssessment::Ready("node-0".into()));
    }

    #[test]
    fn test_assess_waiting() {
        let pods = vec![pod("node-0", "Pending", false)];
        assert_eq!(assess_pods(&pods), PodAssessment::Waiting);
        assert_eq!(assess_pods(&[]), PodAssessment::Waiting);
    }

    #[test]
    fn test_address_prefers_hostname() {
        let svc = load_balancer_service("fullnode", Some("abc.elb.amazonaws.com"), Some("1.2.3.4"));
        assert_eq!(
            load_balancer_address(&svc).as_deref(),
            Some("abc.elb.amazonaws.com")
        );
    }

    #[test]
    fn test_address_falls_back_to_ip_and_trims() {
        let svc = load_balancer_service("fullnode", Some(""), Some(" 10.0.0.7 "));
        assert_eq!(load_balancer_address(&svc).as_deref(), Some("10.0.0.7"));
    }

    #[test]
    fn test_address_pending() {
        let svc = load_balancer_service("fullnode", None, None);
        assert_eq!(load_balancer_address(&svc), None);
        assert_eq!(load_balancer_address(&Service::default()), None);
    }

    #[test]
    fn test_settings_from_env() {
        let env = EnvFile::from_pairs([
            ("POD_READY_TIMEOUT", "600"),
            ("MAX_RETRIES", "5"),
            ("RETRY_INTERVAL", "2"),
        ]);
        let settings = ValidationSettings::from_env(&env).unwrap();
        assert_eq!(settings.pod_timeout, Duration::from_secs(600));
        assert_eq!(settings.lb_attempts, 5);
        assert_eq!(settings.interval, Duration::from_secs(2));
        assert_eq!(settings.api_path, "/v1");
        assert_eq!(settings.api_port, 8080);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = ValidationSettings::from_env(&EnvFile::default()).unwrap();
        assert_eq!(settings, ValidationSettings::default());
        assert_eq!(settings.http_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_settings_reject_garbage() {
        let env = EnvFile::from_pairs([("RETRY_INTERVAL", "ten")]);
        assert!(ValidationSettings::from_env(&env).is_err());
    }
}
