//! Error types for workload validation

use std::time::Duration;
use thiserror::Error;

/// Result type for validation operations
pub type Result<T> = std::result::Result<T, ValidationError>;

#[derive(Error, Debug)]
pub enum ValidationError {
    /// Kubernetes API call failed
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// No usable kubeconfig
    #[error("Failed to load kubeconfig: {0}")]
    Kubeconfig(String),

    /// HTTP client could not be built or the request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Health probe failed without an HTTP response
    #[error("Request to {url} failed: {message}")]
    Probe { url: String, message: String },

    #[error("Service {namespace}/{name} not found")]
    ServiceNotFound { namespace: String, name: String },

    #[error("Pod {pod} entered Failed state")]
    PodFailed { pod: String },

    #[error(
        "Timeout waiting for pod to become ready (namespace={namespace}, app={label}) after {}s",
        timeout.as_secs()
    )]
    PodTimeout {
        namespace: String,
        label: String,
        timeout: Duration,
    },

    #[error("Timeout waiting for LoadBalancer/API readiness of {service} after {attempts} attempts")]
    EndpointUnhealthy { service: String, attempts: u32 },
}
