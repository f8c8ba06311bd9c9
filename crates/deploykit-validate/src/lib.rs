//! deploykit-validate: post-deploy health checks
//!
//! Polls pod readiness through the Kubernetes API and, for workloads with a
//! public endpoint, the load balancer address and the node API behind it.

pub mod error;
pub mod fakes;
pub mod kube_api;
pub mod probe;
pub mod validator;

pub use error::{Result, ValidationError};
pub use kube_api::{KubeApi, KubeClientApi, KubeConnector, KubeconfigConnector};
pub use probe::{ledger_version, HealthProbe, HttpHealthProbe, ProbeResponse};
pub use validator::{
    DeploymentValidator, EndpointHealth, ValidationOutcome, ValidationSettings,
};
