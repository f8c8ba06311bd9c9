//! deploykit-orchestrator: end-to-end deploy and destroy
//!
//! A [`Topology`] turns the environment file into Terraform variables and,
//! once outputs exist, into a [`WorkloadPlan`]. [`ClusterOrchestrator`] runs
//! that plan against Terraform, EKS, Helm and the validation loops.

pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod seeder;
pub mod summary;
pub mod topology;

pub use error::{OrchestratorError, Result};
pub use orchestrator::{resolve_cluster, ClusterOrchestrator, DeploymentReport};
pub use plan::{DeployOptions, OutputBinding, SecretSeed, TeardownPlan, ValidationPlan, WorkloadPlan};
pub use seeder::SecretSeeder;
pub use summary::render_summary;
pub use topology::{PublicFullnode, Topology, ValidatorVfn};
