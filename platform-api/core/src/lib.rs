//! Core provisioning logic for the platform API.
//!
//! This crate owns the request model, validation, the provisioning
//! strategies, and the orchestrator that ties them together. It has no
//! Kubernetes dependency: cluster writes and workflow submission are
//! reached through the [`ProvisionCluster`] and [`WorkflowEngine`] traits,
//! implemented elsewhere.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod cluster;
pub mod direct;
pub mod error;
pub mod orchestrator;
pub mod request;
pub mod result;
pub mod store;
pub mod strategy;
pub mod tier;
pub mod validate;
pub mod workflow;


pub use self::{
    cluster::{ListFilter, ManagedNamespace, ProvisionCluster},
    direct::RollbackPolicy,
    error::{Error, FieldError},
    orchestrator::{Orchestrator, OrchestratorConfig, DEFAULT_WORKFLOW_TEMPLATE},
    request::{Environment, NetworkPolicyKind, ProvisioningRequest, ValidatedRequest},
    result::{CreatedResources, ProvisionStep, ProvisioningResult, ProvisioningStatus, StepStatus},
    store::{InMemoryStore, RequestStore},
    strategy::{ProvisionContext, ProvisioningStrategy},
    tier::ResourceTierConfig,
    validate::validate,
    workflow::{WorkflowEngine, WorkflowPhase, WorkflowReport, WorkflowSpec},
};

/// Identifies this service as the owner of the namespaces it provisions,
/// recorded in the `platform.io/provisioned-by` label.
pub const PROVISIONER_NAME: &str = "platform-api";
