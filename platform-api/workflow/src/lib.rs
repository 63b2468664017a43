//! Argo Workflows adapter: renders provisioning DAGs as `Workflow`
//! objects and reads their phase back.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod argo;

pub use self::argo::ArgoWorkflows;
