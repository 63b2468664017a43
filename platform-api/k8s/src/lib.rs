//! Kubernetes-facing half of the provisioner: the object shapes written
//! to the cluster and the client that writes them.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod client;
pub mod convention;
pub mod objects;

pub use self::client::ProvisionerClient;
