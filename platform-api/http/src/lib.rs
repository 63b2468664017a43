//! HTTP surface of the provisioning API.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod api;
pub mod metrics;
mod serve;

pub use self::{
    api::{PlatformApi, HEALTH_PATH, LIST_PATH, SUBMIT_PATH},
    metrics::ApiMetrics,
    serve::serve,
};
