//! Process wiring for the platform API: command line, logging, the admin
//! server, and the Kubernetes client runtime.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod args;

pub use self::args::Args;
