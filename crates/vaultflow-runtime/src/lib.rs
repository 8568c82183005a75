#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod action;
pub mod compile;
pub mod definition;
pub mod dispatch;
mod error;
pub mod eval;
pub mod event;
mod service;
pub mod store;
pub mod trace;
pub mod validate;

#[doc(hidden)]
pub mod prelude;

pub use error::{Error, Result};
pub use service::{CompileOutcome, RuntimeService};

/// Tracing target for runtime operations.
pub const TRACING_TARGET: &str = "vaultflow_runtime";
